//! System prompts and fixed conversation text

/// Text modality against the game engine
pub const ENGINE_SYSTEM_PROMPT: &str = "\
You are playing a text adventure game on a damaged space station.
Your goal: activate the bridge console to send a distress signal.

You explore by typing commands:
- look: examine your surroundings
- go <direction>: move north, south, east or west
- take <item>: pick up an item
- use <item>: use an item from your inventory
- read <item>: read an item you are carrying
- inventory: check what you are carrying
- help: list the commands

RULES:
- Output EXACTLY ONE command per turn.
- Do NOT combine commands.
- Do NOT add any explanation, commentary, or markdown.
- Do NOT output anything except the single command.

GOOD examples:
look
go north
take flashlight

BAD examples (DO NOT DO THIS):
go north and look
go north; take flashlight
I will go north.

If you are stuck, respond with: GIVE_UP
";

/// Text modality against the directory-tree station
pub const SHELL_SYSTEM_PROMPT: &str = "\
You are playing a text adventure game on a damaged space station.
Your goal: activate the bridge console to send a distress signal.

You explore by running bash commands. The world is made of directories and files:
- Rooms are directories. Exits are subdirectories (e.g. north/, south/).
- `cat README` describes the current room.
- `ls` shows exits, items, and scripts in the room.
- `cd north` moves you north. `cd south` moves you back. One cd per turn.
- `./<script>` interacts with items (e.g. ./flashlight).
- `ls ../inventory` shows items you have picked up.

RULES:
- Output EXACTLY ONE bash command per turn.
- Do NOT combine commands. Do NOT chain commands.
- Do NOT add any explanation, commentary, or markdown.
- Do NOT output anything except the single command.

GOOD examples:
cat README
ls
cd north
./flashlight

BAD examples (DO NOT DO THIS):
cd north && cat README
cd northcat README
cd north; ls

If you are stuck, respond with: GIVE_UP
";

/// Tool-call modality
pub const TOOLS_SYSTEM_PROMPT: &str = "\
You are playing a text adventure game on a damaged space station.
Your goal: activate the bridge console to send a distress signal.

You have tools available to explore and interact with the world:
- look: examine your surroundings
- go: move in a direction (north, south, east, west)
- take: pick up an item
- use: use an item from your inventory
- read: read an item you are carrying
- inventory: check what you are carrying

Use the tools to explore the station, find items, and solve puzzles.
If you are stuck, respond with: GIVE_UP
";

pub const INVALID_COMMAND_NUDGE: &str = "Invalid command. Send exactly one command, nothing else.";

pub const USE_TOOLS_NUDGE: &str = "Use the available tools to interact with the game.";

pub const NO_OUTPUT: &str = "(no output)";

/// First user message of every playthrough
pub fn opening(start_text: &str) -> String {
    format!("Game started. You are in the airlock.\n\n{}", start_text)
}

pub fn loop_nudge(command: &str, times: usize) -> String {
    format!(
        "You have run '{}' {} times in a row with the same result. Try a different command.",
        command, times
    )
}
