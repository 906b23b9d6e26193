//! # Game Engine
//!
//! A finite state machine over (current room, inventory, taken-items, flags,
//! move count). `execute` is the only mutating entry point; it always returns
//! narrative text and never fails. Bad input is answered with guidance.
//!
//! Invariants:
//! - The move counter advances exactly once per recognized command, whether or
//!   not the action succeeds, and never for blank input or unknown verbs.
//! - An item is either still in its home room or taken, never both; a taken
//!   item never returns to a room.
//! - The terminal flag goes false -> true once, through the `Activate` use
//!   effect, and is never cleared.

use crate::command::{Command, Direction};
use crate::world::{FlagId, Item, ItemId, Room, RoomId, UseEffect, World};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub const HELP_TEXT: &str = "Commands:\n\
  look          - Examine your surroundings\n\
  go <direction> - Move (north, south, east, west)\n\
  take <item>   - Pick up an item\n\
  use <item>    - Use an item\n\
  read <item>   - Read an item\n\
  inventory     - Check what you're carrying\n\
  help          - Show this message";

/// Mutable per-playthrough state
#[derive(Debug, Clone)]
struct GameState {
    room: RoomId,
    inventory: BTreeSet<ItemId>,
    /// Items ever removed from their home room
    taken: BTreeSet<ItemId>,
    flags: BTreeMap<FlagId, bool>,
    moves: u32,
}

/// Serializable view of the engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room: RoomId,
    /// Held item ids, sorted
    pub inventory: Vec<ItemId>,
    pub flags: BTreeMap<FlagId, bool>,
    pub moves: u32,
    pub won: bool,
}

pub struct GameEngine {
    world: Arc<World>,
    state: GameState,
}

impl GameEngine {
    /// Fresh playthrough at the world's start room
    pub fn new(world: Arc<World>) -> Self {
        let state = GameState {
            room: world.start().clone(),
            inventory: BTreeSet::new(),
            taken: BTreeSet::new(),
            flags: world.initial_flags().clone(),
            moves: 0,
        };
        Self { world, state }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Parse and execute raw input
    pub fn execute(&mut self, input: &str) -> String {
        self.execute_command(Command::parse(input))
    }

    pub fn execute_command(&mut self, command: Command) -> String {
        if command.is_recognized() {
            self.state.moves += 1;
        }

        match command {
            Command::Look => self.describe(),
            Command::Go(direction) => self.go(&direction),
            Command::Take(item) => self.take(&item),
            Command::Use(item) => self.use_item(&item),
            Command::Read(item) => self.read(&item),
            Command::Inventory => self.inventory(),
            Command::Help => HELP_TEXT.to_string(),
            Command::Empty => "Say something. Type 'help' for commands.".to_string(),
            Command::Unknown(verb) => {
                format!("Unknown command: '{}'. Type 'help' for commands.", verb)
            }
        }
    }

    pub fn is_won(&self) -> bool {
        self.flag(self.world.terminal_flag())
    }

    pub fn moves(&self) -> u32 {
        self.state.moves
    }

    /// Active description of the current room without consuming a move
    pub fn describe(&self) -> String {
        self.describe_current().to_string()
    }

    pub fn current_room(&self) -> &Room {
        // State only ever holds room ids taken from the validated world.
        match self.world.room(&self.state.room) {
            Some(room) => room,
            None => unreachable!("room '{}' missing from validated world", self.state.room),
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            room: self.state.room.clone(),
            inventory: self.state.inventory.iter().cloned().collect(),
            flags: self.state.flags.clone(),
            moves: self.state.moves,
            won: self.is_won(),
        }
    }

    /// Short status block for human play and debugging
    pub fn status(&self) -> String {
        let snapshot = self.snapshot();
        let inventory = if snapshot.inventory.is_empty() {
            "empty".to_string()
        } else {
            snapshot
                .inventory
                .iter()
                .map(ItemId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Room: {}\nInventory: {}\nMoves: {}\nWon: {}",
            snapshot.room, inventory, snapshot.moves, snapshot.won
        )
    }

    // ------------------------------------------------------------------
    // Command handlers
    // ------------------------------------------------------------------

    fn go(&mut self, direction: &str) -> String {
        if direction.is_empty() {
            let names: Vec<&str> = Direction::ALL.iter().map(Direction::as_str).collect();
            return format!("Go where? Specify a direction ({}).", names.join(", "));
        }

        let room = self.current_room();
        let target = direction
            .parse::<Direction>()
            .ok()
            .and_then(|dir| room.exit(dir))
            .cloned();

        match target {
            Some(target) => {
                self.state.room = target;
                format!(
                    "You enter the {}.\n\n{}",
                    self.current_room().name,
                    self.describe_current()
                )
            }
            None => format!("You can't go {}. Exits: {}.", direction, room.exit_list()),
        }
    }

    fn take(&mut self, name: &str) -> String {
        if name.is_empty() {
            return "Take what?".to_string();
        }

        let name = name.replace('_', " ");
        let item = match self.world.item_named(&name) {
            Some(item) if item.home == self.state.room => item,
            _ => return format!("There's no '{}' here to take.", name),
        };

        if self.state.taken.contains(&item.id) {
            return format!("You already took the {}.", item.name);
        }

        if let Some(cond) = &item.take_condition {
            if !self.flag(&cond.flag) {
                return cond.failure.clone();
            }
        }

        let narrative = format!("You pick up the {}.", item.name);
        let id = item.id.clone();
        self.state.inventory.insert(id.clone());
        self.state.taken.insert(id);
        narrative
    }

    fn use_item(&mut self, name: &str) -> String {
        if name.is_empty() {
            return "Use what?".to_string();
        }

        let name = name.replace('_', " ");
        let world = Arc::clone(&self.world);
        let item = match world.item_named(&name) {
            Some(item) if self.state.inventory.contains(&item.id) => item,
            _ => return format!("You don't have a '{}'.", name),
        };

        let rule = world.use_rule(&item.id, &self.state.room);
        match rule.map(|rule| &rule.effect) {
            Some(UseEffect::SetFlag {
                flag,
                text,
                already,
            }) => {
                if self.flag(flag) {
                    return already.clone();
                }
                self.state.flags.insert(flag.clone(), true);
                text.clone()
            }
            Some(UseEffect::Activate { text, already }) => {
                if self.is_won() {
                    return already.clone();
                }
                self.state.flags.insert(world.terminal_flag().clone(), true);
                format!(
                    "{}\n\n*** YOU WIN ***\nCompleted in {} moves.",
                    text, self.state.moves
                )
            }
            Some(UseEffect::Narrate(text)) => text.clone(),
            Some(UseEffect::Read) => read_narrative(item),
            None if item.read_text.is_some() => read_narrative(item),
            None => format!("You can't figure out how to use the {} here.", item.name),
        }
    }

    fn read(&self, name: &str) -> String {
        if name.is_empty() {
            return "Read what?".to_string();
        }

        let name = name.replace('_', " ");
        let item = match self.world.item_named(&name) {
            Some(item) => item,
            None => return format!("You can't read '{}'.", name),
        };

        if !self.state.inventory.contains(&item.id) {
            return format!("You don't have the {}.", item.name);
        }
        if item.read_text.is_none() {
            return format!("There's nothing to read on the {}.", item.name);
        }
        read_narrative(item)
    }

    fn inventory(&self) -> String {
        if self.state.inventory.is_empty() {
            return "You aren't carrying anything.".to_string();
        }

        let names: Vec<&str> = self
            .state
            .inventory
            .iter()
            .filter_map(|id| self.world.item(id))
            .map(|item| item.name.as_str())
            .collect();
        format!("You are carrying: {}.", names.join(", "))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn flag(&self, flag: &FlagId) -> bool {
        self.state.flags.get(flag).copied().unwrap_or(false)
    }

    fn describe_current(&self) -> &str {
        self.current_room()
            .describe(&self.state.flags, &self.state.taken)
    }
}

fn read_narrative(item: &Item) -> String {
    format!(
        "You read the {}:\n\n{}",
        item.name,
        item.read_text.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GameEngine {
        GameEngine::new(Arc::new(World::station().unwrap()))
    }

    fn run(engine: &mut GameEngine, commands: &[&str]) -> String {
        let mut last = String::new();
        for cmd in commands {
            last = engine.execute(cmd);
        }
        last
    }

    #[test]
    fn test_initial_state() {
        let engine = engine();
        assert!(engine.describe().starts_with("You are in the station's airlock."));

        let snap = engine.snapshot();
        assert_eq!(snap.room.as_str(), "airlock");
        assert!(snap.inventory.is_empty());
        assert_eq!(snap.moves, 0);
        assert!(!snap.won);
    }

    #[test]
    fn test_move_counter_rules() {
        let mut engine = engine();

        engine.execute("look");
        engine.execute("go up");
        engine.execute("take unicorn");
        assert_eq!(engine.moves(), 3);

        let out = engine.execute("dance");
        assert_eq!(out, "Unknown command: 'dance'. Type 'help' for commands.");
        engine.execute("   ");
        assert_eq!(engine.moves(), 3);

        engine.execute("help");
        assert_eq!(engine.moves(), 4);
    }

    #[test]
    fn test_go_invalid_direction_lists_exits() {
        let mut engine = engine();
        let out = engine.execute("go south");
        assert_eq!(out, "You can't go south. Exits: north.");
        assert_eq!(engine.snapshot().room.as_str(), "airlock");
    }

    #[test]
    fn test_go_without_direction() {
        let mut engine = engine();
        let out = engine.execute("go");
        assert_eq!(out, "Go where? Specify a direction (north, south, east, west).");
        assert_eq!(engine.moves(), 1);
    }

    #[test]
    fn test_enter_room_uses_variant() {
        let mut engine = engine();
        let out = run(&mut engine, &["go north", "go east"]);
        assert!(out.starts_with("You enter the Engine Room.\n\n"));
        assert!(out.contains("pitch black"));
    }

    #[test]
    fn test_keycard_gated_by_darkness() {
        let mut engine = engine();
        run(&mut engine, &["go north", "go east"]);

        let out = engine.execute("take keycard");
        assert_eq!(out, "It's too dark to find anything in here.");

        assert_eq!(engine.execute("take flashlight"), "You pick up the flashlight.");
        let out = engine.execute("use flashlight");
        assert!(out.starts_with("You switch on the flashlight."));
        assert_eq!(engine.execute("take keycard"), "You pick up the keycard.");
    }

    #[test]
    fn test_illumination_is_idempotent() {
        let mut engine = engine();
        run(&mut engine, &["go north", "go east", "take flashlight", "use flashlight"]);
        let before = engine.snapshot();

        let out = engine.execute("use flashlight");
        assert_eq!(out, "The flashlight is already on. The room is lit.");

        let after = engine.snapshot();
        assert_eq!(before.flags, after.flags);
        assert_eq!(before.inventory, after.inventory);
        assert_eq!(after.moves, before.moves + 1);
    }

    #[test]
    fn test_take_twice_reports_already_taken() {
        let mut engine = engine();
        run(&mut engine, &["go north", "go west", "take crew log"]);

        assert_eq!(engine.execute("take crew_log"), "You already took the crew log.");
        assert_eq!(engine.snapshot().inventory.len(), 1);
    }

    #[test]
    fn test_take_item_from_another_room_fails() {
        let mut engine = engine();
        let out = engine.execute("take flashlight");
        assert_eq!(out, "There's no 'flashlight' here to take.");
    }

    #[test]
    fn test_looted_variants() {
        let mut engine = engine();
        let out = run(&mut engine, &["go north", "go west", "take crew log", "look"]);
        assert!(out.contains("you already took the crew log"));

        let out = run(
            &mut engine,
            &["go east", "go east", "take flashlight", "use flashlight", "take keycard", "look"],
        );
        assert!(out.contains("debris pile"));
    }

    #[test]
    fn test_look_is_pure_in_state() {
        let mut a = engine();
        let mut b = engine();
        run(&mut a, &["go north", "go east", "take flashlight", "use flashlight"]);
        run(&mut b, &["look", "go north", "go east", "take flashlight", "use flashlight"]);

        assert_eq!(a.execute("look"), b.execute("look"));
    }

    #[test]
    fn test_use_requires_holding() {
        let mut engine = engine();
        assert_eq!(engine.execute("use keycard"), "You don't have a 'keycard'.");
        assert_eq!(engine.execute("use banana"), "You don't have a 'banana'.");
        assert_eq!(engine.execute("use"), "Use what?");
    }

    #[test]
    fn test_use_elsewhere_narrates() {
        let mut engine = engine();
        let out = run(&mut engine, &["go north", "go east", "take flashlight", "go west", "use flashlight"]);
        assert_eq!(out, "You wave the flashlight around. Nothing interesting here.");
        assert!(!engine.snapshot().flags[&FlagId::new("engine_room_lit")]);
    }

    #[test]
    fn test_read_and_use_crew_log() {
        let mut engine = engine();
        assert_eq!(engine.execute("read crew log"), "You don't have the crew log.");
        assert_eq!(engine.execute("read menu"), "You can't read 'menu'.");

        run(&mut engine, &["go north", "go west", "take crew log"]);
        let read = engine.execute("read crew log");
        assert!(read.starts_with("You read the crew log:\n\nCREW LOG - Day 247"));

        let used = engine.execute("use crew_log");
        assert_eq!(read, used);
    }

    #[test]
    fn test_read_unreadable_item() {
        let mut engine = engine();
        run(&mut engine, &["go north", "go east", "take flashlight"]);
        assert_eq!(
            engine.execute("read flashlight"),
            "There's nothing to read on the flashlight."
        );
    }

    #[test]
    fn test_inventory_sorted() {
        let mut engine = engine();
        assert_eq!(engine.execute("inventory"), "You aren't carrying anything.");

        run(
            &mut engine,
            &["go north", "go east", "take flashlight", "go west", "go west", "take crew log"],
        );
        assert_eq!(
            engine.execute("inventory"),
            "You are carrying: crew log, flashlight."
        );
    }

    #[test]
    fn test_full_playthrough_wins() {
        let mut engine = engine();
        let out = run(
            &mut engine,
            &[
                "go north",
                "go east",
                "take keycard",
                "take flashlight",
                "use flashlight",
                "take keycard",
                "go west",
                "go north",
                "use keycard",
            ],
        );

        assert!(engine.is_won());
        assert!(out.contains("*** YOU WIN ***"));
        assert!(out.ends_with("Completed in 9 moves."));
        assert_eq!(engine.snapshot().moves, 9);
    }

    #[test]
    fn test_win_is_absorbing() {
        let mut engine = engine();
        run(
            &mut engine,
            &[
                "go north", "go east", "take flashlight", "use flashlight", "take keycard",
                "go west", "go north", "use keycard",
            ],
        );
        assert!(engine.is_won());

        let again = engine.execute("use keycard");
        assert!(again.starts_with("The console is already active."));
        run(&mut engine, &["go south", "go east", "use flashlight", "look"]);
        assert!(engine.is_won());
        assert!(engine.snapshot().won);
    }

    #[test]
    fn test_keycard_elsewhere_does_not_win() {
        let mut engine = engine();
        let out = run(
            &mut engine,
            &["go north", "go east", "take flashlight", "use flashlight", "take keycard", "use keycard"],
        );
        assert_eq!(out, "There's nothing to use the keycard on here.");
        assert!(!engine.is_won());
    }

    #[test]
    fn test_independent_engines_share_nothing() {
        let world = Arc::new(World::station().unwrap());
        let mut a = GameEngine::new(Arc::clone(&world));
        let b = GameEngine::new(world);

        a.execute("go north");
        assert_eq!(a.snapshot().room.as_str(), "corridor");
        assert_eq!(b.snapshot().room.as_str(), "airlock");
        assert_eq!(b.moves(), 0);
    }

    #[test]
    fn test_status_and_snapshot_json() {
        let mut engine = engine();
        engine.execute("go north");
        let status = engine.status();
        assert!(status.contains("Room: corridor"));
        assert!(status.contains("Inventory: empty"));
        assert!(status.contains("Moves: 1"));

        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["room"], "corridor");
        assert_eq!(json["flags"]["console_activated"], false);
    }
}
