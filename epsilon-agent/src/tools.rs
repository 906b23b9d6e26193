//! # Game Tools
//!
//! The fixed tool schema set offered to the agent in the tool-call modality,
//! and the mapping from a structured tool call back to an engine command.
//!
//! A malformed argument payload never aborts the turn: it is treated as an
//! empty argument, so `go` with garbage arguments becomes plain `go` and the
//! engine answers with its usual guidance.

use crate::provider::{ToolCall, ToolDefinition};
use serde_json::{json, Value};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameTool {
    Look,
    Go,
    Take,
    Use,
    Read,
    Inventory,
}

impl GameTool {
    pub const ALL: [GameTool; 6] = [
        GameTool::Look,
        GameTool::Go,
        GameTool::Take,
        GameTool::Use,
        GameTool::Read,
        GameTool::Inventory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GameTool::Look => "look",
            GameTool::Go => "go",
            GameTool::Take => "take",
            GameTool::Use => "use",
            GameTool::Read => "read",
            GameTool::Inventory => "inventory",
        }
    }

    /// Name of the single argument this tool takes, if any
    pub fn argument(&self) -> Option<&'static str> {
        match self {
            GameTool::Go => Some("direction"),
            GameTool::Take | GameTool::Use | GameTool::Read => Some("item"),
            GameTool::Look | GameTool::Inventory => None,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            GameTool::Look => ToolDefinition::new(
                "look",
                "Examine your current surroundings. Shows the room description, exits, and any visible items.",
            ),
            GameTool::Go => ToolDefinition::new("go", "Move in a direction to another room.")
                .with_parameters(json!({
                    "type": "object",
                    "properties": {
                        "direction": {
                            "type": "string",
                            "description": "The direction to move (north, south, east, west)",
                            "enum": ["north", "south", "east", "west"]
                        }
                    },
                    "required": ["direction"]
                })),
            GameTool::Take => ToolDefinition::new("take", "Pick up an item in the current room.")
                .with_parameters(item_parameter(
                    "The name of the item to pick up (e.g. 'flashlight', 'keycard', 'crew log')",
                )),
            GameTool::Use => {
                ToolDefinition::new("use", "Use an item from your inventory in the current room.")
                    .with_parameters(item_parameter(
                        "The name of the item to use (e.g. 'flashlight', 'keycard')",
                    ))
            }
            GameTool::Read => {
                ToolDefinition::new("read", "Read an item you are carrying (e.g. a log or note).")
                    .with_parameters(item_parameter("The name of the item to read (e.g. 'crew log')"))
            }
            GameTool::Inventory => {
                ToolDefinition::new("inventory", "Check what items you are currently carrying.")
            }
        }
    }

    /// Engine command string for this tool with the given raw JSON arguments
    pub fn command(&self, arguments: &str) -> String {
        let key = match self.argument() {
            Some(key) => key,
            None => return self.name().to_string(),
        };

        let value = serde_json::from_str::<Value>(arguments)
            .ok()
            .and_then(|args| args.get(key).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();

        if value.trim().is_empty() {
            self.name().to_string()
        } else {
            format!("{} {}", self.name(), value.trim())
        }
    }
}

impl FromStr for GameTool {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameTool::ALL
            .iter()
            .copied()
            .find(|tool| tool.name() == s)
            .ok_or(())
    }
}

fn item_parameter(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "item": {
                "type": "string",
                "description": description
            }
        },
        "required": ["item"]
    })
}

/// The full schema set, in a stable order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    GameTool::ALL.iter().map(GameTool::definition).collect()
}

/// What a single tool call resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    /// A known tool, mapped to its engine command
    Command { tool: GameTool, command: String },
    /// A name outside the schema set; answered without touching the engine
    Unknown(String),
}

impl ToolAction {
    pub fn from_call(call: &ToolCall) -> Self {
        match call.name.parse::<GameTool>() {
            Ok(tool) => ToolAction::Command {
                tool,
                command: tool.command(&call.arguments),
            },
            Err(()) => ToolAction::Unknown(call.name.clone()),
        }
    }
}

pub fn unknown_tool_message(name: &str) -> String {
    format!("Unknown tool: '{}'", name)
}
