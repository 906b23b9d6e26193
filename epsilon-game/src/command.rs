//! # Commands
//!
//! The closed verb set accepted by the engine. Raw input is parsed once into a
//! `Command`; the engine matches on it exhaustively, so an unknown verb is an
//! explicit variant rather than a failed lookup.
//!
//! Grammar: a verb followed by an optional single argument, case-insensitive,
//! whitespace-trimmed. Everything after the first run of whitespace is the
//! argument (so `take crew log` has the argument `crew log`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compass directions used to label exits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "north" | "n" => Ok(Direction::North),
            "south" | "s" => Ok(Direction::South),
            "east" | "e" => Ok(Direction::East),
            "west" | "w" => Ok(Direction::West),
            _ => Err(()),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verb", content = "arg", rename_all = "lowercase")]
pub enum Command {
    /// Describe the current room
    Look,
    /// Move through an exit; the argument is the raw direction text
    Go(String),
    /// Pick up an item by display name
    Take(String),
    /// Use a held item in the current room
    Use(String),
    /// Read a held item
    Read(String),
    /// List held items
    Inventory,
    /// Show the command summary
    Help,
    /// Blank input
    Empty,
    /// Anything else; carries the offending verb
    Unknown(String),
}

impl Command {
    /// Parse raw input. Never fails: unrecognized input becomes `Unknown`.
    pub fn parse(input: &str) -> Self {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Command::Empty;
        }

        let (verb, arg) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim().to_string()),
            None => (input.as_str(), String::new()),
        };

        match verb {
            "look" => Command::Look,
            "go" => Command::Go(arg),
            "take" => Command::Take(arg),
            "use" => Command::Use(arg),
            "read" => Command::Read(arg),
            "inventory" => Command::Inventory,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Whether this command advances the move counter
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Command::Empty | Command::Unknown(_))
    }

    pub fn verb(&self) -> &str {
        match self {
            Command::Look => "look",
            Command::Go(_) => "go",
            Command::Take(_) => "take",
            Command::Use(_) => "use",
            Command::Read(_) => "read",
            Command::Inventory => "inventory",
            Command::Help => "help",
            Command::Empty => "",
            Command::Unknown(verb) => verb,
        }
    }
}

impl From<&str> for Command {
    fn from(input: &str) -> Self {
        Command::parse(input)
    }
}

/// Renders back to the canonical command line (`go north`, `take crew log`)
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Go(arg) | Command::Take(arg) | Command::Use(arg) | Command::Read(arg)
                if !arg.is_empty() =>
            {
                write!(f, "{} {}", self.verb(), arg)
            }
            _ => f.write_str(self.verb()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbs() {
        assert_eq!(Command::parse("look"), Command::Look);
        assert_eq!(Command::parse("  INVENTORY "), Command::Inventory);
        assert_eq!(Command::parse("go north"), Command::Go("north".into()));
        assert_eq!(Command::parse("Take   Crew Log"), Command::Take("crew log".into()));
        assert_eq!(Command::parse("help me"), Command::Help);
    }

    #[test]
    fn test_parse_missing_argument_is_still_recognized() {
        let cmd = Command::parse("take");
        assert_eq!(cmd, Command::Take(String::new()));
        assert!(cmd.is_recognized());
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(Command::parse("dance wildly"), Command::Unknown("dance".into()));
        assert_eq!(Command::parse("   "), Command::Empty);
        assert!(!Command::parse("xyzzy").is_recognized());
        assert!(!Command::Empty.is_recognized());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("North".parse::<Direction>(), Ok(Direction::North));
        assert_eq!("w".parse::<Direction>(), Ok(Direction::West));
        assert!("up".parse::<Direction>().is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Command::parse("GO  north").to_string(), "go north");
        assert_eq!(Command::Use(String::new()).to_string(), "use");
        assert_eq!(Command::Look.to_string(), "look");
    }
}
