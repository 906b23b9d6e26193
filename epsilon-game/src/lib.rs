//! # Epsilon Game
//!
//! A small deterministic text adventure set on a damaged space station.
//!
//! ## Core Concepts
//! - **World**: immutable rooms, items, flags and use effects, validated once at load
//! - **Command**: closed set of verbs an agent or player can issue
//! - **Engine**: per-playthrough state machine; `execute(command) -> narrative`
//! - **Snapshot**: serializable view of the state (room, inventory, flags, moves, won)
//!
//! The engine performs no I/O and never blocks. One engine belongs to one
//! playthrough; the world is shared read-only behind an `Arc`.

pub mod command;
pub mod engine;
pub mod error;
pub mod world;

pub use command::{Command, Direction};
pub use engine::{GameEngine, GameSnapshot, HELP_TEXT};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use world::{
    Condition, DescriptionVariant, FlagId, Item, ItemId, Room, RoomId, TakeCondition, UseEffect,
    UseRule, World, WorldBuilder,
};
