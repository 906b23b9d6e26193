//! Game error types
//!
//! Re-exports epsilon-error and provides world-validation conveniences.

pub use epsilon_error::{Error, ErrorKind, ErrorStatus, Result};

/// An exit points at a room that is not defined
pub fn dangling_exit(room: &str, direction: &str, target: &str) -> Error {
    Error::room_not_found(target)
        .with_operation("world::validate")
        .with_context("room", room)
        .with_context("direction", direction)
}

/// An item's home room is not defined
pub fn dangling_home(item: &str, home: &str) -> Error {
    Error::room_not_found(home)
        .with_operation("world::validate")
        .with_context("item", item)
}

/// Two definitions share an identifier or display name
pub fn duplicate(what: &'static str, id: impl Into<String>) -> Error {
    let id = id.into();
    Error::world_invalid(format!("duplicate {} '{}'", what, id))
        .with_operation("world::validate")
        .with_context(what, id)
}

/// A condition, precondition or effect names a flag that was never declared
pub fn undeclared_flag(flag: &str, referenced_by: impl Into<String>) -> Error {
    Error::world_invalid(format!("flag '{}' is not declared", flag))
        .with_operation("world::validate")
        .with_context("flag", flag)
        .with_context("referenced_by", referenced_by)
}

/// A condition or use rule names an item that was never defined
pub fn dangling_item(item: &str, referenced_by: impl Into<String>) -> Error {
    Error::item_not_found(item)
        .with_operation("world::validate")
        .with_context("referenced_by", referenced_by)
}
