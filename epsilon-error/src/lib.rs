//! # epsilon-error
//!
//! One error type for the game, the agent harness and the CLI.
//!
//! An [`Error`] answers three questions:
//! - what went wrong: [`ErrorKind`] (a dangling room, a provider outage, a shell timeout)
//! - whether to try again: [`ErrorStatus`]
//! - where: the operation name plus key/value context, with the underlying error kept as the source
//!
//! ```rust
//! use epsilon_error::{Error, ErrorKind};
//!
//! fn validate() -> Result<(), Error> {
//!     Err(Error::room_not_found("vault")
//!         .with_operation("world::validate")
//!         .with_context("room", "corridor")
//!         .with_context("direction", "down"))
//! }
//!
//! let err = validate().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::RoomNotFound);
//! ```
//!
//! Foreign errors enter through `set_source` or `From<std::io::Error>`. Crates
//! with their own contract errors map them in with a `From` impl next to the
//! contract. Later layers add context with `with_operation` and never re-wrap.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

pub type Result<T> = std::result::Result<T, Error>;
