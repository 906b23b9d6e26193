//! Error kinds for Epsilon operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to decide how to handle a failure, e.g. a
/// provider failure ends the playthrough while a world-load failure ends the
/// process before any playthrough starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // World model errors (raised at load time only)
    // =========================================================================
    /// The world definition is internally inconsistent
    WorldInvalid,

    /// A room identifier does not refer to a defined room
    RoomNotFound,

    /// An item identifier does not refer to a defined item
    ItemNotFound,

    // =========================================================================
    // Inference/provider errors
    // =========================================================================
    /// The completion call failed
    InferenceFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// Credentials were rejected
    AuthenticationFailed,

    // =========================================================================
    // Command execution errors
    // =========================================================================
    /// An external command exceeded its wall-clock budget
    CommandTimeout,

    /// An external command could not be run
    CommandFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Serialization/deserialization failed
    SerializationFailed,

    /// Failed to parse input
    ParseFailed,

    /// Invalid argument passed to function
    InvalidArgument,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // World
            ErrorKind::WorldInvalid => "WorldInvalid",
            ErrorKind::RoomNotFound => "RoomNotFound",
            ErrorKind::ItemNotFound => "ItemNotFound",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",

            // Commands
            ErrorKind::CommandTimeout => "CommandTimeout",
            ErrorKind::CommandFailed => "CommandFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // Parse
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::InvalidArgument => "InvalidArgument",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::CommandTimeout
                | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::RoomNotFound.to_string(), "RoomNotFound");
        assert_eq!(ErrorKind::InferenceFailed.to_string(), "InferenceFailed");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::CommandTimeout.is_retryable());
        assert!(!ErrorKind::WorldInvalid.is_retryable());
        assert!(!ErrorKind::AuthenticationFailed.is_retryable());
    }
}
