//! Error types.

use thiserror::Error;

/// Result alias for registry and updator operations.
pub type Result<T> = std::result::Result<T, HostsError>;

/// Errors returned by registry and updator operations.
#[derive(Debug, Error)]
pub enum HostsError {
    /// Filesystem I/O failed (typically `PermissionDenied` on the hosts file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source name was not found in the registry.
    #[error("unknown source: {name}")]
    UnknownSource {
        /// The missing name.
        name: String,
    },

    /// An add or rename collided with an existing source name.
    #[error("source name already taken: {name}")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// A reorder token was neither an unsigned position nor a signed delta.
    #[error("invalid order token: {token:?} (expected e.g. \"3\", \"+1\" or \"-2\")")]
    InvalidOrder {
        /// The rejected token.
        token: String,
    },

    /// Downloading a source's payload failed (transport or HTTP status).
    #[error("download failed: {0}")]
    Network(#[from] reqwest::Error),

    /// `apply` was attempted before any successful `pull` for the source.
    #[error("no cached payload for source {name} (run pull first)")]
    MissingCache {
        /// The source without a cache.
        name: String,
    },

    /// The operating system has no known hosts directory or refresh command.
    #[error("unsupported platform: {os}")]
    UnsupportedPlatform {
        /// `std::env::consts::OS` value.
        os: String,
    },

    /// The persisted registry file could not be parsed or serialized.
    #[error("registry file error: {0}")]
    Registry(#[from] serde_json::Error),
}

impl HostsError {
    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied)
    }
}
