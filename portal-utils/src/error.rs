//! Error types for the portal client
//!
//! Provides a unified error type used across all portal crates.

/// Main error type for portal operations
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection is not closed, but {state}")]
    NotClosed { state: String },

    #[error("Connection was never opened")]
    NeverOpened,

    #[error("Connection is already {state}")]
    AlreadyClosed { state: String },

    #[error("Connection closed unexpectedly (code {code}): {reason}")]
    UncleanClose { code: u16, reason: String },

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    // === Authentication Errors ===

    #[error("Ticket request to {url} failed with status {status}")]
    TicketRejected { url: String, status: u16 },

    #[error("Ticket request failed: {0}")]
    Ticket(String),

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown portal item type: {0}")]
    UnknownItemType(String),

    #[error("Malformed portal item {id}: {message}")]
    MalformedItem { id: String, message: String },

    #[error("Portal item not found: {0}")]
    ItemNotFound(String),

    #[error("Portal item already exists: {0}")]
    DuplicateItem(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a ticket error
    pub fn ticket(msg: impl Into<String>) -> Self {
        Self::Ticket(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is recovered by the reconnection loop
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::ConnectionClosed
                | Self::UncleanClose { .. }
                | Self::Ticket(_)
                | Self::TicketRejected { .. }
        )
    }
}

/// Result type alias using PortalError
pub type Result<T> = std::result::Result<T, PortalError>;
