use crate::config::ConfigError;
use thiserror::Error;

/// Unified error type for the order vault.
///
/// The variants follow how the batch orchestrator reacts to them:
/// a malformed payload is skipped and reported, a transient store failure leaves
/// the event unacknowledged for redelivery, and constraint or projection failures
/// halt the batch pass so an operator can look at them.
#[derive(Error, Debug)]
pub enum VaultError {
    /// A required payload field is missing or has the wrong shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Retryable store failure (connection loss, timeout, I/O)
    #[error("Transient store error: {0}")]
    StoreTransient(String),

    /// Non-duplicate constraint violation or other non-retryable store failure
    #[error("Store constraint error: {0}")]
    StoreConstraint(String),

    /// The built record set is internally inconsistent
    #[error("Projection error: {0}")]
    Projection(String),

    /// JSON encoding or decoding of a stored record or report
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Inbound or outbound transport failures
    #[error("Transport error: {0}")]
    Transport(String),
}

impl VaultError {
    /// Create a new malformed payload error
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    /// Create a new transient store error
    pub fn store_transient(msg: impl Into<String>) -> Self {
        Self::StoreTransient(msg.into())
    }

    /// Create a new store constraint error
    pub fn store_constraint(msg: impl Into<String>) -> Self {
        Self::StoreConstraint(msg.into())
    }

    /// Create a new projection error
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::Projection(msg.into())
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether redelivering the same event may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreTransient(_) | Self::Transport(_))
    }

    /// Whether the event can be skipped without halting the batch pass.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::MalformedPayload(_))
    }
}

/// I/O failures are retryable; everything else sled reports is not.
impl From<sled::Error> for VaultError {
    fn from(error: sled::Error) -> Self {
        match error {
            sled::Error::Io(e) => VaultError::StoreTransient(e.to_string()),
            other => VaultError::StoreConstraint(other.to_string()),
        }
    }
}

/// Result type alias for vault operations
pub type VaultResult<T> = Result<T, VaultError>;
