use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure came from the transport rather than the host logic.
    ///
    /// Callers use this to keep connectivity problems apart from failures that
    /// must be surfaced as-is.
    pub fn is_network(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
