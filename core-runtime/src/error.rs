use bridge_traits::BridgeError;
use thiserror::Error;

/// Runtime-level errors: configuration and missing host capabilities.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
