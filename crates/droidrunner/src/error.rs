//! Error types for bridge backends and the public device API

use thiserror::Error;

/// Errors raised by a bridge backend while talking to a device
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid device pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Uniform errors surfaced by [`Device`](crate::Device) and [`Snapshot`](crate::Snapshot)
///
/// Backend errors never leak through with their original type; only the
/// message is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Device is not valid: {0}")]
    DeviceInvalid(String),

    #[error("Device operation failed: {0}")]
    DeviceOperationFailed(String),

    #[error("Image is not valid: {0}")]
    ImageInvalid(String),

    #[error("Image operation failed: {0}")]
    ImageOperationFailed(String),
}

impl Error {
    pub(crate) fn operation(err: BridgeError) -> Self {
        Error::DeviceOperationFailed(err.to_string())
    }

    pub(crate) fn image(err: BridgeError) -> Self {
        Error::ImageOperationFailed(err.to_string())
    }

    /// The message carried by this error, without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Error::DeviceInvalid(m)
            | Error::DeviceOperationFailed(m)
            | Error::ImageInvalid(m)
            | Error::ImageOperationFailed(m) => m,
        }
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

pub type Result<T> = std::result::Result<T, Error>;
