//! Error types for reader operations.
//!
//! This module defines error types specific to scanning collaborators,
//! covering disconnection, unsupported capabilities, unreadable tags and
//! superseded (cancelled) scans.

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during reader operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Reader is not connected or its event channel has been closed.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Capability is not available on this platform.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// The scan was superseded or torn down before it completed.
    #[error("Scan cancelled")]
    Cancelled,

    /// No scan is currently active on the reader.
    #[error("Reader inactive: {device}")]
    Inactive { device: String },

    /// Reader could not be started (camera permission, NFC permission, ...).
    #[error("Activation failed: {message}")]
    ActivationFailed { message: String },

    /// Tag could not be read.
    #[error("Tag read error: {message}")]
    TagReadError { message: String },

    /// Invalid data received from the reader.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Platform refused to hand off to the external scan app.
    #[error("Redirect failed: {message}")]
    RedirectFailed { message: String },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new inactive reader error.
    pub fn inactive(device: impl Into<String>) -> Self {
        Self::Inactive {
            device: device.into(),
        }
    }

    /// Create a new activation failed error.
    pub fn activation_failed(message: impl Into<String>) -> Self {
        Self::ActivationFailed {
            message: message.into(),
        }
    }

    /// Create a new tag read error.
    pub fn tag_read(message: impl Into<String>) -> Self {
        Self::TagReadError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new redirect failed error.
    pub fn redirect_failed(message: impl Into<String>) -> Self {
        Self::RedirectFailed {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns `true` if the error only reports a superseded scan.
    ///
    /// Cancelled scans are never shown to the user.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<HardwareError> for tagpair_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::Unsupported { operation } => {
                tagpair_core::Error::UnsupportedCapability(operation)
            }
            HardwareError::TagReadError { message } => tagpair_core::Error::scan_failure(message),
            other => tagpair_core::Error::Hardware(other.to_string()),
        }
    }
}
