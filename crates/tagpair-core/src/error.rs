use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Invalid barcode: {0}")]
    InvalidBarcode(String),

    #[error("Invalid tag UID: {0}")]
    InvalidTagUid(String),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Invalid redirect callback: {0}")]
    InvalidCallback(String),

    // Flow errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    #[error("Scan failed: {reason}")]
    ScanFailure { reason: String },

    #[error("Validation failed: tag {tag} does not match barcode {barcode}")]
    ValidationMismatch { barcode: String, tag: String },

    #[error("Flow runner stopped")]
    RunnerStopped,

    // Collaborator errors
    #[error("Hardware operation failed: {0}")]
    Hardware(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a scan failure error.
    pub fn scan_failure(reason: impl Into<String>) -> Self {
        Self::ScanFailure {
            reason: reason.into(),
        }
    }

    /// Returns `true` for outcomes the flow reports to the user rather than
    /// treating as a fault of the system.
    #[must_use]
    pub fn is_business_outcome(&self) -> bool {
        matches!(self, Error::ValidationMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
