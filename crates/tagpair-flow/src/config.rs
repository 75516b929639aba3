use std::time::Duration;
use tagpair_core::constants::{DEFAULT_REDIRECT_BASE, DEFAULT_RESET_DELAY_SECS};

/// Session flow configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Delay before a finished flow restarts automatically
    pub reset_delay: Duration,

    /// Deep-link base used when NFC must be read by an external app
    pub redirect_base: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            reset_delay: Duration::from_secs(DEFAULT_RESET_DELAY_SECS),
            redirect_base: DEFAULT_REDIRECT_BASE.to_string(),
        }
    }
}

impl FlowConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the automatic restart delay
    pub fn reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    /// Set the redirect deep-link base
    pub fn redirect_base(mut self, base: impl Into<String>) -> Self {
        self.redirect_base = base.into();
        self
    }
}
