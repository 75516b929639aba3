//! Mock platform redirect.

use super::lock;
use crate::{HardwareError, Result, traits::PlatformRedirect};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct RedirectState {
    urls: Vec<String>,
    fail_next: Option<String>,
}

/// Mock redirect that records the URLs it was asked to open.
#[derive(Debug)]
pub struct MockRedirect {
    state: Arc<Mutex<RedirectState>>,
}

impl MockRedirect {
    /// Create a new mock redirect and its inspection handle.
    pub fn new() -> (Self, MockRedirectHandle) {
        let state = Arc::new(Mutex::new(RedirectState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockRedirectHandle { state },
        )
    }
}

impl PlatformRedirect for MockRedirect {
    fn redirect(&mut self, url: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(message) = state.fail_next.take() {
            return Err(HardwareError::redirect_failed(message));
        }
        tracing::debug!("Redirecting to external scan app: {}", url);
        state.urls.push(url.to_string());
        Ok(())
    }
}

/// Handle for inspecting a mock redirect.
#[derive(Debug, Clone)]
pub struct MockRedirectHandle {
    state: Arc<Mutex<RedirectState>>,
}

impl MockRedirectHandle {
    /// Every URL opened so far, oldest first.
    pub fn urls(&self) -> Vec<String> {
        lock(&self.state).urls.clone()
    }

    /// Most recently opened URL.
    pub fn last_url(&self) -> Option<String> {
        lock(&self.state).urls.last().cloned()
    }

    /// Make the next redirect fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        lock(&self.state).fail_next = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_urls() {
        let (mut redirect, handle) = MockRedirect::new();

        redirect.redirect("nfcscan://scan?session_id=a").unwrap();
        redirect.redirect("nfcscan://scan?session_id=b").unwrap();

        assert_eq!(handle.urls().len(), 2);
        assert_eq!(
            handle.last_url().as_deref(),
            Some("nfcscan://scan?session_id=b")
        );
    }

    #[test]
    fn test_fail_next() {
        let (mut redirect, handle) = MockRedirect::new();

        handle.fail_next("no handler for nfcscan://");
        let result = redirect.redirect("nfcscan://scan?session_id=a");
        assert!(matches!(result, Err(HardwareError::RedirectFailed { .. })));
        assert!(handle.urls().is_empty());
    }
}
