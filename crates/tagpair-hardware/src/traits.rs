//! Scanning collaborator trait definitions.
//!
//! These traits establish the contract between the session flow controller
//! and the platform's capture sources: a camera barcode reader, an NFC reader
//! and the redirect used to hand off to an external scan app when NFC is not
//! available in-process.
//!
//! Readers are start/stop style. Activating a reader returns immediately and
//! results are delivered later as [`ReaderEvent`]s on the channel the reader
//! was built with, which lets the controller stay a plain synchronous state
//! holder driven by one task.
//!
//! [`ReaderEvent`]: crate::events::ReaderEvent

use crate::error::Result;
use crate::types::DeviceInfo;
use tagpair_core::SessionId;
use tokio_util::sync::CancellationToken;

/// Camera-based barcode reader.
///
/// While active, every decoded barcode is reported as
/// [`ReaderEvent::BarcodeDetected`](crate::events::ReaderEvent::BarcodeDetected)
/// tagged with the session passed to [`activate`](Self::activate).
pub trait BarcodeReader: Send {
    /// Start decoding frames for `session`.
    ///
    /// Activating an already active reader only rebinds the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera cannot be started.
    fn activate(&mut self, session: &SessionId) -> Result<()>;

    /// Stop decoding frames. Idempotent.
    fn deactivate(&mut self);

    /// Returns `true` while frames are being decoded.
    fn is_active(&self) -> bool;

    /// Reader metadata.
    fn info(&self) -> DeviceInfo;
}

/// A request to read one NFC tag for a session.
///
/// The reader must stop listening once `token` is cancelled and must not
/// report a tag for a cancelled request.
#[derive(Debug, Clone)]
pub struct NfcScanRequest {
    /// Session the read belongs to; echoed back on the resulting event.
    pub session: SessionId,

    /// Cancelled when the scan is superseded or the flow is torn down.
    pub token: CancellationToken,
}

impl NfcScanRequest {
    /// Create a request with a fresh cancellation token.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            token: CancellationToken::new(),
        }
    }

    /// Create a request bound to an existing token.
    pub fn with_token(session: SessionId, token: CancellationToken) -> Self {
        Self { session, token }
    }

    /// Returns `true` once the request has been superseded.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// NFC tag reader.
pub trait NfcReader: Send {
    /// Whether in-process NFC reading is available on this platform.
    ///
    /// When it is not, the flow falls back to [`PlatformRedirect`].
    fn is_supported(&self) -> bool;

    /// Start listening for one tag.
    ///
    /// A read is reported as
    /// [`ReaderEvent::TagRead`](crate::events::ReaderEvent::TagRead); a failed
    /// read as [`ReaderEvent::Failed`](crate::events::ReaderEvent::Failed).
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Unsupported`](crate::HardwareError::Unsupported)
    /// if NFC is unavailable, or another error if the scan could not be
    /// started.
    fn scan(&mut self, request: NfcScanRequest) -> Result<()>;

    /// Reader metadata.
    fn info(&self) -> DeviceInfo;
}

/// Hand-off to an external scan application.
///
/// The external app reads the tag and navigates back with the session id and
/// tag data as query parameters.
pub trait PlatformRedirect: Send {
    /// Navigate to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::RedirectFailed`](crate::HardwareError::RedirectFailed)
    /// if the platform refuses the navigation.
    fn redirect(&mut self, url: &str) -> Result<()>;
}

impl<T: BarcodeReader + ?Sized> BarcodeReader for Box<T> {
    fn activate(&mut self, session: &SessionId) -> Result<()> {
        (**self).activate(session)
    }

    fn deactivate(&mut self) {
        (**self).deactivate();
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn info(&self) -> DeviceInfo {
        (**self).info()
    }
}

impl<T: NfcReader + ?Sized> NfcReader for Box<T> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn scan(&mut self, request: NfcScanRequest) -> Result<()> {
        (**self).scan(request)
    }

    fn info(&self) -> DeviceInfo {
        (**self).info()
    }
}

impl<T: PlatformRedirect + ?Sized> PlatformRedirect for Box<T> {
    fn redirect(&mut self, url: &str) -> Result<()> {
        (**self).redirect(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_request_cancellation() {
        let request = NfcScanRequest::new(SessionId::generate());
        let observer = request.clone();

        assert!(!observer.is_cancelled());
        request.token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_scan_request_with_shared_token() {
        let token = CancellationToken::new();
        let request = NfcScanRequest::with_token(SessionId::generate(), token.clone());

        token.cancel();
        assert!(request.is_cancelled());
    }
}
