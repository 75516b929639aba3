//! Mock camera barcode reader.

use super::lock;
use crate::{
    BarcodeDetection, DeviceInfo, DeviceType, HardwareError, ReaderEvent, Result, Symbology,
    traits::BarcodeReader,
};
use std::sync::{Arc, Mutex};
use tagpair_core::{Barcode, SessionId};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct BarcodeState {
    active: bool,
    session: Option<SessionId>,
    activations: usize,
    fail_next_activation: Option<String>,
}

/// Mock barcode reader for testing and development.
///
/// # Examples
///
/// ```
/// use tagpair_core::SessionId;
/// use tagpair_hardware::mock::MockBarcodeReader;
/// use tagpair_hardware::BarcodeReader;
///
/// let (tx, _rx) = tokio::sync::mpsc::channel(8);
/// let (mut reader, handle) = MockBarcodeReader::new(tx);
///
/// reader.activate(&SessionId::generate()).unwrap();
/// assert!(handle.is_active());
/// reader.deactivate();
/// assert!(!handle.is_active());
/// ```
#[derive(Debug)]
pub struct MockBarcodeReader {
    state: Arc<Mutex<BarcodeState>>,
    name: String,
}

impl MockBarcodeReader {
    /// Create a new mock reader reporting on `events`.
    pub fn new(events: mpsc::Sender<ReaderEvent>) -> (Self, MockBarcodeReaderHandle) {
        Self::with_name("Mock Barcode Reader", events)
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(
        name: impl Into<String>,
        events: mpsc::Sender<ReaderEvent>,
    ) -> (Self, MockBarcodeReaderHandle) {
        let state = Arc::new(Mutex::new(BarcodeState::default()));
        let reader = Self {
            state: Arc::clone(&state),
            name: name.into(),
        };
        let handle = MockBarcodeReaderHandle { state, events };
        (reader, handle)
    }
}

impl BarcodeReader for MockBarcodeReader {
    fn activate(&mut self, session: &SessionId) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(message) = state.fail_next_activation.take() {
            return Err(HardwareError::activation_failed(message));
        }
        state.session = Some(session.clone());
        if !state.active {
            state.active = true;
            state.activations += 1;
            tracing::debug!("{} activated", self.name);
        }
        Ok(())
    }

    fn deactivate(&mut self) {
        let mut state = lock(&self.state);
        state.session = None;
        if state.active {
            state.active = false;
            tracing::debug!("{} deactivated", self.name);
        }
    }

    fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "mock-camera")
    }
}

/// Handle for controlling a mock barcode reader.
#[derive(Debug, Clone)]
pub struct MockBarcodeReaderHandle {
    state: Arc<Mutex<BarcodeState>>,
    events: mpsc::Sender<ReaderEvent>,
}

impl MockBarcodeReaderHandle {
    /// Hold a barcode in front of the camera.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is not active, the text is not a valid
    /// barcode, or the event channel is closed.
    pub async fn scan(&self, code: &str, symbology: Symbology) -> Result<()> {
        let session = self
            .session()
            .ok_or_else(|| HardwareError::inactive("barcode reader"))?;
        let barcode = Barcode::new(code).map_err(|e| HardwareError::invalid_data(e.to_string()))?;
        self.send(ReaderEvent::BarcodeDetected {
            detection: BarcodeDetection::new(barcode, symbology),
            session,
        })
        .await
    }

    /// Report a camera failure for the current session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the event channel is closed.
    pub async fn fail(&self, reason: impl Into<String>) -> Result<()> {
        let session = self.session();
        self.send(ReaderEvent::Failed {
            device: DeviceType::Barcode,
            session,
            reason: reason.into(),
        })
        .await
    }

    /// Session of the active reader.
    pub fn session(&self) -> Option<SessionId> {
        let state = lock(&self.state);
        state.session.clone().filter(|_| state.active)
    }

    /// Make the next activation fail with `message`.
    pub fn fail_next_activation(&self, message: impl Into<String>) {
        lock(&self.state).fail_next_activation = Some(message.into());
    }

    /// Returns `true` while the reader is decoding.
    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Number of times the reader went from inactive to active.
    pub fn activation_count(&self) -> usize {
        lock(&self.state).activations
    }

    async fn send(&self, event: ReaderEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("barcode event channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::generate()
    }

    #[tokio::test]
    async fn test_scan_while_active() {
        let (tx, mut rx) = mpsc::channel(8);
        let (mut reader, handle) = MockBarcodeReader::new(tx);

        let active = session();
        reader.activate(&active).unwrap();
        handle.scan("8901435003005", Symbology::Ean13).await.unwrap();

        match rx.recv().await.unwrap() {
            ReaderEvent::BarcodeDetected { detection, session } => {
                assert_eq!(detection.barcode.as_str(), "8901435003005");
                assert_eq!(detection.symbology, Symbology::Ean13);
                assert_eq!(session, active);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scan_while_inactive_is_rejected() {
        let (tx, mut rx) = mpsc::channel(8);
        let (_reader, handle) = MockBarcodeReader::new(tx);

        let result = handle.scan("8901435003005", Symbology::Ean13).await;
        assert!(matches!(result, Err(HardwareError::Inactive { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_activation_is_counted_once_while_active() {
        let (tx, _rx) = mpsc::channel(8);
        let (mut reader, handle) = MockBarcodeReader::new(tx);

        reader.activate(&session()).unwrap();
        reader.activate(&session()).unwrap();
        assert_eq!(handle.activation_count(), 1);

        reader.deactivate();
        reader.activate(&session()).unwrap();
        assert_eq!(handle.activation_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_activation() {
        let (tx, _rx) = mpsc::channel(8);
        let (mut reader, handle) = MockBarcodeReader::new(tx);

        handle.fail_next_activation("camera permission denied");
        assert!(matches!(
            reader.activate(&session()),
            Err(HardwareError::ActivationFailed { .. })
        ));
        assert!(!reader.is_active());

        reader.activate(&session()).unwrap();
        assert!(reader.is_active());
    }

    #[tokio::test]
    async fn test_failure_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let (_reader, handle) = MockBarcodeReader::new(tx);

        handle.fail("camera unplugged").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.device(), DeviceType::Barcode);
        assert!(event.session().is_none());
    }

    #[tokio::test]
    async fn test_reactivation_rebinds_session() {
        let (tx, mut rx) = mpsc::channel(8);
        let (mut reader, handle) = MockBarcodeReader::new(tx);

        let first = session();
        let second = session();
        reader.activate(&first).unwrap();
        reader.activate(&second).unwrap();
        assert_eq!(handle.session(), Some(second.clone()));

        handle.fail("camera lost").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().session(), Some(&second));

        reader.deactivate();
        assert!(handle.session().is_none());
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (tx, rx) = mpsc::channel(8);
        let (mut reader, handle) = MockBarcodeReader::new(tx);
        drop(rx);

        reader.activate(&session()).unwrap();
        let result = handle.scan("A", Symbology::QrCode).await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }
}
