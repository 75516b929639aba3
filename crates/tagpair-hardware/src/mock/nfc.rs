//! Mock NFC reader.

use super::lock;
use crate::{
    DeviceInfo, DeviceType, HardwareError, ReaderEvent, Result,
    traits::{NfcReader, NfcScanRequest},
};
use std::sync::{Arc, Mutex};
use tagpair_core::{SessionId, TagUid};
use tokio::sync::mpsc;

#[derive(Debug)]
struct NfcState {
    supported: bool,
    active: Option<NfcScanRequest>,
    requests: Vec<SessionId>,
    fail_next_scan: Option<String>,
}

/// Mock NFC reader for testing and development.
///
/// Holds at most one scan request. A tag presented through the handle is
/// reported for that request unless its token has been cancelled.
///
/// # Examples
///
/// ```
/// use tagpair_core::SessionId;
/// use tagpair_hardware::mock::MockNfcReader;
/// use tagpair_hardware::{NfcReader, NfcScanRequest, ReaderEvent};
///
/// #[tokio::main]
/// async fn main() -> tagpair_hardware::Result<()> {
///     let (tx, mut rx) = tokio::sync::mpsc::channel(8);
///     let (mut reader, handle) = MockNfcReader::new(tx);
///
///     reader.scan(NfcScanRequest::new(SessionId::generate()))?;
///     handle.present_tag("5f:af:2e:cb:9e:58:1b").await?;
///
///     match rx.recv().await.unwrap() {
///         ReaderEvent::TagRead { tag, .. } => assert_eq!(tag.as_str(), "5faf2ecb9e581b"),
///         other => panic!("unexpected event: {other:?}"),
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockNfcReader {
    state: Arc<Mutex<NfcState>>,
    name: String,
}

impl MockNfcReader {
    /// Create a new mock reader with in-process NFC available.
    pub fn new(events: mpsc::Sender<ReaderEvent>) -> (Self, MockNfcReaderHandle) {
        Self::with_support(true, events)
    }

    /// Create a mock reader for a platform without in-process NFC.
    pub fn unsupported(events: mpsc::Sender<ReaderEvent>) -> (Self, MockNfcReaderHandle) {
        Self::with_support(false, events)
    }

    fn with_support(
        supported: bool,
        events: mpsc::Sender<ReaderEvent>,
    ) -> (Self, MockNfcReaderHandle) {
        let state = Arc::new(Mutex::new(NfcState {
            supported,
            active: None,
            requests: Vec::new(),
            fail_next_scan: None,
        }));
        let reader = Self {
            state: Arc::clone(&state),
            name: "Mock NFC Reader".to_string(),
        };
        let handle = MockNfcReaderHandle { state, events };
        (reader, handle)
    }
}

impl NfcReader for MockNfcReader {
    fn is_supported(&self) -> bool {
        lock(&self.state).supported
    }

    fn scan(&mut self, request: NfcScanRequest) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.supported {
            return Err(HardwareError::unsupported("Web NFC"));
        }
        if let Some(message) = state.fail_next_scan.take() {
            return Err(HardwareError::activation_failed(message));
        }
        tracing::debug!("{} scanning for session {}", self.name, request.session);
        state.requests.push(request.session.clone());
        state.active = Some(request);
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "mock-ndef")
    }
}

/// Handle for controlling a mock NFC reader.
#[derive(Debug, Clone)]
pub struct MockNfcReaderHandle {
    state: Arc<Mutex<NfcState>>,
    events: mpsc::Sender<ReaderEvent>,
}

impl MockNfcReaderHandle {
    /// Bring a tag into range of the active scan.
    ///
    /// The request is consumed; a second tag needs a new scan.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::Inactive`] if no scan is active
    /// - [`HardwareError::Cancelled`] if the active scan was cancelled
    /// - [`HardwareError::InvalidData`] if `uid` is not a valid tag UID
    pub async fn present_tag(&self, uid: &str) -> Result<()> {
        let tag = TagUid::new(uid).map_err(|e| HardwareError::invalid_data(e.to_string()))?;
        let request = self.take_request()?;
        self.send(ReaderEvent::TagRead {
            tag,
            session: request.session,
        })
        .await
    }

    /// Make the active scan fail with `reason`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`present_tag`](Self::present_tag), minus the UID
    /// check.
    pub async fn fail(&self, reason: impl Into<String>) -> Result<()> {
        let request = self.take_request()?;
        self.send(ReaderEvent::Failed {
            device: DeviceType::Nfc,
            session: Some(request.session),
            reason: reason.into(),
        })
        .await
    }

    /// Report a tag read for an arbitrary session, bypassing the active
    /// request. Simulates a read that arrives after its session ended.
    ///
    /// # Errors
    ///
    /// Returns an error if `uid` is invalid or the event channel is closed.
    pub async fn inject_tag(&self, session: SessionId, uid: &str) -> Result<()> {
        let tag = TagUid::new(uid).map_err(|e| HardwareError::invalid_data(e.to_string()))?;
        self.send(ReaderEvent::TagRead { tag, session }).await
    }

    /// Toggle in-process NFC availability.
    pub fn set_supported(&self, supported: bool) {
        lock(&self.state).supported = supported;
    }

    /// Make the next scan request fail to start with `message`.
    pub fn fail_next_scan(&self, message: impl Into<String>) {
        lock(&self.state).fail_next_scan = Some(message.into());
    }

    /// Session of the active, non-cancelled scan, if any.
    pub fn active_session(&self) -> Option<SessionId> {
        lock(&self.state)
            .active
            .as_ref()
            .filter(|request| !request.is_cancelled())
            .map(|request| request.session.clone())
    }

    /// Returns `true` if the most recent request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        lock(&self.state)
            .active
            .as_ref()
            .is_some_and(NfcScanRequest::is_cancelled)
    }

    /// Sessions of every scan requested so far, oldest first.
    pub fn scan_requests(&self) -> Vec<SessionId> {
        lock(&self.state).requests.clone()
    }

    fn take_request(&self) -> Result<NfcScanRequest> {
        let mut state = lock(&self.state);
        let request = state
            .active
            .take()
            .ok_or_else(|| HardwareError::inactive("NFC reader"))?;
        if request.is_cancelled() {
            return Err(HardwareError::Cancelled);
        }
        Ok(request)
    }

    async fn send(&self, event: ReaderEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("NFC event channel closed"))
    }
}
