//! Session flow controller.
//!
//! Owns the session identity and drives one pairing flow at a time: scan a
//! barcode, scan the NFC tag, look the pair up, show the result and restart
//! after the reset delay.
//!
//! The controller is a plain `&mut self` state holder. Reader results reach
//! it through the handler methods, either directly or via
//! [`handle_reader_event`](SessionFlowController::handle_reader_event); the
//! [`FlowRunner`](crate::FlowRunner) drives it from a single Tokio task.
//!
//! Every handler reports a [`Disposition`]. Callbacks from a superseded
//! session or a cancelled scan are dropped without touching state.

use std::collections::VecDeque;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tagpair_core::{
    Barcode, Error, PairingTable, Result, ScanResult, SessionId, TagUid, Verdict,
};
use tagpair_hardware::{
    BarcodeReader, DeviceType, NfcReader, NfcScanRequest, PlatformRedirect, ReaderEvent,
};
use tagpair_storage::{FlowStore, KeyValueStore};

use crate::config::FlowConfig;
use crate::messages::{DisplayMessages, step_title};
use crate::redirect::{RedirectCallback, scan_url};
use crate::state_machine::{FlowState, StateMachine, StateTransition};

/// Scanning collaborators handed to the controller.
#[derive(Debug)]
pub struct Peripherals<B, N, R> {
    /// Camera barcode reader.
    pub barcode: B,

    /// In-process NFC reader.
    pub nfc: N,

    /// Hand-off used when the NFC reader is unsupported.
    pub redirect: R,
}

impl<B, N, R> Peripherals<B, N, R> {
    /// Bundle the three collaborators.
    pub fn new(barcode: B, nfc: N, redirect: R) -> Self {
        Self {
            barcode,
            nfc,
            redirect,
        }
    }
}

/// Why a callback was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The callback carries a session id other than the current one.
    StaleCallback,

    /// The scan the callback belongs to was cancelled or superseded.
    Cancelled,

    /// The flow is not in a state that accepts this callback.
    UnexpectedState,
}

/// Outcome of delivering an event to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Disposition {
    /// The event was processed.
    Applied,

    /// The event was ignored; state is unchanged.
    Dropped(DropReason),
}

impl Disposition {
    /// Returns `true` if the event was processed.
    pub fn is_applied(&self) -> bool {
        matches!(self, Disposition::Applied)
    }
}

/// How the outstanding NFC read is being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPath {
    /// In-process NFC reader.
    Direct,

    /// External app reached through a deep link.
    Redirect,
}

/// The single outstanding NFC scan.
#[derive(Debug)]
struct PendingNfcScan {
    session: SessionId,
    token: CancellationToken,
    path: ScanPath,
}

impl PendingNfcScan {
    fn accepts(&self, session: &SessionId) -> bool {
        !self.token.is_cancelled() && self.session == *session
    }
}

/// Snapshot of the flow for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStatus {
    /// Current flow state.
    pub state: FlowState,

    /// Index into the four-step progress indicator.
    pub step: usize,

    /// Title of the current step.
    pub step_title: &'static str,

    /// Current session id.
    pub session_id: SessionId,

    /// Barcode captured in this session.
    pub barcode: Option<Barcode>,

    /// Tag captured in this session.
    pub tag: Option<TagUid>,

    /// Result or error message, once the flow has finished.
    pub message: Option<String>,
}

/// Drives the barcode + NFC pairing flow.
///
/// # Examples
///
/// ```
/// use tagpair_core::PairingTable;
/// use tagpair_flow::{FlowConfig, FlowState, Peripherals, SessionFlowController};
/// use tagpair_hardware::mock::{MockBarcodeReader, MockNfcReader, MockRedirect};
/// use tagpair_storage::MemoryStore;
///
/// # #[tokio::main]
/// # async fn main() -> tagpair_core::Result<()> {
/// let (tx, _rx) = tokio::sync::mpsc::channel(8);
/// let (barcode, _) = MockBarcodeReader::new(tx.clone());
/// let (nfc, _) = MockNfcReader::new(tx);
/// let (redirect, _) = MockRedirect::new();
///
/// let mut controller = SessionFlowController::new(
///     FlowConfig::default(),
///     PairingTable::demo(),
///     MemoryStore::new(),
///     Peripherals::new(barcode, nfc, redirect),
/// )
/// .await?;
///
/// controller.start().await?;
/// assert_eq!(controller.state(), FlowState::ScanningBarcode);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionFlowController<B, N, R, S> {
    config: FlowConfig,
    pairs: PairingTable,
    store: FlowStore<S>,
    peripherals: Peripherals<B, N, R>,
    machine: StateMachine,
    session: SessionId,
    captured: ScanResult,
    barcode_armed: bool,
    nfc_scan: Option<PendingNfcScan>,
    message: Option<String>,
}

impl<B, N, R, S> SessionFlowController<B, N, R, S>
where
    B: BarcodeReader,
    N: NfcReader,
    R: PlatformRedirect,
    S: KeyValueStore,
{
    /// Create a controller in the `idle` state.
    ///
    /// Adopts the session id persisted by a previous run, if any, so that a
    /// redirect callback arriving in this process can still be matched.
    /// Writes the session id and the pairing table to the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](tagpair_core::Error::Storage) if the store
    /// cannot be read or written.
    pub async fn new(
        config: FlowConfig,
        pairs: PairingTable,
        store: S,
        peripherals: Peripherals<B, N, R>,
    ) -> Result<Self> {
        let store = FlowStore::new(store);

        let session = match store.load_session().await {
            Ok(Some(session)) => {
                debug!("Resuming persisted session {}", session);
                session
            }
            Ok(None) => SessionId::generate(),
            Err(e) => {
                warn!("Discarding unreadable persisted session: {}", e);
                SessionId::generate()
            }
        };

        store.save_session(&session).await?;
        store.save_pairs(&pairs).await?;

        Ok(Self {
            config,
            pairs,
            store,
            peripherals,
            machine: StateMachine::new(),
            session,
            captured: ScanResult::default(),
            barcode_armed: false,
            nfc_scan: None,
            message: None,
        })
    }

    /// Start a new flow.
    ///
    /// Cancels any outstanding scan and pending restart, replaces the
    /// session id, clears captured values and activates the barcode reader.
    /// Accepted from any state. If the barcode reader cannot be activated
    /// the flow enters `error`.
    pub async fn start(&mut self) -> Result<()> {
        self.cancel_scans();
        self.nfc_scan = None;
        self.machine.clear_timeout();

        let previous = self.session.clone();
        let mut session = SessionId::generate();
        while session == previous {
            session = SessionId::generate();
        }
        self.session = session;
        self.captured.clear();
        self.message = None;

        self.machine.transition_to(FlowState::ScanningBarcode)?;

        if let Err(e) = self.store.save_session(&self.session).await {
            warn!("Failed to persist session {}: {}", self.session, e);
        }
        if let Err(e) = self.store.clear_pending_barcode().await {
            warn!("Failed to clear pending barcode: {}", e);
        }

        info!("Pairing flow started with session {}", self.session);

        match self.peripherals.barcode.activate(&self.session) {
            Ok(()) => self.barcode_armed = true,
            Err(e) => {
                warn!("Barcode reader activation failed: {}", e);
                self.fail(DisplayMessages::BARCODE_START_FAILED)?;
            }
        }
        Ok(())
    }

    /// Handle a decoded barcode.
    ///
    /// Only accepted in `scanning-barcode` while the barcode reader started
    /// by [`start`](Self::start) has not been cancelled. Stops the barcode
    /// reader, moves to `scanning-nfc` and requests the tag read (or
    /// redirects to the external app when NFC is unsupported).
    pub async fn on_barcode_captured(&mut self, barcode: Barcode) -> Result<Disposition> {
        if let Some(reason) = self.check_barcode_callback(None) {
            debug!("Dropping barcode {} in state {}: {:?}", barcode, self.state(), reason);
            return Ok(Disposition::Dropped(reason));
        }
        self.apply_barcode(barcode).await
    }

    async fn apply_barcode(&mut self, barcode: Barcode) -> Result<Disposition> {
        self.barcode_armed = false;
        self.peripherals.barcode.deactivate();
        info!("Barcode scanned: {}", barcode);

        if let Err(e) = self.store.save_pending_barcode(&barcode).await {
            warn!("Failed to persist pending barcode: {}", e);
        }
        self.captured.barcode = Some(barcode);

        self.machine.transition_to(FlowState::ScanningNfc)?;
        self.begin_nfc_scan()?;
        Ok(Disposition::Applied)
    }

    /// Handle a tag read for `from_session`.
    ///
    /// Dropped when `from_session` is not the current session, when the flow
    /// is not waiting for a tag, or when the scan was cancelled. Otherwise the
    /// pair is validated, the result recorded and the restart scheduled.
    pub async fn on_tag_captured(
        &mut self,
        tag: TagUid,
        from_session: &SessionId,
    ) -> Result<Disposition> {
        if let Some(reason) = self.check_nfc_callback(Some(from_session)) {
            debug!("Dropping tag {} from session {}: {:?}", tag, from_session, reason);
            return Ok(Disposition::Dropped(reason));
        }
        self.nfc_scan = None;

        info!("NFC tag read: {}", tag);
        self.machine.transition_to(FlowState::Validating)?;

        let verdict = match &self.captured.barcode {
            Some(barcode) => self.pairs.verify(barcode, &tag),
            None => Verdict::Mismatch { expected: None },
        };
        self.captured.tag = Some(tag);

        let (state, message) = match verdict {
            Verdict::Match => {
                info!("Validation successful for session {}", self.session);
                (FlowState::Success, DisplayMessages::VALIDATION_SUCCESS)
            }
            Verdict::Mismatch { expected } => {
                let outcome = Error::ValidationMismatch {
                    barcode: display_or_none(self.captured.barcode.as_ref()),
                    tag: display_or_none(self.captured.tag.as_ref()),
                };
                info!(
                    "{} (expected {})",
                    outcome,
                    display_or_none(expected.as_ref())
                );
                (FlowState::Mismatch, DisplayMessages::VALIDATION_MISMATCH)
            }
        };
        self.machine.transition_to(state)?;
        self.message = Some(message.to_string());

        if let Err(e) = self.store.clear_pending_barcode().await {
            warn!("Failed to clear pending barcode: {}", e);
        }
        self.machine.set_timeout(self.config.reset_delay);
        Ok(Disposition::Applied)
    }

    /// Handle a scan failure reported while scanning.
    ///
    /// Moves to `error` with `reason` as the message and schedules the
    /// restart. Dropped in any other state.
    pub fn on_scan_failure(&mut self, reason: &str) -> Result<Disposition> {
        if !self.state().is_scanning() {
            debug!("Ignoring scan failure in state {}: {}", self.state(), reason);
            return Ok(Disposition::Dropped(DropReason::UnexpectedState));
        }
        self.fail(reason)?;
        Ok(Disposition::Applied)
    }

    /// Dispatch a reader event to the matching handler.
    ///
    /// Failures pass the same session and cancellation checks as the reads
    /// of their device.
    pub async fn handle_reader_event(&mut self, event: ReaderEvent) -> Result<Disposition> {
        match event {
            ReaderEvent::BarcodeDetected { detection, session } => {
                debug!(
                    "Barcode detected ({}) for session {}: {}",
                    detection.symbology, session, detection.barcode
                );
                if let Some(reason) = self.check_barcode_callback(Some(&session)) {
                    debug!("Dropping barcode {}: {:?}", detection.barcode, reason);
                    return Ok(Disposition::Dropped(reason));
                }
                self.apply_barcode(detection.barcode).await
            }
            ReaderEvent::TagRead { tag, session } => self.on_tag_captured(tag, &session).await,
            ReaderEvent::Failed {
                device: DeviceType::Barcode,
                session,
                reason,
            } => {
                if let Some(reason) = self.check_barcode_callback(session.as_ref()) {
                    debug!("Dropping barcode failure: {:?}", reason);
                    return Ok(Disposition::Dropped(reason));
                }
                warn!("Barcode reader failed: {}", reason);
                self.on_scan_failure(non_empty_or(&reason, DisplayMessages::BARCODE_READ_FAILED))
            }
            ReaderEvent::Failed {
                device: DeviceType::Nfc,
                session,
                reason,
            } => {
                if let Some(reason) = self.check_nfc_callback(session.as_ref()) {
                    debug!("Dropping NFC failure: {:?}", reason);
                    return Ok(Disposition::Dropped(reason));
                }
                warn!("NFC reader failed: {}", reason);
                self.on_scan_failure(non_empty_or(&reason, DisplayMessages::NFC_READ_FAILED))
            }
        }
    }

    /// Handle the return from the external scan app.
    ///
    /// Behaves like [`on_tag_captured`](Self::on_tag_captured). When the
    /// controller is still `idle` (a fresh process after the redirect) and
    /// the callback's session is the persisted one, the flow is resumed in
    /// `scanning-nfc` with the persisted barcode before the tag is applied.
    pub async fn on_redirect_callback(
        &mut self,
        callback: &RedirectCallback,
    ) -> Result<Disposition> {
        if callback.session_id != self.session {
            debug!(
                "Dropping redirect callback for stale session {}",
                callback.session_id
            );
            return Ok(Disposition::Dropped(DropReason::StaleCallback));
        }

        if self.state() == FlowState::Idle && !self.resume_after_redirect().await? {
            return Ok(Disposition::Dropped(DropReason::UnexpectedState));
        }

        info!("Received callback from NFC scan app");
        match TagUid::new(&callback.tag_data) {
            Ok(tag) => self.on_tag_captured(tag, &callback.session_id).await,
            Err(e) => {
                if let Some(reason) = self.check_nfc_callback(Some(&callback.session_id)) {
                    return Ok(Disposition::Dropped(reason));
                }
                warn!("Invalid tag data in redirect callback: {}", e);
                self.on_scan_failure(DisplayMessages::INVALID_CALLBACK_TAG)
            }
        }
    }

    /// Cancel any in-flight scan and the pending restart.
    ///
    /// The displayed state is left as is. Later callbacks from the cancelled
    /// scan are dropped.
    pub fn cancel(&mut self) {
        self.cancel_scans();
        self.machine.clear_timeout();
        debug!("Flow cancelled in state {}", self.state());
    }

    /// Perform the scheduled restart if its deadline has passed.
    ///
    /// Returns `true` if a new flow was started.
    pub async fn poll_restart(&mut self) -> Result<bool> {
        if !self.state().is_terminal() || !self.machine.has_timed_out() {
            return Ok(false);
        }
        debug!("Reset delay elapsed, restarting flow");
        self.start().await?;
        Ok(true)
    }

    /// Deadline of the scheduled restart, if one is pending.
    pub fn restart_deadline(&self) -> Option<Instant> {
        if self.state().is_terminal() {
            self.machine.deadline()
        } else {
            None
        }
    }

    /// Snapshot of the flow for display.
    pub fn status(&self) -> FlowStatus {
        let state = self.state();
        let step = state.step_index();
        FlowStatus {
            state,
            step,
            step_title: step_title(step, step),
            session_id: self.session.clone(),
            barcode: self.captured.barcode.clone(),
            tag: self.captured.tag.clone(),
            message: self.message.clone(),
        }
    }

    /// Current flow state.
    pub fn state(&self) -> FlowState {
        *self.machine.current_state()
    }

    /// Current session id.
    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    /// Values captured in the current session.
    pub fn captured(&self) -> &ScanResult {
        &self.captured
    }

    /// Result or error message of the finished flow.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Pairing table used for validation.
    pub fn pairs(&self) -> &PairingTable {
        &self.pairs
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        self.machine.history()
    }

    /// Returns `true` when the outstanding NFC read was handed to the
    /// external app.
    pub fn is_awaiting_redirect(&self) -> bool {
        self.nfc_scan
            .as_ref()
            .is_some_and(|scan| scan.path == ScanPath::Redirect && !scan.token.is_cancelled())
    }

    /// Check whether a barcode reader event for `session` may be applied.
    fn check_barcode_callback(&self, session: Option<&SessionId>) -> Option<DropReason> {
        if session.is_some_and(|s| *s != self.session) {
            return Some(DropReason::StaleCallback);
        }
        if self.state() != FlowState::ScanningBarcode {
            return Some(DropReason::UnexpectedState);
        }
        if !self.barcode_armed {
            return Some(DropReason::Cancelled);
        }
        None
    }

    /// Check whether an NFC callback for `session` may be applied.
    ///
    /// A callback without a session is checked against the outstanding scan
    /// only.
    fn check_nfc_callback(&self, session: Option<&SessionId>) -> Option<DropReason> {
        if session.is_some_and(|s| *s != self.session) {
            return Some(DropReason::StaleCallback);
        }
        if self.state() != FlowState::ScanningNfc {
            return Some(DropReason::UnexpectedState);
        }
        let session = session.unwrap_or(&self.session);
        match &self.nfc_scan {
            Some(scan) if scan.accepts(session) => None,
            _ => Some(DropReason::Cancelled),
        }
    }

    /// Issue the NFC read for the current session, superseding any previous
    /// one.
    fn begin_nfc_scan(&mut self) -> Result<()> {
        if let Some(previous) = self.nfc_scan.take() {
            previous.token.cancel();
        }
        let token = CancellationToken::new();

        if !self.peripherals.nfc.is_supported() {
            info!("Web NFC not supported, redirecting to app");
            let url = match scan_url(&self.config.redirect_base, &self.session) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Cannot build redirect URL: {}", e);
                    return self.fail(DisplayMessages::REDIRECT_FAILED);
                }
            };
            self.nfc_scan = Some(PendingNfcScan {
                session: self.session.clone(),
                token,
                path: ScanPath::Redirect,
            });
            if let Err(e) = self.peripherals.redirect.redirect(url.as_str()) {
                warn!("Redirect to {} failed: {}", url, e);
                return self.fail(DisplayMessages::REDIRECT_FAILED);
            }
            return Ok(());
        }

        self.nfc_scan = Some(PendingNfcScan {
            session: self.session.clone(),
            token: token.clone(),
            path: ScanPath::Direct,
        });
        debug!("Starting NFC scan for session {}", self.session);
        match self
            .peripherals
            .nfc
            .scan(NfcScanRequest::with_token(self.session.clone(), token))
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                warn!("NFC scan failed to start: {}", e);
                self.fail(DisplayMessages::NFC_START_FAILED)
            }
        }
    }

    /// Rebuild the NFC step from the store after a redirect round trip.
    ///
    /// Returns `false` if no barcode was pending for the session.
    async fn resume_after_redirect(&mut self) -> Result<bool> {
        let barcode = match self.store.load_pending_barcode().await {
            Ok(Some(barcode)) => barcode,
            Ok(None) => {
                debug!("No pending barcode for session {}", self.session);
                return Ok(false);
            }
            Err(e) => {
                warn!("Cannot read pending barcode: {}", e);
                return Ok(false);
            }
        };

        info!("Resuming session {} for barcode {}", self.session, barcode);
        self.captured.barcode = Some(barcode);
        self.machine.restore(FlowState::ScanningNfc);
        self.nfc_scan = Some(PendingNfcScan {
            session: self.session.clone(),
            token: CancellationToken::new(),
            path: ScanPath::Redirect,
        });
        Ok(true)
    }

    fn cancel_scans(&mut self) {
        self.barcode_armed = false;
        if let Some(scan) = &self.nfc_scan {
            scan.token.cancel();
        }
        self.peripherals.barcode.deactivate();
    }

    /// Enter `error` with `message` and schedule the restart.
    fn fail(&mut self, message: &str) -> Result<()> {
        self.cancel_scans();
        self.machine.transition_to(FlowState::Error)?;
        self.message = Some(message.to_string());
        self.machine.set_timeout(self.config.reset_delay);
        warn!("Pairing flow failed: {}", message);
        Ok(())
    }
}

fn display_or_none<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "none".to_string(), ToString::to_string)
}

fn non_empty_or<'a>(reason: &'a str, fallback: &'a str) -> &'a str {
    if reason.trim().is_empty() {
        fallback
    } else {
        reason
    }
}
