//! Pairing flow state machine.
//!
//! This module tracks which step of the scan-pair-validate flow is active,
//! enforces the allowed transitions and holds the deadline for the automatic
//! restart after a result.
//!
//! # States
//!
//! - `Idle`: nothing started yet
//! - `ScanningBarcode`: camera active, waiting for a barcode
//! - `ScanningNfc`: waiting for the tag paired with the captured barcode
//! - `Validating`: looking the pair up
//! - `Success` / `Mismatch`: validation result
//! - `Error`: a scan failed or could not be started
//!
//! # Valid Transitions
//!
//! - any state → ScanningBarcode (start or automatic restart)
//! - ScanningBarcode → ScanningNfc | Error
//! - ScanningNfc → Validating | Error
//! - Validating → Success | Mismatch
//!
//! # Examples
//!
//! ```
//! use tagpair_flow::{FlowState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), &FlowState::Idle);
//!
//! machine.transition_to(FlowState::ScanningBarcode).unwrap();
//! assert!(machine.transition_to(FlowState::Success).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use tagpair_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// A full pairing flow takes five transitions, so this covers the last
/// twenty flows.
const MAX_HISTORY_SIZE: usize = 100;

/// All states of the pairing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowState {
    /// Flow not started.
    Idle,

    /// Waiting for a barcode.
    ScanningBarcode,

    /// Barcode captured, waiting for the NFC tag.
    ScanningNfc,

    /// Both values captured, checking the pairing table.
    Validating,

    /// Tag matches the barcode.
    Success,

    /// Tag does not match the barcode, or the barcode is unknown.
    Mismatch,

    /// A scan failed.
    Error,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            FlowState::Idle => "idle",
            FlowState::ScanningBarcode => "scanning-barcode",
            FlowState::ScanningNfc => "scanning-nfc",
            FlowState::Validating => "validating",
            FlowState::Success => "success",
            FlowState::Mismatch => "mismatch",
            FlowState::Error => "error",
        };
        write!(f, "{}", state_str)
    }
}

impl FlowState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagpair_flow::FlowState;
    ///
    /// assert!(FlowState::Success.can_transition_to(&FlowState::ScanningBarcode));
    /// assert!(!FlowState::Idle.can_transition_to(&FlowState::Validating));
    /// ```
    pub fn can_transition_to(&self, target: &FlowState) -> bool {
        matches!(
            (self, target),
            // Start and restart
            (_, FlowState::ScanningBarcode)
            // From ScanningBarcode
            | (FlowState::ScanningBarcode, FlowState::ScanningNfc | FlowState::Error)
            // From ScanningNfc
            | (FlowState::ScanningNfc, FlowState::Validating | FlowState::Error)
            // From Validating
            | (FlowState::Validating, FlowState::Success | FlowState::Mismatch)
        )
    }

    /// Returns `true` for result states that restart after the reset delay.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Success | FlowState::Mismatch | FlowState::Error
        )
    }

    /// Returns `true` while a reader is expected to deliver a capture.
    pub fn is_scanning(&self) -> bool {
        matches!(self, FlowState::ScanningBarcode | FlowState::ScanningNfc)
    }

    /// Index of this state in the four-step progress indicator.
    pub fn step_index(&self) -> usize {
        match self {
            FlowState::Idle | FlowState::ScanningBarcode => 0,
            FlowState::ScanningNfc => 1,
            FlowState::Validating => 2,
            FlowState::Success | FlowState::Mismatch | FlowState::Error => 3,
        }
    }
}

/// One recorded move between flow states.
///
/// The timestamp is a monotonic [`Instant`] and is not serialized; upon
/// deserialization it is set to the current time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: FlowState,

    /// The state transitioned to.
    pub to: FlowState,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: FlowState, to: FlowState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// State machine for the pairing flow.
///
/// Enforces valid transitions, keeps a bounded history and holds the timeout
/// of the current state. Entering a state clears any timeout.
///
/// Time is measured with [`tokio::time::Instant`], so tests can drive
/// timeouts with a paused clock.
///
/// # Examples
///
/// ```
/// use tagpair_flow::{FlowState, StateMachine};
///
/// let mut machine = StateMachine::new();
///
/// machine.transition_to(FlowState::ScanningBarcode).unwrap();
/// machine.transition_to(FlowState::ScanningNfc).unwrap();
/// machine.transition_to(FlowState::Validating).unwrap();
/// machine.transition_to(FlowState::Success).unwrap();
///
/// assert_eq!(machine.history().len(), 4);
/// ```
#[derive(Debug)]
pub struct StateMachine {
    current_state: FlowState,

    /// When the current state was entered.
    state_entered_at: Instant,

    /// Oldest first, at most `MAX_HISTORY_SIZE` entries.
    history: VecDeque<StateTransition>,

    /// Restart delay, measured from `state_entered_at`.
    current_timeout: Option<Duration>,
}

impl StateMachine {
    /// A machine in `Idle` with no history.
    pub fn new() -> Self {
        Self {
            current_state: FlowState::Idle,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            current_timeout: None,
        }
    }

    pub fn current_state(&self) -> &FlowState {
        &self.current_state
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Returns `true` once a timeout is set and has elapsed.
    pub fn has_timed_out(&self) -> bool {
        self.current_timeout
            .is_some_and(|timeout| self.time_in_current_state() >= timeout)
    }

    /// Instant at which the current state times out, if a timeout is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.current_timeout
            .map(|timeout| self.state_entered_at + timeout)
    }

    /// Set a timeout for the current state, measured from when it was entered.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.current_timeout = Some(timeout);
    }

    pub fn clear_timeout(&mut self) {
        self.current_timeout = None;
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state` if the flow allows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] if the transition is not
    /// allowed from the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: FlowState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());

        debug!("Flow state changed: {} -> {}", transition.from, transition.to);
        Ok(transition)
    }

    /// Force the machine into `state` regardless of the transition rules.
    ///
    /// Only for resuming an interrupted flow; the move is still recorded in
    /// history.
    pub fn restore(&mut self, state: FlowState) -> StateTransition {
        let transition = StateTransition::new(self.current_state, state);
        self.perform_state_change(state, transition.clone());
        debug!("Flow state restored: {} -> {}", transition.from, transition.to);
        transition
    }

    fn perform_state_change(&mut self, new_state: FlowState, transition: StateTransition) {
        self.current_state = new_state;
        self.state_entered_at = Instant::now();
        self.current_timeout = None;
        self.add_to_history(transition);
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn machine_in(path: &[FlowState]) -> StateMachine {
        let mut machine = StateMachine::new();
        for state in path {
            machine.transition_to(*state).unwrap();
        }
        machine
    }

    const TO_SUCCESS: &[FlowState] = &[
        FlowState::ScanningBarcode,
        FlowState::ScanningNfc,
        FlowState::Validating,
        FlowState::Success,
    ];

    #[test]
    fn test_new_machine_starts_idle() {
        let machine = StateMachine::new();
        assert_eq!(machine.current_state(), &FlowState::Idle);
        assert_eq!(machine.history().len(), 0);
        assert!(machine.deadline().is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        let machine = machine_in(TO_SUCCESS);
        assert_eq!(machine.current_state(), &FlowState::Success);
        assert!(machine.current_state().is_terminal());
    }

    #[rstest]
    #[case(FlowState::Idle)]
    #[case(FlowState::ScanningBarcode)]
    #[case(FlowState::ScanningNfc)]
    #[case(FlowState::Validating)]
    #[case(FlowState::Success)]
    #[case(FlowState::Mismatch)]
    #[case(FlowState::Error)]
    fn test_start_is_accepted_from_any_state(#[case] from: FlowState) {
        assert!(from.can_transition_to(&FlowState::ScanningBarcode));
    }

    #[rstest]
    #[case(FlowState::Idle, FlowState::ScanningNfc)]
    #[case(FlowState::Idle, FlowState::Validating)]
    #[case(FlowState::Idle, FlowState::Error)]
    #[case(FlowState::ScanningBarcode, FlowState::Validating)]
    #[case(FlowState::ScanningBarcode, FlowState::Success)]
    #[case(FlowState::ScanningNfc, FlowState::Success)]
    #[case(FlowState::ScanningNfc, FlowState::Mismatch)]
    #[case(FlowState::Validating, FlowState::Error)]
    #[case(FlowState::Success, FlowState::Mismatch)]
    #[case(FlowState::Mismatch, FlowState::Success)]
    #[case(FlowState::Error, FlowState::ScanningNfc)]
    fn test_invalid_transitions(#[case] from: FlowState, #[case] to: FlowState) {
        assert!(!from.can_transition_to(&to));
    }

    #[test]
    fn test_invalid_transition_leaves_state_unchanged() {
        let mut machine = StateMachine::new();
        let result = machine.transition_to(FlowState::Validating);

        assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
        assert_eq!(machine.current_state(), &FlowState::Idle);
        assert!(machine.history().is_empty());
    }

    #[rstest]
    #[case(FlowState::Idle, 0)]
    #[case(FlowState::ScanningBarcode, 0)]
    #[case(FlowState::ScanningNfc, 1)]
    #[case(FlowState::Validating, 2)]
    #[case(FlowState::Success, 3)]
    #[case(FlowState::Mismatch, 3)]
    #[case(FlowState::Error, 3)]
    fn test_step_index(#[case] state: FlowState, #[case] step: usize) {
        assert_eq!(state.step_index(), step);
    }

    #[test]
    fn test_display_and_serde_agree() {
        let json = serde_json::to_string(&FlowState::ScanningNfc).unwrap();
        assert_eq!(json, "\"scanning-nfc\"");
        assert_eq!(FlowState::ScanningNfc.to_string(), "scanning-nfc");
    }

    #[test]
    fn test_transition_history_is_recorded() {
        let machine = machine_in(TO_SUCCESS);
        let history: Vec<_> = machine.history().iter().collect();

        assert_eq!(history.len(), 4);
        assert_eq!(history[0].from, FlowState::Idle);
        assert_eq!(history[0].to, FlowState::ScanningBarcode);
        assert_eq!(history[3].from, FlowState::Validating);
        assert_eq!(history[3].to, FlowState::Success);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = StateMachine::new();
        for _ in 0..(MAX_HISTORY_SIZE + 10) {
            machine.transition_to(FlowState::ScanningBarcode).unwrap();
        }
        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_tracking() {
        let mut machine = machine_in(TO_SUCCESS);
        machine.set_timeout(Duration::from_secs(5));

        assert!(!machine.has_timed_out());
        assert!(machine.deadline().is_some());

        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(machine.has_timed_out());
        assert_eq!(machine.time_in_current_state(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_clears_timeout() {
        let mut machine = machine_in(TO_SUCCESS);
        machine.set_timeout(Duration::from_secs(5));

        machine.transition_to(FlowState::ScanningBarcode).unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(!machine.has_timed_out());
        assert!(machine.deadline().is_none());
    }

    #[test]
    fn test_clear_timeout() {
        let mut machine = StateMachine::new();
        machine.set_timeout(Duration::ZERO);
        assert!(machine.has_timed_out());

        machine.clear_timeout();
        assert!(!machine.has_timed_out());
    }

    #[test]
    fn test_restore_bypasses_rules_and_records_history() {
        let mut machine = StateMachine::new();
        let transition = machine.restore(FlowState::ScanningNfc);

        assert_eq!(transition.from, FlowState::Idle);
        assert_eq!(machine.current_state(), &FlowState::ScanningNfc);
        assert_eq!(machine.history().len(), 1);
    }
}
