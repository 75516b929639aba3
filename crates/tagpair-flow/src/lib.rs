//! Session flow for the barcode + NFC tag pairing verifier.
//!
//! This crate contains the state machine and controller that pair a scanned
//! barcode with a scanned NFC tag, plus the async runner that drives them:
//!
//! - [`StateMachine`] / [`FlowState`]: allowed steps and the restart timeout
//! - [`SessionFlowController`]: session identity, scan orchestration,
//!   validation and auto-reset
//! - [`redirect`]: deep links to an external NFC app and their callbacks
//! - [`FlowRunner`]: single-task event loop publishing [`FlowStatus`]

pub mod config;
pub mod controller;
pub mod messages;
pub mod redirect;
pub mod runner;
pub mod state_machine;

pub use config::FlowConfig;
pub use controller::{Disposition, DropReason, FlowStatus, Peripherals, SessionFlowController};
pub use messages::DisplayMessages;
pub use redirect::RedirectCallback;
pub use runner::{FlowCommand, FlowHandle, FlowRunner};
pub use state_machine::{FlowState, StateMachine, StateTransition};
