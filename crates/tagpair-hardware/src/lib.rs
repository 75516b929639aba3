//! Scanning collaborator abstractions for the tag pairing verifier.
//!
//! This crate defines the interfaces the session flow controller drives:
//!
//! - [`BarcodeReader`]: camera barcode decoding, started and stopped per step.
//! - [`NfcReader`]: in-process NFC reads bound to a session and a
//!   cancellation token.
//! - [`PlatformRedirect`]: hand-off to an external scan app when NFC is not
//!   available in-process.
//!
//! Results flow back as [`ReaderEvent`]s over a Tokio channel shared by all
//! readers of a flow.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides programmable readers with control handles,
//! used by the tests and by the console demo:
//!
//! ```
//! use tagpair_core::SessionId;
//! use tagpair_hardware::mock::MockBarcodeReader;
//! use tagpair_hardware::{BarcodeReader, ReaderEvent, Symbology};
//!
//! #[tokio::main]
//! async fn main() -> tagpair_hardware::Result<()> {
//!     let (tx, mut rx) = tokio::sync::mpsc::channel(8);
//!     let (mut reader, handle) = MockBarcodeReader::new(tx);
//!
//!     let session = SessionId::generate();
//!     reader.activate(&session)?;
//!     handle.scan("8901435003005", Symbology::Ean13).await?;
//!
//!     let event = rx.recv().await.unwrap();
//!     assert_eq!(event.session(), Some(&session));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use events::ReaderEvent;
pub use traits::{BarcodeReader, NfcReader, NfcScanRequest, PlatformRedirect};
pub use types::{BarcodeDetection, DeviceInfo, DeviceType, Symbology};

/// Capacity of reader event channels.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;
