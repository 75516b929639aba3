//! Mock reader implementations for testing and development.
//!
//! Each mock is created as a `(reader, handle)` pair. The reader is handed to
//! the flow controller; the handle simulates the physical world (a barcode in
//! front of the camera, a tag near the antenna) and inspects what the
//! controller asked the reader to do.

pub mod barcode;
pub mod nfc;
pub mod redirect;

pub use barcode::{MockBarcodeReader, MockBarcodeReaderHandle};
pub use nfc::{MockNfcReader, MockNfcReaderHandle};
pub use redirect::{MockRedirect, MockRedirectHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock shared mock state, recovering from a poisoned mutex.
///
/// Mock state is plain data, so a panic in another test thread cannot leave
/// it logically inconsistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
