//! Events reported by scanning collaborators.

use crate::types::{BarcodeDetection, DeviceType};
use serde::{Deserialize, Serialize};
use tagpair_core::{SessionId, TagUid};

/// Event emitted by a reader.
///
/// All readers of a flow share one channel; the flow task drains it in
/// arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReaderEvent {
    /// A barcode was decoded while the barcode reader was active.
    BarcodeDetected {
        detection: BarcodeDetection,

        /// Session the reader was activated for.
        session: SessionId,
    },

    /// An NFC tag was read for `session`.
    TagRead {
        /// Normalized tag serial number.
        tag: TagUid,

        /// Session of the scan request that produced the read.
        session: SessionId,
    },

    /// A reader failed.
    ///
    /// Failures carry the session of the request they belong to, when the
    /// reader knows it, so that failures of superseded scans can be ignored.
    Failed {
        /// Reader that failed.
        device: DeviceType,

        /// Session of the failed request, if any.
        session: Option<SessionId>,

        /// Human-readable reason.
        reason: String,
    },
}

impl ReaderEvent {
    /// Reader that produced the event.
    pub fn device(&self) -> DeviceType {
        match self {
            Self::BarcodeDetected { .. } => DeviceType::Barcode,
            Self::TagRead { .. } => DeviceType::Nfc,
            Self::Failed { device, .. } => *device,
        }
    }

    /// Session the event is bound to, if any.
    pub fn session(&self) -> Option<&SessionId> {
        match self {
            Self::BarcodeDetected { session, .. } | Self::TagRead { session, .. } => Some(session),
            Self::Failed { session, .. } => session.as_ref(),
        }
    }
}
