//! Core constants for the pairing verifier.
//!
//! This module centralizes the values shared between the flow controller,
//! the storage layer and the console demo: timing defaults, key-value store
//! keys, redirect callback parameters and the demo pairing data.
//!
//! # Usage
//!
//! ```
//! use tagpair_core::constants::*;
//! use std::time::Duration;
//!
//! let delay = Duration::from_secs(DEFAULT_RESET_DELAY_SECS);
//! assert_eq!(delay.as_secs(), 5);
//! assert_eq!(SESSION_KEY, "sessionId");
//! ```

// ============================================================================
// Timing
// ============================================================================

/// Delay before a finished flow (success, mismatch or error) restarts.
pub const DEFAULT_RESET_DELAY_SECS: u64 = 5;

// ============================================================================
// Key-Value Store Keys
// ============================================================================

/// Key holding the current session identifier.
///
/// Must survive a full redirect to the external scan app, so it lives in the
/// durable store rather than in memory.
pub const SESSION_KEY: &str = "sessionId";

/// Key holding the pairing table as a JSON object.
pub const PAIRS_KEY: &str = "pairs";

/// Key holding the barcode captured before a redirect.
pub const PENDING_BARCODE_KEY: &str = "pendingBarcode";

// ============================================================================
// Redirect
// ============================================================================

/// Deep-link base handed to the platform when Web NFC is unavailable.
///
/// The session id is appended as the `session_id` query parameter:
///
/// ```text
/// nfcscan://scan?session_id=2f1c...
/// ```
pub const DEFAULT_REDIRECT_BASE: &str = "nfcscan://scan";

/// Query parameter carrying the session id, both ways.
pub const CALLBACK_SESSION_PARAM: &str = "session_id";

/// Query parameter carrying the tag read by the external app.
pub const CALLBACK_TAG_PARAM: &str = "tag_data";

// ============================================================================
// Validation Limits
// ============================================================================

/// Maximum accepted barcode length in characters.
///
/// Covers the longest common 2D payloads the decoder reports for product
/// labels without accepting arbitrary blobs.
pub const MAX_BARCODE_LENGTH: usize = 512;

/// Maximum accepted session id length in characters.
pub const MAX_SESSION_ID_LENGTH: usize = 128;

/// Characters stripped from tag UIDs before comparison.
///
/// Readers report serial numbers as `5f:af:2e:...`; pairing data stores the
/// bare hex form.
pub const TAG_UID_SEPARATORS: &[char] = &[':', '-', ' '];

// ============================================================================
// Demo Data
// ============================================================================

/// Demo pairing table (barcode -> tag UID).
pub const DEMO_PAIRS: &[(&str, &str)] = &[
    ("8901435003005", "5faf2ecb9e581b"),
    ("4987176270337", "5fd1f9aae1578b"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_pairs_are_unique() {
        let mut barcodes: Vec<_> = DEMO_PAIRS.iter().map(|(b, _)| *b).collect();
        barcodes.sort_unstable();
        barcodes.dedup();
        assert_eq!(barcodes.len(), DEMO_PAIRS.len());
    }

    #[test]
    fn test_store_keys_are_distinct() {
        assert_ne!(SESSION_KEY, PAIRS_KEY);
        assert_ne!(SESSION_KEY, PENDING_BARCODE_KEY);
        assert_ne!(PAIRS_KEY, PENDING_BARCODE_KEY);
    }
}
