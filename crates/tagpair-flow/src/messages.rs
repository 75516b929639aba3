//! User-facing messages and progress steps.
//!
//! Centralizes every string the flow surfaces to the UI layer so that the
//! console demo, tests and any future front end render the same text.
//!
//! # Usage
//!
//! ```
//! use tagpair_flow::messages::DisplayMessages;
//!
//! assert_eq!(DisplayMessages::VALIDATION_SUCCESS, "Validation successful!");
//! ```

/// Messages shown after a flow reaches a result or fails.
pub struct DisplayMessages;

impl DisplayMessages {
    // Validation results
    pub const VALIDATION_SUCCESS: &'static str = "Validation successful!";
    pub const VALIDATION_MISMATCH: &'static str = "Validation failed: Tag does not match barcode";

    // NFC
    pub const NFC_READ_FAILED: &'static str = "Couldn't read NFC tag. Please try again.";
    pub const NFC_START_FAILED: &'static str = "Failed to start NFC scan";
    pub const NFC_UNSUPPORTED: &'static str = "Web NFC not supported, redirecting to app";
    pub const REDIRECT_FAILED: &'static str = "Couldn't open the NFC scan app";

    // Barcode
    pub const BARCODE_START_FAILED: &'static str = "Failed to start barcode scanner";
    pub const BARCODE_READ_FAILED: &'static str = "Couldn't read barcode. Please try again.";

    // Redirect callback
    pub const INVALID_CALLBACK_TAG: &'static str = "Received an invalid tag from the NFC scan app";
}

/// One entry of the four-step progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub title: &'static str,
    pub description: &'static str,
}

/// Progress steps in display order.
pub const STEPS: [Step; 4] = [
    Step {
        title: "Scan Barcode",
        description: "Scan the box barcode.",
    },
    Step {
        title: "Scan NFC",
        description: "Scan the NFC tag with your device.",
    },
    Step {
        title: "Validation",
        description: "Validating the barcode and NFC tag data.",
    },
    Step {
        title: "Done",
        description: "Process complete.",
    },
];

/// Title shown for the validation step while it is the current one.
pub const VALIDATING_TITLE: &str = "Validating...";

/// Title for step `index`, accounting for the in-progress validation title.
///
/// Out-of-range indexes are clamped to the last step.
pub fn step_title(index: usize, current: usize) -> &'static str {
    let index = index.min(STEPS.len() - 1);
    if index == 2 && current == 2 {
        VALIDATING_TITLE
    } else {
        STEPS[index].title
    }
}
