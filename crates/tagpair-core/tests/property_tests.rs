//! Property-based tests for tag UID normalization and pairing lookups.

use proptest::prelude::*;
use tagpair_core::{Barcode, PairingTable, TagUid};

/// Render hex bytes the way a reader reports a serial number.
fn colon_separated(hex: &str) -> String {
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).to_uppercase())
        .collect::<Vec<_>>()
        .join(":")
}

proptest! {
    #[test]
    fn normalization_is_idempotent(uid in "[0-9a-fA-F]{2,20}") {
        let once = TagUid::new(&uid).unwrap();
        let twice = TagUid::new(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn separators_do_not_affect_identity(bytes in proptest::collection::vec(any::<u8>(), 4..10)) {
        let bare = TagUid::from_bytes(&bytes).unwrap();
        let separated = TagUid::new(&colon_separated(bare.as_str())).unwrap();
        prop_assert_eq!(bare, separated);
    }

    #[test]
    fn paired_tag_always_matches(barcode in "[0-9]{8,13}", uid in "[0-9a-f]{8,14}") {
        let table = PairingTable::from_pairs([(barcode.as_str(), uid.as_str())]).unwrap();
        let barcode = Barcode::new(&barcode).unwrap();
        let tag = TagUid::new(&uid).unwrap();
        prop_assert!(table.verify(&barcode, &tag).is_match());
    }

    #[test]
    fn different_tag_never_matches(barcode in "[0-9]{8,13}", uid in "[0-9a-f]{8,14}", other in "[0-9a-f]{8,14}") {
        prop_assume!(uid != other);
        let table = PairingTable::from_pairs([(barcode.as_str(), uid.as_str())]).unwrap();
        let barcode = Barcode::new(&barcode).unwrap();
        let tag = TagUid::new(&other).unwrap();
        prop_assert!(!table.verify(&barcode, &tag).is_match());
    }
}
