use crate::{
    Result,
    constants::{DEMO_PAIRS, MAX_BARCODE_LENGTH, MAX_SESSION_ID_LENGTH, TAG_UID_SEPARATORS},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use subtle::ConstantTimeEq;

/// Session identifier correlating a scan request with its result.
///
/// Generated as a UUID v4 on every flow start. Identifiers read back from the
/// store or from a redirect callback are accepted as opaque tokens.
///
/// # Security
/// Comparison is constant-time, since the id is what authorizes a redirect
/// callback to complete a session.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session id.
    #[must_use]
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing session id with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSessionId` if the id is empty, longer than
    /// `MAX_SESSION_ID_LENGTH`, or contains whitespace or non-ASCII characters.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();

        if id.is_empty() {
            return Err(Error::InvalidSessionId("empty session id".to_string()));
        }

        if id.len() > MAX_SESSION_ID_LENGTH {
            return Err(Error::InvalidSessionId(format!(
                "session id must be at most {MAX_SESSION_ID_LENGTH} chars, got {}",
                id.len()
            )));
        }

        if !id.is_ascii() || id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidSessionId(format!("malformed session id: {id}")));
        }

        Ok(SessionId(id.to_string()))
    }

    /// Get the session id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for SessionId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SessionId::new(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        SessionId::new(&value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

/// Decoded barcode text (numeric or alphanumeric).
///
/// Normalized by trimming surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

impl Barcode {
    /// Create a barcode with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidBarcode` if the trimmed text is empty or longer
    /// than `MAX_BARCODE_LENGTH` characters.
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();

        if code.is_empty() {
            return Err(Error::InvalidBarcode("empty barcode".to_string()));
        }

        let len = code.chars().count();
        if len > MAX_BARCODE_LENGTH {
            return Err(Error::InvalidBarcode(format!(
                "barcode must be at most {MAX_BARCODE_LENGTH} chars, got {len}"
            )));
        }

        Ok(Barcode(code.to_string()))
    }

    /// Get the barcode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Barcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Barcode::new(s)
    }
}

impl TryFrom<String> for Barcode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Barcode::new(&value)
    }
}

impl From<Barcode> for String {
    fn from(value: Barcode) -> Self {
        value.0
    }
}

/// NFC tag UID in normalized form.
///
/// Separators (`:`, `-`, spaces) are stripped and letters lower-cased, so
/// `5F:AF:2E:CB:9E:58:1B` and `5faf2ecb9e581b` are the same tag.
///
/// # Security
/// Comparison is constant-time, matching how credentials are compared
/// elsewhere in the system.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagUid(String);

impl TagUid {
    /// Create a tag UID from reader output, normalizing it.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagUid` if nothing is left after stripping
    /// separators, or if the result is not ASCII alphanumeric.
    pub fn new(uid: &str) -> Result<Self> {
        let normalized: String = uid
            .trim()
            .chars()
            .filter(|c| !TAG_UID_SEPARATORS.contains(c))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if normalized.is_empty() {
            return Err(Error::InvalidTagUid("empty tag UID".to_string()));
        }

        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidTagUid(format!(
                "tag UID must be alphanumeric, got {uid}"
            )));
        }

        Ok(TagUid(normalized))
    }

    /// Create a tag UID from raw UID bytes (hex encoded).
    ///
    /// # Errors
    /// Returns `Error::InvalidTagUid` if `bytes` is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidTagUid("empty tag UID".to_string()));
        }
        Ok(TagUid(bytes.iter().map(|b| format!("{b:02x}")).collect()))
    }

    /// Get the normalized UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for TagUid {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for TagUid {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagUid::new(s)
    }
}

impl TryFrom<String> for TagUid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TagUid::new(&value)
    }
}

impl From<TagUid> for String {
    fn from(value: TagUid) -> Self {
        value.0
    }
}

/// Result of checking a barcode/tag pair against the pairing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
    /// The tag is the one paired with the barcode.
    Match,

    /// The tag differs from the paired one, or the barcode is unknown
    /// (`expected` is `None`).
    Mismatch { expected: Option<TagUid> },
}

impl Verdict {
    /// Returns `true` if the pair matched.
    #[inline]
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }
}

/// Expected barcode-to-tag correspondences.
///
/// Serialized as a flat JSON object, the same shape persisted under the
/// `pairs` store key:
///
/// ```
/// use tagpair_core::PairingTable;
///
/// let table: PairingTable = serde_json::from_str(r#"{"A":"1"}"#).unwrap();
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingTable(BTreeMap<Barcode, TagUid>);

impl PairingTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the demo table shipped with the verifier.
    #[must_use]
    pub fn demo() -> Self {
        let mut table = Self::new();
        for (barcode, tag) in DEMO_PAIRS {
            if let (Ok(barcode), Ok(tag)) = (Barcode::new(barcode), TagUid::new(tag)) {
                table.insert(barcode, tag);
            }
        }
        table
    }

    /// Build a table from raw string pairs.
    ///
    /// # Errors
    /// Returns the first barcode or tag validation error encountered.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = Self::new();
        for (barcode, tag) in pairs {
            table.insert(Barcode::new(barcode)?, TagUid::new(tag)?);
        }
        Ok(table)
    }

    /// Add or replace a pairing. Returns the previously paired tag.
    pub fn insert(&mut self, barcode: Barcode, tag: TagUid) -> Option<TagUid> {
        self.0.insert(barcode, tag)
    }

    /// Look up the tag paired with a barcode.
    #[must_use]
    pub fn expected_for(&self, barcode: &Barcode) -> Option<&TagUid> {
        self.0.get(barcode)
    }

    /// Check whether `tag` is the tag paired with `barcode`.
    #[must_use]
    pub fn verify(&self, barcode: &Barcode, tag: &TagUid) -> Verdict {
        match self.expected_for(barcode) {
            Some(expected) if expected == tag => Verdict::Match,
            expected => Verdict::Mismatch {
                expected: expected.cloned(),
            },
        }
    }

    /// Number of pairings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the table has no pairings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over pairings in barcode order.
    pub fn iter(&self) -> impl Iterator<Item = (&Barcode, &TagUid)> {
        self.0.iter()
    }
}

/// Values captured during the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Barcode captured in the first step.
    pub barcode: Option<Barcode>,

    /// Tag captured in the second step.
    pub tag: Option<TagUid>,
}

impl ScanResult {
    /// Forget both captured values.
    pub fn clear(&mut self) {
        self.barcode = None;
        self.tag = None;
    }

    /// Returns `true` if nothing has been captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.barcode.is_none() && self.tag.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_generated_session_ids_differ() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("has space")]
    #[case("sessão")]
    fn test_session_id_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            SessionId::new(input),
            Err(Error::InvalidSessionId(_))
        ));
    }

    #[test]
    fn test_session_id_rejects_too_long() {
        let long = "a".repeat(MAX_SESSION_ID_LENGTH + 1);
        assert!(SessionId::new(&long).is_err());
        assert!(SessionId::new(&long[..MAX_SESSION_ID_LENGTH]).is_ok());
    }

    #[test]
    fn test_session_id_round_trips_through_string() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_barcode_is_trimmed() {
        let barcode = Barcode::new("  8901435003005\n").unwrap();
        assert_eq!(barcode.as_str(), "8901435003005");
    }

    #[test]
    fn test_barcode_rejects_empty_and_oversized() {
        assert!(matches!(Barcode::new(""), Err(Error::InvalidBarcode(_))));
        assert!(matches!(Barcode::new(" \t "), Err(Error::InvalidBarcode(_))));
        let long = "9".repeat(MAX_BARCODE_LENGTH + 1);
        assert!(Barcode::new(&long).is_err());
    }

    #[rstest]
    #[case("5f:af:2e:cb:9e:58:1b", "5faf2ecb9e581b")]
    #[case("5F:AF:2E:CB:9E:58:1B", "5faf2ecb9e581b")]
    #[case("5f-af-2e-cb-9e-58-1b", "5faf2ecb9e581b")]
    #[case(" 5faf2ecb9e581b ", "5faf2ecb9e581b")]
    #[case("04 AB CD EF", "04abcdef")]
    fn test_tag_uid_normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(TagUid::new(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(":::")]
    #[case("5f:af/2e")]
    fn test_tag_uid_rejects_invalid(#[case] raw: &str) {
        assert!(matches!(TagUid::new(raw), Err(Error::InvalidTagUid(_))));
    }

    #[test]
    fn test_tag_uid_from_bytes() {
        let tag = TagUid::from_bytes(&[0x04, 0xAB, 0xCD, 0xEF]).unwrap();
        assert_eq!(tag.as_str(), "04abcdef");
        assert!(TagUid::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_demo_table_contents() {
        let table = PairingTable::demo();
        assert_eq!(table.len(), 2);

        let barcode = Barcode::new("8901435003005").unwrap();
        let expected = TagUid::new("5faf2ecb9e581b").unwrap();
        assert_eq!(table.expected_for(&barcode), Some(&expected));
    }

    #[test]
    fn test_verify_match_and_mismatch() {
        let table = PairingTable::from_pairs([("A", "1")]).unwrap();
        let a = Barcode::new("A").unwrap();

        assert_eq!(table.verify(&a, &TagUid::new("1").unwrap()), Verdict::Match);
        assert_eq!(
            table.verify(&a, &TagUid::new("2").unwrap()),
            Verdict::Mismatch {
                expected: Some(TagUid::new("1").unwrap())
            }
        );
    }

    #[test]
    fn test_verify_unknown_barcode() {
        let table = PairingTable::from_pairs([("A", "1")]).unwrap();
        let verdict = table.verify(&Barcode::new("B").unwrap(), &TagUid::new("1").unwrap());
        assert_eq!(verdict, Verdict::Mismatch { expected: None });
        assert!(!verdict.is_match());
    }

    #[test]
    fn test_verify_ignores_separators() {
        let table = PairingTable::demo();
        let barcode = Barcode::new("4987176270337").unwrap();
        let tag = TagUid::new("5F:D1:F9:AA:E1:57:8B").unwrap();
        assert!(table.verify(&barcode, &tag).is_match());
    }

    #[test]
    fn test_pairing_table_json_shape() {
        let table = PairingTable::from_pairs([("A", "1"), ("B", "2")]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"A":"1","B":"2"}"#);

        let parsed: PairingTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_pairing_table_json_normalizes_tags() {
        let parsed: PairingTable = serde_json::from_str(r#"{"A":"0A:0B"}"#).unwrap();
        let expected = TagUid::new("0a0b").unwrap();
        assert_eq!(parsed.expected_for(&Barcode::new("A").unwrap()), Some(&expected));
    }

    #[test]
    fn test_pairing_table_json_rejects_empty_barcode() {
        let parsed: std::result::Result<PairingTable, _> = serde_json::from_str(r#"{"":"1"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_scan_result_clear() {
        let mut result = ScanResult {
            barcode: Some(Barcode::new("A").unwrap()),
            tag: Some(TagUid::new("1").unwrap()),
        };
        assert!(!result.is_empty());

        result.clear();
        assert!(result.is_empty());
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_string(&Verdict::Match).unwrap();
        assert_eq!(json, r#"{"verdict":"match"}"#);
    }
}
