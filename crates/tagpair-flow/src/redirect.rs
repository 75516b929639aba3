//! Deep links to the external NFC scan app and the callbacks it returns.
//!
//! When in-process NFC is unavailable, the flow navigates to
//! `<redirect_base>?session_id=<id>`. The external app reads the tag and
//! navigates back with `session_id` and `tag_data` query parameters.

use tagpair_core::constants::{CALLBACK_SESSION_PARAM, CALLBACK_TAG_PARAM};
use tagpair_core::{Error, Result, SessionId};
use url::Url;

/// Build the deep link handing a scan for `session` to the external app.
///
/// # Errors
///
/// Returns [`Error::Config`] if `base` is not an absolute URL.
///
/// # Examples
///
/// ```
/// use tagpair_core::SessionId;
/// use tagpair_flow::redirect::scan_url;
///
/// let session = SessionId::new("abc-123").unwrap();
/// let url = scan_url("nfcscan://scan", &session).unwrap();
/// assert_eq!(url.as_str(), "nfcscan://scan?session_id=abc-123");
/// ```
pub fn scan_url(base: &str, session: &SessionId) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::Config(format!("Invalid redirect base {base:?}: {e}")))?;
    url.query_pairs_mut()
        .clear()
        .append_pair(CALLBACK_SESSION_PARAM, session.as_str());
    Ok(url)
}

/// Result delivered by the external scan app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCallback {
    /// Session the scan was requested for.
    pub session_id: SessionId,

    /// Tag data as returned by the app, percent-decoded but not normalized.
    pub tag_data: String,
}

impl RedirectCallback {
    /// Create a callback from already-parsed parts.
    pub fn new(session_id: SessionId, tag_data: impl Into<String>) -> Self {
        Self {
            session_id,
            tag_data: tag_data.into(),
        }
    }

    /// Extract a callback from a return URL or a bare query string.
    ///
    /// Returns `Ok(None)` when either parameter is missing or empty, which
    /// is how a normal page load looks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallback`] if `session_id` is present but not
    /// a valid session id.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagpair_flow::redirect::RedirectCallback;
    ///
    /// let callback = RedirectCallback::from_url(
    ///     "https://verify.example/?session_id=abc&tag_data=5f%3Aaf%3A2e",
    /// )
    /// .unwrap()
    /// .unwrap();
    /// assert_eq!(callback.tag_data, "5f:af:2e");
    ///
    /// assert!(RedirectCallback::from_url("https://verify.example/").unwrap().is_none());
    /// ```
    pub fn from_url(input: &str) -> Result<Option<Self>> {
        match Url::parse(input) {
            Ok(url) => Self::from_query(url.query_pairs()),
            Err(_) => {
                let query = input.trim().trim_start_matches('?');
                Self::from_query(url::form_urlencoded::parse(query.as_bytes()))
            }
        }
    }

    /// Extract a callback from decoded query pairs.
    ///
    /// The first occurrence of each parameter wins.
    pub fn from_query<K, V, I>(pairs: I) -> Result<Option<Self>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut session = None;
        let mut tag = None;

        for (key, value) in pairs {
            match key.as_ref() {
                CALLBACK_SESSION_PARAM if session.is_none() => {
                    session = Some(value.as_ref().to_string())
                }
                CALLBACK_TAG_PARAM if tag.is_none() => tag = Some(value.as_ref().to_string()),
                _ => {}
            }
        }

        let (Some(session), Some(tag)) = (session, tag) else {
            return Ok(None);
        };
        if session.trim().is_empty() || tag.trim().is_empty() {
            return Ok(None);
        }

        let session_id = SessionId::new(&session)
            .map_err(|e| Error::InvalidCallback(format!("bad {CALLBACK_SESSION_PARAM}: {e}")))?;
        Ok(Some(Self::new(session_id, tag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_scan_url_appends_session() {
        let session = SessionId::generate();
        let url = scan_url("nfcscan://scan", &session).unwrap();

        assert_eq!(url.scheme(), "nfcscan");
        assert_eq!(
            url.as_str(),
            format!("nfcscan://scan?session_id={}", session)
        );
    }

    #[test]
    fn test_scan_url_replaces_existing_query() {
        let session = SessionId::new("s1").unwrap();
        let url = scan_url("nfcscan://scan?session_id=old", &session).unwrap();
        assert_eq!(url.as_str(), "nfcscan://scan?session_id=s1");
    }

    #[test]
    fn test_scan_url_rejects_relative_base() {
        let session = SessionId::generate();
        assert!(matches!(
            scan_url("not a url", &session),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_scan_url_roundtrips_through_callback() {
        let session = SessionId::generate();
        let mut url = scan_url("nfcscan://scan", &session).unwrap();
        url.query_pairs_mut().append_pair("tag_data", "5faf2ecb9e581b");

        let callback = RedirectCallback::from_url(url.as_str()).unwrap().unwrap();
        assert_eq!(callback.session_id, session);
        assert_eq!(callback.tag_data, "5faf2ecb9e581b");
    }

    #[rstest]
    #[case("https://app.example/?session_id=s1&tag_data=abc")]
    #[case("?session_id=s1&tag_data=abc")]
    #[case("session_id=s1&tag_data=abc")]
    #[case("tag_data=abc&session_id=s1&other=1")]
    fn test_from_url_accepts_urls_and_queries(#[case] input: &str) {
        let callback = RedirectCallback::from_url(input).unwrap().unwrap();
        assert_eq!(callback.session_id.as_str(), "s1");
        assert_eq!(callback.tag_data, "abc");
    }

    #[rstest]
    #[case("https://app.example/")]
    #[case("https://app.example/?session_id=s1")]
    #[case("https://app.example/?tag_data=abc")]
    #[case("https://app.example/?session_id=&tag_data=abc")]
    #[case("https://app.example/?session_id=s1&tag_data=")]
    #[case("")]
    fn test_from_url_missing_parameters(#[case] input: &str) {
        assert!(RedirectCallback::from_url(input).unwrap().is_none());
    }

    #[test]
    fn test_from_url_percent_decodes_tag() {
        let callback = RedirectCallback::from_url("session_id=s1&tag_data=5f%3Aaf%3A2e")
            .unwrap()
            .unwrap();
        assert_eq!(callback.tag_data, "5f:af:2e");
    }

    #[test]
    fn test_from_url_invalid_session() {
        let result = RedirectCallback::from_url("session_id=has%20space&tag_data=abc");
        assert!(matches!(result, Err(Error::InvalidCallback(_))));
    }
}
