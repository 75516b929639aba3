//! Typed access to the persisted session state.

use crate::error::{StorageError, StorageResult};
use crate::store::KeyValueStore;
use tagpair_core::constants::{PAIRS_KEY, PENDING_BARCODE_KEY, SESSION_KEY};
use tagpair_core::{Barcode, PairingTable, SessionId};

/// Session state persisted across reloads and redirects.
///
/// Wraps a [`KeyValueStore`] and maps the raw string entries to domain types:
///
/// | key              | value                                 |
/// |------------------|---------------------------------------|
/// | `sessionId`      | current [`SessionId`]                 |
/// | `pairs`          | [`PairingTable`] as a JSON object     |
/// | `pendingBarcode` | [`Barcode`] captured before redirect  |
#[derive(Debug, Clone)]
pub struct FlowStore<S> {
    store: S,
}

impl<S: KeyValueStore> FlowStore<S> {
    /// Wrap a key-value store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Load the persisted session id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] if the stored value is not a
    /// valid session id.
    pub async fn load_session(&self) -> StorageResult<Option<SessionId>> {
        self.store
            .get(SESSION_KEY)
            .await?
            .map(|raw| SessionId::new(&raw).map_err(|e| StorageError::Validation(e.to_string())))
            .transpose()
    }

    /// Persist the session id, replacing any previous one.
    pub async fn save_session(&self, session: &SessionId) -> StorageResult<()> {
        self.store.set(SESSION_KEY, session.as_str()).await
    }

    /// Load the persisted pairing table.
    pub async fn load_pairs(&self) -> StorageResult<Option<PairingTable>> {
        self.store
            .get(PAIRS_KEY)
            .await?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| StorageError::serialization(PAIRS_KEY, e))
            })
            .transpose()
    }

    /// Persist the pairing table as a JSON object.
    pub async fn save_pairs(&self, pairs: &PairingTable) -> StorageResult<()> {
        let raw =
            serde_json::to_string(pairs).map_err(|e| StorageError::serialization(PAIRS_KEY, e))?;
        self.store.set(PAIRS_KEY, &raw).await
    }

    /// Load the barcode captured before a redirect, if any.
    pub async fn load_pending_barcode(&self) -> StorageResult<Option<Barcode>> {
        self.store
            .get(PENDING_BARCODE_KEY)
            .await?
            .map(|raw| Barcode::new(&raw).map_err(|e| StorageError::Validation(e.to_string())))
            .transpose()
    }

    /// Remember the barcode captured in the current session.
    pub async fn save_pending_barcode(&self, barcode: &Barcode) -> StorageResult<()> {
        self.store.set(PENDING_BARCODE_KEY, barcode.as_str()).await
    }

    /// Forget the pending barcode.
    pub async fn clear_pending_barcode(&self) -> StorageResult<()> {
        self.store.remove(PENDING_BARCODE_KEY).await
    }
}
