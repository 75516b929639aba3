//! Session state persistence for the tag pairing verifier.
//!
//! The pairing flow persists three values so it can resume after a full
//! reload, including the round trip through an external NFC scan app: the
//! session id, the pairing table and the barcode captured before the
//! hand-off.
//!
//! # Architecture
//!
//! - [`KeyValueStore`] - string key-value contract
//! - [`MemoryStore`] - process-local implementation
//! - [`SqliteStore`] over a [`Database`] - durable implementation
//! - [`FlowStore`] - typed access to the session keys
//!
//! # Example
//!
//! ```no_run
//! use tagpair_storage::{Database, DatabaseConfig, FlowStore, SqliteStore};
//! use tagpair_core::SessionId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("tagpair.db")).await?;
//! let store = FlowStore::new(SqliteStore::from_database(&db));
//!
//! store.save_session(&SessionId::generate()).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod session;
pub mod store;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use session::FlowStore;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
