#![deny(warnings)]

//! Persistence layer: the key/value store port, the shared save document
//! and the background aggregator lease.
//!
//! Two processes may write the same document. Writes are ordered only by
//! the document's `lastUpdate`: a write whose stamp is older than what is
//! already stored is dropped. Writes stamped in the same millisecond are
//! unordered; the later write lands.

use thiserror::Error;

pub mod document;
pub mod lease;
pub mod store;

pub use document::{
    clear_document, load_document, persisted_last_update, read_document, save_guarded,
    LoadOutcome, LoadSource, WriteOutcome, LEGACY_STATE_KEYS, STATE_KEY,
};
pub use lease::{read_lease, release_lease, renew_lease, LeaseOutcome, LeaseRecord, LEASE_KEY};
pub use store::{FileStore, MemoryStore, Store};

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store unavailable for key {0}")]
    Unavailable(String),
}

/// Failures of document and lease operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}
