//! Flag-level operations over a stored document.
//!
//! Each call reloads the document from its backend, applies one codec edit
//! and hands the re-rendered text back to the store, which validates it
//! before anything is written.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::codec::{self, Deletion, FlagCodec, FlagEntry, FlagRequest};
use crate::error::StoreError;
use crate::store::ConfigurationStore;
use crate::uri::DocumentUri;

/// Serializes edits of the same document within this process.
///
/// Writers in other processes are not covered; between them the last write
/// still wins. An entry lives only while some edit of its document holds or
/// waits for it.
#[derive(Debug, Default)]
struct DocumentLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `edit` while holding the lock of `uri`.
    fn with_lock<T>(&self, uri: &DocumentUri, edit: impl FnOnce() -> T) -> T {
        let key = format!("{}://{}", uri.scheme(), uri.payload());
        let lock = self.map().entry(key.clone()).or_default().clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            edit()
        };

        // clones are only taken under the map lock, so the count is stable here
        let mut locks = self.map();
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Lists, reads, writes and deletes individual flags of a document.
#[derive(Clone)]
pub struct FlagService {
    store: ConfigurationStore,
    codec: FlagCodec,
    locks: Arc<DocumentLocks>,
}

impl FlagService {
    pub fn new(store: ConfigurationStore, codec: FlagCodec) -> Self {
        Self {
            store,
            codec,
            locks: Arc::new(DocumentLocks::default()),
        }
    }

    pub fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    /// Loads and parses the document at `uri`.
    pub fn read_document(&self, uri: &DocumentUri) -> Result<Value, StoreError> {
        codec::parse_document(&self.store.load_content(uri)?)
    }

    pub fn list_flags(&self, uri: &DocumentUri) -> Result<Vec<FlagEntry>, StoreError> {
        Ok(self.codec.list_flags(&self.read_document(uri)?))
    }

    /// `Ok(None)` means the document exists but has no readable flag `flag_id`.
    pub fn get_flag(
        &self,
        uri: &DocumentUri,
        flag_id: &str,
    ) -> Result<Option<FlagEntry>, StoreError> {
        Ok(self.codec.get_flag(&self.read_document(uri)?, flag_id))
    }

    /// Adds `flag_id`, or replaces it wholesale if it already exists.
    pub fn upsert_flag(
        &self,
        uri: &DocumentUri,
        flag_id: &str,
        request: &FlagRequest,
    ) -> Result<(), StoreError> {
        self.locks.with_lock(uri, || -> Result<(), StoreError> {
            let document = self.read_document(uri)?;
            let updated = self.codec.upsert_flag(document, flag_id, request);
            self.store
                .initialize_content(uri, &codec::render_document(&updated)?)?;
            tracing::info!(uri = %uri, flag = flag_id, "Saved flag");
            Ok(())
        })
    }

    /// Removes `flag_id`. Returns `false`, without writing, if it was not there.
    pub fn delete_flag(&self, uri: &DocumentUri, flag_id: &str) -> Result<bool, StoreError> {
        self.locks.with_lock(uri, || -> Result<bool, StoreError> {
            match self.codec.delete_flag(self.read_document(uri)?, flag_id) {
                Deletion::Removed(document) => {
                    self.store
                        .initialize_content(uri, &codec::render_document(&document)?)?;
                    tracing::info!(uri = %uri, flag = flag_id, "Deleted flag");
                    Ok(true)
                }
                Deletion::Absent(_) => {
                    tracing::debug!(
                        uri = %uri,
                        flag = flag_id,
                        "Flag not present, nothing to delete"
                    );
                    Ok(false)
                }
            }
        })
    }
}
