use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{default_document, Content, ContentBackend, DEFAULT_SCHEMA_URL};
use crate::error::StoreError;
use crate::uri::DocumentUri;

/// Keeps documents in process memory, keyed by the payload of `mem://` URIs.
///
/// Content is lost when the backend is dropped.
#[derive(Debug)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<String, String>>,
    schema_url: String,
}

impl MemoryBackend {
    pub const SCHEME: &'static str = "mem";

    pub fn new() -> Self {
        Self::with_schema_url(DEFAULT_SCHEMA_URL)
    }

    pub fn with_schema_url(schema_url: impl Into<String>) -> Self {
        MemoryBackend {
            documents: Mutex::new(HashMap::new()),
            schema_url: schema_url.into(),
        }
    }

    /// Seeds a document without going through validation.
    pub fn insert(&self, name: impl Into<String>, content: impl Into<String>) {
        self.documents().insert(name.into(), content.into());
    }

    /// Current content stored under `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.documents().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn documents(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentBackend for MemoryBackend {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    fn load(&self, uri: &DocumentUri) -> Result<String, StoreError> {
        self.get(uri.payload())
            .ok_or_else(|| StoreError::not_found(format!("Document not found: {}", uri)))
    }

    fn save(&self, uri: &DocumentUri, content: Content<'_>) -> Result<(), StoreError> {
        let text = match content {
            Content::Default => default_document(&self.schema_url),
            Content::Text(text) => text.to_string(),
        };
        tracing::debug!(uri = %uri, bytes = text.len(), "Stored in-memory document");
        self.insert(uri.payload(), text);
        Ok(())
    }
}
