//! Storage backends for configuration documents.
//!
//! A backend claims one URI scheme and moves raw document text in and out of
//! its storage. Backends never interpret the text; validation happens in
//! [`crate::store::ConfigurationStore`] before any write reaches them.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use serde_json::json;

use crate::error::StoreError;
use crate::uri::DocumentUri;

/// Schema tag written into generated documents.
pub const DEFAULT_SCHEMA_URL: &str = "https://flagd.dev/schema/v0/flags.json";

/// What a backend should write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content<'a> {
    /// No content supplied; the backend writes its canonical default document
    Default,
    /// Write exactly this text, which may be empty
    Text(&'a str),
}

/// Renders the canonical empty configuration carrying `schema_url`.
///
/// ```
/// use flagd_admin::backend::{default_document, DEFAULT_SCHEMA_URL};
///
/// let doc: serde_json::Value = serde_json::from_str(&default_document(DEFAULT_SCHEMA_URL)).unwrap();
/// assert_eq!(doc["flags"], serde_json::json!({}));
/// ```
pub fn default_document(schema_url: &str) -> String {
    let document = json!({
        "$schema": schema_url,
        "flags": {}
    });
    // serializing a json! literal cannot fail
    serde_json::to_string_pretty(&document).unwrap_or_default()
}

/// Document storage for one URI scheme.
pub trait ContentBackend: Send + Sync {
    /// The scheme this backend is registered under, lowercase.
    fn scheme(&self) -> &str;

    /// Whether this backend handles `scheme`, compared case-insensitively.
    fn supports(&self, scheme: &str) -> bool {
        self.scheme().eq_ignore_ascii_case(scheme)
    }

    /// Reads the full content at `uri`.
    fn load(&self, uri: &DocumentUri) -> Result<String, StoreError>;

    /// Writes `content` to `uri`, creating any missing parent structure and
    /// overwriting existing content unconditionally.
    fn save(&self, uri: &DocumentUri, content: Content<'_>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_shape() {
        let text = default_document("https://example.com/flags.json");
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            doc,
            json!({"$schema": "https://example.com/flags.json", "flags": {}})
        );
        // $schema comes first
        assert!(text.find("$schema").unwrap() < text.find("flags").unwrap());
    }

    #[test]
    fn test_supports_is_case_insensitive() {
        let backend = MemoryBackend::new();
        assert!(backend.supports("mem"));
        assert!(backend.supports("MEM"));
        assert!(!backend.supports("memory"));
        assert!(!backend.supports("file"));
    }
}
