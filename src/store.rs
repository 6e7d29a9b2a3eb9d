//! Backend resolution, validation-before-write and bootstrap of documents.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{Content, ContentBackend, FileBackend};
use crate::engine::ValidationMode;
use crate::error::{ErrorType, StoreError};
use crate::uri::DocumentUri;
use crate::validator::{ContentValidator, EngineValidator};

/// Scheme to backend mapping, built once at startup.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ContentBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `backend` under its scheme. A later registration for the
    /// same scheme replaces the earlier one.
    pub fn register(mut self, backend: Arc<dyn ContentBackend>) -> Self {
        self.backends
            .insert(backend.scheme().to_ascii_lowercase(), backend);
        self
    }

    /// The backend claiming `scheme`, if any.
    pub fn resolve(&self, scheme: &str) -> Option<&Arc<dyn ContentBackend>> {
        self.backends
            .get(&scheme.to_ascii_lowercase())
            .filter(|backend| backend.supports(scheme))
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

/// Loads, validates and saves configuration documents through the backend
/// matching each URI's scheme.
///
/// The store holds no document state: every call goes to the backend.
///
/// # Example
///
/// ```
/// use flagd_admin::{ConfigurationStore, DocumentUri};
///
/// let dir = tempfile::tempdir().unwrap();
/// let uri = DocumentUri::parse(&format!("file://{}/flags.json", dir.path().display())).unwrap();
///
/// let store = ConfigurationStore::with_defaults();
/// store.initialize_content_with_config(&uri).unwrap();
/// assert!(store.content_exists(&uri));
/// ```
#[derive(Clone)]
pub struct ConfigurationStore {
    backends: BackendRegistry,
    validator: Arc<dyn ContentValidator>,
}

impl ConfigurationStore {
    pub fn new(backends: BackendRegistry, validator: Arc<dyn ContentValidator>) -> Self {
        Self {
            backends,
            validator,
        }
    }

    /// A store with the file backend and a strict engine validator.
    pub fn with_defaults() -> Self {
        Self::new(
            BackendRegistry::new().register(Arc::new(FileBackend::new())),
            Arc::new(EngineValidator::new(ValidationMode::Strict)),
        )
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    fn backend_for(&self, uri: &DocumentUri) -> Result<&Arc<dyn ContentBackend>, StoreError> {
        self.backends
            .resolve(uri.scheme())
            .ok_or_else(|| StoreError::unsupported_scheme(uri.scheme()))
    }

    /// Reads the current raw content at `uri`.
    pub fn load_content(&self, uri: &DocumentUri) -> Result<String, StoreError> {
        self.backend_for(uri)?.load(uri)
    }

    /// Validates `content` and, only if it is accepted, writes it to `uri`.
    pub fn initialize_content(&self, uri: &DocumentUri, content: &str) -> Result<(), StoreError> {
        self.validator.validate(content)?;
        self.backend_for(uri)?.save(uri, Content::Text(content))?;
        tracing::info!(uri = %uri, bytes = content.len(), "Saved configuration content");
        Ok(())
    }

    /// Whether content can currently be loaded from `uri`. Never fails.
    pub fn content_exists(&self, uri: &DocumentUri) -> bool {
        self.load_content(uri).is_ok()
    }

    /// Makes sure `uri` holds a usable document.
    ///
    /// Existing content is validated but never rewritten, so a broken file
    /// surfaces as an error. Missing content is replaced by the backend's
    /// default document.
    pub fn initialize_content_with_config(&self, uri: &DocumentUri) -> Result<(), StoreError> {
        let backend = self.backend_for(uri)?;

        match backend.load(uri) {
            Ok(current) => {
                tracing::debug!(uri = %uri, "Validating existing configuration content");
                self.validator.validate(&current)
            }
            Err(err) if err.error_type == ErrorType::NotFound => {
                backend.save(uri, Content::Default)?;
                tracing::info!(uri = %uri, "Created default configuration content");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_document, MemoryBackend, DEFAULT_SCHEMA_URL};

    fn mem_store() -> (ConfigurationStore, Arc<MemoryBackend>) {
        let memory = Arc::new(MemoryBackend::new());
        let store = ConfigurationStore::new(
            BackendRegistry::new().register(memory.clone()),
            Arc::new(EngineValidator::default()),
        );
        (store, memory)
    }

    fn uri(raw: &str) -> DocumentUri {
        DocumentUri::parse(raw).unwrap()
    }

    #[test]
    fn test_registry_resolution() {
        let registry = BackendRegistry::new()
            .register(Arc::new(FileBackend::new()))
            .register(Arc::new(MemoryBackend::new()));
        assert_eq!(registry.schemes(), vec!["file", "mem"]);
        assert!(registry.resolve("FILE").is_some());
        assert!(registry.resolve("s3").is_none());
    }

    #[test]
    fn test_unsupported_scheme() {
        let (store, _) = mem_store();
        let target = uri("s3://bucket/flags.json");

        let err = store.load_content(&target).unwrap_err();
        assert_eq!(err.error_type, ErrorType::UnsupportedScheme);
        assert_eq!(
            store
                .initialize_content(&target, r#"{"flags": {}}"#)
                .unwrap_err()
                .error_type,
            ErrorType::UnsupportedScheme
        );
        assert!(!store.content_exists(&target));
    }

    #[test]
    fn test_initialize_content_validates_first() {
        let (store, memory) = mem_store();
        let target = uri("mem://flags");

        let err = store.initialize_content(&target, "{ invalid").unwrap_err();
        assert_eq!(err.error_type, ErrorType::ContentValidation);
        assert!(memory.get("flags").is_none());

        store.initialize_content(&target, r#"{"flags": {}}"#).unwrap();
        assert_eq!(store.load_content(&target).unwrap(), r#"{"flags": {}}"#);
    }

    #[test]
    fn test_invalid_content_keeps_previous_document() {
        let (store, memory) = mem_store();
        memory.insert("flags", r#"{"flags": {}}"#);

        assert!(store.initialize_content(&uri("mem://flags"), "").is_err());
        assert_eq!(memory.get("flags").as_deref(), Some(r#"{"flags": {}}"#));
    }

    #[test]
    fn test_content_exists() {
        let (store, memory) = mem_store();
        assert!(!store.content_exists(&uri("mem://a")));
        memory.insert("a", "not even json");
        assert!(store.content_exists(&uri("mem://a")));
    }

    #[test]
    fn test_bootstrap_creates_default_once() {
        let (store, memory) = mem_store();
        let target = uri("mem://fresh");

        store.initialize_content_with_config(&target).unwrap();
        assert_eq!(
            memory.get("fresh").unwrap(),
            default_document(DEFAULT_SCHEMA_URL)
        );

        let edited = r#"{"flags": {"a": {"state": "ENABLED", "variants": {"on": true}}}}"#;
        memory.insert("fresh", edited);
        store.initialize_content_with_config(&target).unwrap();
        assert_eq!(memory.get("fresh").as_deref(), Some(edited));
    }

    #[test]
    fn test_bootstrap_surfaces_broken_content() {
        let (store, memory) = mem_store();
        memory.insert("broken", "{ invalid");

        let err = store
            .initialize_content_with_config(&uri("mem://broken"))
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::ContentValidation);
        assert_eq!(memory.get("broken").as_deref(), Some("{ invalid"));
    }

    struct DeniedBackend;

    impl ContentBackend for DeniedBackend {
        fn scheme(&self) -> &str {
            "locked"
        }

        fn load(&self, _uri: &DocumentUri) -> Result<String, StoreError> {
            Err(StoreError::access_denied("locked"))
        }

        fn save(&self, _uri: &DocumentUri, _content: Content<'_>) -> Result<(), StoreError> {
            panic!("save must not be called");
        }
    }

    #[test]
    fn test_bootstrap_propagates_access_errors() {
        let store = ConfigurationStore::new(
            BackendRegistry::new().register(Arc::new(DeniedBackend)),
            Arc::new(EngineValidator::default()),
        );
        let err = store
            .initialize_content_with_config(&uri("locked:thing"))
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::AccessDenied);
    }
}
