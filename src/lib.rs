//! # flagd-admin
//!
//! Administrative store for [flagd](https://flagd.dev) flag configuration
//! documents.
//!
//! Each source points at one JSON document through a [`DocumentUri`]. The
//! crate locates that document through a scheme-specific backend, validates
//! every candidate write by loading it through the flagd configuration
//! loader, and edits single flag entries without disturbing the rest of the
//! document.
//!
//! ## Modules
//!
//! - [`uri`]: parsing of `scheme://location` strings
//! - [`backend`]: the `file://` and `mem://` storage backends
//! - [`validator`]: acceptance checks through a disposable engine instance
//! - [`store`]: backend dispatch, validate-before-write, bootstrap
//! - [`codec`]: reading and editing flag entries inside a document
//! - [`service`]: load, edit and save in one call
//! - [`engine`]: the flagd configuration loader (schema + typed parse)
//! - [`config`]: YAML configuration
//!
//! ## Example
//!
//! ```
//! use flagd_admin::{AdminConfig, DocumentUri, FlagRequest};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let uri = DocumentUri::parse(&format!("file://{}/flags.json", dir.path().display())).unwrap();
//!
//! let service = AdminConfig::default().build_service();
//! service.store().initialize_content_with_config(&uri).unwrap();
//!
//! let request = FlagRequest::new("ENABLED")
//!     .with_variant("on", json!(true))
//!     .with_variant("off", json!(false))
//!     .with_default_variant("off");
//! service.upsert_flag(&uri, "new-checkout", &request).unwrap();
//!
//! let flags = service.list_flags(&uri).unwrap();
//! assert_eq!(flags[0].key, "new-checkout");
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod uri;
pub mod validator;

pub use backend::{Content, ContentBackend, FileBackend, MemoryBackend, DEFAULT_SCHEMA_URL};
pub use codec::{Deletion, FlagCodec, FlagEntry, FlagRequest, Targeting};
pub use config::{AdminConfig, ConfigError};
pub use engine::{FlagEngine, ValidationMode};
pub use error::{ErrorType, StoreError};
pub use service::FlagService;
pub use store::{BackendRegistry, ConfigurationStore};
pub use uri::DocumentUri;
pub use validator::{ContentValidator, EngineValidator};
