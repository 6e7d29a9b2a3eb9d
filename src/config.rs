//! YAML configuration for the admin store.
//!
//! ```yaml
//! validation_mode: strict
//! schema_url: https://flagd.dev/schema/v0/flags.json
//! log_level: info
//! backends:
//!   file: true
//!   mem: false
//! ```
//!
//! Every key is optional.

use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{FileBackend, MemoryBackend, DEFAULT_SCHEMA_URL};
use crate::codec::FlagCodec;
use crate::engine::ValidationMode;
use crate::service::FlagService;
use crate::store::{BackendRegistry, ConfigurationStore};
use crate::validator::EngineValidator;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendsConfig {
    pub file: bool,
    pub mem: bool,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        BackendsConfig {
            file: true,
            mem: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    pub validation_mode: ValidationMode,
    pub schema_url: String,
    pub log_level: String,
    pub backends: BackendsConfig,
    /// Directory for the validator's scratch files; system temp dir if unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            validation_mode: ValidationMode::Strict,
            schema_url: DEFAULT_SCHEMA_URL.into(),
            log_level: "info".into(),
            backends: BackendsConfig::default(),
            scratch_dir: None,
        }
    }
}

impl AdminConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Registers the enabled backends and the configured validator.
    pub fn build_store(&self) -> ConfigurationStore {
        let mut registry = BackendRegistry::new();
        if self.backends.file {
            registry = registry.register(Arc::new(FileBackend::with_schema_url(&self.schema_url)));
        }
        if self.backends.mem {
            registry =
                registry.register(Arc::new(MemoryBackend::with_schema_url(&self.schema_url)));
        }

        let mut validator = EngineValidator::new(self.validation_mode);
        if let Some(dir) = &self.scratch_dir {
            validator = validator.with_scratch_dir(dir);
        }

        ConfigurationStore::new(registry, Arc::new(validator))
    }

    pub fn build_service(&self) -> FlagService {
        FlagService::new(self.build_store(), FlagCodec::new(&self.schema_url))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");
        tmp
    }

    #[test]
    fn test_defaults() {
        let config = AdminConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.build_store().backends().schemes(), vec!["file"]);
    }

    #[test]
    fn test_full_config_from_file() {
        let tmp = write_tmp_file(
            r#"
            validation_mode: permissive
            schema_url: https://example.com/flags.json
            log_level: debug
            backends:
                file: false
                mem: true
            "#,
        );

        let config = AdminConfig::from_file(tmp.path()).unwrap();
        assert_eq!(config.validation_mode, ValidationMode::Permissive);
        assert_eq!(config.schema_url, "https://example.com/flags.json");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.build_store().backends().schemes(), vec!["mem"]);
    }

    #[test]
    fn test_schema_url_reaches_default_document() {
        let config = AdminConfig::from_yaml(
            "schema_url: https://example.com/s.json\nbackends:\n  mem: true\n",
        )
        .unwrap();
        let store = config.build_store();
        let uri = crate::DocumentUri::parse("mem://x").unwrap();

        store.initialize_content_with_config(&uri).unwrap();
        assert!(store
            .load_content(&uri)
            .unwrap()
            .contains("https://example.com/s.json"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            AdminConfig::from_yaml("validation_mode: sometimes"),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            AdminConfig::from_yaml("listen_port: 8080"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AdminConfig::from_file(&dir.path().join("none.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
