//! Reference flagd configuration loader.
//!
//! This is the load path of the flagd evaluation engine: JSON parsing, schema
//! validation and typed parsing of every flag. Nothing here evaluates flags.
//! [`crate::validator::EngineValidator`] initializes a disposable [`FlagEngine`]
//! against candidate content and treats any load failure as a rejection.

mod model;
mod schema;

pub use model::{FeatureFlag, ParsingResult};
pub use schema::{validate_config_value, validate_flags_config, ValidationError, ValidationResult};

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Validation mode determines how schema violations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject configurations that violate the flagd schema
    #[default]
    Strict,
    /// Accept schema violations with a warning; typed parsing still applies
    Permissive,
}

/// Why a configuration could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema validation failed: {}", .0.summary())]
    Schema(ValidationResult),
    #[error("{0}")]
    Parse(String),
}

impl LoadError {
    /// Per-location failures, for schema violations.
    pub fn details(&self) -> Vec<ValidationError> {
        match self {
            LoadError::Schema(result) => result.errors.clone(),
            _ => Vec::new(),
        }
    }
}

/// An engine instance holding one loaded configuration.
///
/// # Example
///
/// ```
/// use flagd_admin::engine::{FlagEngine, ValidationMode};
///
/// let mut engine = FlagEngine::new(ValidationMode::Strict);
/// engine
///     .update_state(r#"{"flags": {"a": {"state": "ENABLED", "variants": {"on": true}}}}"#)
///     .unwrap();
/// assert_eq!(engine.flag_count(), 1);
/// ```
#[derive(Debug)]
pub struct FlagEngine {
    state: Option<ParsingResult>,
    validation_mode: ValidationMode,
}

impl FlagEngine {
    /// Creates an engine with no configuration loaded.
    pub fn new(validation_mode: ValidationMode) -> Self {
        Self {
            state: None,
            validation_mode,
        }
    }

    /// Creates an engine initialized from the configuration file at `path`.
    pub fn from_path(path: &Path, validation_mode: ValidationMode) -> Result<Self, LoadError> {
        let mut engine = Self::new(validation_mode);
        engine.load_path(path)?;
        Ok(engine)
    }

    /// Replaces the current state with the configuration file at `path`.
    pub fn load_path(&mut self, path: &Path) -> Result<(), LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.update_state(&content)
    }

    /// Validates and parses `json_config`, replacing the current state.
    ///
    /// On failure the previous state is kept.
    pub fn update_state(&mut self, json_config: &str) -> Result<(), LoadError> {
        let config: Value = serde_json::from_str(json_config)?;

        if let Err(result) = validate_config_value(&config) {
            match self.validation_mode {
                ValidationMode::Strict => return Err(LoadError::Schema(result)),
                ValidationMode::Permissive => {
                    tracing::warn!(
                        errors = %result.summary(),
                        "Configuration has schema validation errors"
                    );
                }
            }
        }

        let parsed = ParsingResult::from_value(&config).map_err(LoadError::Parse)?;
        self.state = Some(parsed);
        Ok(())
    }

    /// Gets the currently loaded configuration.
    pub fn get_state(&self) -> Option<&ParsingResult> {
        self.state.as_ref()
    }

    /// Number of flags in the loaded configuration.
    pub fn flag_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.flags.len())
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }
}

impl Default for FlagEngine {
    fn default() -> Self {
        Self::new(ValidationMode::Strict)
    }
}
