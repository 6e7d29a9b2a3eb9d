//! Acceptance checks for candidate configuration documents.
//!
//! [`EngineValidator`] follows the same path flagd takes when it starts from a
//! file: the candidate is written to a scratch file and a throwaway
//! [`FlagEngine`] is initialized against it. Whatever the engine refuses to
//! load is refused here.

use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::engine::{FlagEngine, ValidationMode};
use crate::error::StoreError;

/// Decides whether text is acceptable as a flag configuration document.
pub trait ContentValidator: Send + Sync {
    fn validate(&self, content: &str) -> Result<(), StoreError>;
}

/// Validates by loading the content through a disposable engine instance.
#[derive(Debug, Clone, Default)]
pub struct EngineValidator {
    mode: ValidationMode,
    scratch_dir: Option<PathBuf>,
}

impl EngineValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            scratch_dir: None,
        }
    }

    /// Places scratch files in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }
}

fn load_through_engine(
    scratch: &mut NamedTempFile,
    content: &str,
    mode: ValidationMode,
) -> Result<FlagEngine, StoreError> {
    scratch
        .write_all(content.as_bytes())
        .and_then(|()| scratch.flush())
        .map_err(|e| {
            StoreError::content_validation(format!(
                "Failed to write temporary file for validation: {}",
                e
            ))
        })?;

    FlagEngine::from_path(scratch.path(), mode).map_err(|e| {
        StoreError::content_validation(format!("Content validation failed: {}", e))
            .with_details(e.details())
    })
}

impl ContentValidator for EngineValidator {
    fn validate(&self, content: &str) -> Result<(), StoreError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("flagd-validation-").suffix(".json");
        let scratch = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut scratch = scratch.map_err(|e| {
            StoreError::content_validation(format!(
                "Failed to create temporary file for validation: {}",
                e
            ))
        })?;

        let outcome = load_through_engine(&mut scratch, content, self.mode);

        // dropping the handle also deletes the file; close() lets us report failures
        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "Failed to delete temporary validation file");
        }

        let engine = outcome?;
        tracing::debug!(flags = engine.flag_count(), "Content accepted by engine");
        Ok(())
    }
}
