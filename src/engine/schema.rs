//! JSON Schema validation for flagd flag configurations.
//!
//! The flagd schema is embedded at build time and compiled with `boon` on
//! first use, once per thread.

use boon::{Compiler, SchemaIndex, Schemas};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;

const FLAGS_SCHEMA: &str = include_str!("../../schemas/flags.json");
const TARGETING_SCHEMA: &str = include_str!("../../schemas/targeting.json");

/// The flags schema refers to "./targeting.json", resolved against this base.
const FLAGS_SCHEMA_URL: &str = "https://flagd.dev/schema/v0/flags.json";
const TARGETING_SCHEMA_URL: &str = "https://flagd.dev/schema/v0/targeting.json";

struct FlagSchema {
    schemas: Schemas,
    root: SchemaIndex,
}

impl FlagSchema {
    fn compile() -> Result<Self, String> {
        let parse = |name: &str, text: &str| {
            serde_json::from_str::<Value>(text)
                .map_err(|e| format!("Embedded {} schema is not JSON: {}", name, e))
        };

        let mut compiler = Compiler::new();
        compiler
            .add_resource(TARGETING_SCHEMA_URL, parse("targeting", TARGETING_SCHEMA)?)
            .map_err(|e| format!("Cannot register targeting schema: {}", e))?;
        compiler
            .add_resource(FLAGS_SCHEMA_URL, parse("flags", FLAGS_SCHEMA)?)
            .map_err(|e| format!("Cannot register flags schema: {}", e))?;

        let mut schemas = Schemas::new();
        let root = compiler
            .compile(FLAGS_SCHEMA_URL, &mut schemas)
            .map_err(|e| format!("Cannot compile flags schema: {}", e))?;
        Ok(Self { schemas, root })
    }
}

thread_local! {
    static FLAG_SCHEMA: RefCell<Option<FlagSchema>> = const { RefCell::new(None) };
}

/// One schema violation, located by JSON pointer (e.g. `/flags/myFlag/state`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Empty when `valid`
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Joins all error messages into one line, prefixed by their location.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                if e.path.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.path, e.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validates an already-parsed configuration against the flagd schema.
pub fn validate_config_value(config: &Value) -> Result<(), ValidationResult> {
    FLAG_SCHEMA.with(|cell| {
        let unavailable = |e: String| ValidationResult::failure(vec![ValidationError::new("", e)]);

        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(FlagSchema::compile().map_err(unavailable)?);
        }
        let schema = slot
            .as_ref()
            .ok_or_else(|| unavailable("Flags schema is not compiled".to_string()))?;

        schema.schemas.validate(config, schema.root).map_err(|e| {
            // the root error only names the schema; its causes carry the locations
            let located = |err: &boon::ValidationError| {
                ValidationError::new(err.instance_location.to_string(), err.kind.to_string())
            };
            let errors = if e.causes.is_empty() {
                vec![located(&e)]
            } else {
                e.causes.iter().map(located).collect()
            };
            ValidationResult::failure(errors)
        })
    })
}

/// Parses `json_str` and validates it; unparsable input is one root-level error.
///
/// # Example
///
/// ```
/// use flagd_admin::engine::validate_flags_config;
///
/// let config = r#"{
///     "flags": {
///         "myFlag": {
///             "state": "ENABLED",
///             "variants": {"on": true, "off": false},
///             "defaultVariant": "on"
///         }
///     }
/// }"#;
///
/// assert!(validate_flags_config(config).is_ok());
/// ```
pub fn validate_flags_config(json_str: &str) -> Result<(), ValidationResult> {
    let config: Value = serde_json::from_str(json_str).map_err(|e| {
        ValidationResult::failure(vec![ValidationError::new("", format!("Invalid JSON: {}", e))])
    })?;
    validate_config_value(&config)
}
