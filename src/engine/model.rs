//! Typed view of a flagd configuration as the evaluation engine loads it.
//!
//! See the [flagd flag definitions](https://flagd.dev/reference/flag-definitions/).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// A feature flag as loaded by the engine.
///
/// Unlike [`crate::codec::FlagEntry`], this is strict about types: `state` is
/// required and every field present must have the right JSON type. A flag
/// without `variants` loads with none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    /// The key of the feature flag, taken from its position in `flags`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// `ENABLED` or `DISABLED`; the schema enforces the values
    pub state: String,

    /// The variant served when no targeting rule matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<String>,

    #[serde(default)]
    pub variants: HashMap<String, Value>,

    /// `$ref`s already resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeting: Option<Value>,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// A fully loaded flagd configuration.
#[derive(Debug, Clone, Default)]
pub struct ParsingResult {
    pub flags: HashMap<String, FeatureFlag>,

    /// Top-level `metadata` of the flag set
    pub flag_set_metadata: HashMap<String, Value>,
}

impl ParsingResult {
    /// Parses a flagd JSON configuration.
    ///
    /// Fails if the text is not JSON, `flags` is missing or not an object, a
    /// flag does not deserialize, or a `$ref` in a targeting rule cannot be
    /// resolved against `$evaluators`.
    ///
    /// # Example
    ///
    /// ```
    /// use flagd_admin::engine::ParsingResult;
    ///
    /// let config = r#"{
    ///     "flags": {
    ///         "myFlag": {
    ///             "state": "ENABLED",
    ///             "defaultVariant": "on",
    ///             "variants": {"on": true, "off": false}
    ///         }
    ///     }
    /// }"#;
    ///
    /// let result = ParsingResult::parse(config).unwrap();
    /// assert_eq!(result.flags.len(), 1);
    /// ```
    pub fn parse(json_str: &str) -> Result<Self, String> {
        let config: Value =
            serde_json::from_str(json_str).map_err(|e| format!("Failed to parse JSON: {}", e))?;
        Self::from_value(&config)
    }

    /// Same as [`ParsingResult::parse`] for an already-parsed document.
    pub fn from_value(config: &Value) -> Result<Self, String> {
        let evaluators = config
            .get("$evaluators")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let flags_obj = config
            .get("flags")
            .ok_or_else(|| "configuration has no 'flags' object".to_string())?
            .as_object()
            .ok_or_else(|| "'flags' is not an object".to_string())?;

        let mut flags = HashMap::with_capacity(flags_obj.len());
        for (flag_key, flag_value) in flags_obj {
            let mut flag: FeatureFlag = serde_json::from_value(flag_value.clone())
                .map_err(|e| format!("Failed to parse flag '{}': {}", flag_key, e))?;
            flag.key = Some(flag_key.clone());

            if let Some(targeting) = flag.targeting.take() {
                let mut visiting = HashSet::new();
                let resolved = resolve_refs(&targeting, &evaluators, &mut visiting)
                    .map_err(|e| format!("Failed to resolve $ref in flag '{}': {}", flag_key, e))?;
                flag.targeting = Some(resolved);
            }

            flags.insert(flag_key.clone(), flag);
        }

        let flag_set_metadata = config
            .get("metadata")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Ok(ParsingResult {
            flags,
            flag_set_metadata,
        })
    }
}

/// Replaces every `{"$ref": "name"}` object with the named evaluator.
fn resolve_refs(
    value: &Value,
    evaluators: &Map<String, Value>,
    visiting: &mut HashSet<String>,
) -> Result<Value, String> {
    match value {
        Value::Object(obj) => {
            if let (1, Some(Value::String(name))) = (obj.len(), obj.get("$ref")) {
                if !visiting.insert(name.clone()) {
                    return Err(format!("Circular reference detected in evaluator: {}", name));
                }
                let evaluator = evaluators
                    .get(name)
                    .ok_or_else(|| format!("Evaluator '{}' not found in $evaluators", name))?;
                let resolved = resolve_refs(evaluator, evaluators, visiting)?;
                visiting.remove(name);
                return Ok(resolved);
            }

            let mut resolved = Map::with_capacity(obj.len());
            for (key, val) in obj {
                resolved.insert(key.clone(), resolve_refs(val, evaluators, visiting)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_refs(item, evaluators, visiting))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Ok(value.clone()),
    }
}
