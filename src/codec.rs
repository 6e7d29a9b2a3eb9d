//! Reading and editing single flag entries inside a configuration document.
//!
//! Documents are handled as `serde_json::Value` with key order preserved, so
//! an edit only ever touches the entry it targets. Everything else in the
//! document (sibling flags, `$schema`, `$evaluators`, `metadata`) is carried
//! through unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::DEFAULT_SCHEMA_URL;
use crate::error::StoreError;

/// The `targeting` part of a flag entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Targeting {
    /// Context attribute name to type hint, e.g. `{"email": "string"}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting_key: Option<IndexMap<String, String>>,

    /// Opaque rule, a string or a structured predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Value>,
}

/// One flag as read from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent only when the stored entry has no usable state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<IndexMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeting: Option<Targeting>,
}

/// The replacement definition for one flag.
///
/// # Example
///
/// ```
/// use flagd_admin::codec::FlagRequest;
/// use serde_json::json;
///
/// let request: FlagRequest = serde_json::from_value(json!({
///     "state": "ENABLED",
///     "name": "Dark mode",
///     "variants": {"on": true, "off": false},
///     "defaultVariant": "off"
/// }))
/// .unwrap();
/// assert_eq!(request.default_variant.as_deref(), Some("off"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRequest {
    pub state: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_variant: Option<String>,
    #[serde(default)]
    pub variants: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub targeting: Option<Targeting>,
}

impl FlagRequest {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default_variant(mut self, variant: impl Into<String>) -> Self {
        self.default_variant = Some(variant.into());
        self
    }

    pub fn with_variant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variants
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value);
        self
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = Some(targeting);
        self
    }

    /// Builds the stored form of this flag under `flag_id`.
    ///
    /// Blank strings and empty maps are left out entirely, never written as
    /// `null`.
    pub fn to_entry(&self, flag_id: &str) -> Value {
        let mut entry = Map::new();
        entry.insert("key".into(), Value::String(flag_id.to_string()));
        entry.insert("state".into(), Value::String(self.state.clone()));
        insert_text(&mut entry, "name", self.name.as_deref());
        insert_text(&mut entry, "description", self.description.as_deref());
        insert_text(&mut entry, "defaultVariant", self.default_variant.as_deref());

        if let Some(variants) = self.variants.as_ref().filter(|v| !v.is_empty()) {
            let variants = variants
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            entry.insert("variants".into(), Value::Object(variants));
        }

        if let Some(targeting) = &self.targeting {
            let mut node = Map::new();
            if let Some(keys) = targeting.targeting_key.as_ref().filter(|k| !k.is_empty()) {
                let keys = keys
                    .iter()
                    .map(|(attr, hint)| (attr.clone(), Value::String(hint.clone())))
                    .collect();
                node.insert("targetingKey".into(), Value::Object(keys));
            }
            match &targeting.rule {
                None | Some(Value::Null) => {}
                Some(Value::String(rule)) if rule.trim().is_empty() => {}
                Some(rule) => {
                    node.insert("rule".into(), rule.clone());
                }
            }
            entry.insert("targeting".into(), Value::Object(node));
        }

        Value::Object(entry)
    }
}

fn insert_text(entry: &mut Map<String, Value>, field: &str, value: Option<&str>) {
    if let Some(text) = value.filter(|t| !t.trim().is_empty()) {
        entry.insert(field.to_string(), Value::String(text.to_string()));
    }
}

/// Outcome of [`FlagCodec::delete_flag`].
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion {
    /// The flag was removed; holds the edited document
    Removed(Value),
    /// No such flag; holds the untouched document
    Absent(Value),
}

impl Deletion {
    pub fn is_removed(&self) -> bool {
        matches!(self, Deletion::Removed(_))
    }

    pub fn into_document(self) -> Value {
        match self {
            Deletion::Removed(doc) | Deletion::Absent(doc) => doc,
        }
    }
}

/// Parses raw document text.
pub fn parse_document(text: &str) -> Result<Value, StoreError> {
    serde_json::from_str(text).map_err(|e| {
        StoreError::malformed_document(format!("Failed to parse flag configuration: {}", e))
    })
}

/// Serializes a whole document, pretty-printed, in its current key order.
pub fn render_document(document: &Value) -> Result<String, StoreError> {
    serde_json::to_string_pretty(document).map_err(|e| {
        StoreError::malformed_document(format!("Failed to serialize flag configuration: {}", e))
    })
}

/// Scalar JSON as text; `null` and containers have no text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads one stored entry. Entries without a `key` are unparsable.
fn parse_entry(node: &Value) -> Option<FlagEntry> {
    let field = |name: &str| node.get(name).and_then(as_text);
    let key = field("key")?;

    let variants = node.get("variants").and_then(Value::as_object).map(|v| {
        v.iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    });

    let targeting = node
        .get("targeting")
        .and_then(Value::as_object)
        .map(|t| Targeting {
            targeting_key: t.get("targetingKey").and_then(Value::as_object).map(|keys| {
                keys.iter()
                    .filter_map(|(attr, hint)| as_text(hint).map(|h| (attr.clone(), h)))
                    .collect()
            }),
            rule: t.get("rule").filter(|r| !r.is_null()).cloned(),
        });

    Some(FlagEntry {
        key,
        name: field("name"),
        description: field("description"),
        state: field("state"),
        default_variant: field("defaultVariant"),
        variants,
        targeting,
    })
}

fn flags_of(document: &Value) -> Option<&Map<String, Value>> {
    document.get("flags").and_then(Value::as_object)
}

/// Reads and edits the `flags` collection of a document.
#[derive(Debug, Clone)]
pub struct FlagCodec {
    schema_url: String,
}

impl FlagCodec {
    /// `schema_url` tags documents the codec has to create from scratch.
    pub fn new(schema_url: impl Into<String>) -> Self {
        Self {
            schema_url: schema_url.into(),
        }
    }

    /// All readable flags, in document order.
    ///
    /// Entries without a `key` are skipped rather than reported.
    pub fn list_flags(&self, document: &Value) -> Vec<FlagEntry> {
        flags_of(document)
            .map(|flags| flags.values().filter_map(parse_entry).collect())
            .unwrap_or_default()
    }

    /// The flag stored under `flag_id`, if present and readable.
    pub fn get_flag(&self, document: &Value, flag_id: &str) -> Option<FlagEntry> {
        flags_of(document)?.get(flag_id).and_then(parse_entry)
    }

    /// Replaces the entry at `flag_id` with one built from `request`.
    ///
    /// An existing key keeps its position; a new key is appended. A document
    /// without a `flags` object gets one, plus a `$schema` tag if it has
    /// none. A non-object document is replaced by a fresh one.
    pub fn upsert_flag(&self, document: Value, flag_id: &str, request: &FlagRequest) -> Value {
        let mut root = match document {
            Value::Object(root) => root,
            _ => Map::new(),
        };
        let entry = request.to_entry(flag_id);

        match root.get_mut("flags").and_then(Value::as_object_mut) {
            Some(flags) => {
                flags.insert(flag_id.to_string(), entry);
            }
            None => {
                if !root.contains_key("$schema") {
                    root.insert("$schema".into(), Value::String(self.schema_url.clone()));
                }
                let mut flags = Map::new();
                flags.insert(flag_id.to_string(), entry);
                root.insert("flags".into(), Value::Object(flags));
            }
        }

        Value::Object(root)
    }

    /// Removes the entry at `flag_id`, keeping the order of the others.
    pub fn delete_flag(&self, mut document: Value, flag_id: &str) -> Deletion {
        let removed = document
            .get_mut("flags")
            .and_then(Value::as_object_mut)
            .and_then(|flags| flags.shift_remove(flag_id))
            .is_some();

        if removed {
            Deletion::Removed(document)
        } else {
            Deletion::Absent(document)
        }
    }
}

impl Default for FlagCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_URL)
    }
}
