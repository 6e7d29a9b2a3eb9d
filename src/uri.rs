//! Location strings for configuration documents.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::StoreError;

/// Schemes that require the `scheme://` form.
const HIERARCHICAL_SCHEMES: &[&str] = &["file", "mem"];

/// A parsed, immutable document location such as `file:///etc/flagd/flags.json`.
///
/// # Example
///
/// ```
/// use flagd_admin::DocumentUri;
///
/// let uri = DocumentUri::parse("FILE://config/flags.json").unwrap();
/// assert_eq!(uri.scheme(), "file");
/// assert_eq!(uri.payload(), "config/flags.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentUri {
    raw: String,
    scheme: String,
    payload: String,
}

impl DocumentUri {
    /// Parses and validates a location string.
    ///
    /// Leading and trailing whitespace is ignored. The scheme is everything
    /// before the first `:` and is lowercased.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let raw = raw.trim();
        let colon = match raw.find(':') {
            Some(idx) if idx > 0 => idx,
            _ => {
                return Err(StoreError::invalid_uri(format!(
                    "Invalid URI format: {}",
                    raw
                )))
            }
        };

        let scheme = raw[..colon].to_ascii_lowercase();
        let rest = &raw[colon + 1..];
        let payload = match rest.strip_prefix("//") {
            Some(payload) => payload,
            None if HIERARCHICAL_SCHEMES.contains(&scheme.as_str()) => {
                return Err(StoreError::invalid_uri(format!(
                    "Source uri must start with {}://: {}",
                    scheme, raw
                )))
            }
            None => rest,
        };

        if payload.is_empty() {
            return Err(StoreError::invalid_uri(format!(
                "Source uri has an empty location: {}",
                raw
            )));
        }
        if scheme == "file" && payload.contains('\0') {
            return Err(StoreError::invalid_uri(format!(
                "Source uri is not a valid file path: {}",
                raw
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            payload: payload.to_string(),
            scheme,
        })
    }

    /// The lowercase scheme, e.g. `file`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after the scheme prefix.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The trimmed location string this URI was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The payload interpreted as a filesystem path.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.payload)
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DocumentUri {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DocumentUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DocumentUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|e| serde::de::Error::custom(e.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn test_absolute_file_uri() {
        let uri = DocumentUri::parse("file:///var/lib/flagd/flags.json").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert_eq!(uri.payload(), "/var/lib/flagd/flags.json");
        assert_eq!(uri.to_path(), PathBuf::from("/var/lib/flagd/flags.json"));
    }

    #[test]
    fn test_relative_file_uri() {
        let uri = DocumentUri::parse("file://flags/dev.json").unwrap();
        assert_eq!(uri.to_path(), PathBuf::from("flags/dev.json"));
    }

    #[test]
    fn test_trims_and_lowercases() {
        let uri = DocumentUri::parse("  File://a.json \n").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert_eq!(uri.as_str(), "File://a.json");
        assert_eq!(uri.to_string(), "File://a.json");
    }

    #[test]
    fn test_missing_colon() {
        let err = DocumentUri::parse("/etc/flags.json").unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidUri);
    }

    #[test]
    fn test_leading_colon() {
        assert!(DocumentUri::parse(":foo").is_err());
    }

    #[test]
    fn test_file_requires_slashes() {
        let err = DocumentUri::parse("file:flags.json").unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidUri);
    }

    #[test]
    fn test_empty_payload() {
        assert!(DocumentUri::parse("file://").is_err());
        assert!(DocumentUri::parse("s3:").is_err());
    }

    #[test]
    fn test_unknown_scheme_parses() {
        let uri = DocumentUri::parse("s3://bucket/flags.json").unwrap();
        assert_eq!(uri.scheme(), "s3");
        assert_eq!(uri.payload(), "bucket/flags.json");

        let opaque = DocumentUri::parse("urn:flags:prod").unwrap();
        assert_eq!(opaque.scheme(), "urn");
        assert_eq!(opaque.payload(), "flags:prod");
    }

    #[test]
    fn test_from_str_and_serde() {
        let uri: DocumentUri = "mem://demo".parse().unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, r#""mem://demo""#);

        let back: DocumentUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
        assert!(serde_json::from_str::<DocumentUri>(r#""nope""#).is_err());
    }
}
