use std::fs;
use std::path::{Path, PathBuf};

use super::{default_document, Content, ContentBackend, DEFAULT_SCHEMA_URL};
use crate::error::StoreError;
use crate::uri::DocumentUri;

/// Stores each document as a plain file at the path of a `file://` URI.
///
/// Writes go straight to the target file; there is no temp-file and rename
/// step, so a crash mid-write can leave a truncated document.
#[derive(Debug, Clone)]
pub struct FileBackend {
    schema_url: String,
}

impl FileBackend {
    pub const SCHEME: &'static str = "file";

    pub fn new() -> Self {
        Self::with_schema_url(DEFAULT_SCHEMA_URL)
    }

    /// Uses `schema_url` as the `$schema` tag of generated default documents.
    pub fn with_schema_url(schema_url: impl Into<String>) -> Self {
        FileBackend {
            schema_url: schema_url.into(),
        }
    }

    fn path_of(&self, uri: &DocumentUri) -> Result<PathBuf, StoreError> {
        if !self.supports(uri.scheme()) {
            return Err(StoreError::invalid_uri(format!("Invalid file URI: {}", uri)));
        }
        Ok(uri.to_path())
    }
}

impl Default for FileBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl ContentBackend for FileBackend {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    fn load(&self, uri: &DocumentUri) -> Result<String, StoreError> {
        let path = self.path_of(uri)?;
        if !path.exists() {
            return Err(StoreError::not_found(format!(
                "File not found: {}",
                display(&path)
            )));
        }

        tracing::debug!(path = %path.display(), "Reading configuration file");
        fs::read_to_string(&path).map_err(|e| StoreError::from_io(&e, "reading", &display(&path)))
    }

    fn save(&self, uri: &DocumentUri, content: Content<'_>) -> Result<(), StoreError> {
        let path = self.path_of(uri)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                tracing::debug!(dir = %parent.display(), "Creating parent directories");
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::from_io(&e, "creating directory for", &display(&path)))?;
            }
        }

        let text = match content {
            Content::Default => default_document(&self.schema_url),
            Content::Text(text) => text.to_string(),
        };

        fs::write(&path, text).map_err(|e| StoreError::from_io(&e, "writing", &display(&path)))?;
        tracing::debug!(path = %path.display(), "Wrote configuration file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    fn file_uri(path: &Path) -> DocumentUri {
        DocumentUri::parse(&format!("file://{}", path.display())).unwrap()
    }

    #[test]
    fn test_load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, r#"{"flags": {}}"#).unwrap();

        let content = FileBackend::new().load(&file_uri(&path)).unwrap();
        assert_eq!(content, r#"{"flags": {}}"#);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileBackend::new()
            .load(&file_uri(&dir.path().join("missing.json")))
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert!(err.message.contains("missing.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_directory_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileBackend::new().load(&file_uri(dir.path())).unwrap_err();
        assert_eq!(err.error_type, ErrorType::AccessError);
        assert_eq!(err.code(), "SOURCE_CONTENT_ACCESS_ERROR");
        assert!(err
            .message
            .starts_with(&format!("Error reading file: {}: ", dir.path().display())));
    }

    #[test]
    fn test_permission_denied_maps_to_access_denied() {
        let path = Path::new("/etc/flagd/flags.json");
        let io_err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);

        let err = StoreError::from_io(&io_err, "reading", &display(path));
        assert_eq!(err.error_type, ErrorType::AccessDenied);
        assert_eq!(err.message, "Permission denied reading file: /etc/flagd/flags.json");
    }

    #[cfg(unix)]
    #[test]
    fn test_load_unreadable_file_is_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, r#"{"flags": {}}"#).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // root reads regardless of mode bits
        if fs::read(&path).is_ok() {
            return;
        }

        let err = FileBackend::new().load(&file_uri(&path)).unwrap_err();
        assert_eq!(err.error_type, ErrorType::AccessDenied);
        assert_eq!(
            err.message,
            format!("Permission denied reading file: {}", path.display())
        );

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/flags.json");

        FileBackend::new()
            .save(&file_uri(&path), Content::Text(r#"{"flags": {}}"#))
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"flags": {}}"#);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, "old").unwrap();

        FileBackend::new()
            .save(&file_uri(&path), Content::Text("new"))
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_save_default_and_empty_text_differ() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("default.json");
        let empty_path = dir.path().join("empty.json");
        let backend = FileBackend::with_schema_url("https://example.com/s.json");

        backend.save(&file_uri(&default_path), Content::Default).unwrap();
        backend.save(&file_uri(&empty_path), Content::Text("")).unwrap();

        assert_eq!(
            fs::read_to_string(&default_path).unwrap(),
            default_document("https://example.com/s.json")
        );
        assert_eq!(fs::read_to_string(&empty_path).unwrap(), "");
    }

    #[test]
    fn test_rejects_foreign_scheme() {
        let uri = DocumentUri::parse("mem://flags").unwrap();
        let err = FileBackend::new().load(&uri).unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidUri);
    }
}
