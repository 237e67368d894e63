use serde::{Deserialize, Serialize};

/// A single object in the remote store.
///
/// Identity is `id`; `name` is whatever the uploader chose and is NOT
/// guaranteed unique within a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    pub mime: String,
    /// Size in bytes, when the store reports it.
    #[serde(default)]
    pub size: Option<u64>,
    /// Hex SHA-256 digest, when the store reports one.
    #[serde(default)]
    pub checksum: Option<String>,
}

/// MIME/extension predicate restricting which objects a pipeline
/// considers.
///
/// The MIME type scopes remote listing queries; the extension guards
/// local filenames. Both pipelines supply their own filter, so nothing
/// downstream is hardcoded to a media type.
#[derive(Debug, Clone)]
pub struct TypeFilter {
    mime: String,
    extension: String,
}

impl TypeFilter {
    /// Creates a filter from a MIME type and a filename extension.
    ///
    /// The extension is normalized to lowercase with a leading dot.
    pub fn new(mime: &str, extension: &str) -> Self {
        let ext = extension.trim().to_ascii_lowercase();
        let extension = if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        };
        Self {
            mime: mime.to_string(),
            extension,
        }
    }

    /// Filter for MP4 video.
    pub fn mp4() -> Self {
        Self::new("video/mp4", ".mp4")
    }

    /// Filter for PNG images.
    pub fn png() -> Self {
        Self::new("image/png", ".png")
    }

    /// MIME type used in listing queries.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Normalized extension, including the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns `true` if `name` carries the expected extension
    /// (ASCII-case-insensitive).
    pub fn matches_name(&self, name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(&self.extension)
    }
}
