//! Content-Type Resolver - extension to MIME mapping

use std::collections::HashMap;
use std::path::Path;

use crate::error::{AssetError, Result};

const DEFAULT_MIME_TYPES: &[(&str, &str)] = &[
    (".js", "application/javascript"),
    (".css", "text/css"),
    (".html", "text/html"),
    (".json", "application/json"),
    (".txt", "text/plain"),
    (".xml", "application/xml"),
    (".svg", "image/svg+xml"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".ico", "image/vnd.microsoft.icon"),
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
];

/// Normalize an extension to its dotted, lowercase form (`"JS"` -> `".js"`).
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim_start_matches('.');
    format!(".{}", trimmed.to_ascii_lowercase())
}

#[derive(Debug, Clone)]
pub struct ContentTypes {
    mime_types: HashMap<String, String>,
}

impl ContentTypes {
    /// An empty resolver with no mappings at all.
    pub fn empty() -> Self {
        Self { mime_types: HashMap::new() }
    }

    /// Register or override a mapping.
    pub fn register(&mut self, extension: &str, mime_type: impl Into<String>) {
        self.mime_types
            .insert(normalize_extension(extension), mime_type.into());
    }

    pub fn get(&self, extension: &str) -> Option<&str> {
        self.mime_types
            .get(&normalize_extension(extension))
            .map(String::as_str)
    }

    /// Resolve the MIME type for `extension`, naming `pathname` on failure.
    pub fn lookup(&self, extension: Option<&str>, pathname: &Path) -> Result<&str> {
        extension
            .and_then(|ext| self.get(ext))
            .ok_or_else(|| AssetError::UnknownContentType {
                extension: extension.unwrap_or_default().to_string(),
                pathname: pathname.to_path_buf(),
            })
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        let mut types = Self::empty();
        for (extension, mime_type) in DEFAULT_MIME_TYPES {
            types.register(extension, *mime_type);
        }
        types
    }
}
