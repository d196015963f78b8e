use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Extension to content-type mapping used when serving files.
///
/// Overrides are keyed by extension including the leading dot and take
/// precedence over the built-in `mime_guess` table. The table is built once
/// before the listener starts and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    overrides: HashMap<String, String>,
}

impl MimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the overrides a web/WASM build needs.
    pub fn for_web_builds() -> Self {
        Self::new()
            .with_override(".html", "text/html")
            .with_override(".wasm", "application/wasm")
    }

    /// Adds an override; a later entry for the same extension replaces an earlier one.
    pub fn with_override(mut self, extension: &str, content_type: &str) -> Self {
        let key = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };
        self.overrides.insert(key, content_type.to_string());
        self
    }

    pub fn content_type(&self, path: &Path) -> &str {
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            return DEFAULT_CONTENT_TYPE;
        };

        let dotted = format!(".{}", ext);
        if let Some(mime) = self.overrides.get(&dotted) {
            return mime;
        }
        if let Some(mime) = self.overrides.get(&dotted.to_lowercase()) {
            return mime;
        }

        mime_guess::from_ext(ext)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}
