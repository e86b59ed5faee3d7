//! Access attributes read from filesystem extended attributes.

use std::collections::HashMap;
use std::path::Path;

/// Value used when an attribute cannot be read.
pub const UNKNOWN: &str = "unknown";

pub const STATUS_ATTR: &str = "status";
pub const APPROVED_BY_ATTR: &str = "approved_by";

/// Access-control attributes of one document, copied onto each of its chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessAttributes {
    pub status: String,
    pub approved_by: String,
}

impl AccessAttributes {
    #[must_use]
    pub fn new(status: impl Into<String>, approved_by: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            approved_by: approved_by.into(),
        }
    }
}

impl Default for AccessAttributes {
    fn default() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

/// Source of per-file attributes. Reads never fail: any problem resolves to the default.
pub trait AttributeSource: Send + Sync {
    /// Read attribute `name` (without namespace prefix) of `path`.
    fn read(&self, path: &Path, name: &str, default: &str) -> String;

    fn access_attributes(&self, path: &Path) -> AccessAttributes {
        AccessAttributes {
            status: self.read(path, STATUS_ATTR, UNKNOWN),
            approved_by: self.read(path, APPROVED_BY_ATTR, UNKNOWN),
        }
    }
}

/// Reads `user.<name>` extended attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XattrReader;

impl AttributeSource for XattrReader {
    fn read(&self, path: &Path, name: &str, default: &str) -> String {
        let key = format!("user.{name}");
        match xattr::get(path, &key) {
            Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(None) => {
                tracing::debug!(path = %path.display(), attr = %key, "attribute not set");
                default.to_owned()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), attr = %key, "attribute read failed: {e}");
                default.to_owned()
            }
        }
    }
}

/// Attributes keyed by file name, for filesystems without xattr support and for tests.
#[derive(Debug, Clone, Default)]
pub struct FixedAttributes {
    by_filename: HashMap<String, HashMap<String, String>>,
}

impl FixedAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, filename: &str, name: &str, value: &str) -> Self {
        self.by_filename
            .entry(filename.to_owned())
            .or_default()
            .insert(name.to_owned(), value.to_owned());
        self
    }

    /// Shorthand for setting both access attributes of a file.
    #[must_use]
    pub fn with_access(self, filename: &str, status: &str, approved_by: &str) -> Self {
        self.with(filename, STATUS_ATTR, status)
            .with(filename, APPROVED_BY_ATTR, approved_by)
    }
}

impl AttributeSource for FixedAttributes {
    fn read(&self, path: &Path, name: &str, default: &str) -> String {
        path.file_name()
            .and_then(|f| f.to_str())
            .and_then(|f| self.by_filename.get(f))
            .and_then(|attrs| attrs.get(name))
            .map_or_else(|| default.to_owned(), Clone::clone)
    }
}
