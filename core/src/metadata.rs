//! # Proxy Metadata
//!
//! Reads the bundle descriptor, `apiproxy/<name>.xml`, for the fields that
//! feed the document's `info` block.

use crate::error::{AppError, AppResult};
use crate::markup::XmlElement;

/// Descriptor fields surfaced in the assembled document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyMetadata {
    /// Human-readable proxy name; falls back to the technical name.
    pub display_name: Option<String>,
    /// Free-form proxy description.
    pub description: Option<String>,
    /// Bundle revision, kept as text exactly as exported.
    pub revision: Option<String>,
}

impl ProxyMetadata {
    /// Reads metadata off a parsed descriptor document.
    pub fn from_markup(root: &XmlElement) -> AppResult<Self> {
        if root.name() != "APIProxy" {
            return Err(AppError::Malformed(format!(
                "expected APIProxy root, found '{}'",
                root.name()
            )));
        }
        Ok(Self {
            display_name: root.child_text("DisplayName").map(str::to_string),
            description: root.child_text("Description").map(str::to_string),
            revision: root.attr("revision").map(str::to_string),
        })
    }
}
