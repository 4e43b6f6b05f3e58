//! # Conversion Diagnostics
//!
//! Non-fatal findings collected while a bundle is resolved. A unit that
//! cannot be interpreted (unreadable policy, endpoint without a base path,
//! unsupported verb) is skipped and recorded here instead of aborting the
//! conversion or writing to a log.

use std::fmt;

use serde::Serialize;

/// One non-fatal finding, tied to the archive entry that produced it when
/// one applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Archive entry the finding refers to, when known.
    pub entry: Option<String>,
    /// What was skipped or overridden, and why.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some(entry) => write!(f, "{}: {}", entry, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Ordered collection of the findings of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finding.
    pub fn warn(&mut self, entry: Option<&str>, message: impl Into<String>) {
        self.items.push(Diagnostic {
            entry: entry.map(str::to_string),
            message: message.into(),
        });
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Findings in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_and_without_entry() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Some("apiproxy/policies/Broken.xml"), "policy skipped");
        diagnostics.warn(None, "descriptor entry not found");
        let rendered: Vec<_> = diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "apiproxy/policies/Broken.xml: policy skipped",
                "descriptor entry not found",
            ]
        );
    }

    #[test]
    fn test_order_is_kept() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(None, "first");
        diagnostics.warn(None, "second");
        let messages: Vec<_> = diagnostics.into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
