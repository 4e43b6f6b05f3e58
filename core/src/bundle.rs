//! # Bundle Model
//!
//! In-memory form of one proxy bundle: an ordered list of named text
//! entries, `/`-separated like ZIP entry names. Opening the container
//! (archive file, exploded directory, management-API download) is the
//! caller's job; the resolver only consumes entries.

/// Directory prefix of policy documents inside a bundle.
pub const POLICIES_PREFIX: &str = "apiproxy/policies/";

/// Directory prefix of proxy-endpoint documents inside a bundle.
pub const PROXIES_PREFIX: &str = "apiproxy/proxies/";

const BUNDLE_PREFIX: &str = "apiproxy/";
const XML_SUFFIX: &str = ".xml";

/// One named text entry of a proxy bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path inside the bundle, e.g. `apiproxy/policies/ExtractOrder.xml`.
    pub name: String,
    /// Entry content decoded as text.
    pub text: String,
}

impl ArchiveEntry {
    /// Creates an entry from its path and text content.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// An ordered set of bundle entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyArchive {
    entries: Vec<ArchiveEntry>,
}

impl ProxyArchive {
    /// Wraps a list of entries, keeping their order.
    pub fn new(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Text of the first entry with the given path.
    pub fn entry(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.text.as_str())
    }

    /// Text of the proxy descriptor, `apiproxy/<name>.xml`.
    pub fn descriptor(&self, proxy_name: &str) -> Option<&str> {
        self.entry(&format!("{BUNDLE_PREFIX}{proxy_name}{XML_SUFFIX}"))
    }

    /// Name of the proxy this bundle describes, taken from the descriptor
    /// sitting directly under `apiproxy/`.
    pub fn infer_proxy_name(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| {
            let rest = entry.name.strip_prefix(BUNDLE_PREFIX)?;
            let stem = rest.strip_suffix(XML_SUFFIX)?;
            (!stem.is_empty() && !stem.contains('/')).then_some(stem)
        })
    }

    /// Policy documents, `(entry name, text)`, in archive order.
    pub fn policies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.with_prefix(POLICIES_PREFIX)
    }

    /// Proxy-endpoint documents, `(entry name, text)`, in archive order.
    pub fn proxy_endpoints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.with_prefix(PROXIES_PREFIX)
    }

    fn with_prefix(&self, prefix: &'static str) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(move |entry| {
                entry.name.starts_with(prefix) && entry.name.ends_with(XML_SUFFIX)
            })
            .map(|entry| (entry.name.as_str(), entry.text.as_str()))
    }
}
