use crate::identity::Fdn;
use serde::{Deserialize, Serialize};

/// Descriptor of a unit of work's data shape
///
/// Producers and subscribers are matched on manifests. `intended_target_system`
/// optionally names the subsystem a payload is explicitly addressed to; empty
/// or the wildcard marker means "any subscriber".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataManifest {
    /// Content type, e.g. `[resource=Patient][format=json]`
    pub content_type: Fdn,
    /// Content version; the wildcard marker matches any version
    pub content_version: String,
    #[serde(default)]
    pub intended_target_system: Option<String>,
    #[serde(default)]
    pub source_system: Option<String>,
}

impl DataManifest {
    pub fn new(content_type: Fdn, content_version: impl Into<String>) -> Self {
        Self {
            content_type,
            content_version: content_version.into(),
            intended_target_system: None,
            source_system: None,
        }
    }

    pub fn with_intended_target(mut self, target: impl Into<String>) -> Self {
        self.intended_target_system = Some(target.into());
        self
    }

    pub fn with_source_system(mut self, source: impl Into<String>) -> Self {
        self.source_system = Some(source.into());
        self
    }

    /// The intended target when it is set, non-empty and not `wildcard`
    pub fn explicit_target<'a>(&'a self, wildcard: &str) -> Option<&'a str> {
        self.intended_target_system
            .as_deref()
            .filter(|target| !target.is_empty() && *target != wildcard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> DataManifest {
        DataManifest::new(Fdn::new("resource", "Patient").unwrap(), "4.0.1")
    }

    #[test]
    fn test_explicit_target_ignores_empty_and_wildcard() {
        assert_eq!(manifest().explicit_target("*"), None);
        assert_eq!(manifest().with_intended_target("").explicit_target("*"), None);
        assert_eq!(manifest().with_intended_target("*").explicit_target("*"), None);
        assert_eq!(
            manifest().with_intended_target("Lab").explicit_target("*"),
            Some("Lab")
        );
    }
}
