use semver::Version;
use serde::{Deserialize, Serialize};

/// Identity and metadata of a tool plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl PluginManifest {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: "1.0.0".to_string(),
            description: description.to_string(),
            author: None,
        }
    }

    /// Get the semver version.
    pub fn semver(&self) -> Option<Version> {
        Version::parse(&self.version).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_parses_valid_version() {
        let m = PluginManifest::new("p", "P", "test");
        assert_eq!(m.semver(), Some(Version::new(1, 0, 0)));
    }

    #[test]
    fn semver_rejects_garbage() {
        let mut m = PluginManifest::new("p", "P", "test");
        m.version = "latest".into();
        assert!(m.semver().is_none());
    }
}
