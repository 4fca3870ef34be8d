use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::skill::Skill;
use quill_core::{QuillError, Result};

/// Current on-disk document version.
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    skills: Vec<Skill>,
    #[serde(default = "default_store_version")]
    version: u32,
}

fn default_store_version() -> u32 {
    STORE_VERSION
}

#[derive(Serialize)]
struct StoreDocumentRef<'a> {
    skills: Vec<&'a Skill>,
    version: u32,
}

/// The registry's durable copy: one JSON document rewritten on every mutation.
#[derive(Debug, Clone)]
pub struct SkillStore {
    path: PathBuf,
}

impl SkillStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored skill. A missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<Skill>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "skill store does not exist yet");
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let doc: StoreDocument = serde_json::from_str(&content).map_err(|e| {
            QuillError::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        if doc.version > STORE_VERSION {
            return Err(QuillError::Storage(format!(
                "{} has version {}, newest supported is {STORE_VERSION}",
                self.path.display(),
                doc.version
            )));
        }

        info!(path = ?self.path, count = doc.skills.len(), "loaded skills from disk");
        Ok(doc.skills)
    }

    /// Replace the stored document. Writes a sibling temp file then renames
    /// it over the target so readers never see a half-written file.
    pub fn save<'a>(&self, skills: impl IntoIterator<Item = &'a Skill>) -> Result<()> {
        let doc = StoreDocumentRef {
            skills: skills.into_iter().collect(),
            version: STORE_VERSION,
        };
        let content = serde_json::to_string_pretty(&doc)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            QuillError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(path = ?self.path, "skill store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{PromptSkill, SkillDefinition};

    fn skill(id: &str) -> Skill {
        Skill::new(
            id,
            id.to_uppercase(),
            "test skill",
            SkillDefinition::Prompt(PromptSkill {
                template: "{{text}}".into(),
                parameters: vec![],
                system_prompt: None,
                model: None,
            }),
        )
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SkillStore::new(dir.path().join("skills.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SkillStore::new(dir.path().join("nested").join("skills.json"));
        let skills = vec![skill("a"), skill("b")];
        store.save(&skills).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["skills"][0]["definition"]["type"], "prompt");

        let loaded = store.load().unwrap();
        assert_eq!(loaded, skills);
        assert!(!dir.path().join("nested").join("skills.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SkillStore::new(&path).load().unwrap_err();
        assert!(matches!(err, QuillError::Storage(_)));
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.json");
        std::fs::write(&path, r#"{ "skills": [], "version": 7 }"#).unwrap();
        assert!(SkillStore::new(&path).load().is_err());
    }
}
