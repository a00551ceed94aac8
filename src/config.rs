/// Per-section configuration store.
///
/// Sections are free-form JSON documents keyed by a human-readable
/// name. Each loaded section remembers the file it came from, so
/// `save` without an explicit filename writes back to the origin.
/// Loading never overwrites a section that is already present.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Default)]
pub struct ConfigStore {
    sections: HashMap<String, Value>,
    origins: HashMap<String, PathBuf>,
}

impl ConfigStore {
    pub fn new() -> Self {
        ConfigStore::default()
    }

    /// Parse a JSON file into the given section and record its origin.
    /// A section that already exists is left untouched.
    pub fn load(&mut self, path: &Path, section: &str) -> Result<()> {
        if self.sections.contains_key(section) {
            return Ok(());
        }
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        self.sections.insert(section.to_string(), value);
        self.origins.insert(section.to_string(), path.to_path_buf());
        Ok(())
    }

    /// Initialize an empty section (no origin).
    pub fn create(&mut self, section: &str) {
        self.sections
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.sections.get_mut(name)
    }

    pub fn origin(&self, name: &str) -> Option<&Path> {
        self.origins.get(name).map(PathBuf::as_path)
    }

    /// Write a section back to disk. Without an explicit filename the
    /// recorded origin is used; a section that was never loaded from a
    /// file must be given one.
    pub fn save(&self, section: &str, filename: Option<&Path>) -> Result<()> {
        let value = self
            .sections
            .get(section)
            .ok_or_else(|| Error::UnknownSection(section.to_string()))?;
        let path = match filename {
            Some(path) => path.to_path_buf(),
            None => self
                .origins
                .get(section)
                .cloned()
                .ok_or_else(|| Error::NoOriginFile(section.to_string()))?,
        };
        std::fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_records_origin_and_keeps_first_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controls.json");
        std::fs::write(&path, r#"{"up": "w", "down": "s"}"#).unwrap();

        let mut store = ConfigStore::new();
        store.load(&path, "controls").unwrap();
        assert_eq!(store.section("controls").unwrap()["up"], json!("w"));
        assert_eq!(store.origin("controls").unwrap(), path);

        // A second load into the same section is ignored.
        let other = dir.path().join("other.json");
        std::fs::write(&other, r#"{"up": "k"}"#).unwrap();
        store.load(&other, "controls").unwrap();
        assert_eq!(store.section("controls").unwrap()["up"], json!("w"));
    }

    #[test]
    fn save_falls_back_to_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.json");
        std::fs::write(&path, r#"{"volume": 3}"#).unwrap();

        let mut store = ConfigStore::new();
        store.load(&path, "main").unwrap();
        store.section_mut("main").unwrap()["volume"] = json!(7);
        store.save("main", None).unwrap();

        let mut reread = ConfigStore::new();
        reread.load(&path, "main").unwrap();
        assert_eq!(reread.section("main").unwrap()["volume"], json!(7));
    }

    #[test]
    fn created_sections_need_an_explicit_filename() {
        let mut store = ConfigStore::new();
        store.create("scores");
        store.section_mut("scores").unwrap()["best"] = json!(9000);
        assert_eq!(store.save("scores", None).unwrap_err().code(), "no_origin_file");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        store.save("scores", Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unknown_section_errors() {
        let store = ConfigStore::new();
        assert_eq!(store.save("nope", None).unwrap_err().code(), "unknown_section");
        assert!(store.section("nope").is_none());
    }
}
