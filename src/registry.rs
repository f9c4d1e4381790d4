//! The branch registry: the small persisted document mapping registered
//! branch triples (§4.3). Field names on the wire (`Url`, `Bzr`, `Git`) are
//! fixed by the on-disk format (§6) for compatibility with existing
//! repositories and are not renamed here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, IoResultExt, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchRecord {
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Bzr")]
    pub source_name: String,
    #[serde(rename = "Git")]
    pub target_name: String,
}

#[derive(Debug, Clone)]
pub struct BranchRegistry {
    branches: Vec<BranchRecord>,
    by_source_name: HashMap<String, usize>,
    by_target_name: HashMap<String, usize>,
}

impl BranchRegistry {
    fn from_records(branches: Vec<BranchRecord>) -> Result<Self> {
        let mut by_source_name = HashMap::with_capacity(branches.len());
        let mut by_target_name = HashMap::with_capacity(branches.len());

        for (i, b) in branches.iter().enumerate() {
            if b.url.is_empty() {
                return Err(EngineError::Config(format!("entry {i}: empty url")));
            }
            if b.source_name.is_empty() {
                return Err(EngineError::Config(format!("entry {i}: empty source branch name")));
            }
            if b.target_name.is_empty() {
                return Err(EngineError::Config(format!("entry {i}: empty target branch name")));
            }
            if by_source_name.insert(b.source_name.clone(), i).is_some() {
                return Err(EngineError::Config(format!(
                    "entry {i}: duplicate source branch name {:?}",
                    b.source_name
                )));
            }
            if by_target_name.insert(b.target_name.clone(), i).is_some() {
                return Err(EngineError::Config(format!(
                    "entry {i}: duplicate target branch name {:?}",
                    b.target_name
                )));
            }
        }

        Ok(BranchRegistry {
            branches,
            by_source_name,
            by_target_name,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).io_ctx(path)?;
        let records: Vec<BranchRecord> =
            serde_json::from_str(&data).map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_records(records)
    }

    pub fn write_empty(path: &Path) -> Result<()> {
        fs::write(path, b"[]").io_ctx(path)
    }

    pub fn branches(&self) -> &[BranchRecord] {
        &self.branches
    }

    pub fn by_source_name(&self, name: &str) -> Option<&BranchRecord> {
        self.by_source_name.get(name).map(|&i| &self.branches[i])
    }

    pub fn by_target_name(&self, name: &str) -> Option<&BranchRecord> {
        self.by_target_name.get(name).map(|&i| &self.branches[i])
    }

    /// Reads, extends, and writes back the whole file (§4.3: mutation is
    /// append-only from the engine's perspective, there is no locking).
    pub fn add(path: &Path, record: BranchRecord) -> Result<()> {
        let mut registry = Self::load(path)?;
        if registry.by_source_name.contains_key(&record.source_name) {
            return Err(EngineError::PolicyReject(format!(
                "source branch name {:?} already registered",
                record.source_name
            )));
        }
        if registry.by_target_name.contains_key(&record.target_name) {
            return Err(EngineError::PolicyReject(format!(
                "target branch name {:?} already registered",
                record.target_name
            )));
        }
        registry.by_source_name.insert(record.source_name.clone(), registry.branches.len());
        registry.by_target_name.insert(record.target_name.clone(), registry.branches.len());
        registry.branches.push(record);
        registry.persist(path)
    }

    fn persist(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.branches)
            .map_err(|e| EngineError::Config(format!("serializing registry: {e}")))?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data).io_ctx(&tmp_path)?;
        fs::rename(&tmp_path, path).io_ctx(path)
    }

    /// Branches sorted by target name (§6: `branches` listing sort order).
    pub fn sorted_by_target_name(&self) -> Vec<&BranchRecord> {
        let mut v: Vec<&BranchRecord> = self.branches.iter().collect();
        v.sort_by(|a, b| a.target_name.cmp(&b.target_name));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(url: &str, source: &str, target: &str) -> BranchRecord {
        BranchRecord {
            url: url.to_string(),
            source_name: source.to_string(),
            target_name: target.to_string(),
        }
    }

    #[test]
    fn empty_registry_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.cfg");
        BranchRegistry::write_empty(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");

        let registry = BranchRegistry::load(&path).unwrap();
        assert!(registry.branches().is_empty());
    }

    #[test]
    fn add_appends_and_persists_with_expected_field_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.cfg");
        BranchRegistry::write_empty(&path).unwrap();

        BranchRegistry::add(&path, record("https://example/src", "bzr/foo", "foo")).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        assert!(data.contains("\"Url\": \"https://example/src\""));
        assert!(data.contains("\"Bzr\": \"bzr/foo\""));
        assert!(data.contains("\"Git\": \"foo\""));

        let registry = BranchRegistry::load(&path).unwrap();
        assert_eq!(registry.branches().len(), 1);
        assert!(registry.by_source_name("bzr/foo").is_some());
        assert!(registry.by_target_name("foo").is_some());
    }

    #[test]
    fn add_rejects_clashing_target_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.cfg");
        BranchRegistry::write_empty(&path).unwrap();
        BranchRegistry::add(&path, record("https://example/src", "bzr/foo", "foo")).unwrap();

        let err = BranchRegistry::add(&path, record("https://example/other", "bzr/bar", "foo")).unwrap_err();
        assert!(matches!(err, EngineError::PolicyReject(_)));

        // Unchanged on rejection.
        let registry = BranchRegistry::load(&path).unwrap();
        assert_eq!(registry.branches().len(), 1);
    }

    #[test]
    fn load_rejects_duplicate_source_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.cfg");
        fs::write(
            &path,
            r#"[{"Url":"u1","Bzr":"dup","Git":"g1"},{"Url":"u2","Bzr":"dup","Git":"g2"}]"#,
        )
        .unwrap();

        let err = BranchRegistry::load(&path).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn load_rejects_empty_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.cfg");
        fs::write(&path, r#"[{"Url":"","Bzr":"b","Git":"g"}]"#).unwrap();

        let err = BranchRegistry::load(&path).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn sorted_by_target_name_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.cfg");
        BranchRegistry::write_empty(&path).unwrap();
        BranchRegistry::add(&path, record("u1", "s-zeta", "zeta")).unwrap();
        BranchRegistry::add(&path, record("u2", "s-alpha", "alpha")).unwrap();

        let registry = BranchRegistry::load(&path).unwrap();
        let sorted = registry.sorted_by_target_name();
        assert_eq!(sorted[0].target_name, "alpha");
        assert_eq!(sorted[1].target_name, "zeta");
    }
}
