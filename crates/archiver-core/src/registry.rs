//! Artifact type table.
//!
//! Each type is a name plus the subdirectory of the working tree its tool
//! writes to. The archiver walks the table in order, so adding a type is a
//! data change.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A kind of build output the archiver knows how to collect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactType {
    /// Key used in the per-type config file.
    pub name: String,

    /// Output directory relative to the working tree.
    pub default_dir: PathBuf,
}

impl ArtifactType {
    pub fn new(name: impl Into<String>, default_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            default_dir: default_dir.into(),
        }
    }
}

/// Ordered set of artifact types, unique by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRegistry {
    types: Vec<ArtifactType>,
}

impl ArtifactRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self { types: Vec::new() }
    }

    /// Coverage (rcov) and metrics (metric_fu) output.
    pub fn builtin() -> Self {
        Self::empty()
            .with(ArtifactType::new("rcov", "coverage"))
            .with(ArtifactType::new("metric_fu", "tmp/metric_fu"))
    }

    /// Add a type. A type with the same name is replaced in place.
    pub fn register(&mut self, artifact: ArtifactType) {
        match self.types.iter_mut().find(|t| t.name == artifact.name) {
            Some(existing) => *existing = artifact,
            None => self.types.push(artifact),
        }
    }

    pub fn with(mut self, artifact: ArtifactType) -> Self {
        self.register(artifact);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArtifactType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ArtifactRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_is_rcov_then_metric_fu() {
        let names: Vec<_> = ArtifactRegistry::builtin()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(names, vec!["rcov", "metric_fu"]);
    }

    #[test]
    fn builtin_default_dirs() {
        let registry = ArtifactRegistry::builtin();
        assert_eq!(registry.get("rcov").unwrap().default_dir, PathBuf::from("coverage"));
        assert_eq!(
            registry.get("metric_fu").unwrap().default_dir,
            PathBuf::from("tmp/metric_fu")
        );
    }

    #[test]
    fn register_appends_new_types() {
        let registry = ArtifactRegistry::builtin().with(ArtifactType::new("flog", "tmp/flog"));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.iter().last().unwrap().name, "flog");
    }

    #[test]
    fn register_replaces_same_name_in_place() {
        let registry = ArtifactRegistry::builtin().with(ArtifactType::new("rcov", "tmp/rcov"));
        assert_eq!(registry.len(), 2);
        let first = registry.iter().next().unwrap();
        assert_eq!(first.name, "rcov");
        assert_eq!(first.default_dir, PathBuf::from("tmp/rcov"));
    }

    #[test]
    fn empty_registry() {
        let registry = ArtifactRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.get("rcov").is_none());
    }
}
