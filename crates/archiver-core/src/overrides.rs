//! Per-type overrides read from a project's artifact config file.
//!
//! The file is a YAML mapping from artifact type name to its settings:
//!
//! ```yaml
//! rcov:
//!   output_dir: rcov
//!   disabled: true
//! metric_fu:
//!   output_dir: tmp/metric_fu
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ArchiveError, Result};

/// Settings for one artifact type. Absent or empty keys keep the built-in
/// behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactOverride {
    /// Replaces the type's default directory, relative to the working tree.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Suppresses the type entirely.
    #[serde(default, deserialize_with = "null_as_false")]
    pub disabled: bool,
}

fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl ArtifactOverride {
    pub fn output_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: Some(dir.into()),
            disabled: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            output_dir: None,
            disabled: true,
        }
    }
}

/// Overrides keyed by artifact type name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OverrideSet {
    entries: BTreeMap<String, ArtifactOverride>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, entry: ArtifactOverride) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArtifactOverride> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Parse a YAML document. An empty document or `~` yields an empty set.
    /// A type key or setting with no value keeps the defaults.
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Option<BTreeMap<String, Option<ArtifactOverride>>> =
            serde_yaml::from_str(content)?;
        let entries = raw
            .unwrap_or_default()
            .into_iter()
            .map(|(name, entry)| (name, entry.unwrap_or_default()))
            .collect();
        Ok(Self { entries })
    }
}

/// Where the override set of a delivery came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum OverrideSource {
    /// No config file was configured.
    NotConfigured,
    /// A config file was configured but does not exist.
    Missing(PathBuf),
    /// The config file was read (it may still have been empty).
    Loaded(PathBuf),
}

/// Override set together with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedOverrides {
    pub source: OverrideSource,
    pub overrides: OverrideSet,
}

impl ResolvedOverrides {
    pub fn not_configured() -> Self {
        Self {
            source: OverrideSource::NotConfigured,
            overrides: OverrideSet::default(),
        }
    }

    pub fn missing(path: PathBuf) -> Self {
        Self {
            source: OverrideSource::Missing(path),
            overrides: OverrideSet::default(),
        }
    }

    pub fn loaded(path: PathBuf, overrides: OverrideSet) -> Self {
        Self {
            source: OverrideSource::Loaded(path),
            overrides,
        }
    }
}

/// Reads a per-type config file into an [`OverrideSet`].
pub trait ConfigParser: Send + Sync {
    /// Parse the file at `path`. Called only for files that exist.
    fn parse(&self, path: &Path) -> Result<OverrideSet>;
}

/// YAML config parser backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlConfigParser;

impl ConfigParser for YamlConfigParser {
    fn parse(&self, path: &Path) -> Result<OverrideSet> {
        let content = std::fs::read_to_string(path).map_err(|source| ArchiveError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        OverrideSet::from_yaml_str(&content).map_err(|source| ArchiveError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_output_dirs_and_disabled() {
        let yaml = "rcov:\n  output_dir: rcov\n  disabled: true\n\
                    metric_fu:\n  output_dir: tmp/metric_fu\n";
        let set = OverrideSet::from_yaml_str(yaml).unwrap();

        assert_eq!(set.len(), 2);
        let rcov = set.get("rcov").unwrap();
        assert!(rcov.disabled);
        assert_eq!(rcov.output_dir, Some(PathBuf::from("rcov")));

        let metric_fu = set.get("metric_fu").unwrap();
        assert!(!metric_fu.disabled);
        assert_eq!(metric_fu.output_dir, Some(PathBuf::from("tmp/metric_fu")));
    }

    #[test]
    fn empty_document_is_empty_set() {
        assert!(OverrideSet::from_yaml_str("").unwrap().is_empty());
        assert!(OverrideSet::from_yaml_str("  \n").unwrap().is_empty());
        assert!(OverrideSet::from_yaml_str("~").unwrap().is_empty());
    }

    #[test]
    fn type_without_settings_uses_defaults() {
        let set = OverrideSet::from_yaml_str("rcov:\n").unwrap();
        assert_eq!(set.get("rcov"), Some(&ArtifactOverride::default()));
    }

    #[test]
    fn settings_without_value_use_defaults() {
        let yaml = "rcov:\n  disabled:\nmetric_fu:\n  output_dir: ~\n";
        let set = OverrideSet::from_yaml_str(yaml).unwrap();
        assert_eq!(set.get("rcov"), Some(&ArtifactOverride::default()));
        assert_eq!(set.get("metric_fu"), Some(&ArtifactOverride::default()));
    }

    #[test]
    fn explicit_false_keeps_type_enabled() {
        let set = OverrideSet::from_yaml_str("rcov:\n  disabled: false\n").unwrap();
        assert!(!set.get("rcov").unwrap().disabled);
    }

    #[test]
    fn non_boolean_disabled_is_an_error() {
        assert!(OverrideSet::from_yaml_str("rcov:\n  disabled: [yes]\n").is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let set =
            OverrideSet::from_yaml_str("rcov:\n  output_dir: rcov\n  threshold: 90\n").unwrap();
        assert_eq!(set.get("rcov"), Some(&ArtifactOverride::output_dir("rcov")));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(OverrideSet::from_yaml_str("rcov: [output_dir").is_err());
    }

    #[test]
    fn non_mapping_document_is_an_error() {
        assert!(OverrideSet::from_yaml_str("- rcov\n- metric_fu\n").is_err());
        assert!(OverrideSet::from_yaml_str("rcov: coverage\n").is_err());
    }

    #[test]
    fn yaml_parser_reports_path_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.yml");
        std::fs::write(&path, "rcov: [output_dir").unwrap();

        match YamlConfigParser.parse(&path) {
            Err(ArchiveError::ConfigParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }

    #[test]
    fn yaml_parser_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.yml");
        std::fs::write(&path, "metric_fu:\n  disabled: true\n").unwrap();

        let set = YamlConfigParser.parse(&path).unwrap();
        assert_eq!(set.get("metric_fu"), Some(&ArtifactOverride::disabled()));
    }

    #[test]
    fn yaml_parser_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = YamlConfigParser.parse(dir.path());
        assert!(matches!(result, Err(ArchiveError::ConfigRead { .. })));
    }
}
