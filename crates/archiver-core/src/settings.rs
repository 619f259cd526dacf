//! Process-wide archiver defaults, loaded once at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ArchiveError, Result};

/// Defaults shared by every delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverSettings {
    /// Base directory holding project working trees.
    pub export_directory: PathBuf,

    /// Archive root used when a project configures none, or a missing one.
    pub artifact_root: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    export_directory: PathBuf,
    #[serde(default)]
    artifact_root: Option<PathBuf>,
}

impl ArchiverSettings {
    pub fn new(export_directory: impl Into<PathBuf>, artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            export_directory: export_directory.into(),
            artifact_root: artifact_root.into(),
        }
    }

    /// Settings with the artifact root derived from the export directory:
    /// a `public/artifacts` directory next to it.
    pub fn from_export_directory(export_directory: impl Into<PathBuf>) -> Self {
        let export_directory = export_directory.into();
        let artifact_root = default_artifact_root(&export_directory);
        Self {
            export_directory,
            artifact_root,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(content)?;
        Ok(match raw.artifact_root {
            Some(root) => Self::new(raw.export_directory, root),
            None => Self::from_export_directory(raw.export_directory),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ArchiveError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

fn default_artifact_root(export_directory: &Path) -> PathBuf {
    let base = match export_directory.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => export_directory,
    };
    base.join("public").join("artifacts")
}
