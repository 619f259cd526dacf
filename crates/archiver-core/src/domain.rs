//! Build, commit and project data handed to the archiver by the notifier
//! dispatch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// Number of characters kept in a commit's short identifier.
pub const SHORT_IDENTIFIER_LEN: usize = 7;

/// Terminal state of a build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Succeeded,
    Failed,
}

impl BuildStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, BuildStatus::Succeeded)
    }
}

/// A project tracked by the CI server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub uri: String,
    pub branch: String,
}

impl Project {
    pub fn new(name: impl Into<String>, uri: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            branch: branch.into(),
        }
    }

    /// Directory name of this project's checkout under the export directory:
    /// `<repository path with '/' replaced by '-'>-<branch>`.
    ///
    /// `git://github.com/foca/integrity.git` on `master` becomes
    /// `foca-integrity-master`.
    pub fn working_tree_name(&self) -> String {
        format!("{}-{}", repository_slug(&self.uri), self.branch)
    }
}

/// Reduce a repository URI to its path component, without a `.git` suffix,
/// with separators flattened to `-`.
fn repository_slug(uri: &str) -> String {
    let path = if let Some((_, rest)) = uri.split_once("://") {
        // Drop the authority; a bare authority has no path.
        rest.split_once('/').map(|(_, p)| p).unwrap_or("")
    } else {
        match (uri.find(':'), uri.find('/')) {
            // scp-like `git@host:owner/repo.git`
            (Some(colon), Some(slash)) if colon < slash => &uri[colon + 1..],
            (Some(colon), None) => &uri[colon + 1..],
            _ => uri,
        }
    };

    let trimmed = path.trim_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let slug = trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "repository".to_string()
    } else {
        slug
    }
}

/// A built commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub identifier: String,
    pub short_identifier: String,
    pub project: Project,
    /// Checkout directory in which the build ran.
    pub working_tree: PathBuf,
}

impl Commit {
    /// Build a commit, deriving the short identifier from the full one.
    pub fn new(
        identifier: impl Into<String>,
        project: Project,
        working_tree: impl Into<PathBuf>,
    ) -> Self {
        let identifier = identifier.into();
        let short_identifier = identifier.chars().take(SHORT_IDENTIFIER_LEN).collect();
        Self {
            identifier,
            short_identifier,
            project,
            working_tree: working_tree.into(),
        }
    }
}

/// Locates project checkouts under the process-wide export directory.
pub struct WorkingTree;

impl WorkingTree {
    pub fn resolve(export_directory: &Path, project: &Project) -> PathBuf {
        export_directory.join(project.working_tree_name())
    }
}

/// Result of a finished build, as delivered to notifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOutcome {
    pub status: BuildStatus,
    pub commit: Commit,
}

impl BuildOutcome {
    pub fn new(status: BuildStatus, commit: Commit) -> Self {
        Self { status, commit }
    }

    pub fn succeeded(commit: Commit) -> Self {
        Self::new(BuildStatus::Succeeded, commit)
    }

    pub fn failed(commit: Commit) -> Self {
        Self::new(BuildStatus::Failed, commit)
    }
}

/// Per-project notifier options, as stored by the configuration form.
///
/// Blank values count as unset: an empty form field is submitted as `""`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiverOptions {
    /// Absolute path replacing the default archive root.
    #[serde(default, deserialize_with = "non_blank_path")]
    pub artifact_root: Option<PathBuf>,

    /// Per-type config file, relative to the working tree.
    #[serde(default, alias = "config_yaml", deserialize_with = "non_blank_path")]
    pub config_path: Option<PathBuf>,
}

impl ArchiverOptions {
    /// Options from free-form input such as command-line flags. Blank values
    /// count as unset and the rest are trimmed.
    pub fn new(artifact_root: Option<PathBuf>, config_path: Option<PathBuf>) -> Self {
        Self {
            artifact_root: artifact_root.and_then(non_blank),
            config_path: config_path.and_then(non_blank),
        }
    }

    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = Some(root.into());
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }
}

fn non_blank_path<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(PathBuf::from).and_then(non_blank))
}

fn non_blank(path: PathBuf) -> Option<PathBuf> {
    let Some(raw) = path.to_str() else {
        return Some(path);
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}
