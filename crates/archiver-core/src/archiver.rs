//! Post-build artifact archiving.
//!
//! After a successful build the archiver moves each artifact type's output
//! directory out of the working tree into `<root>/<project>/<short id>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ArchiverOptions, BuildOutcome, BuildStatus, Commit};
use crate::error::{ArchiveError, Result};
use crate::fs::{Filesystem, LocalFilesystem};
use crate::overrides::{
    ConfigParser, OverrideSet, OverrideSource, ResolvedOverrides, YamlConfigParser,
};
use crate::registry::ArtifactRegistry;
use crate::settings::ArchiverSettings;

/// How the archive root of a delivery was chosen.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RootSource {
    /// No root configured for the project.
    Default,
    /// The project's configured root exists and is used.
    Configured,
    /// The project's configured root is missing; the default is used.
    FellBack { configured: PathBuf },
}

/// Where one artifact type will be collected from.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum SourceResolution {
    /// Disabled in the config file; never looked at.
    Disabled,
    /// Directory to move, if it exists.
    Directory(PathBuf),
}

/// Resolution for a single artifact type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlannedArtifact {
    pub name: String,
    pub source: SourceResolution,
}

/// Everything a delivery resolved before moving anything.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchivePlan {
    pub root: PathBuf,
    pub root_source: RootSource,
    /// Destination of every move: `root/project/short id`.
    pub archive_dir: PathBuf,
    pub archive_dir_created: bool,
    pub overrides: OverrideSource,
    pub artifacts: Vec<PlannedArtifact>,
}

/// What happened to one artifact type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Archived { name: String, source: PathBuf },
    Disabled { name: String },
    SourceMissing { name: String, source: PathBuf },
}

impl ArtifactOutcome {
    pub fn name(&self) -> &str {
        match self {
            ArtifactOutcome::Archived { name, .. }
            | ArtifactOutcome::Disabled { name }
            | ArtifactOutcome::SourceMissing { name, .. } => name,
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, ArtifactOutcome::Archived { .. })
    }
}

/// A completed delivery for a successful build.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Delivery {
    pub plan: ArchivePlan,
    pub outcomes: Vec<ArtifactOutcome>,
    /// Fallback warnings, in the order they were logged.
    pub warnings: Vec<String>,
}

/// Result of [`ArtifactArchiver::deliver`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeliveryReport {
    /// The build did not succeed; nothing was touched.
    Skipped { status: BuildStatus },
    Delivered(Delivery),
}

impl DeliveryReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DeliveryReport::Skipped { .. })
    }

    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            DeliveryReport::Delivered(delivery) => Some(delivery),
            DeliveryReport::Skipped { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        self.delivery().map(|d| d.warnings.as_slice()).unwrap_or(&[])
    }

    /// Names of the artifact types that were moved.
    pub fn archived(&self) -> Vec<&str> {
        self.delivery()
            .map(|d| {
                d.outcomes
                    .iter()
                    .filter(|o| o.is_archived())
                    .map(ArtifactOutcome::name)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Moves build artifacts into the per-commit archive.
///
/// Holds only immutable configuration; one archiver can serve every build.
pub struct ArtifactArchiver {
    settings: ArchiverSettings,
    registry: ArtifactRegistry,
    fs: Arc<dyn Filesystem>,
    parser: Arc<dyn ConfigParser>,
}

impl ArtifactArchiver {
    /// Archiver on the local filesystem with the built-in artifact types.
    pub fn new(settings: ArchiverSettings) -> Self {
        Self {
            settings,
            registry: ArtifactRegistry::builtin(),
            fs: Arc::new(LocalFilesystem),
            parser: Arc::new(YamlConfigParser),
        }
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ConfigParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_registry(mut self, registry: ArtifactRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &ArchiverSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Archive the artifacts of a finished build.
    ///
    /// Builds that did not succeed are ignored. Missing configured roots and
    /// config files fall back to defaults with a warning; missing artifact
    /// directories and disabled types are skipped. A malformed config file or
    /// a failing filesystem call aborts the delivery; moves already made stay.
    pub fn deliver(
        &self,
        outcome: &BuildOutcome,
        options: &ArchiverOptions,
    ) -> Result<DeliveryReport> {
        if !outcome.status.is_succeeded() {
            debug!(status = ?outcome.status, "Build did not succeed, not archiving");
            return Ok(DeliveryReport::Skipped {
                status: outcome.status,
            });
        }

        let commit = &outcome.commit;
        let mut warnings = Vec::new();

        let (root, root_source) = self.resolve_root(options, &mut warnings);
        let archive_dir = archive_dir_for(&root, commit);
        let archive_dir_created = self.ensure_dir(&archive_dir)?;
        let resolved = self.resolve_overrides(&commit.working_tree, options, &mut warnings)?;

        let plan = ArchivePlan {
            artifacts: self.plan_artifacts(&commit.working_tree, &resolved.overrides),
            root,
            root_source,
            archive_dir,
            archive_dir_created,
            overrides: resolved.source,
        };

        let mut outcomes = Vec::with_capacity(plan.artifacts.len());
        for artifact in &plan.artifacts {
            outcomes.push(self.collect(artifact, &plan.archive_dir)?);
        }

        info!(
            project = %commit.project.name,
            commit = %commit.short_identifier,
            archived = outcomes.iter().filter(|o| o.is_archived()).count(),
            "Artifact delivery finished"
        );

        Ok(DeliveryReport::Delivered(Delivery {
            plan,
            outcomes,
            warnings,
        }))
    }

    fn resolve_root(
        &self,
        options: &ArchiverOptions,
        warnings: &mut Vec<String>,
    ) -> (PathBuf, RootSource) {
        let default_root = &self.settings.artifact_root;
        match &options.artifact_root {
            None => (default_root.clone(), RootSource::Default),
            Some(configured) if self.fs.exists(configured) => {
                (configured.clone(), RootSource::Configured)
            }
            Some(configured) => {
                emit(
                    warnings,
                    format!(
                        "WARNING: Configured artifact_root: {} does not exist. Using default: {}",
                        configured.display(),
                        default_root.display()
                    ),
                );
                (
                    default_root.clone(),
                    RootSource::FellBack {
                        configured: configured.clone(),
                    },
                )
            }
        }
    }

    /// Returns whether the directory had to be created.
    fn ensure_dir(&self, dir: &Path) -> Result<bool> {
        if self.fs.exists(dir) {
            return Ok(false);
        }
        self.fs
            .create_dir_all(dir)
            .map_err(|e| ArchiveError::fs("create directory", dir, e))?;
        info!(dir = %dir.display(), "Created archive directory");
        Ok(true)
    }

    fn resolve_overrides(
        &self,
        working_tree: &Path,
        options: &ArchiverOptions,
        warnings: &mut Vec<String>,
    ) -> Result<ResolvedOverrides> {
        let Some(config_path) = &options.config_path else {
            return Ok(ResolvedOverrides::not_configured());
        };

        let config_file = working_tree.join(config_path);
        if !self.fs.exists(&config_file) {
            emit(
                warnings,
                format!(
                    "WARNING: Configured yaml file: {} does not exist! \
                     Using default configuration.",
                    config_file.display()
                ),
            );
            return Ok(ResolvedOverrides::missing(config_file));
        }

        let overrides = self.parser.parse(&config_file)?;
        debug!(
            config = %config_file.display(),
            entries = overrides.len(),
            "Loaded artifact overrides"
        );
        Ok(ResolvedOverrides::loaded(config_file, overrides))
    }

    fn plan_artifacts(&self, working_tree: &Path, overrides: &OverrideSet) -> Vec<PlannedArtifact> {
        self.registry
            .iter()
            .map(|artifact| {
                let entry = overrides.get(&artifact.name);
                let source = match entry {
                    Some(o) if o.disabled => SourceResolution::Disabled,
                    _ => {
                        let subdir = entry
                            .and_then(|o| o.output_dir.as_deref())
                            .unwrap_or(artifact.default_dir.as_path());
                        SourceResolution::Directory(working_tree.join(subdir))
                    }
                };
                PlannedArtifact {
                    name: artifact.name.clone(),
                    source,
                }
            })
            .collect()
    }

    fn collect(&self, artifact: &PlannedArtifact, archive_dir: &Path) -> Result<ArtifactOutcome> {
        let name = artifact.name.clone();
        let source = match &artifact.source {
            SourceResolution::Disabled => return Ok(ArtifactOutcome::Disabled { name }),
            SourceResolution::Directory(source) => source.clone(),
        };

        if !self.fs.exists(&source) {
            return Ok(ArtifactOutcome::SourceMissing { name, source });
        }

        self.fs
            .move_forced(&source, archive_dir)
            .map_err(|e| ArchiveError::fs("move", &source, e))?;
        info!(
            artifact = %name,
            from = %source.display(),
            to = %archive_dir.display(),
            "Archived artifact"
        );
        Ok(ArtifactOutcome::Archived { name, source })
    }
}

/// `root/project/short id`
pub fn archive_dir_for(root: &Path, commit: &Commit) -> PathBuf {
    root.join(&commit.project.name).join(&commit.short_identifier)
}

fn emit(warnings: &mut Vec<String>, message: String) {
    warn!("{}", message);
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Project;
    use crate::overrides::ArtifactOverride;

    fn commit() -> Commit {
        Commit::new(
            "abc123",
            Project::new("foo", "git://example.com/foo.git", "master"),
            "/builds/foo-master",
        )
    }

    fn archiver() -> ArtifactArchiver {
        ArtifactArchiver::new(ArchiverSettings::new("/builds", "/pub/artifacts"))
    }

    #[test]
    fn archive_dir_is_root_project_short_id() {
        assert_eq!(
            archive_dir_for(Path::new("/pub/artifacts"), &commit()),
            PathBuf::from("/pub/artifacts/foo/abc123")
        );
    }

    #[test]
    fn plan_uses_defaults_without_overrides() {
        let planned = archiver().plan_artifacts(Path::new("/w"), &OverrideSet::new());
        assert_eq!(
            planned,
            vec![
                PlannedArtifact {
                    name: "rcov".to_string(),
                    source: SourceResolution::Directory(PathBuf::from("/w/coverage")),
                },
                PlannedArtifact {
                    name: "metric_fu".to_string(),
                    source: SourceResolution::Directory(PathBuf::from("/w/tmp/metric_fu")),
                },
            ]
        );
    }

    #[test]
    fn plan_disabled_wins_over_output_dir() {
        let overrides = OverrideSet::new().with(
            "rcov",
            ArtifactOverride {
                output_dir: Some(PathBuf::from("rcov")),
                disabled: true,
            },
        );
        let planned = archiver().plan_artifacts(Path::new("/w"), &overrides);
        assert_eq!(planned[0].source, SourceResolution::Disabled);
        assert_eq!(
            planned[1].source,
            SourceResolution::Directory(PathBuf::from("/w/tmp/metric_fu"))
        );
    }

    #[test]
    fn plan_applies_output_dir_override() {
        let overrides = OverrideSet::new().with("rcov", ArtifactOverride::output_dir("rcov"));
        let planned = archiver().plan_artifacts(Path::new("/w"), &overrides);
        assert_eq!(planned[0].source, SourceResolution::Directory(PathBuf::from("/w/rcov")));
    }

    #[test]
    fn plan_ignores_unregistered_types() {
        let overrides = OverrideSet::new().with("flog", ArtifactOverride::output_dir("tmp/flog"));
        let planned = archiver().plan_artifacts(Path::new("/w"), &overrides);
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|p| p.name != "flog"));
    }

    #[test]
    fn skipped_report_has_no_warnings_or_archives() {
        let report = DeliveryReport::Skipped {
            status: BuildStatus::Failed,
        };
        assert!(report.is_skipped());
        assert!(report.warnings().is_empty());
        assert!(report.archived().is_empty());
    }

    #[test]
    fn outcome_names() {
        let outcome = ArtifactOutcome::Disabled {
            name: "rcov".to_string(),
        };
        assert_eq!(outcome.name(), "rcov");
        assert!(!outcome.is_archived());
    }
}
