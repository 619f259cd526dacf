//! Artifact Archiver - post-build artifact relocation for CI
//!
//! After a build succeeds, moves generated output directories (coverage,
//! metrics) from the build's working tree into
//! `<artifact root>/<project>/<short commit id>`:
//! - Per-project artifact root, falling back to the process default
//! - Per-type output directory overrides and disabling via a YAML file
//! - Missing configuration and missing outputs degrade to defaults/skips

pub mod archiver;
pub mod domain;
pub mod error;
pub mod fakes;
pub mod form;
pub mod fs;
pub mod overrides;
pub mod registry;
pub mod settings;
pub mod telemetry;

pub use archiver::{
    archive_dir_for, ArchivePlan, ArtifactArchiver, ArtifactOutcome, Delivery, DeliveryReport,
    PlannedArtifact, RootSource, SourceResolution,
};
pub use domain::{ArchiverOptions, BuildOutcome, BuildStatus, Commit, Project, WorkingTree};
pub use error::{ArchiveError, Result};
pub use form::{form_schema, FieldDescriptor, FieldKind};
pub use fs::{Filesystem, LocalFilesystem};
pub use overrides::{
    ArtifactOverride, ConfigParser, OverrideSet, OverrideSource, ResolvedOverrides,
    YamlConfigParser,
};
pub use registry::{ArtifactRegistry, ArtifactType};
pub use settings::ArchiverSettings;
pub use telemetry::init_tracing;
