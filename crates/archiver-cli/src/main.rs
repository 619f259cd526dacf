//! Artifact Archiver CLI
//!
//! `archive-artifacts` is called from a build-completion hook to move a
//! build's coverage and metrics output into the per-commit archive.
//!
//! ## Commands
//!
//! - `deliver`: archive the artifacts of one finished build
//! - `form-schema`: print the notifier configuration fields as JSON

use std::path::PathBuf;

use anyhow::{Context, Result};
use archiver_core::{
    form_schema, ArchiverOptions, ArchiverSettings, ArtifactArchiver, ArtifactOutcome,
    BuildOutcome, BuildStatus, Commit, DeliveryReport, Project, RootSource, WorkingTree,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "archive-artifacts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Archive CI build artifacts per project and commit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive the artifacts of a finished build
    Deliver {
        /// Project name (archive subdirectory)
        #[arg(long)]
        project: String,

        /// Repository URI of the project
        #[arg(long)]
        uri: String,

        /// Branch that was built
        #[arg(long, default_value = "master")]
        branch: String,

        /// Full commit identifier
        #[arg(long)]
        commit: String,

        /// Build result
        #[arg(long, value_enum)]
        status: StatusArg,

        /// Checkout the build ran in (default: resolved under the export directory)
        #[arg(long)]
        working_tree: Option<PathBuf>,

        /// Per-project archive root overriding the default
        #[arg(long)]
        artifact_root: Option<String>,

        /// Per-type config file, relative to the working tree
        #[arg(long, alias = "config-path")]
        config_yaml: Option<String>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Print the notifier configuration fields as JSON
    FormSchema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Succeeded,
    Failed,
}

impl From<StatusArg> for BuildStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Succeeded => BuildStatus::Succeeded,
            StatusArg::Failed => BuildStatus::Failed,
        }
    }
}

#[derive(clap::Args, Debug)]
struct SettingsArgs {
    /// TOML settings file with `export_directory` and `artifact_root`
    #[arg(long, env = "ARCHIVER_SETTINGS", conflicts_with = "export_directory")]
    settings: Option<PathBuf>,

    /// Base directory holding project working trees
    #[arg(long, env = "ARCHIVER_EXPORT_DIRECTORY")]
    export_directory: Option<PathBuf>,

    /// Default archive root (default: public/artifacts next to the export directory)
    #[arg(long, env = "ARCHIVER_ARTIFACT_ROOT", requires = "export_directory")]
    default_artifact_root: Option<PathBuf>,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<ArchiverSettings> {
        if let Some(path) = &self.settings {
            return ArchiverSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()));
        }

        let export_directory = self
            .export_directory
            .clone()
            .context("Either --settings or --export-directory is required")?;
        Ok(match &self.default_artifact_root {
            Some(root) => ArchiverSettings::new(export_directory, root),
            None => ArchiverSettings::from_export_directory(export_directory),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    archiver_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Deliver {
            project,
            uri,
            branch,
            commit,
            status,
            working_tree,
            artifact_root,
            config_yaml,
            settings,
        } => {
            let settings = settings.resolve()?;
            let project = Project::new(project, uri, branch);
            let working_tree = working_tree
                .unwrap_or_else(|| WorkingTree::resolve(&settings.export_directory, &project));
            let commit = Commit::new(commit, project, working_tree);
            let outcome = BuildOutcome::new(status.into(), commit);
            let options = ArchiverOptions::new(
                artifact_root.map(PathBuf::from),
                config_yaml.map(PathBuf::from),
            );
            cmd_deliver(settings, &outcome, &options, cli.json)
        }
        Commands::FormSchema => cmd_form_schema(),
    }
}

fn cmd_deliver(
    settings: ArchiverSettings,
    outcome: &BuildOutcome,
    options: &ArchiverOptions,
    json: bool,
) -> Result<()> {
    debug!(
        working_tree = %outcome.commit.working_tree.display(),
        default_root = %settings.artifact_root.display(),
        "Delivering artifacts"
    );

    let archiver = ArtifactArchiver::new(settings);
    let report = archiver.deliver(outcome, options).with_context(|| {
        format!(
            "Failed to archive artifacts for {}@{}",
            outcome.commit.project.name, outcome.commit.short_identifier
        )
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &DeliveryReport) {
    let delivery = match report {
        DeliveryReport::Skipped { status } => {
            println!("Build {status:?}, nothing archived");
            return;
        }
        DeliveryReport::Delivered(delivery) => delivery,
    };

    let plan = &delivery.plan;
    let root_note = match &plan.root_source {
        RootSource::Default => "default",
        RootSource::Configured => "configured",
        RootSource::FellBack { .. } => "default, configured root missing",
    };
    println!("Archive: {} ({})", plan.archive_dir.display(), root_note);

    for outcome in &delivery.outcomes {
        match outcome {
            ArtifactOutcome::Archived { name, source } => {
                println!("  {:<10} archived from {}", name, source.display())
            }
            ArtifactOutcome::Disabled { name } => println!("  {:<10} disabled", name),
            ArtifactOutcome::SourceMissing { name, source } => {
                println!("  {:<10} no output at {}", name, source.display())
            }
        }
    }
}

fn cmd_form_schema() -> Result<()> {
    let fields: Vec<_> = form_schema()
        .into_iter()
        .map(|field| {
            serde_json::json!({
                "key": field.key,
                "label": field.label,
                "kind": field.kind,
                "id": field.html_id(),
                "name": field.html_name(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}
