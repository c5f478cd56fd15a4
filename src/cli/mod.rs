//! Command-line interface for fleetrender.
//!
//! The CLI resolves a multi-cluster configuration tree into concrete
//! (cluster, application) pairs and either lists the resolution result or
//! renders it with helm. Each subcommand lives in its own module with its
//! own argument structure and execution logic.
//!
//! # Available Commands
//!
//! - `render` - Render selected applications for selected clusters
//! - `list-clusters` - List the clusters an instance defines
//! - `list-apps` - List the applications resolved for matching clusters
//!
//! # Global Options
//!
//! Every subcommand operates on one *instance*, a named directory below the
//! instances directory whose YAML files define clusters and group catalogs.
//! The instance and the directory layout are global options, each with an
//! environment fallback so CI pipelines can configure them once:
//!
//! | Option | Environment variable | Default |
//! |--------|----------------------|---------|
//! | `--root` | `FLEETRENDER_ROOT` | `.` |
//! | `--instance` | `FLEETRENDER_INSTANCE` | (required) |
//! | `--instances-dir` | `FLEETRENDER_INSTANCES_DIR` | `instances` |
//! | `--projects-dir` | `FLEETRENDER_PROJECTS_DIR` | `projects` |
//! | `--apps-dir` | `FLEETRENDER_APPS_DIR` | `applications` |
//! | `--values-dir` | `FLEETRENDER_VALUES_DIR` | `values` |
//! | `--clusters-dir` | `FLEETRENDER_CLUSTERS_DIR` | `clusters` |
//! | `--groups-dir` | `FLEETRENDER_GROUPS_DIR` | `groups` |
//! | `--shared-charts-dir` | `FLEETRENDER_SHARED_CHARTS_DIR` | `shared/charts` |
//!
//! # Examples
//!
//! ```bash
//! # Everything for one cluster
//! fleetrender -i production render 'cluster-a'
//!
//! # One application across all clusters, two renders at a time
//! fleetrender -i production render '.*' ingress --max-parallel 2
//!
//! # Inspect the resolution without helm
//! fleetrender -i staging list-apps 'cluster-.*' --paths
//! ```

mod list_apps;
mod list_clusters;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::constants::{
    DEFAULT_APPS_DIR, DEFAULT_CLUSTERS_DIR, DEFAULT_GROUPS_DIR, DEFAULT_INSTANCES_DIR,
    DEFAULT_PROJECTS_DIR, DEFAULT_SHARED_CHARTS_DIR, DEFAULT_VALUES_DIR,
};
use crate::core::FleetError;
use crate::instance::Instance;
use crate::layout::DirectoryLayout;

/// Top-level CLI structure.
///
/// Parses global layout and verbosity options and delegates to the
/// subcommand structures. Options marked `global = true` may appear before
/// or after the subcommand name.
#[derive(Debug, Parser)]
#[command(
    name = "fleetrender",
    about = "Resolve and render helm configuration for fleets of clusters",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the configuration repository
    #[arg(long, global = true, env = "FLEETRENDER_ROOT", default_value = ".")]
    root: PathBuf,

    /// Instance to operate on (directory name below the instances dir)
    #[arg(short, long, global = true, env = "FLEETRENDER_INSTANCE")]
    instance: Option<String>,

    /// Directory containing instance definitions
    #[arg(long, global = true, env = "FLEETRENDER_INSTANCES_DIR", default_value = DEFAULT_INSTANCES_DIR)]
    instances_dir: String,

    /// Directory containing project definitions
    #[arg(long, global = true, env = "FLEETRENDER_PROJECTS_DIR", default_value = DEFAULT_PROJECTS_DIR)]
    projects_dir: String,

    /// Per-project subdirectory holding application charts
    #[arg(long, global = true, env = "FLEETRENDER_APPS_DIR", default_value = DEFAULT_APPS_DIR)]
    apps_dir: String,

    /// Per-project subdirectory holding overlay values
    #[arg(long, global = true, env = "FLEETRENDER_VALUES_DIR", default_value = DEFAULT_VALUES_DIR)]
    values_dir: String,

    /// Subdirectory of the values dir holding cluster overlays
    #[arg(long, global = true, env = "FLEETRENDER_CLUSTERS_DIR", default_value = DEFAULT_CLUSTERS_DIR)]
    clusters_dir: String,

    /// Subdirectory of the values dir holding group overlays
    #[arg(long, global = true, env = "FLEETRENDER_GROUPS_DIR", default_value = DEFAULT_GROUPS_DIR)]
    groups_dir: String,

    /// Directory containing shared charts referenced via sharedChart
    #[arg(long, global = true, env = "FLEETRENDER_SHARED_CHARTS_DIR", default_value = DEFAULT_SHARED_CHARTS_DIR)]
    shared_charts_dir: String,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress rendered output and informational logging
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render selected applications for selected clusters with helm.
    Render(render::RenderCommand),

    /// List the clusters defined by the instance.
    ListClusters(list_clusters::ListClustersCommand),

    /// List the applications resolved for matching clusters.
    ListApps(list_apps::ListAppsCommand),
}

impl Cli {
    /// Installs the global tracing subscriber according to the verbosity
    /// flags. `RUST_LOG` still takes precedence at the default level.
    pub fn init_tracing(&self) {
        let filter = if self.verbose {
            EnvFilter::new("debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn layout(&self) -> DirectoryLayout {
        DirectoryLayout::new(
            self.root.clone(),
            self.instances_dir.clone(),
            self.projects_dir.clone(),
            self.apps_dir.clone(),
            self.values_dir.clone(),
            self.clusters_dir.clone(),
            self.groups_dir.clone(),
            self.shared_charts_dir.clone(),
        )
    }

    fn load_instance(&self) -> Result<Instance> {
        let name = self.instance.as_deref().ok_or_else(|| FleetError::ConfigError {
            message: "no instance selected; pass --instance or set FLEETRENDER_INSTANCE".into(),
        })?;
        Ok(Instance::load(name, self.layout())?)
    }

    /// Executes the selected subcommand and returns the process exit code.
    pub async fn execute(self) -> Result<i32> {
        let instance = self.load_instance()?;
        match &self.command {
            Commands::Render(cmd) => cmd.execute(&instance, self.quiet, self.no_progress).await,
            Commands::ListClusters(cmd) => cmd.execute(&instance).map(|()| 0),
            Commands::ListApps(cmd) => cmd.execute(&instance).map(|()| 0),
        }
    }
}
