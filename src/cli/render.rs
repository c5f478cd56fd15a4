//! Render selected applications for selected clusters with helm.
//!
//! The `render` command is the main operation: it resolves the instance's
//! clusters and applications, selects the requested subset with anchored
//! regular expressions, assembles one render target per (cluster,
//! application) pair, and fans the helm invocations out over a bounded pool
//! of concurrent subprocesses.
//!
//! # Command Usage
//!
//! ```bash
//! # Everything for every cluster
//! fleetrender -i production render
//!
//! # All applications of one cluster
//! fleetrender -i production render cluster-a
//!
//! # One application across a cluster family
//! fleetrender -i production render 'edge-.*' ingress
//!
//! # Only one template file of each chart
//! fleetrender -i production render '.*' '.*' -s deployment.yaml
//!
//! # CI: fail fast, no cleanup, tolerate missing applications
//! fleetrender -i ci render --fatal-errors --no-git-clean --warn-notfound
//! ```
//!
//! # Exit Codes
//!
//! The command exits 0 when the selectors matched nothing, with the single
//! item's own helm exit code for exactly one match, and with 0 or 1 for
//! larger batches depending on whether every item succeeded. An application
//! whose chart directory does not exist yields the distinguished code 99;
//! `--warn-notfound` downgrades those items to warnings.
//!
//! # Working Tree Hygiene
//!
//! `helm dependency build` drops chart archives into `charts/` directories.
//! Unless `--no-git-clean` is given, the command runs `git clean -d -X -f`
//! in the repository root before and after the batch so consecutive runs
//! start from a clean tree. A failing cleanup is logged, not fatal.

use anyhow::Result;
use clap::Args;
use tracing::debug;

use crate::constants::default_parallelism;
use crate::git::GitCli;
use crate::helm::Helm;
use crate::instance::Instance;
use crate::render::{BatchOptions, plan, run_batch};

/// Command to render applications with helm.
#[derive(Debug, Args)]
#[command(about = "Render selected applications for selected clusters")]
pub struct RenderCommand {
    /// Cluster selector (anchored regular expression)
    #[arg(value_name = "CLUSTER", default_value = ".*")]
    pub cluster: String,

    /// Application selector (anchored regular expression)
    #[arg(value_name = "APP", default_value = ".*")]
    pub app: String,

    /// Helm binary to invoke
    #[arg(long, env = "FLEETRENDER_HELM", default_value = "helm")]
    pub helm: String,

    /// Git binary to invoke for working tree cleanup
    #[arg(long, env = "FLEETRENDER_GIT", default_value = "git")]
    pub git: String,

    /// Skip the git clean runs before and after the batch
    #[arg(long)]
    pub no_git_clean: bool,

    /// Stop at the first failed render and exit with its code
    #[arg(long)]
    pub fatal_errors: bool,

    /// Treat applications without a chart directory as warnings
    #[arg(long)]
    pub warn_notfound: bool,

    /// Render only these template files (relative to templates/)
    #[arg(short = 's', long = "show-only", value_name = "FILE")]
    pub show_only: Vec<String>,

    /// Pass --debug through to helm
    #[arg(long)]
    pub debug: bool,

    /// List every item in the execution results, not only failed ones
    #[arg(short = 'x', long)]
    pub full_execution_results: bool,

    /// Maximum number of concurrent helm invocations
    #[arg(long, value_name = "N", default_value_t = default_parallelism())]
    pub max_parallel: usize,
}

impl RenderCommand {
    /// Renders all matching (cluster, application) pairs and returns the
    /// aggregated exit code.
    pub async fn execute(&self, instance: &Instance, quiet: bool, no_progress: bool) -> Result<i32> {
        let helm = Helm::new(self.helm.as_str(), self.debug);
        helm.ensure_available()?;

        let git = GitCli::new(self.git.as_str());
        if !self.no_git_clean {
            git.clean_ignored(instance.layout().root()).await?;
        }

        let mut targets = Vec::new();
        for cluster in instance.select_clusters(&self.cluster)? {
            for app in cluster.select_applications(&self.app)? {
                targets.push(plan(instance, cluster, app));
            }
        }
        debug!(
            target: "resolver",
            "rendering {} application(s) of instance '{}'",
            targets.len(),
            instance.name()
        );

        let options = BatchOptions {
            fatal_errors: self.fatal_errors,
            warn_notfound: self.warn_notfound,
            quiet,
            full_results: self.full_execution_results,
            show_only: self.show_only.clone(),
            max_parallel: self.max_parallel,
            no_progress,
        };
        let code = run_batch(&helm, targets, &options).await?;

        if !self.no_git_clean {
            git.clean_ignored(instance.layout().root()).await?;
        }
        Ok(code)
    }
}
