//! Render plan assembly, parallel batch execution, and exit-code
//! aggregation.
//!
//! For every selected (cluster, application) pair a [`RenderTarget`] is
//! assembled: the release name, the chart to render, the full
//! precedence-ordered overlay file list, and the flat override values the
//! downstream templates expect. Targets are independent of each other, so
//! the batch fans them out over a bounded pool of concurrent helm
//! invocations and collects one [`ItemOutcome`] per pair.
//!
//! Two failure policies exist: with `fatal_errors`, the batch stops issuing
//! work after the first non-zero result and propagates that code; without
//! it, every pair runs and [`aggregate`] rolls the item codes up into one
//! exit status. A missing application chart is recorded with the
//! distinguished code [`MISSING_APP_EXIT_CODE`] so `warn_notfound` can
//! forgive exactly those items.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::application::Application;
use crate::cluster::Cluster;
use crate::constants::MISSING_APP_EXIT_CODE;
use crate::core::FleetError;
use crate::helm::{Helm, HelmOutput};
use crate::instance::Instance;

/// Override keys handed to every render; the template that renders the
/// ArgoCD application resource passes the same parameters to each app.
const PARAM_CLUSTER_NAME: &str = "argocdParams.clusterName";
const PARAM_CLUSTER_API: &str = "argocdParams.clusterAPI";
const PARAM_STAGE: &str = "argocdParams.argocdStage";

/// Everything needed to render one application for one cluster.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    /// Cluster name (part of the release name and the override values).
    pub cluster: String,
    /// Application name.
    pub app: String,
    /// Helm release name, `<app>-<cluster>`.
    pub release_name: String,
    /// Namespace the application renders into.
    pub namespace: String,
    /// Chart directory to render.
    pub chart_path: PathBuf,
    /// Ordered overlay files; later paths override earlier ones.
    pub overlay_paths: Vec<PathBuf>,
    /// Flat dotted-path override values passed via `--set`/`--set-string`.
    pub set_values: BTreeMap<String, Value>,
    /// Whether the chart directory is missing on disk. Missing targets are
    /// never handed to helm; they produce the distinguished outcome code.
    pub missing: bool,
}

/// The full precedence-ordered overlay file list of one (cluster,
/// application) pair, lowest precedence first: the chart's own values and
/// secrets, the project addon files, every group overlay in group-priority
/// order, and finally the cluster overlays.
pub fn overlay_paths(instance: &Instance, cluster: &Cluster, app: &Application) -> Vec<PathBuf> {
    let layout = instance.layout();
    let mut paths = Vec::new();
    paths.extend(app.values_path(layout));
    paths.extend(app.secrets_path(layout));
    paths.extend(app.addon_values_path(layout));
    paths.extend(app.addon_secrets_path(layout));
    paths.extend(cluster.app_group_values_file_paths(layout, app));
    paths.extend(cluster.app_cluster_values_file_paths(layout, app));
    paths
}

/// Assembles the render target for one (cluster, application) pair.
pub fn plan(instance: &Instance, cluster: &Cluster, app: &Application) -> RenderTarget {
    let api = cluster.api.clone().unwrap_or_else(|| {
        warn!(
            target: "resolver",
            "cluster '{}' has no 'api' field; {} will be empty",
            cluster.name,
            PARAM_CLUSTER_API
        );
        String::new()
    });

    let mut set_values = BTreeMap::new();
    set_values.insert(PARAM_CLUSTER_NAME.to_string(), Value::from(cluster.name.clone()));
    set_values.insert(PARAM_CLUSTER_API.to_string(), Value::from(api));
    set_values.insert(PARAM_STAGE.to_string(), Value::from(instance.name().to_string()));

    let chart_path = app.chart_path(instance.layout());
    RenderTarget {
        cluster: cluster.name.clone(),
        app: app.name.clone(),
        release_name: format!("{}-{}", app.name, cluster.name),
        namespace: app.namespace.clone(),
        chart_path: chart_path.clone(),
        overlay_paths: overlay_paths(instance, cluster, app),
        set_values,
        missing: !chart_path.is_dir(),
    }
}

/// Execution policy and output options of a render batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Stop issuing work after the first non-zero result.
    pub fatal_errors: bool,
    /// Treat missing applications as warnings during aggregation.
    pub warn_notfound: bool,
    /// Do not print the rendered manifests.
    pub quiet: bool,
    /// List every item in the execution results, not just failed ones.
    pub full_results: bool,
    /// Template files (relative to the chart's `templates/`) to render
    /// exclusively; empty renders everything.
    pub show_only: Vec<String>,
    /// Bound on concurrent helm invocations.
    pub max_parallel: usize,
    /// Disable the progress bar.
    pub no_progress: bool,
}

/// Result of one rendered (cluster, application) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Cluster name.
    pub cluster: String,
    /// Application name.
    pub app: String,
    /// Helm exit code, or [`MISSING_APP_EXIT_CODE`] for a missing chart.
    pub code: i32,
}

/// Rolls item outcomes up into one exit status.
///
/// Zero items (the selectors matched nothing) is a success. A single item
/// propagates its own code unchanged. Multiple items succeed iff none
/// failed, where missing-application items are forgiven under
/// `warn_notfound`.
#[must_use]
pub fn aggregate(outcomes: &[ItemOutcome], warn_notfound: bool) -> i32 {
    match outcomes {
        [] => 0,
        [only] => only.code,
        many => {
            let failed = many.iter().any(|item| {
                item.code != 0 && !(warn_notfound && item.code == MISSING_APP_EXIT_CODE)
            });
            i32::from(failed)
        }
    }
}

/// Renders all `targets` and returns the aggregated exit status.
///
/// Fans out up to `max_parallel` concurrent helm invocations; the shared
/// inputs are all read-only. Rendered manifests go to stdout (unless
/// `quiet`), helm's stderr is passed through, and for batches of more than
/// one item an execution summary is printed to stderr.
pub async fn run_batch(helm: &Helm, targets: Vec<RenderTarget>, options: &BatchOptions) -> Result<i32> {
    let total = targets.len() as u64;
    let progress = if options.no_progress || options.quiet || total < 2 {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .expect("valid progress template")
                .progress_chars("=> "),
        );
        pb.set_message("Rendering");
        pb
    };

    let concurrency = options.max_parallel.max(1);
    let mut stream = futures::stream::iter(targets.into_iter().map(|target| {
        let helm = helm.clone();
        let show_only = options.show_only.clone();
        async move { render_one(&helm, target, &show_only).await }
    }))
    .buffer_unordered(concurrency);

    let mut outcomes = Vec::new();
    while let Some(result) = stream.next().await {
        let (outcome, output) = result?;

        eprintln!("################ {} {} ################", outcome.cluster, outcome.app);
        match output {
            ItemOutput::Rendered(output) => {
                if !output.stdout.is_empty() && !options.quiet {
                    progress.suspend(|| println!("{}", output.stdout));
                }
                if !output.stderr.is_empty() {
                    eprintln!("{}", output.stderr);
                }
            }
            ItemOutput::Missing(err) => eprintln!("{err}"),
        }
        progress.inc(1);

        if options.fatal_errors && outcome.code != 0 {
            // stop issuing further work; dropping the stream cancels
            // everything not yet started
            progress.finish_and_clear();
            return Ok(outcome.code);
        }
        outcomes.push(outcome);
    }
    progress.finish_and_clear();

    if outcomes.len() > 1 {
        print_summary(&outcomes, options);
    }
    Ok(aggregate(&outcomes, options.warn_notfound))
}

/// What one batch item produced: helm's captured output, or the missing
/// application error when no helm process was started.
enum ItemOutput {
    Rendered(HelmOutput),
    Missing(FleetError),
}

async fn render_one(
    helm: &Helm,
    target: RenderTarget,
    show_only: &[String],
) -> Result<(ItemOutcome, ItemOutput)> {
    if target.missing {
        let err = FleetError::ApplicationMissing {
            name: target.app.clone(),
            path: target.chart_path.display().to_string(),
        };
        debug!(target: "resolver", "skipping '{}': {}", target.cluster, err);
        // the error becomes the distinguished item code at this boundary
        return Ok((
            ItemOutcome {
                cluster: target.cluster,
                app: target.app,
                code: MISSING_APP_EXIT_CODE,
            },
            ItemOutput::Missing(err),
        ));
    }

    let output = helm
        .template(
            &target.release_name,
            &target.namespace,
            &target.chart_path,
            &target.overlay_paths,
            &target.set_values,
            show_only,
        )
        .await?;

    Ok((
        ItemOutcome {
            cluster: target.cluster,
            app: target.app,
            code: output.code,
        },
        ItemOutput::Rendered(output),
    ))
}

fn print_summary(outcomes: &[ItemOutcome], options: &BatchOptions) {
    eprintln!("Execution results:");
    let mut all_ok = true;
    for item in outcomes {
        if item.code != 0 || options.full_results {
            eprintln!("  {} {}: {}", item.cluster, item.app, item.code);
        }
        if item.code != 0 && !(options.warn_notfound && item.code == MISSING_APP_EXIT_CODE) {
            all_ok = false;
        }
    }
    if all_ok {
        eprintln!("  {}", "All applications rendered successfully!".green());
    }
}
