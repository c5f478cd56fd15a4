//! List the applications resolved for matching clusters.
//!
//! Shows the outcome of the group catalog resolution per cluster: which
//! applications ended up selected, which project and namespace they landed
//! in, and, with `--paths`, the exact precedence-ordered overlay files a
//! render would pass to helm. This is the fastest way to answer "why does
//! this cluster render that value".
//!
//! ```bash
//! fleetrender -i production list-apps
//! fleetrender -i production list-apps cluster-a 'ingress.*' --paths
//! fleetrender -i production list-apps --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::instance::Instance;
use crate::render::overlay_paths;

#[derive(Serialize)]
struct AppEntry<'a> {
    cluster: &'a str,
    name: &'a str,
    project: &'a str,
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<String>>,
}

/// Command to list resolved applications.
#[derive(Debug, Args)]
#[command(about = "List the applications resolved for matching clusters")]
pub struct ListAppsCommand {
    /// Cluster selector (anchored regular expression)
    #[arg(value_name = "CLUSTER", default_value = ".*")]
    pub cluster: String,

    /// Application selector (anchored regular expression)
    #[arg(value_name = "APP", default_value = ".*")]
    pub app: String,

    /// Also list the overlay files each render would use, in order
    #[arg(long)]
    pub paths: bool,

    /// Output format (table or json)
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,
}

impl ListAppsCommand {
    /// Prints the resolved applications to stdout.
    pub fn execute(&self, instance: &Instance) -> Result<()> {
        if self.format == "json" {
            return self.execute_json(instance);
        }

        for cluster in instance.select_clusters(&self.cluster)? {
            println!("{}", cluster.name.bold());
            for app in cluster.select_applications(&self.app)? {
                println!("  {} (project: {}, namespace: {})", app.name, app.project, app.namespace);
                if self.paths {
                    for path in overlay_paths(instance, cluster, app) {
                        println!("    {}", path.display());
                    }
                }
            }
        }
        Ok(())
    }

    fn execute_json(&self, instance: &Instance) -> Result<()> {
        let mut entries = Vec::new();
        for cluster in instance.select_clusters(&self.cluster)? {
            for app in cluster.select_applications(&self.app)? {
                let paths = self.paths.then(|| {
                    overlay_paths(instance, cluster, app)
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect()
                });
                entries.push(AppEntry {
                    cluster: &cluster.name,
                    name: &app.name,
                    project: &app.project,
                    namespace: &app.namespace,
                    paths,
                });
            }
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        Ok(())
    }
}
