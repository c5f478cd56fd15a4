//! List the clusters an instance defines.
//!
//! ```bash
//! fleetrender -i production list-clusters
//! fleetrender -i production list-clusters 'edge-.*'
//! fleetrender -i production list-clusters --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::instance::Instance;

#[derive(Serialize)]
struct ClusterEntry<'a> {
    name: &'a str,
    groups: &'a [String],
    api: Option<&'a str>,
    applications: Vec<&'a str>,
}

/// Command to list clusters.
#[derive(Debug, Args)]
#[command(about = "List the clusters defined by the instance")]
pub struct ListClustersCommand {
    /// Cluster selector (anchored regular expression)
    #[arg(value_name = "CLUSTER", default_value = ".*")]
    pub cluster: String,

    /// Output format (table or json)
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,
}

impl ListClustersCommand {
    /// Prints the matching clusters to stdout.
    pub fn execute(&self, instance: &Instance) -> Result<()> {
        let clusters = instance.select_clusters(&self.cluster)?;

        if self.format == "json" {
            let entries: Vec<_> = clusters
                .iter()
                .map(|cluster| ClusterEntry {
                    name: &cluster.name,
                    groups: &cluster.groups,
                    api: cluster.api.as_deref(),
                    applications: cluster.applications().keys().map(String::as_str).collect(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if clusters.is_empty() {
            println!("No clusters match '{}'", self.cluster);
            return Ok(());
        }
        for cluster in clusters {
            println!(
                "{} ({} applications, groups: {})",
                cluster.name.bold(),
                cluster.applications().len(),
                cluster.groups.join(", ")
            );
        }
        Ok(())
    }
}
