//! Instance aggregation: one directory tree, one configuration.
//!
//! An instance is a self-contained set of cluster, group, and application
//! configuration. Loading an instance scans every `*.yaml` document below
//! the instance directory (chart metadata and in-chart template files are
//! not configuration and are skipped), deep-merges them into a single raw
//! tree, and builds the [`GroupCatalog`] and [`Cluster`] collection from
//! the `clusterGroupApps` and `clusters` sections.
//!
//! The filesystem does not guarantee a traversal order, so documents are
//! sorted by path before merging; aggregation is deterministic for a given
//! tree. Any unreadable or unparsable document aborts the whole aggregation,
//! partial configuration is never produced.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;
use walkdir::WalkDir;

use crate::cluster::Cluster;
use crate::core::{FleetError, Result};
use crate::groups::GroupCatalog;
use crate::layout::DirectoryLayout;
use crate::selector;

/// Config sections seeded empty before aggregation so downstream accessors
/// always find them.
const CLUSTERS_SECTION: &str = "clusters";
const GROUP_APPS_SECTION: &str = "clusterGroupApps";

/// Chart metadata filename excluded from aggregation.
const CHART_METADATA: &str = "Chart.yaml";

/// Directory name holding in-chart template files, excluded from aggregation.
const TEMPLATES_DIR: &str = "templates";

/// A fully aggregated instance: raw config tree, group catalog, clusters.
#[derive(Debug)]
pub struct Instance {
    name: String,
    layout: DirectoryLayout,
    config: Mapping,
    catalog: GroupCatalog,
    clusters: BTreeMap<String, Cluster>,
}

impl Instance {
    /// Loads the instance `name` from the repository described by `layout`.
    ///
    /// Fails fast with [`FleetError::InstanceNotFound`] when the instance
    /// directory does not exist and with [`FleetError::DocumentError`] when
    /// any document cannot be read or parsed.
    pub fn load(name: &str, layout: DirectoryLayout) -> Result<Self> {
        let path = layout.instance(name);
        if !path.is_dir() {
            return Err(FleetError::InstanceNotFound {
                path: path.display().to_string(),
            });
        }

        let config = aggregate_documents(&path)?;

        let catalog = match config.get(GROUP_APPS_SECTION) {
            Some(Value::Mapping(section)) => GroupCatalog::from_config(section)?,
            _ => GroupCatalog::default(),
        };

        let mut clusters = BTreeMap::new();
        if let Some(Value::Sequence(records)) = config.get(CLUSTERS_SECTION) {
            for record in records {
                let record = record.as_mapping().ok_or_else(|| FleetError::ConfigError {
                    message: format!("'{CLUSTERS_SECTION}' records must be mappings: {record:?}"),
                })?;
                let cluster = Cluster::from_config(record, &catalog)?;
                clusters.insert(cluster.name.clone(), cluster);
            }
        }

        debug!(
            target: "resolver",
            "instance '{}' loaded: {} clusters",
            name,
            clusters.len()
        );

        Ok(Self {
            name: name.to_string(),
            layout,
            config,
            catalog,
            clusters,
        })
    }

    /// Instance name; also handed to the templates as the stage identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory layout this instance was loaded with.
    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// The aggregated raw configuration tree.
    pub fn config(&self) -> &Mapping {
        &self.config
    }

    /// The group catalog built from the `clusterGroupApps` section.
    pub fn catalog(&self) -> &GroupCatalog {
        &self.catalog
    }

    /// All clusters of the instance, keyed by name.
    pub fn clusters(&self) -> &BTreeMap<String, Cluster> {
        &self.clusters
    }

    /// Clusters whose names fully match the anchored `pattern`.
    pub fn select_clusters(&self, pattern: &str) -> Result<Vec<&Cluster>> {
        let matcher = selector::anchored(pattern)?;
        Ok(self.clusters.values().filter(|cluster| matcher.is_match(&cluster.name)).collect())
    }
}

/// Scans `path` recursively and deep-merges every configuration document
/// into a tree seeded with empty `clusters` / `clusterGroupApps` sections.
fn aggregate_documents(path: &Path) -> Result<Mapping> {
    let mut result = Mapping::new();
    result.insert(Value::from(CLUSTERS_SECTION), Value::Sequence(Vec::new()));
    result.insert(Value::from(GROUP_APPS_SECTION), Value::Mapping(Mapping::new()));

    for file in config_documents(path)? {
        let text = fs::read_to_string(&file).map_err(|e| FleetError::DocumentError {
            path: file.display().to_string(),
            reason: e.to_string(),
        })?;
        let document: Value =
            serde_yaml::from_str(&text).map_err(|e| FleetError::DocumentError {
                path: file.display().to_string(),
                reason: e.to_string(),
            })?;
        match document {
            // empty documents merge to nothing
            Value::Null => {}
            Value::Mapping(mapping) => {
                debug!(target: "resolver", "merging config document {}", file.display());
                result = crate::merge::deep_merge(&result, &mapping);
            }
            other => {
                return Err(FleetError::DocumentError {
                    path: file.display().to_string(),
                    reason: format!("top-level value must be a mapping, got: {other:?}"),
                });
            }
        }
    }

    Ok(result)
}

/// All `*.yaml` documents below `path`, sorted for deterministic merge
/// order, excluding chart metadata and anything directly inside a
/// `templates` directory.
fn config_documents(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| FleetError::DocumentError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file = entry.path();
        if file.extension().is_none_or(|ext| ext != "yaml") {
            continue;
        }
        if file.file_name().is_some_and(|name| name == CHART_METADATA) {
            continue;
        }
        if file
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| dir == TEMPLATES_DIR)
        {
            continue;
        }
        files.push(file.to_path_buf());
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_for(root: &Path) -> DirectoryLayout {
        DirectoryLayout::new(
            root,
            "instances",
            "projects",
            "applications",
            "values",
            "clusters",
            "groups",
            "shared/charts",
        )
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_instance_directory_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Instance::load("nope", layout_for(tmp.path())).unwrap_err();
        assert!(matches!(err, FleetError::InstanceNotFound { .. }));
    }

    #[test]
    fn documents_are_merged_in_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        // "b-" sorts after "a-", so its value wins on conflict
        write(tmp.path(), "instances/int/a-first.yaml", "shared: from-a\nonly_a: 1");
        write(tmp.path(), "instances/int/b-second.yaml", "shared: from-b");
        let instance = Instance::load("int", layout_for(tmp.path())).unwrap();
        assert_eq!(instance.config().get("shared"), Some(&Value::from("from-b")));
        assert_eq!(instance.config().get("only_a"), Some(&Value::from(1)));
    }

    #[test]
    fn nested_sections_merge_across_documents() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "instances/int/groups-a.yaml",
            "clusterGroupApps:\n  all:\n    applications:\n      - name: echo",
        );
        write(
            tmp.path(),
            "instances/int/groups-b.yaml",
            "clusterGroupApps:\n  monitoring:\n    applications:\n      - name: prometheus",
        );
        let instance = Instance::load("int", layout_for(tmp.path())).unwrap();
        assert!(instance.catalog().group_applications("all").is_some());
        assert!(instance.catalog().group_applications("monitoring").is_some());
    }

    #[test]
    fn chart_metadata_and_templates_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "instances/int/config.yaml", "key: value");
        write(tmp.path(), "instances/int/chart/Chart.yaml", "name: not-config");
        write(tmp.path(), "instances/int/chart/templates/app.yaml", "not: [valid, config");
        let instance = Instance::load("int", layout_for(tmp.path())).unwrap();
        assert_eq!(instance.config().get("key"), Some(&Value::from("value")));
        assert!(!instance.config().contains_key("name"));
    }

    #[test]
    fn unparsable_documents_abort_aggregation() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "instances/int/good.yaml", "key: value");
        write(tmp.path(), "instances/int/broken.yaml", "key: [unclosed");
        let err = Instance::load("int", layout_for(tmp.path())).unwrap_err();
        assert!(matches!(err, FleetError::DocumentError { .. }));
    }

    #[test]
    fn empty_documents_are_tolerated() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "instances/int/empty.yaml", "");
        write(tmp.path(), "instances/int/config.yaml", "key: value");
        let instance = Instance::load("int", layout_for(tmp.path())).unwrap();
        assert_eq!(instance.config().get("key"), Some(&Value::from("value")));
    }

    #[test]
    fn clusters_are_built_from_the_aggregated_tree() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "instances/int/clusters.yaml",
            r"
clusters:
  - name: prod-1
    api: https://api.prod-1:6443
    groups: [monitoring]
  - name: test-1
",
        );
        write(
            tmp.path(),
            "instances/int/groups.yaml",
            r"
clusterGroupApps:
  all:
    applications:
      - name: echo
  monitoring:
    applications:
      - name: prometheus
",
        );
        let instance = Instance::load("int", layout_for(tmp.path())).unwrap();
        assert_eq!(instance.clusters().len(), 2);
        let prod = &instance.clusters()["prod-1"];
        assert_eq!(prod.groups, vec!["all", "monitoring"]);
        assert!(prod.applications().contains_key("prometheus"));
        let test = &instance.clusters()["test-1"];
        assert!(!test.applications().contains_key("prometheus"));
        assert!(test.applications().contains_key("echo"));
    }

    #[test]
    fn select_clusters_is_anchored() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "instances/int/clusters.yaml",
            "clusters:\n  - name: prod-1\n  - name: prod-2\n  - name: preprod-1",
        );
        let instance = Instance::load("int", layout_for(tmp.path())).unwrap();
        assert_eq!(instance.select_clusters("prod-.*").unwrap().len(), 2);
        assert_eq!(instance.select_clusters("prod-1").unwrap().len(), 1);
        assert_eq!(instance.select_clusters(".*").unwrap().len(), 3);
    }
}
