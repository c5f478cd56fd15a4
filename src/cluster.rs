//! Cluster resolution: effective group order, per-cluster application sets,
//! and overlay path enumeration.
//!
//! A cluster combines three layers of application definitions, lowest
//! priority first: the implicit `all` group, the configured groups in their
//! listed order, and the cluster's own direct application records. Direct
//! excludes are applied last. The resolved set is computed once at
//! construction (the inputs are immutable for the run, so eager computation
//! and memoization are equivalent) and reused by every query afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_yaml::Mapping;
use tracing::debug;

use crate::application::Application;
use crate::constants::{ALL_GROUP, DEFAULT_PROJECT};
use crate::core::{FleetError, Result};
use crate::groups::GroupCatalog;
use crate::layout::DirectoryLayout;
use crate::selector;

/// Raw config keys consumed by [`Cluster::from_config`]; everything else is
/// copied verbatim into `extra`.
const KEY_NAME: &str = "name";
const KEY_GROUPS: &str = "groups";
const KEY_APPLICATIONS: &str = "applications";
const KEY_EXCLUDE_APPLICATIONS: &str = "excludeApplications";
const KEY_API: &str = "api";

/// One deployment target with its resolved application set.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Cluster name.
    pub name: String,
    /// Effective group membership, lowest priority first. Always starts
    /// with `all`; a configured leading `all` is not duplicated, but `all`
    /// elsewhere in the configured list is processed again at that higher
    /// position.
    pub groups: Vec<String>,
    /// API endpoint of the cluster, handed to the templates as an override
    /// value. Optional; absent endpoints render as an empty string.
    pub api: Option<String>,
    /// Remaining cluster config fields, verbatim.
    pub extra: Mapping,
    applications: BTreeMap<String, Application>,
}

impl Cluster {
    /// Builds a cluster from one record of the `clusters` section and
    /// resolves its application set against `catalog`.
    pub fn from_config(config: &Mapping, catalog: &GroupCatalog) -> Result<Self> {
        let name = config
            .get(KEY_NAME)
            .and_then(|v| v.as_str())
            .ok_or_else(|| FleetError::ConfigError {
                message: format!("cluster record without a '{KEY_NAME}' field: {config:?}"),
            })?
            .to_string();

        let mut groups = vec![ALL_GROUP.to_string()];
        if let Some(configured) = config.get(KEY_GROUPS) {
            let configured = configured
                .as_sequence()
                .and_then(|seq| {
                    seq.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| FleetError::ConfigError {
                    message: format!("cluster '{name}': 'groups' must be a list of names"),
                })?;
            // "all" is unconditionally the lowest-priority group; only a
            // *leading* configured "all" is deduplicated.
            let skip = usize::from(configured.first().is_some_and(|g| g == ALL_GROUP));
            groups.extend(configured.into_iter().skip(skip));
        }

        let mut direct_apps = Vec::new();
        if let Some(app_configs) = config.get(KEY_APPLICATIONS) {
            let app_configs = app_configs.as_sequence().ok_or_else(|| FleetError::ConfigError {
                message: format!("cluster '{name}': 'applications' must be a sequence"),
            })?;
            for app_config in app_configs {
                let app_config = app_config.as_mapping().ok_or_else(|| FleetError::ConfigError {
                    message: format!("cluster '{name}': application records must be mappings"),
                })?;
                direct_apps.push(Application::from_config(app_config)?);
            }
        }

        let excludes = match config.get(KEY_EXCLUDE_APPLICATIONS) {
            None => Vec::new(),
            Some(value) => value
                .as_sequence()
                .and_then(|seq| {
                    seq.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| FleetError::ConfigError {
                    message: format!(
                        "cluster '{name}': '{KEY_EXCLUDE_APPLICATIONS}' must be a list of names"
                    ),
                })?,
        };

        let api = match config.get(KEY_API) {
            None | Some(serde_yaml::Value::Null) => None,
            Some(value) => Some(
                value
                    .as_str()
                    .ok_or_else(|| FleetError::ConfigError {
                        message: format!("cluster '{name}': '{KEY_API}' must be a string"),
                    })?
                    .to_string(),
            ),
        };

        let mut extra = Mapping::new();
        for (key, value) in config {
            let recognized = matches!(
                key.as_str(),
                Some(KEY_NAME | KEY_GROUPS | KEY_APPLICATIONS | KEY_EXCLUDE_APPLICATIONS | KEY_API)
            );
            if !recognized {
                extra.insert(key.clone(), value.clone());
            }
        }

        let applications = Self::resolve(&name, &groups, &direct_apps, &excludes, catalog);

        Ok(Self {
            name,
            groups,
            api,
            extra,
            applications,
        })
    }

    /// Group layers first, then the cluster's direct definitions as the
    /// highest-priority layer, then the cluster-level excludes.
    fn resolve(
        name: &str,
        groups: &[String],
        direct_apps: &[Application],
        excludes: &[String],
        catalog: &GroupCatalog,
    ) -> BTreeMap<String, Application> {
        let mut applications = catalog.resolve_applications(groups);

        for app in direct_apps {
            let resolved = match applications.get(&app.name) {
                Some(existing) => existing.combine(app),
                None => app.clone(),
            };
            applications.insert(app.name.clone(), resolved);
        }

        for exclude in excludes {
            if applications.remove(exclude).is_some() {
                debug!(target: "resolver", "cluster '{}' excludes application '{}'", name, exclude);
            }
        }

        debug!(
            target: "resolver",
            "cluster '{}' resolved {} applications from groups {:?}",
            name,
            applications.len(),
            groups
        );
        applications
    }

    /// The resolved application set, keyed by name.
    pub fn applications(&self) -> &BTreeMap<String, Application> {
        &self.applications
    }

    /// Applications whose names fully match the anchored `pattern`.
    pub fn select_applications(&self, pattern: &str) -> Result<Vec<&Application>> {
        let matcher = selector::anchored(pattern)?;
        Ok(self.applications.values().filter(|app| matcher.is_match(&app.name)).collect())
    }

    /// Overlay files for `app` from the values directories of every group
    /// this cluster belongs to, in group-priority order.
    ///
    /// Per group the candidates are, lowest precedence first: the default
    /// project's common values/secrets (each gated by the application's
    /// opt-in flag), the application project's common values/secrets, and
    /// the application-named values/secrets. Only files that exist are
    /// returned; the order of the returned list is the override precedence.
    pub fn app_group_values_file_paths(
        &self,
        layout: &DirectoryLayout,
        app: &Application,
    ) -> Vec<PathBuf> {
        let mut result = Vec::new();
        for group in &self.groups {
            result.extend(overlay_candidates(app, |project, file| {
                layout.group_values_file(project, group, file)
            }));
        }
        result
    }

    /// Overlay files for `app` from this cluster's own values directory.
    ///
    /// Same six-step candidate sequence as the group enumeration. Cluster
    /// overlays are the highest-precedence layer and belong after all group
    /// overlays in the final file list.
    pub fn app_cluster_values_file_paths(
        &self,
        layout: &DirectoryLayout,
        app: &Application,
    ) -> Vec<PathBuf> {
        overlay_candidates(app, |project, file| {
            layout.cluster_values_file(project, &self.name, file)
        })
    }
}

/// The six-step overlay candidate sequence for one scope directory,
/// filtered down to the files that exist.
fn overlay_candidates(
    app: &Application,
    path_for: impl Fn(&str, &str) -> PathBuf,
) -> Vec<PathBuf> {
    let common_values = DirectoryLayout::values_filename(crate::constants::COMMON_ID);
    let common_secrets = DirectoryLayout::secrets_filename(crate::constants::COMMON_ID);
    let app_values = DirectoryLayout::values_filename(&app.name);
    let app_secrets = DirectoryLayout::secrets_filename(&app.name);

    let mut candidates = Vec::with_capacity(6);
    if app.adds_default_common_values() {
        candidates.push(path_for(DEFAULT_PROJECT, &common_values));
    }
    if app.adds_default_common_secrets() {
        candidates.push(path_for(DEFAULT_PROJECT, &common_secrets));
    }
    candidates.push(path_for(&app.project, &common_values));
    candidates.push(path_for(&app.project, &common_secrets));
    candidates.push(path_for(&app.project, &app_values));
    candidates.push(path_for(&app.project, &app_secrets));

    candidates.into_iter().filter(|path| path.is_file()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn catalog(yaml: &str) -> GroupCatalog {
        GroupCatalog::from_config(&serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn cluster(yaml: &str, catalog: &GroupCatalog) -> Cluster {
        Cluster::from_config(&serde_yaml::from_str(yaml).unwrap(), catalog).unwrap()
    }

    #[test]
    fn all_group_is_prepended() {
        let catalog = GroupCatalog::default();
        let c = cluster("name: c1\ngroups: [g1]", &catalog);
        assert_eq!(c.groups, vec!["all", "g1"]);
    }

    #[test]
    fn leading_all_is_not_duplicated() {
        let catalog = GroupCatalog::default();
        let c = cluster("name: c1\ngroups: [all, g1]", &catalog);
        assert_eq!(c.groups, vec!["all", "g1"]);
    }

    #[test]
    fn non_leading_all_is_reprocessed_at_higher_priority() {
        let catalog = GroupCatalog::default();
        let c = cluster("name: c1\ngroups: [g1, all]", &catalog);
        assert_eq!(c.groups, vec!["all", "g1", "all"]);
    }

    #[test]
    fn no_groups_means_just_all() {
        let catalog = GroupCatalog::default();
        let c = cluster("name: c1", &catalog);
        assert_eq!(c.groups, vec!["all"]);
    }

    #[test]
    fn direct_applications_are_highest_priority() {
        let catalog = catalog(
            r"
all:
  applications:
    - name: echo
      replicas: 1
      labels:
        team: x
",
        );
        let c = cluster(
            r"
name: c1
applications:
  - name: echo
    replicas: 3
  - name: extra-app
",
            &catalog,
        );
        let echo = &c.applications()["echo"];
        assert_eq!(echo.extra.get("replicas"), Some(&serde_yaml::Value::from(3)));
        // group-layer mapping values survive under a direct override
        assert!(echo.extra.contains_key("labels"));
        assert!(c.applications().contains_key("extra-app"));
    }

    #[test]
    fn cluster_excludes_are_applied_last() {
        let catalog = catalog("all:\n  applications:\n    - name: echo\n    - name: keepme");
        let c = cluster("name: c1\nexcludeApplications: [echo]", &catalog);
        assert!(!c.applications().contains_key("echo"));
        assert!(c.applications().contains_key("keepme"));
    }

    #[test]
    fn select_is_anchored() {
        let catalog =
            catalog("all:\n  applications:\n    - name: echo\n    - name: echo-server");
        let c = cluster("name: c1", &catalog);
        let selected = c.select_applications("echo").unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "echo");
        let all = c.select_applications(".*").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn api_and_extra_fields_are_copied() {
        let catalog = GroupCatalog::default();
        let c = cluster("name: c1\napi: https://api.c1.example:6443\nregion: eu-west", &catalog);
        assert_eq!(c.api.as_deref(), Some("https://api.c1.example:6443"));
        assert_eq!(c.extra.get("region"), Some(&serde_yaml::Value::from("eu-west")));
    }

    #[test]
    fn overlay_enumeration_order_and_gating() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DirectoryLayout::new(
            tmp.path(),
            "instances",
            "projects",
            "applications",
            "values",
            "clusters",
            "groups",
            "shared/charts",
        );

        // group scope: default-common plus app project files for group g1
        for (project, scope_dir, file) in [
            ("default", "groups/g1", "common.yaml"),
            ("default", "groups/g1", "secrets-common.yaml"),
            ("web", "groups/g1", "common.yaml"),
            ("web", "groups/g1", "echo.yaml"),
            ("web", "clusters/c1", "echo.yaml"),
            ("web", "clusters/c1", "secrets-echo.yaml"),
        ] {
            let dir = tmp.path().join("projects").join(project).join("values").join(scope_dir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(file), "{}\n").unwrap();
        }

        let catalog = catalog(
            r"
g1:
  applications:
    - name: echo
      project: web
      addDefaultCommonValues: true
",
        );
        let c = cluster("name: c1\ngroups: [g1]", &catalog);
        let echo = &c.applications()["echo"];

        let group_paths = c.app_group_values_file_paths(&layout, echo);
        let expected: Vec<PathBuf> = vec![
            layout.group_values_file("default", "g1", "common.yaml"),
            layout.group_values_file("web", "g1", "common.yaml"),
            layout.group_values_file("web", "g1", "echo.yaml"),
        ];
        assert_eq!(group_paths, expected);

        let cluster_paths = c.app_cluster_values_file_paths(&layout, echo);
        let expected: Vec<PathBuf> = vec![
            layout.cluster_values_file("web", "c1", "echo.yaml"),
            layout.cluster_values_file("web", "c1", "secrets-echo.yaml"),
        ];
        assert_eq!(cluster_paths, expected);
    }

    #[test]
    fn default_common_files_are_gated_by_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DirectoryLayout::new(
            tmp.path(),
            "instances",
            "projects",
            "applications",
            "values",
            "clusters",
            "groups",
            "shared/charts",
        );
        let dir = tmp.path().join("projects/default/values/groups/all");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("common.yaml"), "{}\n").unwrap();
        fs::write(dir.join("secrets-common.yaml"), "{}\n").unwrap();

        let catalog = catalog("all:\n  applications:\n    - name: echo\n      project: web");
        let c = cluster("name: c1", &catalog);
        let echo = &c.applications()["echo"];

        // flags unset: the existing default-common files must not appear
        assert!(c.app_group_values_file_paths(&layout, echo).is_empty());
    }
}
