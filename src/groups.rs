//! Group membership catalog and the group-priority resolution fold.
//!
//! The `clusterGroupApps` section of the configuration associates named
//! groups with the applications they contribute and the application names
//! they exclude again. Clusters opt into groups, and the order of that
//! membership is a priority order: later groups override (and may exclude)
//! what earlier groups contributed.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::application::Application;
use crate::core::{FleetError, Result};

/// A named, reusable bundle of application definitions and excludes.
#[derive(Debug, Clone)]
pub struct Group {
    /// Group name as used in cluster membership lists.
    pub name: String,
    /// Member applications, keyed by application name.
    pub applications: BTreeMap<String, Application>,
    /// Application names this group removes from lower-priority groups.
    pub excludes: Vec<String>,
}

/// All groups of an instance, built once from the `clusterGroupApps`
/// section and immutable afterwards.
///
/// The catalog is shared read-only between all clusters of an instance;
/// resolution never mutates it.
#[derive(Debug, Clone, Default)]
pub struct GroupCatalog {
    groups: BTreeMap<String, Group>,
}

impl GroupCatalog {
    /// Builds the catalog from the raw `clusterGroupApps` mapping:
    /// group-name -> `{ applications: [...], excludes: [...] }`.
    pub fn from_config(config: &Mapping) -> Result<Self> {
        let mut groups = BTreeMap::new();

        for (key, group_config) in config {
            let name = key.as_str().ok_or_else(|| FleetError::ConfigError {
                message: format!("group names must be strings, got: {key:?}"),
            })?;
            let group_config = group_config.as_mapping().ok_or_else(|| FleetError::ConfigError {
                message: format!("group '{name}' must be a mapping"),
            })?;

            let mut applications = BTreeMap::new();
            if let Some(app_configs) = group_config.get("applications") {
                let app_configs =
                    app_configs.as_sequence().ok_or_else(|| FleetError::ConfigError {
                        message: format!("group '{name}': 'applications' must be a sequence"),
                    })?;
                for app_config in app_configs {
                    let app_config =
                        app_config.as_mapping().ok_or_else(|| FleetError::ConfigError {
                            message: format!(
                                "group '{name}': application records must be mappings"
                            ),
                        })?;
                    let app = Application::from_config(app_config)?;
                    applications.insert(app.name.clone(), app);
                }
            }

            let excludes = match group_config.get("excludes") {
                None => Vec::new(),
                Some(value) => string_list(value).ok_or_else(|| FleetError::ConfigError {
                    message: format!("group '{name}': 'excludes' must be a list of names"),
                })?,
            };

            groups.insert(
                name.to_string(),
                Group {
                    name: name.to_string(),
                    applications,
                    excludes,
                },
            );
        }

        Ok(Self { groups })
    }

    /// Member applications of `group`; empty for unknown group names.
    pub fn group_applications(&self, group: &str) -> Option<&BTreeMap<String, Application>> {
        self.groups.get(group).map(|g| &g.applications)
    }

    /// Exclude list of `group`; empty for unknown group names.
    pub fn group_excludes(&self, group: &str) -> &[String] {
        self.groups.get(group).map_or(&[], |g| g.excludes.as_slice())
    }

    /// Resolves the application set for an ordered group list.
    ///
    /// `groups` is ordered from lowest to highest priority. Each group's
    /// members are combined on top of what earlier groups contributed
    /// (same-name definitions merge via [`Application::combine`]); then the
    /// group's excludes are applied. Excludes therefore only remove
    /// applications contributed by groups of equal or lower priority - a
    /// later group can re-add an excluded name.
    pub fn resolve_applications(&self, groups: &[String]) -> BTreeMap<String, Application> {
        let mut result: BTreeMap<String, Application> = BTreeMap::new();

        for group in groups {
            if let Some(applications) = self.group_applications(group) {
                for (name, app) in applications {
                    let resolved = match result.get(name) {
                        Some(existing) => existing.combine(app),
                        None => app.clone(),
                    };
                    result.insert(name.clone(), resolved);
                }
            }

            for exclude in self.group_excludes(group) {
                if result.remove(exclude).is_some() {
                    debug!(target: "resolver", "group '{}' excludes application '{}'", group, exclude);
                }
            }
        }

        result
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_sequence()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
