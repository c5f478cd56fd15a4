//! The extensible application record and its layer-merge operator.
//!
//! An [`Application`] describes one workload's rendering parameters. The
//! config format is deliberately open: besides the handful of fields the
//! engine recognizes, a record may carry arbitrary keys that are opaque to
//! the resolver and only become meaningful to the downstream templates.
//! Those keys live in the `extra` mapping, so the record stays a typed
//! struct without losing the "accept anything, merge structurally" contract.
//!
//! Definitions of the same application can originate from several layers
//! (the `all` group, further groups in priority order, the cluster itself).
//! [`Application::combine`] stacks a higher-priority layer onto a lower one,
//! field by field, deep-merging nested mappings and overwriting everything
//! else. The operator is pure: both operands are left untouched and a fresh
//! record is returned, so application values can be shared across concurrent
//! per-cluster resolutions without aliasing.

use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::constants::{COMMON_ID, DEFAULT_NAMESPACE, DEFAULT_PROJECT};
use crate::core::{FleetError, Result};
use crate::layout::DirectoryLayout;
use crate::merge::deep_merge_value;

/// Config keys the engine recognizes; everything else goes to `extra`.
const KEY_NAME: &str = "name";
const KEY_PROJECT: &str = "project";
const KEY_NAMESPACE: &str = "namespace";
const KEY_SHARED_CHART: &str = "sharedChart";
const KEY_ADD_DEFAULT_COMMON_VALUES: &str = "addDefaultCommonValues";
const KEY_ADD_DEFAULT_COMMON_SECRETS: &str = "addDefaultCommonSecrets";

/// One workload definition, resolvable and overridable across layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    /// Application name; also the chart directory name unless
    /// [`shared_chart`](Self::shared_chart) points elsewhere.
    pub name: String,
    /// Project the application belongs to. Defaults to `"default"`.
    pub project: String,
    /// Namespace the application is rendered into. Defaults to `"default"`.
    pub namespace: String,
    /// Name of a shared chart to render instead of a project-local chart.
    pub shared_chart: Option<String>,
    /// Whether the default project's `common.yaml` cluster/group overlays
    /// apply to this application.
    pub add_default_common_values: Option<bool>,
    /// Whether the default project's `secrets-common.yaml` overlays apply.
    pub add_default_common_secrets: Option<bool>,
    /// All unrecognized config keys, carried verbatim for the templates.
    pub extra: Mapping,
}

fn string_field(config: &Mapping, key: &str) -> Result<Option<String>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FleetError::ConfigError {
            message: format!("application field '{key}' must be a string, got: {other:?}"),
        }),
    }
}

fn bool_field(config: &Mapping, key: &str) -> Result<Option<bool>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(FleetError::ConfigError {
            message: format!("application field '{key}' must be a boolean, got: {other:?}"),
        }),
    }
}

impl Application {
    /// Builds an application from a raw config mapping.
    ///
    /// Recognized keys are lifted into typed fields, everything else is kept
    /// in [`extra`](Self::extra). Fails with [`FleetError::NamingConflict`]
    /// when the name is the reserved common identifier and with
    /// [`FleetError::ConfigError`] when `name` is missing or a recognized
    /// field has the wrong type.
    pub fn from_config(config: &Mapping) -> Result<Self> {
        let name = string_field(config, KEY_NAME)?.ok_or_else(|| FleetError::ConfigError {
            message: format!("application record without a '{KEY_NAME}' field: {config:?}"),
        })?;

        if name == COMMON_ID {
            return Err(FleetError::NamingConflict { name });
        }

        let mut extra = Mapping::new();
        for (key, value) in config {
            let recognized = matches!(
                key.as_str(),
                Some(
                    KEY_NAME
                        | KEY_PROJECT
                        | KEY_NAMESPACE
                        | KEY_SHARED_CHART
                        | KEY_ADD_DEFAULT_COMMON_VALUES
                        | KEY_ADD_DEFAULT_COMMON_SECRETS
                )
            );
            if !recognized {
                extra.insert(key.clone(), value.clone());
            }
        }

        Ok(Self {
            name,
            project: string_field(config, KEY_PROJECT)?.unwrap_or_else(|| DEFAULT_PROJECT.into()),
            namespace: string_field(config, KEY_NAMESPACE)?
                .unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            shared_chart: string_field(config, KEY_SHARED_CHART)?,
            add_default_common_values: bool_field(config, KEY_ADD_DEFAULT_COMMON_VALUES)?,
            add_default_common_secrets: bool_field(config, KEY_ADD_DEFAULT_COMMON_SECRETS)?,
            extra,
        })
    }

    /// Stacks `higher` (the higher-priority layer) onto `self`.
    ///
    /// `project` and `namespace` always exist on both layers (they are
    /// defaulted at construction), so the higher layer's value always wins,
    /// including a reset back to `"default"` when the higher record omitted
    /// the field. Optional fields only override when the higher layer sets
    /// them. Extra keys are deep-merged when both sides hold mappings and
    /// replaced otherwise; lists are replaced, never concatenated.
    ///
    /// Chaining is a left fold: `a.combine(&b).combine(&c)` equals folding
    /// an arbitrarily long priority-ordered layer list.
    #[must_use]
    pub fn combine(&self, higher: &Self) -> Self {
        let mut extra = self.extra.clone();
        for (key, higher_value) in &higher.extra {
            let merged = match extra.get(key) {
                Some(existing) => deep_merge_value(existing, higher_value),
                None => higher_value.clone(),
            };
            extra.insert(key.clone(), merged);
        }

        Self {
            name: higher.name.clone(),
            project: higher.project.clone(),
            namespace: higher.namespace.clone(),
            shared_chart: higher.shared_chart.clone().or_else(|| self.shared_chart.clone()),
            add_default_common_values: higher
                .add_default_common_values
                .or(self.add_default_common_values),
            add_default_common_secrets: higher
                .add_default_common_secrets
                .or(self.add_default_common_secrets),
            extra,
        }
    }

    /// Whether the default project's common values overlays apply.
    #[must_use]
    pub fn adds_default_common_values(&self) -> bool {
        self.add_default_common_values.unwrap_or(false)
    }

    /// Whether the default project's common secrets overlays apply.
    #[must_use]
    pub fn adds_default_common_secrets(&self) -> bool {
        self.add_default_common_secrets.unwrap_or(false)
    }

    /// Path to the chart directory: a shared chart when `sharedChart` is
    /// set, the project-local application directory otherwise.
    pub fn chart_path(&self, layout: &DirectoryLayout) -> PathBuf {
        match &self.shared_chart {
            Some(chart) => layout.shared_chart(chart),
            None => layout.app(&self.project, &self.name),
        }
    }

    /// Whether the chart directory exists on disk.
    pub fn exists(&self, layout: &DirectoryLayout) -> bool {
        self.chart_path(layout).is_dir()
    }

    /// The chart's own `values.yaml`, if present.
    pub fn values_path(&self, layout: &DirectoryLayout) -> Option<PathBuf> {
        existing_file(self.chart_path(layout).join("values.yaml"))
    }

    /// The chart's own `secrets.yaml`, if present.
    pub fn secrets_path(&self, layout: &DirectoryLayout) -> Option<PathBuf> {
        existing_file(self.chart_path(layout).join("secrets.yaml"))
    }

    /// The project-level `<name>.yaml` addon values file, if present.
    pub fn addon_values_path(&self, layout: &DirectoryLayout) -> Option<PathBuf> {
        existing_file(
            layout.apps_addon_values_file(&self.project, &DirectoryLayout::values_filename(&self.name)),
        )
    }

    /// The project-level `secrets-<name>.yaml` addon file, if present.
    pub fn addon_secrets_path(&self, layout: &DirectoryLayout) -> Option<PathBuf> {
        existing_file(
            layout
                .apps_addon_values_file(&self.project, &DirectoryLayout::secrets_filename(&self.name)),
        )
    }
}

fn existing_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}
