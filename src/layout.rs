//! Directory layout of the config repository.
//!
//! All paths the resolver touches are derived here, so structural changes to
//! the repository only ever require changes to this module. The default
//! layout is:
//!
//! ```text
//! .
//! ├── instances
//! │   └── test
//! │       └── values.yaml
//! ├── projects
//! │   └── default
//! │       ├── applications
//! │       └── values
//! │           ├── applications
//! │           ├── clusters
//! │           └── groups
//! └── shared
//!     └── charts
//! ```
//!
//! Every segment name is configurable; only the `common` overlay identifier
//! is fixed (see [`crate::constants::COMMON_ID`]).

use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_APPS_DIR, DEFAULT_CLUSTERS_DIR, DEFAULT_GROUPS_DIR, DEFAULT_INSTANCES_DIR,
    DEFAULT_PROJECTS_DIR, DEFAULT_SHARED_CHARTS_DIR, DEFAULT_VALUES_DIR,
};

/// Value object deriving every path in the config repository.
///
/// Two layouts with identical fields derive identical paths; the type holds
/// no state beyond its configuration and all methods are pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    root: PathBuf,
    instances: String,
    projects: String,
    apps: String,
    values: String,
    clusters: String,
    groups: String,
    shared: String,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self::new(
            ".",
            DEFAULT_INSTANCES_DIR,
            DEFAULT_PROJECTS_DIR,
            DEFAULT_APPS_DIR,
            DEFAULT_VALUES_DIR,
            DEFAULT_CLUSTERS_DIR,
            DEFAULT_GROUPS_DIR,
            DEFAULT_SHARED_CHARTS_DIR,
        )
    }
}

impl DirectoryLayout {
    /// Creates a layout from a root directory and the seven segment names.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: impl Into<PathBuf>,
        instances: impl Into<String>,
        projects: impl Into<String>,
        apps: impl Into<String>,
        values: impl Into<String>,
        clusters: impl Into<String>,
        groups: impl Into<String>,
        shared: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            instances: instances.into(),
            projects: projects.into(),
            apps: apps.into(),
            values: values.into(),
            clusters: clusters.into(),
            groups: groups.into(),
            shared: shared.into(),
        }
    }

    /// The repository root all other paths live below.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing all instance directories.
    pub fn instances(&self) -> PathBuf {
        self.root.join(&self.instances)
    }

    /// Directory containing all project directories.
    pub fn projects(&self) -> PathBuf {
        self.root.join(&self.projects)
    }

    /// Directory containing the shared charts usable by multiple projects.
    pub fn shared(&self) -> PathBuf {
        self.root.join(&self.shared)
    }

    /// Path to the directory of a specific instance.
    pub fn instance(&self, instance: &str) -> PathBuf {
        self.instances().join(instance)
    }

    /// Path to the directory of a specific project.
    pub fn project(&self, project: &str) -> PathBuf {
        self.projects().join(project)
    }

    /// Path to the chart directory of an application within a project.
    pub fn app(&self, project: &str, app: &str) -> PathBuf {
        self.project(project).join(&self.apps).join(app)
    }

    /// Path to the directory of a shared chart.
    pub fn shared_chart(&self, chart: &str) -> PathBuf {
        self.shared().join(chart)
    }

    /// Path to a project's application addon values directory.
    pub fn apps_addon_values(&self, project: &str) -> PathBuf {
        self.project(project).join(&self.values).join(&self.apps)
    }

    /// Path to the values directory of a specific group within a project.
    pub fn group_values(&self, project: &str, group: &str) -> PathBuf {
        self.project(project).join(&self.values).join(&self.groups).join(group)
    }

    /// Path to the values directory of a specific cluster within a project.
    pub fn cluster_values(&self, project: &str, cluster: &str) -> PathBuf {
        self.project(project).join(&self.values).join(&self.clusters).join(cluster)
    }

    /// Path to a file in a group values directory.
    pub fn group_values_file(&self, project: &str, group: &str, file: &str) -> PathBuf {
        self.group_values(project, group).join(file)
    }

    /// Path to a file in a cluster values directory.
    pub fn cluster_values_file(&self, project: &str, cluster: &str, file: &str) -> PathBuf {
        self.cluster_values(project, cluster).join(file)
    }

    /// Path to a file in a project's application addon values directory.
    pub fn apps_addon_values_file(&self, project: &str, file: &str) -> PathBuf {
        self.apps_addon_values(project).join(file)
    }

    /// Filename of the values overlay for `id` (an application name or the
    /// common identifier).
    pub fn values_filename(id: &str) -> String {
        format!("{id}.yaml")
    }

    /// Filename of the secrets overlay for `id`.
    pub fn secrets_filename(id: &str) -> String {
        format!("secrets-{id}.yaml")
    }
}
