//! Global constants used throughout the fleetrender codebase.
//!
//! This module contains the default directory-segment names of the config
//! repository layout, the reserved overlay identifier, and the numeric
//! constants shared across modules. Defining them centrally keeps the
//! on-disk conventions discoverable in one place.

use std::time::Duration;

/// Default name of the directory containing all instance directories.
pub const DEFAULT_INSTANCES_DIR: &str = "instances";

/// Default name of the directory containing all project directories.
pub const DEFAULT_PROJECTS_DIR: &str = "projects";

/// Default name of the directory containing application charts within a
/// project; also the name of the values subdirectory holding per-application
/// addon values.
pub const DEFAULT_APPS_DIR: &str = "applications";

/// Default name of the per-project values directory.
pub const DEFAULT_VALUES_DIR: &str = "values";

/// Default name of the cluster values directory below the values directory.
pub const DEFAULT_CLUSTERS_DIR: &str = "clusters";

/// Default name of the group values directory below the values directory.
pub const DEFAULT_GROUPS_DIR: &str = "groups";

/// Default path (relative to the root) of the shared charts directory.
pub const DEFAULT_SHARED_CHARTS_DIR: &str = "shared/charts";

/// Name of the project every application belongs to unless configured
/// otherwise. Also the project whose common overlays can be pulled in via
/// the `addDefaultCommonValues` / `addDefaultCommonSecrets` flags.
pub const DEFAULT_PROJECT: &str = "default";

/// Default namespace applications are rendered into.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Reserved identifier for overlay files that apply to every application in
/// a scope (`common.yaml` / `secrets-common.yaml`). An application must
/// never be named like this, the overlay lookup could not tell them apart.
pub const COMMON_ID: &str = "common";

/// The group every cluster implicitly belongs to, always at the lowest
/// priority position.
pub const ALL_GROUP: &str = "all";

/// Distinguished exit code for applications that are declared in the
/// configuration but have no chart directory on disk. Kept distinct from
/// helm's own exit codes so `--warn-notfound` can forgive exactly these.
pub const MISSING_APP_EXIT_CODE: i32 = 99;

/// Timeout for a single helm invocation (5 minutes).
///
/// Covers `helm template` as well as `helm dependency build`, which may
/// download chart archives over the network.
pub const HELM_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for git cleanup commands (60 seconds).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default CPU core count when detection fails.
///
/// Used as a fallback when `std::thread::available_parallelism()` returns an error.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Default number of concurrent render invocations.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(FALLBACK_CORE_COUNT, std::num::NonZero::get)
}
