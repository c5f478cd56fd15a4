//! fleetrender - configuration resolution and helm rendering for cluster
//! fleets.
//!
//! A GitOps repository describes many clusters running overlapping sets of
//! helm-charted applications. fleetrender resolves that description into
//! concrete (cluster, application) pairs and renders them, exactly the way
//! the cluster's deployment pipeline would, so changes can be reviewed as
//! rendered manifests before they merge.
//!
//! # Resolution Model
//!
//! An *instance* (for example `production` or `staging`) is a directory of
//! YAML files that are deep-merged into one configuration document. The
//! document defines a *group catalog* (named groups of application records,
//! `clusterGroupApps`) and a list of *clusters*. Each cluster subscribes to
//! groups in priority order, always starting with the implicit `all` group,
//! and may add direct applications or exclude inherited ones. Application
//! records met more than once are combined field by field, later (higher
//! priority) sources winning.
//!
//! Rendering an application layers overlay value files in a fixed
//! precedence order: the chart's own values and secrets, project-wide addon
//! files, group overlays in subscription order, and finally
//! cluster-specific overlays. The list is handed to `helm template`
//! together with a small set of `--set` parameters identifying the cluster
//! and instance.
//!
//! # Core Modules
//!
//! - [`layout`] - Directory layout and path derivation
//! - [`merge`] - Recursive mapping merge underlying everything
//! - [`instance`] - Instance loading and YAML aggregation
//! - [`groups`] - Group catalog and priority-ordered resolution
//! - [`cluster`] - Cluster records and overlay path enumeration
//! - [`application`] - Application records and field-wise combination
//! - [`render`] - Render planning and parallel batch execution
//! - [`helm`] / [`git`] - Subprocess wrappers for the external tools
//! - [`cli`] - The command-line surface
//!
//! # Example
//!
//! ```bash
//! fleetrender --instance production render 'edge-.*' ingress
//! ```

pub mod application;
pub mod cli;
pub mod cluster;
pub mod constants;
pub mod core;
pub mod git;
pub mod groups;
pub mod helm;
pub mod instance;
pub mod layout;
pub mod merge;
pub mod render;
pub mod selector;
