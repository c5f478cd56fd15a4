//! Error handling for fleetrender.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`FleetError`]) for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! Construction-time errors (naming conflicts, missing instance directories,
//! unreadable documents) are unrecoverable and stop the whole run. Per-item
//! errors (a missing application chart, a failed helm invocation) are local
//! to one (cluster, application) pair and are aggregated into the batch
//! outcome instead of propagating (see [`crate::render`]).
//!
//! Use [`user_friendly_error`] at the binary boundary to convert any error
//! into an [`ErrorContext`] with a suggestion for the user.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for fleetrender operations.
///
/// Each variant carries the context needed to explain the failure to the
/// user: paths, names, and the stderr of failed external commands.
#[derive(Error, Debug)]
pub enum FleetError {
    /// An application uses the reserved common-overlay identifier as its
    /// name. The overlay lookup could not distinguish the application's
    /// `<name>.yaml` from the scope-wide `common.yaml`, so construction
    /// fails.
    #[error(
        "an application cannot be named '{name}': it conflicts with the '{name}.yaml' common overlay of groups and clusters"
    )]
    NamingConflict {
        /// The reserved identifier that was used as an application name
        name: String,
    },

    /// The instance's root directory does not exist.
    ///
    /// Surfaced before any resolution begins; nothing is retried.
    #[error("no instance directory: {path}")]
    InstanceNotFound {
        /// The instance directory that was expected to exist
        path: String,
    },

    /// A configuration document could not be read or parsed.
    ///
    /// Fatal for the whole aggregation; no partial configuration is ever
    /// produced.
    #[error("failed to load config document '{path}': {reason}")]
    DocumentError {
        /// Path of the offending document
        path: String,
        /// Why reading or parsing failed
        reason: String,
    },

    /// An application is declared in the configuration but its chart
    /// directory does not exist on disk.
    ///
    /// Recoverable per caller policy: `--fatal-errors` aborts the batch,
    /// otherwise the pair is recorded with the distinguished exit code
    /// [`crate::constants::MISSING_APP_EXIT_CODE`].
    #[error("application '{name}' not found in path '{path}'")]
    ApplicationMissing {
        /// Name of the missing application
        name: String,
        /// The chart path that was expected to exist
        path: String,
    },

    /// Helm executable not found in PATH.
    #[error("helm is not installed or not found in PATH")]
    HelmNotFound,

    /// A helm invocation failed during execution.
    #[error("helm {operation} failed")]
    HelmCommandError {
        /// The helm operation that failed (e.g. "template", "dependency build")
        operation: String,
        /// The error output of the helm command
        stderr: String,
    },

    /// A git cleanup command failed.
    #[error("git {operation} failed")]
    GitCommandError {
        /// The git operation that failed (e.g. "clean")
        operation: String,
        /// The error output of the git command
        stderr: String,
    },

    /// A cluster or application selector is not a valid regular expression.
    #[error("invalid selector '{pattern}': {reason}")]
    InvalidSelector {
        /// The selector as given on the command line
        pattern: String,
        /// The regex compilation error
        reason: String,
    },

    /// A configuration section is structurally malformed (e.g. an
    /// application record without a `name`).
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the malformed section
        message: String,
    },
}

/// Convenience result alias used throughout the resolution engine.
pub type Result<T> = std::result::Result<T, FleetError>;

/// A user-facing wrapper that pairs an error with a suggestion and optional
/// details for display at the CLI boundary.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// An actionable suggestion shown to the user, if any
    pub suggestion: Option<String>,
    /// Additional detail lines (e.g. command stderr)
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps an error without suggestion or details.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attaches an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attaches additional details (shown dimmed below the error).
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error, details, and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            for line in details.lines() {
                eprintln!("  {}", line.dimmed());
            }
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("{} {}", "hint:".yellow().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nhint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Converts any error into an [`ErrorContext`] with a suggestion matched to
/// the concrete [`FleetError`] variant where possible.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast_ref::<FleetError>() {
        Some(FleetError::InstanceNotFound { .. }) => ErrorContext::new(error).with_suggestion(
            "check the --instance name and the --root / --instances-dir flags; the instance directory must exist",
        ),
        Some(FleetError::NamingConflict { .. }) => ErrorContext::new(error)
            .with_suggestion("rename the application in the clusterGroupApps/clusters config"),
        Some(FleetError::HelmNotFound) => ErrorContext::new(error)
            .with_suggestion("install helm from https://helm.sh/ or pass --helm /path/to/helm"),
        Some(FleetError::HelmCommandError { stderr, .. }) => {
            let details = stderr.clone();
            ErrorContext::new(error).with_details(details)
        }
        Some(FleetError::InvalidSelector { .. }) => ErrorContext::new(error)
            .with_suggestion("selectors are anchored regular expressions, e.g. 'prod-.*'"),
        Some(FleetError::DocumentError { .. }) => ErrorContext::new(error)
            .with_suggestion("fix or remove the offending document; aggregation never produces partial results"),
        _ => ErrorContext::new(error),
    }
}
