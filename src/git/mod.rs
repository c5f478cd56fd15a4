//! Git cleanup wrapper.
//!
//! Rendering pulls chart dependency archives into `charts/` directories and
//! other gitignored artifacts into the working tree. [`GitCli`] wraps the
//! `git clean` maintenance calls that run before and after a render batch
//! so consecutive runs start from a clean tree. Anything beyond cleanup
//! should use a proper git library instead of this wrapper.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::constants::GIT_TIMEOUT;
use crate::core::FleetError;

/// Interface to the git binary for maintenance tasks.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    /// Creates a git interface for `program` (usually `"git"`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Recursively deletes all files ignored by gitignores below `dir`
    /// (`git clean -d -X -f`).
    ///
    /// A failed cleanup is logged but not fatal; the render result does not
    /// depend on it.
    pub async fn clean_ignored(&self, dir: &Path) -> Result<()> {
        self.clean(dir, &["-d", "-X", "-f"]).await
    }

    async fn clean(&self, dir: &Path, params: &[&str]) -> Result<()> {
        debug!(target: "git", "Executing: {} clean {}", self.program, params.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.arg("clean")
            .args(params)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match timeout(GIT_TIMEOUT, cmd.output()).await {
            Ok(result) => {
                result.with_context(|| format!("failed to execute {} clean", self.program))?
            }
            Err(_) => {
                return Err(FleetError::GitCommandError {
                    operation: "clean".into(),
                    stderr: format!("git clean timed out after {} seconds", GIT_TIMEOUT.as_secs()),
                }
                .into());
            }
        };

        if !output.status.success() {
            warn!(
                target: "git",
                "git clean failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
