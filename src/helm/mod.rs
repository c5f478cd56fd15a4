//! Helm invocation wrapper.
//!
//! All helm executions go through [`HelmCommand`], a small builder over
//! [`tokio::process::Command`] with timeout handling, debug logging, and
//! captured output. A non-zero helm exit code is not an error at this
//! layer: the render batch aggregates exit codes per (cluster, application)
//! pair, so [`HelmCommand::execute`] returns the captured
//! [`HelmOutput`] either way and only failures to launch the process (or a
//! timeout) surface as errors.
//!
//! [`Helm::template`] additionally retries once after running
//! `helm dependency build` when the error output indicates missing chart
//! dependencies, the same detection ArgoCD uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_yaml::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::constants::HELM_TIMEOUT;
use crate::core::FleetError;

/// Captured result of one helm invocation.
#[derive(Debug)]
pub struct HelmOutput {
    /// Standard output of the helm process (the rendered manifests for
    /// `helm template`).
    pub stdout: String,
    /// Standard error of the helm process.
    pub stderr: String,
    /// Process exit code; 0 on success.
    pub code: i32,
}

impl HelmOutput {
    /// Whether the invocation exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.code == 0
    }
}

/// Builder for a single helm invocation.
pub struct HelmCommand {
    program: String,
    args: Vec<String>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl HelmCommand {
    /// Creates a builder for `program` (usually `"helm"` or an absolute
    /// path) with the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_duration: Some(HELM_TIMEOUT),
            context: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a custom timeout (`None` for no timeout).
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Sets a context label included in debug logs, used to tell
    /// concurrent render invocations apart.
    #[must_use]
    pub fn with_context_label(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Runs the command and captures its output.
    ///
    /// A non-zero exit code is reported through [`HelmOutput::code`], not
    /// as an error. Errors are reserved for processes that cannot be
    /// launched (missing binary) or that exceed the timeout.
    pub async fn execute(self) -> Result<HelmOutput> {
        let operation = self.args.first().cloned().unwrap_or_else(|| "unknown".to_string());

        if let Some(ref ctx) = self.context {
            debug!(target: "helm", "({}) Executing: {} {}", ctx, self.program, self.args.join(" "));
        } else {
            debug!(target: "helm", "Executing: {} {}", self.program, self.args.join(" "));
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        target: "helm",
                        "Command timed out after {} seconds: {} {}",
                        duration.as_secs(),
                        self.program,
                        self.args.join(" ")
                    );
                    return Err(FleetError::HelmCommandError {
                        operation,
                        stderr: format!(
                            "helm command timed out after {} seconds; try running it manually: {} {}",
                            duration.as_secs(),
                            self.program,
                            self.args.join(" ")
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future.await
        };

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FleetError::HelmNotFound.into());
            }
            Err(e) => {
                return Err(e)
                    .context(format!("failed to execute {} {}", self.program, operation));
            }
        };

        let result = HelmOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code().unwrap_or(-1),
        };
        trace!(target: "helm", "Command exited with code {}", result.code);
        Ok(result)
    }
}

/// Interface to the helm binary.
#[derive(Debug, Clone)]
pub struct Helm {
    program: String,
    debug: bool,
}

impl Helm {
    /// Creates a helm interface for `program`. With `debug` set, every
    /// invocation gets helm's `--debug` flag.
    pub fn new(program: impl Into<String>, debug: bool) -> Self {
        Self {
            program: program.into(),
            debug,
        }
    }

    /// Verifies the helm binary can be found.
    pub fn ensure_available(&self) -> crate::core::Result<()> {
        which::which(&self.program).map_err(|_| FleetError::HelmNotFound)?;
        Ok(())
    }

    /// Runs `helm template` for `chart`.
    ///
    /// `value_files` are passed in order via `-f` (later files win),
    /// `values` via `--set`/`--set-string` (strings as `--set-string` so
    /// helm does not reinterpret e.g. `"true"`, lists in helm's
    /// `key={a,b,c}` encoding), and `show_only` entries via
    /// `-s templates/<file>`. When helm reports missing chart
    /// dependencies, runs `helm dependency build` once and retries.
    pub async fn template(
        &self,
        release: &str,
        namespace: &str,
        chart: &Path,
        value_files: &[PathBuf],
        values: &BTreeMap<String, Value>,
        show_only: &[String],
    ) -> Result<HelmOutput> {
        let mut args: Vec<String> = vec![
            "template".into(),
            release.into(),
            chart.display().to_string(),
            "-n".into(),
            namespace.into(),
        ];

        for file in value_files {
            args.push("-f".into());
            args.push(file.display().to_string());
        }

        for file in show_only {
            args.push("-s".into());
            args.push(format!("templates/{file}"));
        }

        // helm treats --set and --set-string differently: --set flag=true
        // yields a boolean, --set-string flag=true a string. All values
        // arrive here as YAML values, so route strings through
        // --set-string and everything else through --set.
        let mut set_values = Vec::new();
        let mut set_string_values = Vec::new();
        for (key, value) in values {
            match value {
                Value::String(s) => set_string_values.push(format!("{key}={s}")),
                Value::Sequence(items) => {
                    let list = items.iter().map(scalar_to_string).collect::<Vec<_>>().join(",");
                    set_values.push(format!("{key}={{{list}}}"));
                }
                other => set_values.push(format!("{key}={}", scalar_to_string(other))),
            }
        }
        if !set_values.is_empty() {
            args.push("--set".into());
            args.push(set_values.join(","));
        }
        if !set_string_values.is_empty() {
            args.push("--set-string".into());
            args.push(set_string_values.join(","));
        }

        let output = self.invoke(args.clone(), release).await?;
        if is_missing_dependency_err(&output.stderr) {
            debug!(target: "helm", "({}) missing chart dependencies, running dependency build", release);
            let build = self.dependency_build(chart).await?;
            if !build.success() {
                return Ok(build);
            }
            return self.invoke(args, release).await;
        }
        Ok(output)
    }

    /// Runs `helm dependency build` for `chart`, pulling missing chart
    /// archives into its `charts/` directory.
    pub async fn dependency_build(&self, chart: &Path) -> Result<HelmOutput> {
        self.invoke(
            vec!["dependency".into(), "build".into(), chart.display().to_string()],
            chart.display().to_string(),
        )
        .await
    }

    async fn invoke(&self, mut args: Vec<String>, context: impl Into<String>) -> Result<HelmOutput> {
        if self.debug {
            args.push("--debug".into());
        }
        HelmCommand::new(&self.program).args(args).with_context_label(context).execute().await
    }
}

/// Error strings helm emits for missing chart dependencies; taken from
/// ArgoCD's helm wrapper.
fn is_missing_dependency_err(stderr: &str) -> bool {
    stderr.contains("found in requirements.yaml, but missing in charts")
        || stderr.contains("found in Chart.yaml, but missing in charts/ directory")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim_end().to_string(),
    }
}
