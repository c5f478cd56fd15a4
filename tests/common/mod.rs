//! Common test utilities for fleetrender integration tests.
//!
//! Builds temporary configuration repositories with the expected directory
//! layout and provides a stub helm binary so render tests never depend on
//! a real helm installation.

// Not every helper is used by every test file
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// A temporary configuration repository with the standard layout.
pub struct TestRepo {
    _temp_dir: TempDir, // keep alive for RAII cleanup
    root: PathBuf,
    bin_dir: PathBuf,
}

impl TestRepo {
    /// Creates an empty repository with `instances/`, `projects/` and a
    /// private `bin/` directory for stub executables.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("repo");
        let bin_dir = temp_dir.path().join("bin");
        fs::create_dir_all(root.join("instances"))?;
        fs::create_dir_all(root.join("projects"))?;
        fs::create_dir_all(&bin_dir)?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
            bin_dir,
        })
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a file below the repository root, creating parents.
    pub fn write_file(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Writes one YAML file into an instance directory.
    pub fn write_instance_file(&self, instance: &str, file: &str, content: &str) -> Result<()> {
        self.write_file(&format!("instances/{instance}/{file}"), content)
    }

    /// Creates an application chart directory with a minimal Chart.yaml.
    pub fn create_chart(&self, project: &str, app: &str) -> Result<()> {
        let chart = format!("projects/{project}/applications/{app}");
        self.write_file(
            &format!("{chart}/Chart.yaml"),
            &format!("apiVersion: v2\nname: {app}\nversion: 0.1.0\n"),
        )?;
        self.write_file(
            &format!("{chart}/templates/configmap.yaml"),
            "kind: ConfigMap\n",
        )
    }

    /// Installs a stub helm script that prints its release name and exits 0.
    #[cfg(unix)]
    pub fn stub_helm(&self) -> Result<PathBuf> {
        self.stub_helm_script(
            "#!/bin/sh\n\
             if [ \"$1\" = \"dependency\" ]; then exit 0; fi\n\
             echo \"rendered $2 from $3\"\n\
             exit 0\n",
        )
    }

    /// Installs a stub helm script that fails for releases whose name
    /// starts with `fail-`, with exit code 3.
    #[cfg(unix)]
    pub fn stub_helm_failing(&self) -> Result<PathBuf> {
        self.stub_helm_script(
            "#!/bin/sh\n\
             if [ \"$1\" = \"dependency\" ]; then exit 0; fi\n\
             case \"$2\" in\n\
               fail-*) echo \"render failed for $2\" >&2; exit 3;;\n\
             esac\n\
             echo \"rendered $2 from $3\"\n\
             exit 0\n",
        )
    }

    /// Installs a stub helm that reports missing chart dependencies until
    /// `helm dependency build` has run, then renders normally. The
    /// `dependency` branch records itself in the marker file returned by
    /// [`dependency_build_marker`](Self::dependency_build_marker).
    #[cfg(unix)]
    pub fn stub_helm_with_missing_dependency(&self) -> Result<PathBuf> {
        let marker = self.dependency_build_marker();
        self.stub_helm_script(&format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"dependency\" ]; then touch '{marker}'; exit 0; fi\n\
             if [ ! -f '{marker}' ]; then\n\
               echo 'Error: found in Chart.yaml, but missing in charts/ directory: redis' >&2\n\
               exit 1\n\
             fi\n\
             echo \"rendered $2 from $3\"\n\
             exit 0\n",
            marker = marker.display()
        ))
    }

    /// Marker file written by the stateful dependency stub.
    pub fn dependency_build_marker(&self) -> PathBuf {
        self.bin_dir.join("deps-built")
    }

    /// Installs a stub helm script that echoes its full argument list, for
    /// asserting flag passthrough.
    #[cfg(unix)]
    pub fn stub_helm_echo_args(&self) -> Result<PathBuf> {
        self.stub_helm_script(
            "#!/bin/sh\n\
             if [ \"$1\" = \"dependency\" ]; then exit 0; fi\n\
             echo \"helm-args: $*\"\n\
             exit 0\n",
        )
    }

    #[cfg(unix)]
    fn stub_helm_script(&self, script: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;
        let path = self.bin_dir.join("helm");
        fs::write(&path, script)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Runs fleetrender with `args` against this repository.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let binary = env!("CARGO_BIN_EXE_fleetrender");
        let output = Command::new(binary)
            .args(args)
            .arg("--root")
            .arg(&self.root)
            .env("NO_COLOR", "1")
            .env_remove("FLEETRENDER_INSTANCE")
            .env_remove("FLEETRENDER_ROOT")
            .output()
            .context("failed to run fleetrender")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Captured output of one fleetrender invocation.
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

/// A small but complete instance: two clusters, one group catalog, two
/// charts. `cluster-a` gets `web` and `worker`, `cluster-b` excludes
/// `worker`.
pub fn basic_instance(repo: &TestRepo, instance: &str) -> Result<()> {
    repo.write_instance_file(
        instance,
        "groups.yaml",
        r"
clusterGroupApps:
  all:
    applications:
      - name: web
  backend:
    applications:
      - name: worker
",
    )?;
    repo.write_instance_file(
        instance,
        "clusters.yaml",
        r"
clusters:
  - name: cluster-a
    api: https://a.example.com
    groups:
      - backend
  - name: cluster-b
    api: https://b.example.com
    groups:
      - backend
    excludeApplications:
      - worker
",
    )?;
    repo.create_chart("default", "web")?;
    repo.create_chart("default", "worker")?;
    Ok(())
}
