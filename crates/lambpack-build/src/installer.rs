use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use lambpack_core::InstallConfig;

/// Installs the packages listed in a dependency manifest into a target directory.
///
/// Production code uses [`DockerInstaller`], tests use mockall-generated mocks.
pub trait DependencyInstaller {
    fn install(&self, manifest: &Path, target_dir: &Path) -> Result<(), InstallError>;
}

/// Runs `pip install` inside the Lambda runtime image so that native wheels
/// match the execution platform rather than the host.
pub struct DockerInstaller<'a> {
    root: PathBuf,
    config: &'a InstallConfig,
}

impl<'a> DockerInstaller<'a> {
    /// `root` is mounted into the container; manifest and target must live under it.
    pub fn new(root: impl Into<PathBuf>, config: &'a InstallConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Full argument list passed to the container runtime.
    pub fn args(&self, manifest: &Path, target_dir: &Path) -> Result<Vec<String>, InstallError> {
        let mount = self.config.mount_point.trim_end_matches('/');
        let manifest_in_container = format!("{mount}/{}", self.container_relative(manifest)?);
        let target_in_container = format!("{mount}/{}", self.container_relative(target_dir)?);

        // Paths go through `sh -c`, so each one is quoted as a single word.
        let pip = format!(
            "pip install --no-cache-dir --target {} -r {}",
            shell_words::quote(&target_in_container),
            shell_words::quote(&manifest_in_container),
        );

        Ok(vec![
            "run".to_owned(),
            "--rm".to_owned(),
            "-v".to_owned(),
            format!("{}:{}", self.root.display(), self.config.mount_point),
            "--platform".to_owned(),
            self.config.platform.clone(),
            "--entrypoint".to_owned(),
            String::new(),
            self.config.image.clone(),
            "/bin/sh".to_owned(),
            "-c".to_owned(),
            pip,
        ])
    }

    /// First line of `<runtime> --version`, used by the doctor check.
    pub fn runtime_version(&self) -> Result<String, InstallError> {
        let output = Command::new(&self.config.runtime)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| InstallError::Spawn {
                runtime: self.config.runtime.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(InstallError::Failed {
                runtime: self.config.runtime.clone(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_owned())
    }

    fn container_relative(&self, path: &Path) -> Result<String, InstallError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|e| InstallError::OutsideMount {
                path: path.to_path_buf(),
                root: self.root.clone(),
                source: e,
            })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }
}

impl DependencyInstaller for DockerInstaller<'_> {
    fn install(&self, manifest: &Path, target_dir: &Path) -> Result<(), InstallError> {
        let args = self.args(manifest, target_dir)?;
        tracing::debug!(runtime = %self.config.runtime, ?args, "running dependency install");

        let status = Command::new(&self.config.runtime)
            .args(&args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| InstallError::Spawn {
                runtime: self.config.runtime.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(InstallError::Failed {
                runtime: self.config.runtime.clone(),
                status,
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("failed to run container runtime '{runtime}' (is it installed and on PATH?)")]
    Spawn {
        runtime: String,
        source: std::io::Error,
    },

    #[error("dependency install via '{runtime}' failed with {status}")]
    Failed { runtime: String, status: ExitStatus },

    #[error("{path} is outside the mounted root {root}")]
    OutsideMount {
        path: PathBuf,
        root: PathBuf,
        source: std::path::StripPrefixError,
    },
}
