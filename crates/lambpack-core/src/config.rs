use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the optional config file looked up at the working root.
pub const CONFIG_FILE_NAME: &str = "lambpack.toml";

/// lambpack.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackagerConfig {
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub install: InstallConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Dependency manifest handed to pip
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Transient directory holding everything destined for the archive
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    /// Output archive name
    #[serde(default = "default_output")]
    pub output: String,
    /// Application files copied into the archive root when present
    #[serde(default = "default_app_files")]
    pub app_files: Vec<String>,
    /// Static data directory copied recursively when present
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Direct-upload limit in MiB; larger archives only trigger a warning
    #[serde(default = "default_size_limit_mb")]
    pub size_limit_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Container engine binary
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Image matching the target Lambda runtime
    #[serde(default = "default_image")]
    pub image: String,
    /// Target CPU architecture
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Where the working root is mounted inside the container
    #[serde(default = "default_mount_point")]
    pub mount_point: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            staging_dir: default_staging_dir(),
            output: default_output(),
            app_files: default_app_files(),
            data_dir: default_data_dir(),
            size_limit_mb: default_size_limit_mb(),
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            image: default_image(),
            platform: default_platform(),
            mount_point: default_mount_point(),
        }
    }
}

impl PackagerConfig {
    /// Load from lambpack.toml in the given directory, or return defaults if not found.
    pub fn load(root: &Path) -> crate::Result<Self> {
        let config_path = root.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path,
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Every configured path must stay inside the working root.
    pub fn validate(&self) -> crate::Result<()> {
        self.package.validate()
    }
}

impl PackageConfig {
    /// Paths must be relative, stay inside the working root, and keep user
    /// inputs out of the staging directory that each run deletes.
    pub fn validate(&self) -> crate::Result<()> {
        let manifest = validate_relative("manifest", &self.manifest)?;
        let staging = validate_relative("staging_dir", &self.staging_dir)?;
        let output = validate_relative("output", &self.output)?;
        let data_dir = validate_relative("data_dir", &self.data_dir)?;
        let app_files = self
            .app_files
            .iter()
            .map(|file| validate_relative("app_files", file).map(|path| (file, path)))
            .collect::<crate::Result<Vec<_>>>()?;

        let clash = |field, path: &str, reason| crate::Error::InvalidPath {
            field,
            path: path.to_owned(),
            reason,
        };

        if overlaps(&output, &staging) {
            return Err(clash("output", &self.output, "must not overlap staging_dir"));
        }
        if overlaps(&data_dir, &staging) {
            return Err(clash("data_dir", &self.data_dir, "must not overlap staging_dir"));
        }
        if overlaps(&manifest, &staging) {
            return Err(clash("manifest", &self.manifest, "must not overlap staging_dir"));
        }
        for (file, path) in &app_files {
            if overlaps(path, &staging) {
                return Err(clash("app_files", file, "must not overlap staging_dir"));
            }
            if *path == output {
                return Err(clash(
                    "output",
                    &self.output,
                    "must not replace an application file",
                ));
            }
        }
        if manifest == output {
            return Err(clash("output", &self.output, "must not replace the manifest"));
        }
        if overlaps(&output, &data_dir) {
            return Err(clash("output", &self.output, "must not overlap data_dir"));
        }

        Ok(())
    }
}

/// Canonicalize the working root every configured path is resolved against.
pub fn resolve_root(path: &Path) -> crate::Result<PathBuf> {
    path.canonicalize().map_err(|e| crate::Error::RootResolve {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Checks a configured path and returns it with `.` components dropped.
fn validate_relative(field: &'static str, path: &str) -> crate::Result<PathBuf> {
    let invalid = |reason| crate::Error::InvalidPath {
        field,
        path: path.to_owned(),
        reason,
    };

    if path.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }

    let parsed = Path::new(path);
    if parsed.is_absolute() || parsed.has_root() {
        return Err(invalid("must be relative to the working root"));
    }

    let mut normalized = PathBuf::new();
    for component in parsed.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("must not contain '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("must be relative to the working root"));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(invalid("must name a path below the working root"));
    }

    Ok(normalized)
}

/// One path equals or contains the other.
fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn default_manifest() -> String {
    "requirements.txt".to_owned()
}

fn default_staging_dir() -> String {
    "lambda-package".to_owned()
}

fn default_output() -> String {
    "lambda-deployment.zip".to_owned()
}

fn default_app_files() -> Vec<String> {
    ["server.py", "lambda_handler.py", "context.py", "resources.py"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_data_dir() -> String {
    "data".to_owned()
}

fn default_size_limit_mb() -> u64 {
    50
}

fn default_runtime() -> String {
    "docker".to_owned()
}

fn default_image() -> String {
    "public.ecr.aws/lambda/python:3.12".to_owned()
}

fn default_platform() -> String {
    "linux/amd64".to_owned()
}

fn default_mount_point() -> String {
    "/var/task".to_owned()
}
