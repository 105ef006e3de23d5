use std::io::Write;
use std::path::{Path, PathBuf};

use lambpack_core::{PackageConfig, SizeReport};

use crate::archive::{self, ArchiveError};
use crate::installer::{DependencyInstaller, InstallError};
use crate::staging::{self, StagingError};

/// Result of a successful package run.
#[derive(Debug)]
pub struct PackageOutcome {
    pub archive_path: PathBuf,
    pub size: SizeReport,
    /// Archive entry names in the order they were written.
    pub entries: Vec<String>,
    /// Application files and data directory that made it into staging.
    pub included: Vec<String>,
}

/// Builds a Lambda deployment archive from a working root.
///
/// All paths in `config` are resolved against `root`; the installer is
/// handed absolute paths under `root`.
pub struct Packager<'a, I: DependencyInstaller> {
    root: PathBuf,
    config: &'a PackageConfig,
    installer: I,
}

impl<'a, I: DependencyInstaller> Packager<'a, I> {
    pub fn new(root: impl Into<PathBuf>, config: &'a PackageConfig, installer: I) -> Self {
        Self {
            root: root.into(),
            config,
            installer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(&self.config.staging_dir)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join(&self.config.output)
    }

    /// Run the full pipeline: reset → install → copy → archive → report → cleanup.
    ///
    /// Progress lines go to `out`. The config is validated before anything is
    /// removed. An install failure returns immediately and leaves the staging
    /// directory behind.
    pub fn package<W: Write>(&self, out: &mut W) -> Result<PackageOutcome, PackageError> {
        self.config.validate()?;

        let staging_dir = self.staging_dir();
        let archive_path = self.archive_path();

        writeln!(out, "Creating Lambda deployment package...")?;
        staging::reset(&staging_dir, &archive_path)?;

        writeln!(out, "Installing dependencies for Lambda runtime...")?;
        let manifest = self.root.join(&self.config.manifest);
        self.installer.install(&manifest, &staging_dir)?;
        tracing::info!(target_dir = %staging_dir.display(), "dependencies installed");

        writeln!(out, "Copying application files...")?;
        let mut included =
            staging::copy_app_files(&self.root, &staging_dir, &self.config.app_files)?;
        for name in &included {
            writeln!(out, "  - {name}")?;
        }
        if staging::copy_data_dir(&self.root, &staging_dir, &self.config.data_dir)? {
            let data = format!("{}/", self.config.data_dir.trim_end_matches('/'));
            writeln!(out, "  - {data}")?;
            included.push(data);
        }

        writeln!(out, "Creating zip file...")?;
        let entries = archive::write_archive(&staging_dir, &archive_path)?;

        let bytes = std::fs::metadata(&archive_path)
            .map_err(|e| PackageError::Metadata {
                path: archive_path.clone(),
                source: e,
            })?
            .len();
        let size = SizeReport::new(bytes, self.config.size_limit_mb);
        tracing::info!(entries = entries.len(), bytes, "archive written");

        writeln!(out, "Created {} ({size})", self.config.output)?;
        if size.exceeds_limit() {
            tracing::warn!(bytes, limit_mb = size.limit_mb, "archive exceeds upload limit");
        }
        writeln!(out, "{}", size.verdict())?;

        staging::remove(&staging_dir)?;
        writeln!(out, "Cleaned up temporary files")?;

        Ok(PackageOutcome {
            archive_path,
            size,
            entries,
            included,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("invalid package configuration")]
    Config(#[from] lambpack_core::Error),

    #[error("dependency installation failed")]
    Install(#[from] InstallError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to read size of {path}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write progress output")]
    Output(#[from] std::io::Error),
}
