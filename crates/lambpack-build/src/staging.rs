use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Removes leftovers from a previous run and creates an empty staging directory.
pub fn reset(staging_dir: &Path, archive: &Path) -> Result<(), StagingError> {
    if staging_dir.exists() {
        std::fs::remove_dir_all(staging_dir).map_err(|e| StagingError::Cleanup {
            path: staging_dir.to_path_buf(),
            source: e,
        })?;
    }
    if archive.exists() {
        std::fs::remove_file(archive).map_err(|e| StagingError::Cleanup {
            path: archive.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::create_dir_all(staging_dir).map_err(|e| StagingError::Create {
        path: staging_dir.to_path_buf(),
        source: e,
    })
}

/// Copies each listed file from `root` into `staging_dir`, keeping its relative path.
///
/// Files that don't exist are skipped; returns the names that were copied.
pub fn copy_app_files(
    root: &Path,
    staging_dir: &Path,
    files: &[String],
) -> Result<Vec<String>, StagingError> {
    let mut copied = Vec::new();

    for name in files {
        let src = root.join(name);
        if !src.is_file() {
            tracing::debug!(file = %name, "application file not present, skipping");
            continue;
        }

        let dst = staging_dir.join(name);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StagingError::Create {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::copy(&src, &dst).map_err(|e| StagingError::CopyFile {
            path: src.clone(),
            source: e,
        })?;

        tracing::debug!(file = %name, "copied application file");
        copied.push(name.clone());
    }

    Ok(copied)
}

/// Recursively copies `root/<data_dir>` to `staging_dir/<data_dir>`.
///
/// Returns `false` without touching anything when the directory is absent.
pub fn copy_data_dir(
    root: &Path,
    staging_dir: &Path,
    data_dir: &str,
) -> Result<bool, StagingError> {
    let from = root.join(data_dir);
    if !from.is_dir() {
        tracing::debug!(dir = %data_dir, "data directory not present, skipping");
        return Ok(false);
    }
    let to = staging_dir.join(data_dir);

    for entry in WalkDir::new(&from).follow_links(true) {
        let entry = entry.map_err(|e| StagingError::Walk {
            path: from.clone(),
            source: e,
        })?;
        let path = entry.path();
        let relative = path.strip_prefix(&from).map_err(|e| StagingError::Relative {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| StagingError::Create {
                path: dest.clone(),
                source: e,
            })?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StagingError::Create {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            std::fs::copy(path, &dest).map_err(|e| StagingError::CopyFile {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
    }

    Ok(true)
}

/// Deletes the staging directory once the archive has been written.
pub fn remove(staging_dir: &Path) -> Result<(), StagingError> {
    std::fs::remove_dir_all(staging_dir).map_err(|e| StagingError::Cleanup {
        path: staging_dir.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("failed to remove {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not inside the copied directory")]
    Relative {
        path: PathBuf,
        source: std::path::StripPrefixError,
    },
    #[error("failed to walk directory {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}
