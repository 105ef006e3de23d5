use std::fs::File;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes every file under `source_dir` into a deflate-compressed zip at `archive`.
///
/// Entry names are paths relative to `source_dir` with `/` separators, in
/// directory walk order. Directories themselves get no entries. Returns the
/// entry names in the order they were written.
pub fn write_archive(source_dir: &Path, archive: &Path) -> Result<Vec<String>, ArchiveError> {
    let file = File::create(archive).map_err(|e| ArchiveError::Create {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let base_options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::new();
    for entry in WalkDir::new(source_dir).follow_links(true) {
        let entry = entry.map_err(|e| ArchiveError::Walk {
            path: source_dir.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry_name(source_dir, path)?;
        let options = with_permissions(base_options, &entry);

        zip.start_file(name.as_str(), options)
            .map_err(|e| ArchiveError::Zip {
                entry: name.clone(),
                source: e,
            })?;
        let mut src = File::open(path).map_err(|e| ArchiveError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::io::copy(&mut src, &mut zip).map_err(|e| ArchiveError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(entry = %name, "added archive entry");
        entries.push(name);
    }

    zip.finish().map_err(|e| ArchiveError::Finish {
        path: archive.to_path_buf(),
        source: e,
    })?;

    Ok(entries)
}

fn entry_name(source_dir: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(source_dir)
        .map_err(|e| ArchiveError::Relative {
            path: path.to_path_buf(),
            source: e,
        })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn with_permissions(options: FileOptions, entry: &walkdir::DirEntry) -> FileOptions {
    use std::os::unix::fs::PermissionsExt;

    // Keep executable bits on console scripts and native helpers.
    match entry.metadata() {
        Ok(meta) => options.unix_permissions(meta.permissions().mode() & 0o7777),
        Err(e) => {
            tracing::debug!(path = %entry.path().display(), error = %e, "no metadata, using default permissions");
            options
        }
    }
}

#[cfg(not(unix))]
fn with_permissions(options: FileOptions, _entry: &walkdir::DirEntry) -> FileOptions {
    options
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to create archive {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk directory {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("{path} is not inside the staging directory")]
    Relative {
        path: PathBuf,
        source: std::path::StripPrefixError,
    },
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write archive entry {entry}")]
    Zip {
        entry: String,
        source: zip::result::ZipError,
    },
    #[error("failed to finalize archive {path}")]
    Finish {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}
