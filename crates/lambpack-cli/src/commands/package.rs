use lambpack_build::{DockerInstaller, Packager};
use lambpack_core::{PackagerConfig, resolve_root};
use std::path::Path;

/// Build the deployment archive for the project at `root`.
pub fn package(root: &Path) -> anyhow::Result<()> {
    let root = resolve_root(root)?;
    let config = PackagerConfig::load(&root)?;

    let installer = DockerInstaller::new(&root, &config.install);
    let packager = Packager::new(&root, &config.package, installer);

    let mut stdout = std::io::stdout().lock();
    let outcome = packager.package(&mut stdout)?;

    tracing::debug!(
        archive = %outcome.archive_path.display(),
        entries = outcome.entries.len(),
        "package complete"
    );

    Ok(())
}
