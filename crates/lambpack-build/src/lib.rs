//! Dependency installation, staging, and archiving for lambpack.
//!
//! # Package pipeline
//!
//! ```text
//! lambpack package
//!   1. Reset    ── remove lambda-package/ and lambda-deployment.zip
//!   2. Install  ── docker run ... pip install --target lambda-package/
//!   3. Copy     ── fixed app files, skipped when absent
//!   4. Data     ── data/ → lambda-package/data/, skipped when absent
//!   5. Archive  ── walk lambda-package/ → lambda-deployment.zip (deflate)
//!   6. Report   ── size in MiB, warn above the limit, remove lambda-package/
//! ```
//!
//! A failed install stops the pipeline before any copy and leaves the
//! staging directory on disk for inspection.

pub mod archive;
pub mod installer;
pub mod packager;
pub mod staging;

pub use installer::{DependencyInstaller, DockerInstaller, InstallError};
pub use packager::{PackageError, PackageOutcome, Packager};
