//! Core types and configuration for lambpack.
//!
//! This crate defines the `lambpack.toml` schema ([`PackagerConfig`]),
//! archive size reporting ([`SizeReport`]), and shared error types.

pub mod config;
pub mod error;
pub mod size;

pub use config::{CONFIG_FILE_NAME, InstallConfig, PackageConfig, PackagerConfig, resolve_root};
pub use error::{Error, Result};
pub use size::{BYTES_PER_MB, SizeReport};
