use std::fs::File;
use std::path::Path;

use lambpack_build::installer::{DependencyInstaller, InstallError};
use lambpack_build::{PackageError, Packager};
use lambpack_core::PackageConfig;
use mockall::mock;
use tempfile::TempDir;

mock! {
    Installer {}

    impl DependencyInstaller for Installer {
        fn install(&self, manifest: &Path, target_dir: &Path) -> Result<(), InstallError>;
    }
}

/// Working root from the end-to-end scenario: manifest, two of the four
/// application files, a data directory, and some files that must stay out.
fn scenario_root() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    std::fs::write(root.join("requirements.txt"), "").unwrap();
    std::fs::write(root.join("server.py"), "from fastapi import FastAPI\n").unwrap();
    std::fs::write(root.join("lambda_handler.py"), "def handler(e, c): pass\n").unwrap();
    std::fs::create_dir_all(root.join("data")).unwrap();
    std::fs::write(root.join("data/seed.json"), "{\"seed\": 1}").unwrap();
    std::fs::write(root.join("README.md"), "# not packaged").unwrap();
    std::fs::write(root.join(".env"), "SECRET=1").unwrap();
    std::fs::create_dir_all(root.join("tests")).unwrap();
    std::fs::write(root.join("tests/test_server.py"), "").unwrap();
    tmp
}

/// Installer that drops a fake package into the target directory.
fn fake_pip(times: usize) -> MockInstaller {
    let mut mock = MockInstaller::new();
    mock.expect_install()
        .times(times)
        .returning(|_manifest: &Path, target: &Path| {
            std::fs::create_dir_all(target.join("fastapi")).unwrap();
            std::fs::write(target.join("fastapi/__init__.py"), "").unwrap();
            std::fs::create_dir_all(target.join("fastapi-0.110.0.dist-info")).unwrap();
            std::fs::write(target.join("fastapi-0.110.0.dist-info/METADATA"), "").unwrap();
            Ok(())
        });
    mock
}

fn sorted_entries(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_owned).collect();
    names.sort();
    names
}

fn expected_scenario_entries() -> Vec<&'static str> {
    vec![
        "data/seed.json",
        "fastapi-0.110.0.dist-info/METADATA",
        "fastapi/__init__.py",
        "lambda_handler.py",
        "server.py",
    ]
}

// ── End-to-end ──

#[test]
fn package_builds_archive_with_deps_app_files_and_data() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));
    let mut out = Vec::new();

    let outcome = packager.package(&mut out).unwrap();

    assert_eq!(outcome.archive_path, tmp.path().join("lambda-deployment.zip"));
    assert!(outcome.archive_path.is_file());
    assert_eq!(sorted_entries(&outcome.archive_path), expected_scenario_entries());
    assert_eq!(
        outcome.included,
        vec!["server.py", "lambda_handler.py", "data/"]
    );
    assert_eq!(outcome.entries.len(), 5);
    assert!(!tmp.path().join("lambda-package").exists());
}

#[test]
fn package_never_includes_unlisted_files() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));

    let outcome = packager.package(&mut Vec::new()).unwrap();

    let entries = sorted_entries(&outcome.archive_path);
    for excluded in [
        "README.md",
        ".env",
        "tests/test_server.py",
        "requirements.txt",
        "context.py",
        "resources.py",
    ] {
        assert!(
            !entries.iter().any(|e| e == excluded),
            "{excluded} should not be archived"
        );
    }
}

#[test]
fn package_passes_manifest_and_staging_to_installer() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let root = tmp.path().to_path_buf();
    let mut mock = MockInstaller::new();
    mock.expect_install()
        .withf(move |manifest: &Path, target: &Path| {
            manifest == root.join("requirements.txt") && target == root.join("lambda-package")
        })
        .times(1)
        .returning(|_: &Path, target: &Path| {
            assert!(target.is_dir(), "staging must exist before install");
            Ok(())
        });
    let packager = Packager::new(tmp.path(), &config, mock);

    packager.package(&mut Vec::new()).unwrap();
}

#[test]
fn package_prints_progress_and_size_report() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));
    let mut out = Vec::new();

    packager.package(&mut out).unwrap();

    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("Creating Lambda deployment package..."));
    assert!(output.contains("Installing dependencies for Lambda runtime..."));
    assert!(output.contains("Copying application files..."));
    assert!(output.contains("  - server.py\n"));
    assert!(output.contains("  - lambda_handler.py\n"));
    assert!(output.contains("  - data/\n"));
    assert!(!output.contains("context.py"));
    assert!(output.contains("Creating zip file..."));
    assert!(output.contains("Created lambda-deployment.zip (0.00 MB)"));
    assert!(output.contains("Size OK for direct Lambda upload"));
    assert!(!output.contains("Warning"));
    assert!(output.trim_end().ends_with("Cleaned up temporary files"));
}

#[test]
fn package_warns_when_archive_exceeds_limit() {
    let tmp = scenario_root();
    let config = PackageConfig {
        size_limit_mb: 0,
        ..Default::default()
    };
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));
    let mut out = Vec::new();

    let outcome = packager.package(&mut out).unwrap();

    let output = String::from_utf8(out).unwrap();
    assert!(outcome.size.exceeds_limit());
    assert!(output.contains("Warning: archive exceeds 0 MB. Upload it via S3 instead."));
    assert!(!output.contains("Size OK"));
    // Advisory only: the run still completes.
    assert!(outcome.archive_path.exists());
    assert!(!tmp.path().join("lambda-package").exists());
}

#[test]
fn package_reports_archive_byte_size() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));

    let outcome = packager.package(&mut Vec::new()).unwrap();

    let on_disk = std::fs::metadata(&outcome.archive_path).unwrap().len();
    assert_eq!(outcome.size.bytes, on_disk);
    assert_eq!(outcome.size.limit_mb, 50);
}

#[test]
fn package_without_optional_inputs_archives_only_dependencies() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("requirements.txt"), "").unwrap();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));

    let outcome = packager.package(&mut Vec::new()).unwrap();

    assert!(outcome.included.is_empty());
    assert_eq!(
        sorted_entries(&outcome.archive_path),
        vec!["fastapi-0.110.0.dist-info/METADATA", "fastapi/__init__.py"]
    );
}

// ── Idempotence ──

#[test]
fn package_twice_produces_same_entries() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(2));

    let first = packager.package(&mut Vec::new()).unwrap();
    let first_entries = sorted_entries(&first.archive_path);
    let second = packager.package(&mut Vec::new()).unwrap();
    let second_entries = sorted_entries(&second.archive_path);

    assert_eq!(first_entries, second_entries);
    assert_eq!(second_entries, expected_scenario_entries());
    assert!(!tmp.path().join("lambda-package").exists());
}

#[test]
fn package_clears_leftovers_from_previous_run() {
    let tmp = scenario_root();
    let staging = tmp.path().join("lambda-package");
    std::fs::create_dir_all(&staging).unwrap();
    std::fs::write(staging.join("stale.py"), "").unwrap();
    std::fs::write(tmp.path().join("lambda-deployment.zip"), "not a zip").unwrap();
    let config = PackageConfig::default();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));

    let outcome = packager.package(&mut Vec::new()).unwrap();

    let entries = sorted_entries(&outcome.archive_path);
    assert!(!entries.iter().any(|e| e == "stale.py"));
    assert_eq!(entries, expected_scenario_entries());
}

// ── Failure ──

#[test]
fn install_failure_aborts_before_copy_and_keeps_staging() {
    let tmp = scenario_root();
    let config = PackageConfig::default();
    let mut mock = MockInstaller::new();
    mock.expect_install().times(1).returning(|_: &Path, target: &Path| {
        std::fs::write(target.join("partial.txt"), "half installed").unwrap();
        Err(InstallError::Spawn {
            runtime: "docker".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    });
    let packager = Packager::new(tmp.path(), &config, mock);
    let mut out = Vec::new();

    let err = packager.package(&mut out).unwrap_err();

    assert!(matches!(err, PackageError::Install(InstallError::Spawn { .. })));
    let staging = tmp.path().join("lambda-package");
    assert!(staging.is_dir());
    assert!(staging.join("partial.txt").exists());
    assert!(!staging.join("server.py").exists());
    assert!(!staging.join("data").exists());
    assert!(!tmp.path().join("lambda-deployment.zip").exists());

    let output = String::from_utf8(out).unwrap();
    assert!(!output.contains("Copying application files..."));
}

#[cfg(unix)]
#[test]
fn install_failure_from_runtime_exit_status_is_fatal() {
    use lambpack_build::DockerInstaller;
    use lambpack_core::InstallConfig;

    let tmp = scenario_root();
    let root = tmp.path().canonicalize().unwrap();
    let config = PackageConfig::default();
    let install = InstallConfig {
        runtime: "false".to_owned(),
        ..Default::default()
    };
    let packager = Packager::new(&root, &config, DockerInstaller::new(&root, &install));

    let err = packager.package(&mut Vec::new()).unwrap_err();

    assert!(matches!(err, PackageError::Install(InstallError::Failed { .. })));
    assert!(root.join("lambda-package").is_dir());
    assert!(!root.join("lambda-deployment.zip").exists());
}

// ── Unsafe configuration ──

/// Installer that must never run because validation stops the pipeline first.
fn never_installs() -> MockInstaller {
    let mut mock = MockInstaller::new();
    mock.expect_install().times(0);
    mock
}

fn assert_scenario_untouched(root: &Path) {
    assert!(root.join("requirements.txt").is_file());
    assert!(root.join("server.py").is_file());
    assert!(root.join("lambda_handler.py").is_file());
    assert!(root.join("data/seed.json").is_file());
}

#[test]
fn staging_at_working_root_is_rejected_before_reset() {
    for staging in [".", "./"] {
        let tmp = scenario_root();
        let config = PackageConfig {
            staging_dir: staging.to_owned(),
            ..Default::default()
        };
        let packager = Packager::new(tmp.path(), &config, never_installs());
        let mut out = Vec::new();

        let err = packager.package(&mut out).unwrap_err();

        assert!(matches!(err, PackageError::Config(_)), "{staging:?}: {err:?}");
        assert!(out.is_empty());
        assert_scenario_untouched(tmp.path());
    }
}

#[test]
fn staging_equal_to_data_dir_is_rejected_before_reset() {
    let tmp = scenario_root();
    let config = PackageConfig {
        staging_dir: "data".to_owned(),
        ..Default::default()
    };
    let packager = Packager::new(tmp.path(), &config, never_installs());

    let err = packager.package(&mut Vec::new()).unwrap_err();

    assert!(matches!(err, PackageError::Config(_)));
    assert_scenario_untouched(tmp.path());
}

#[test]
fn staging_nested_in_data_dir_is_rejected_before_reset() {
    let tmp = scenario_root();
    std::fs::create_dir_all(tmp.path().join("data/build")).unwrap();
    std::fs::write(tmp.path().join("data/build/keep.json"), "{}").unwrap();
    let config = PackageConfig {
        staging_dir: "data/build".to_owned(),
        ..Default::default()
    };
    let packager = Packager::new(tmp.path(), &config, never_installs());

    let err = packager.package(&mut Vec::new()).unwrap_err();

    assert!(matches!(err, PackageError::Config(_)));
    assert!(tmp.path().join("data/build/keep.json").is_file());
}

#[test]
fn output_inside_staging_is_rejected() {
    let tmp = scenario_root();
    let config = PackageConfig {
        output: "lambda-package/out.zip".to_owned(),
        ..Default::default()
    };
    let packager = Packager::new(tmp.path(), &config, never_installs());

    let err = packager.package(&mut Vec::new()).unwrap_err();

    assert!(matches!(err, PackageError::Config(_)));
    assert!(!tmp.path().join("lambda-package").exists());
}

#[test]
fn custom_output_outside_staging_survives_cleanup() {
    let tmp = scenario_root();
    let config = PackageConfig {
        output: "dist/function.zip".to_owned(),
        ..Default::default()
    };
    std::fs::create_dir_all(tmp.path().join("dist")).unwrap();
    let packager = Packager::new(tmp.path(), &config, fake_pip(1));

    let outcome = packager.package(&mut Vec::new()).unwrap();

    assert_eq!(outcome.archive_path, tmp.path().join("dist/function.zip"));
    assert!(outcome.archive_path.is_file());
    assert_eq!(sorted_entries(&outcome.archive_path), expected_scenario_entries());
}
