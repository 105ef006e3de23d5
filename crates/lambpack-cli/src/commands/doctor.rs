use std::fmt;
use std::path::Path;

use lambpack_build::DockerInstaller;
use lambpack_core::{CONFIG_FILE_NAME, PackagerConfig, resolve_root};

pub fn doctor(root: &Path) -> anyhow::Result<()> {
    let root = resolve_root(root)?;
    let mut report = DoctorReport::default();

    // Config file
    let config = match PackagerConfig::load(&root) {
        Ok(config) => {
            report.config = if root.join(CONFIG_FILE_NAME).exists() {
                CheckResult::ok(&format!("Loaded {CONFIG_FILE_NAME}"))
            } else {
                CheckResult::ok("Not found, using defaults")
            };
            config
        }
        Err(e) => {
            report.config = CheckResult::fail(&format!("{:#}", anyhow::Error::from(e)));
            println!("{report}");
            anyhow::bail!("some checks failed, see above for details");
        }
    };

    // Dependency manifest
    let manifest = &config.package.manifest;
    report.manifest = if root.join(manifest).is_file() {
        CheckResult::ok(&format!("Found {manifest}"))
    } else {
        CheckResult::fail(&format!("{manifest} not found"))
    };

    // Container runtime
    let installer = DockerInstaller::new(&root, &config.install);
    report.runtime = match installer.runtime_version() {
        Ok(version) => CheckResult::ok(&version),
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    // Optional inputs are informational only
    report.app_files = config
        .package
        .app_files
        .iter()
        .map(|name| (name.clone(), root.join(name).is_file()))
        .collect();
    report.data_dir = (
        config.package.data_dir.clone(),
        root.join(&config.package.data_dir).is_dir(),
    );

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed, see above for details");
    }

    Ok(())
}

#[derive(Debug, Default)]
struct DoctorReport {
    config: CheckResult,
    manifest: CheckResult,
    runtime: CheckResult,
    app_files: Vec<(String, bool)>,
    data_dir: (String, bool),
}

impl DoctorReport {
    fn all_passed(&self) -> bool {
        self.config.passed && self.manifest.passed && self.runtime.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lambpack doctor")?;
        writeln!(f, "{:<20}{}", "Config", self.config)?;
        writeln!(f, "{:<20}{}", "Manifest", self.manifest)?;
        writeln!(f, "{:<20}{}", "Container runtime", self.runtime)?;

        if !self.app_files.is_empty() {
            writeln!(f, "Application files")?;
            for (name, present) in &self.app_files {
                let state = if *present { "present" } else { "absent, skipped" };
                writeln!(f, "  {name:<18}{state}")?;
            }
        }
        let (data_dir, present) = &self.data_dir;
        if !data_dir.is_empty() {
            let state = if *present { "present" } else { "absent, skipped" };
            writeln!(f, "{:<20}{state}", format!("{data_dir}/"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct CheckResult {
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "OK" } else { "FAIL" };
        write!(f, "[{mark}] {}", self.detail)
    }
}
