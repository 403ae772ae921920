use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a depsweep run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Manifest path, relative to the project root
    pub manifest: PathBuf,

    /// Manifest blocks whose entries are candidates for removal
    pub sections: Vec<String>,

    /// Dependency patterns that are never offered for removal
    pub retain: Vec<String>,

    /// Path patterns to exclude from scanning
    pub exclude: Vec<String>,

    /// Directory names skipped entirely while scanning
    pub ignore_dirs: Vec<String>,

    /// File extensions treated as source files
    pub extensions: Vec<String>,

    /// Scanner worker count (0 = one per core)
    pub jobs: usize,

    /// Transaction configuration
    pub transaction: TransactionConfig,

    /// Verification command configuration
    pub verify: VerifyConfig,

    /// Report configuration
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Prefix of the per-dependency work branch
    pub branch_prefix: String,

    /// Package manager used to uninstall and re-sync
    pub package_manager: PackageManagerKind,

    /// What happens to a verified branch
    pub finish: FinishMode,

    /// Reinstall packages after restoring the manifest on revert
    pub resync_on_revert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Shell command that must succeed with the dependency removed
    pub command: String,

    /// Hard limit for the command, in seconds
    pub timeout_secs: u64,

    /// How the command's outcome is judged
    pub mode: VerifyMode,

    /// In stays-up mode, how long the command must survive
    pub grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format: terminal, json
    pub format: String,

    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManagerKind {
    Npm,
    Yarn,
    Pnpm,
    /// Only edit the manifest; never touch installed packages
    ManifestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishMode {
    /// Fast-forward the base branch and delete the work branch
    Merge,
    /// Leave the work branch checked out as the new base
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyMode {
    /// Success means exit status 0 before the timeout
    ExitCode,
    /// Success means still running after the grace period (dev servers)
    StaysUp,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("package.json"),
            sections: vec!["dependencies".to_string()],
            retain: vec![],
            exclude: vec![],
            ignore_dirs: [
                "node_modules",
                ".git",
                "build",
                "dist",
                "coverage",
                ".next",
                "out",
                "__pycache__",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            extensions: ["js", "jsx", "ts", "tsx", "mjs", "cjs"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            jobs: 0,
            transaction: TransactionConfig::default(),
            verify: VerifyConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            branch_prefix: "depsweep".to_string(),
            package_manager: PackageManagerKind::Npm,
            finish: FinishMode::Merge,
            resync_on_revert: true,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            command: "npm run build".to_string(),
            timeout_secs: 300,
            mode: VerifyMode::ExitCode,
            grace_secs: 5,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: "terminal".to_string(),
            output: None,
        }
    }
}

impl VerifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".depsweep.yml",
            ".depsweep.yaml",
            ".depsweep.toml",
            "depsweep.yml",
            "depsweep.yaml",
            "depsweep.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Absolute manifest location for a project
    pub fn manifest_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.manifest)
    }

    /// Check if a path (relative to the project root) is excluded
    pub fn should_exclude(&self, relative: &Path) -> bool {
        let path_str = format!("/{}", relative.to_string_lossy().replace('\\', "/"));
        self.exclude
            .iter()
            .any(|pattern| glob_match(pattern, &path_str))
    }

    /// Check if a dependency must never be removed
    pub fn should_retain(&self, dependency: &str) -> bool {
        self.retain.iter().any(|p| glob_match(p, dependency))
    }

    /// Check if a directory name is on the ignore list
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }

    /// Check if an extension marks a source file
    pub fn is_source_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Wildcard matching where `*` matches any run of characters, `/` included.
///
/// `**/build/**` therefore matches any path with a `build` directory, and
/// `@types/*` matches every package in the `@types` scope.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_ti = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
