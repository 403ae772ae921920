use super::command::{self, node_tool, CommandError};
use super::snapshot::LOCKFILES;
use crate::config::PackageManagerKind;
use crate::manifest::{DependencyRecord, ManifestEditor};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Applies and undoes dependency removals in the project
pub trait PackageManager {
    fn name(&self) -> &str;

    /// Remove the dependency from the manifest (and install tree)
    fn uninstall(&mut self, dependency: &DependencyRecord) -> Result<(), CommandError>;

    /// Bring installed packages back in line with the manifest
    fn sync(&mut self) -> Result<(), CommandError>;

    /// Files this manager may rewrite besides the manifest
    fn lockfiles(&self) -> Vec<PathBuf>;
}

/// npm, yarn and pnpm share the same shape: `<tool> <remove-verb> <name>` and
/// `<tool> install`.
pub struct NpmFamily {
    root: PathBuf,
    tool: &'static str,
    remove_verb: &'static str,
    lockfile: &'static str,
}

impl NpmFamily {
    pub fn npm(root: &Path) -> Self {
        Self::with_tool(root, "npm", "uninstall", "package-lock.json")
    }

    pub fn yarn(root: &Path) -> Self {
        Self::with_tool(root, "yarn", "remove", "yarn.lock")
    }

    pub fn pnpm(root: &Path) -> Self {
        Self::with_tool(root, "pnpm", "remove", "pnpm-lock.yaml")
    }

    fn with_tool(root: &Path, tool: &'static str, remove_verb: &'static str, lockfile: &'static str) -> Self {
        Self {
            root: root.to_path_buf(),
            tool,
            remove_verb,
            lockfile,
        }
    }

    /// The uninstall invocation, program first
    pub fn uninstall_command(&self, dependency: &str) -> Vec<String> {
        vec![
            node_tool(self.tool),
            self.remove_verb.to_string(),
            dependency.to_string(),
        ]
    }
}

impl PackageManager for NpmFamily {
    fn name(&self) -> &str {
        self.tool
    }

    fn uninstall(&mut self, dependency: &DependencyRecord) -> Result<(), CommandError> {
        let program = node_tool(self.tool);
        command::run(&program, &[self.remove_verb, &dependency.name], &self.root)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), CommandError> {
        let program = node_tool(self.tool);
        command::run(&program, &["install"], &self.root)?;
        Ok(())
    }

    fn lockfiles(&self) -> Vec<PathBuf> {
        let mut files = vec![self.root.join(self.lockfile)];
        if self.tool == "npm" {
            files.push(self.root.join("npm-shrinkwrap.json"));
        }
        files
    }
}

/// Edits the manifest text only; nothing is installed or resolved
pub struct ManifestOnly {
    manifest_path: PathBuf,
    /// Blocks a dependency is removed from besides its own
    sections: Vec<String>,
}

impl ManifestOnly {
    pub fn new(manifest_path: &Path) -> Self {
        Self {
            manifest_path: manifest_path.to_path_buf(),
            sections: Vec::new(),
        }
    }

    /// Also remove the name from these blocks, as `npm uninstall` does
    pub fn with_sections(mut self, sections: &[String]) -> Self {
        self.sections = sections.to_vec();
        self
    }
}

impl PackageManager for ManifestOnly {
    fn name(&self) -> &str {
        "manifest-only"
    }

    fn uninstall(&mut self, dependency: &DependencyRecord) -> Result<(), CommandError> {
        let editor = ManifestEditor::new(&self.manifest_path);
        let mut sections = vec![dependency.section.as_str()];
        sections.extend(
            self.sections
                .iter()
                .map(String::as_str)
                .filter(|s| *s != dependency.section),
        );

        let mut removed = false;
        for section in sections {
            if editor
                .remove(section, &dependency.name)
                .map_err(|e| CommandError::Other(e.to_string()))?
            {
                debug!("Removed {} from {}", dependency.name, section);
                removed = true;
            }
        }
        if !removed {
            return Err(CommandError::Other(format!(
                "{} has no entry for {} in {}",
                self.manifest_path.display(),
                dependency.name,
                dependency.section
            )));
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), CommandError> {
        Ok(())
    }

    fn lockfiles(&self) -> Vec<PathBuf> {
        let dir = self.manifest_path.parent().unwrap_or_else(|| Path::new("."));
        LOCKFILES.iter().map(|name| dir.join(name)).collect()
    }
}

/// Build the configured package manager for a project
pub fn for_kind(
    kind: PackageManagerKind,
    root: &Path,
    manifest_path: &Path,
    sections: &[String],
) -> Box<dyn PackageManager> {
    match kind {
        PackageManagerKind::Npm => Box::new(NpmFamily::npm(root)),
        PackageManagerKind::Yarn => Box::new(NpmFamily::yarn(root)),
        PackageManagerKind::Pnpm => Box::new(NpmFamily::pnpm(root)),
        PackageManagerKind::ManifestOnly => Box::new(ManifestOnly::new(manifest_path).with_sections(sections)),
    }
}
