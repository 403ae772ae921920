use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lockfiles any supported package manager may rewrite
pub const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// Byte-exact record of a set of files taken before a removal.
///
/// A file that did not exist is recorded as absent, and restoring deletes it
/// again, so a lockfile created by an uninstall does not outlive a revert.
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    files: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl FileSnapshot {
    pub fn capture<I, P>(paths: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for path in paths {
            let path = path.as_ref().to_path_buf();
            if !seen.insert(path.clone()) {
                continue;
            }
            let contents = match std::fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(e),
            };
            files.push((path, contents));
        }

        debug!("Snapshot of {} files taken", files.len());
        Ok(Self { files })
    }

    /// Manifest, every known lockfile next to it, and any `extra` files
    pub fn capture_project(manifest: &Path, extra: &[PathBuf]) -> io::Result<Self> {
        let dir = manifest.parent().unwrap_or_else(|| Path::new("."));
        let mut paths = vec![manifest.to_path_buf()];
        paths.extend(LOCKFILES.iter().map(|name| dir.join(name)));
        paths.extend(extra.iter().cloned());
        Self::capture(paths)
    }

    /// Put every recorded file back exactly as it was
    pub fn restore(&self) -> io::Result<()> {
        for (path, contents) in &self.files {
            match contents {
                Some(bytes) => std::fs::write(path, bytes)?,
                None => match std::fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                },
            }
        }
        Ok(())
    }

    /// First recorded path whose current bytes differ from the snapshot
    pub fn first_mismatch(&self) -> Option<&Path> {
        self.files.iter().find_map(|(path, contents)| {
            let current = std::fs::read(path).ok();
            (current.as_ref() != contents.as_ref()).then_some(path.as_path())
        })
    }

    pub fn matches_disk(&self) -> bool {
        self.first_mismatch().is_none()
    }

    /// Recorded paths that existed at capture time or exist now
    pub fn touched_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|(path, contents)| contents.is_some() || path.exists())
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
