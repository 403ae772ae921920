use crate::config::Config;
use crate::queue::{ErrorQueueItem, ErrorSink};
use ignore::WalkBuilder;
use miette::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Represents a discovered source file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Absolute path to the file
    pub path: PathBuf,

    /// Path relative to the scanned root
    pub relative: PathBuf,
}

impl SourceFile {
    pub fn new(path: PathBuf, relative: PathBuf) -> Self {
        Self { path, relative }
    }
}

/// File finder for discovering source files in a project
pub struct FileFinder<'a> {
    config: &'a Config,
    errors: Option<ErrorSink>,
}

impl<'a> FileFinder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            errors: None,
        }
    }

    /// Report unreadable directories to the error queue
    pub fn with_errors(mut self, sink: ErrorSink) -> Self {
        self.errors = Some(sink);
        self
    }

    /// Find all source files under `root`, sorted by path
    pub fn find_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        debug!("Scanning for files in: {}", root.display());

        if !root.is_dir() {
            return Err(miette::miette!("Not a directory: {}", root.display()));
        }

        let config = self.config.clone();
        let walker = WalkBuilder::new(root)
            .hidden(true)           // Skip hidden files
            .git_ignore(true)       // Respect .gitignore
            .git_global(false)
            .git_exclude(true)      // Respect .git/info/exclude
            .ignore(true)           // Respect .ignore files
            .parents(false)
            .follow_links(false)    // Don't follow symlinks
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                !(is_dir && config.is_ignored_dir(&entry.file_name().to_string_lossy()))
            })
            .build();

        let mut files = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    if let Some(sink) = &self.errors {
                        let path = error_path(&err).unwrap_or_else(|| root.to_path_buf());
                        sink.push(ErrorQueueItem::scan(&path, err.to_string()));
                    }
                    continue;
                }
            };

            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            let is_source = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| self.config.is_source_extension(e))
                .unwrap_or(false);
            if !is_source {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            if self.config.should_exclude(&relative) {
                trace!("Excluded: {}", relative.display());
                continue;
            }

            files.push(SourceFile::new(path.to_path_buf(), relative));
        }

        files.sort();
        debug!("Found {} files", files.len());
        Ok(files)
    }
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}
