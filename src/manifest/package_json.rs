use super::{DependencyRecord, ManifestError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Declared dependencies of one `package.json`, in manifest order
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    records: Vec<DependencyRecord>,
}

impl Manifest {
    /// Load the given dependency blocks from a manifest file
    pub fn load(path: &Path, sections: &[String]) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse_str(path, &contents, sections)
    }

    /// Parse manifest text; `path` is only used for error context
    pub fn parse_str(path: &Path, contents: &str, sections: &[String]) -> Result<Self, ManifestError> {
        let root: Value = serde_json::from_str(contents).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let root = root.as_object().ok_or_else(|| ManifestError::Malformed {
            path: path.to_path_buf(),
            reason: "top level is not an object".to_string(),
        })?;

        let mut records = Vec::new();

        for section in sections {
            let block = match root.get(section) {
                None | Some(Value::Null) => continue,
                Some(Value::Object(block)) => block,
                Some(_) => {
                    return Err(ManifestError::Malformed {
                        path: path.to_path_buf(),
                        reason: format!("\"{}\" is not an object", section),
                    })
                }
            };

            for (name, range) in block {
                let declared_range = range.as_str().ok_or_else(|| ManifestError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("\"{}\" in \"{}\" has a non-string version", name, section),
                })?;

                records.push(DependencyRecord {
                    name: name.clone(),
                    declared_range: declared_range.to_string(),
                    section: section.clone(),
                });
            }
        }

        debug!("Loaded {} dependencies from {}", records.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&DependencyRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
