// store.rs — DocumentStore: JSON file persistence for the plan document.
//
// The document is read, mutated by one command, and written back whole.
// Concurrent writers are caught with a version compare-and-swap: `save`
// takes the version the caller loaded and refuses to write if the file on
// disk has moved on since. Writes go to a sibling temp file that is then
// renamed over the original, so readers never see a half-written document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::document::PlanDocument;
use crate::error::PlanError;

/// Persistent store for a single plan document.
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document.
    pub fn load(&self) -> Result<PlanDocument, PlanError> {
        let json = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write a brand-new document. Fails if one already exists.
    pub fn create(&self, doc: &PlanDocument) -> Result<(), PlanError> {
        if self.exists() {
            return Err(PlanError::AlreadyExists(self.path.display().to_string()));
        }
        self.write(doc)
    }

    /// Save `doc`, provided the stored document is still at `base_version`
    /// (the version the caller loaded).
    pub fn save(&self, doc: &PlanDocument, base_version: u64) -> Result<(), PlanError> {
        let stored = self.load()?;
        if stored.version != base_version {
            return Err(PlanError::VersionConflict {
                expected: base_version,
                found: stored.version,
            });
        }
        if doc.version == base_version && *doc == stored {
            tracing::debug!("document unchanged, skipping write");
            return Ok(());
        }
        self.write(doc)
    }

    fn write(&self, doc: &PlanDocument) -> Result<(), PlanError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| PlanError::IoError {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> PlanError {
        PlanError::IoError {
            path: self.path.display().to_string(),
            source,
        }
    }
}
