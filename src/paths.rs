//! Typed paths into the service data directory.
//!
//! Centralizing path construction keeps file access consistent and prevents
//! drift when the layout evolves.
use std::path::{Path, PathBuf};

/// Convenience wrapper for locating data-directory artifacts.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new path helper rooted at the data directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the data-directory root used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `tracking/state.json` persistence document path.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("tracking").join("state.json")
    }

    /// Return the generated report artifacts directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// Return the raw collected evidence directory.
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    /// Return the legal-request documents directory.
    pub fn legal_requests_dir(&self) -> PathBuf {
        self.root.join("legal")
    }

    /// Return the web-mention search export directory.
    pub fn mentions_dir(&self) -> PathBuf {
        self.root.join("mentions")
    }

    /// Return the dispatch outbox directory.
    pub fn outbox_dir(&self) -> PathBuf {
        self.root.join("outbox")
    }
}
