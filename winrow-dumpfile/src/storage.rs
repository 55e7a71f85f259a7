//! File I/O for session documents.

use super::Content;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while reading or writing a dump file.
#[derive(Debug, Error)]
pub enum DumpfileError {
    /// The dump file could not be read or written.
    #[error("dump file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dump file is not a valid session document.
    #[error("dump file {path:?} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document could not be serialized.
    #[error("failed to encode session document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Content {
    /// Read a session document from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DumpfileError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DumpfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content: Content =
            serde_json::from_str(&contents).map_err(|source| DumpfileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!(
            "Loaded session document ({} windows) from {:?}",
            content.windows.len(),
            path
        );
        Ok(content)
    }

    /// Write the document to `path`, replacing any existing file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DumpfileError> {
        let path = path.as_ref();
        let io_err = |source| DumpfileError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("dump.tmp");
        fs::write(&temp_path, json).map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;
        log::info!(
            "Saved session document ({} windows) to {:?}",
            self.windows.len(),
            path
        );
        Ok(())
    }
}
