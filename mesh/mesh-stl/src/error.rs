//! Error types for STL reading and writing.

use std::path::PathBuf;

use mesh_topology::TopologyError;
use thiserror::Error;

/// Result type for STL operations.
pub type StlResult<T> = Result<T, StlError>;

/// Errors that can occur while reading or writing STL data.
#[derive(Debug, Error)]
pub enum StlError {
    /// Input file not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Output file exists; the writer never overwrites.
    #[error("output file already exists: {path}")]
    OutputExists {
        /// Path that already exists.
        path: PathBuf,
    },

    /// The writer was used in the wrong state.
    #[error("STL writer conflict: {reason}")]
    IoConflict {
        /// What went wrong.
        reason: &'static str,
    },

    /// Invalid ASCII content.
    #[error("invalid STL content at line {line}: {message}")]
    InvalidContent {
        /// 1-based line number.
        line: usize,
        /// Description of what was invalid.
        message: String,
    },

    /// Binary data too short to hold the header and face count.
    #[error("invalid STL header: expected {expected} bytes, got {got}")]
    InvalidHeader {
        /// Expected header size.
        expected: usize,
        /// Actual data size.
        got: usize,
    },

    /// Binary record stream ended early.
    #[error("invalid face count: expected {expected}, got {got}")]
    InvalidFaceCount {
        /// Number of faces declared in the header.
        expected: u32,
        /// Number of complete records present.
        got: u32,
    },

    /// A facet could not be added to the mesh.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StlError {
    /// Create an `InvalidContent` error for the given line.
    #[must_use]
    pub fn invalid_content(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidContent {
            line,
            message: message.into(),
        }
    }
}
