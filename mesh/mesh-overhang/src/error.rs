//! Error types for a correction run.

use std::path::PathBuf;

use mesh_stl::StlError;
use mesh_topology::{Axis, TopologyError};
use thiserror::Error;

/// Result type for correction runs.
pub type RunResult<T> = Result<T, RunError>;

/// Errors that abort a correction run.
///
/// Not reaching zero warnings is never an error; see
/// [`RunReport::warnings_after`](crate::RunReport::warnings_after).
#[derive(Debug, Error)]
pub enum RunError {
    /// The input file does not exist.
    #[error("input file not found: {path}")]
    InputNotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// The output file exists and overwriting was not requested.
    #[error("output file already exists: {path}")]
    OutputExists {
        /// Occupied path.
        path: PathBuf,
    },

    /// A coordinate is not finite or a facet has no area.
    #[error("malformed geometry: {message}")]
    MalformedGeometry {
        /// Description of the offending geometry.
        message: String,
    },

    /// Rotation about an unsupported axis was requested.
    #[error("rotation about the {axis} axis is not supported")]
    UnsupportedAxis {
        /// The rejected axis.
        axis: Axis,
    },

    /// An option value is out of range or could not be parsed.
    #[error("invalid option: {message}")]
    InvalidOption {
        /// Description of the bad option.
        message: String,
    },

    /// The input file is not valid STL.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of what was invalid.
        message: String,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Create an `InvalidOption` error with the given message.
    #[must_use]
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }
}

impl From<TopologyError> for RunError {
    fn from(err: TopologyError) -> Self {
        match err {
            TopologyError::MalformedGeometry { message } => Self::MalformedGeometry { message },
            TopologyError::UnsupportedAxis { axis } => Self::UnsupportedAxis { axis },
            other @ (TopologyError::SnapshotMismatch { .. }
            | TopologyError::CapacityExceeded { .. }) => Self::InvalidInput {
                message: other.to_string(),
            },
        }
    }
}

impl From<StlError> for RunError {
    fn from(err: StlError) -> Self {
        match err {
            StlError::FileNotFound { path } => Self::InputNotFound { path },
            StlError::OutputExists { path } => Self::OutputExists { path },
            StlError::IoConflict { reason } => Self::Io(std::io::Error::other(reason)),
            StlError::InvalidContent { line, message } => Self::InvalidInput {
                message: format!("line {line}: {message}"),
            },
            other @ (StlError::InvalidHeader { .. } | StlError::InvalidFaceCount { .. }) => {
                Self::InvalidInput {
                    message: other.to_string(),
                }
            }
            StlError::Topology(inner) => inner.into(),
            StlError::Io(inner) => Self::Io(inner),
        }
    }
}
