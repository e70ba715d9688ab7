//! Error types for the topology kernel.

use thiserror::Error;

use crate::transform::Axis;

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while building or transforming a mesh.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// A coordinate was not finite, or a facet has no area.
    #[error("malformed geometry: {message}")]
    MalformedGeometry {
        /// Description of the offending geometry.
        message: String,
    },

    /// Rotation about the given axis is not supported.
    #[error("rotation about the {axis} axis is not supported")]
    UnsupportedAxis {
        /// The rejected axis.
        axis: Axis,
    },

    /// A position snapshot does not match the vertex table.
    #[error("position snapshot has {got} entries, vertex table has {expected}")]
    SnapshotMismatch {
        /// Number of vertices in the table.
        expected: usize,
        /// Number of positions in the snapshot.
        got: usize,
    },

    /// The mesh grew past the `u32` index range.
    #[error("too many {kind}: index space of u32 exhausted")]
    CapacityExceeded {
        /// Entity kind ("vertices", "edges", "faces").
        kind: &'static str,
    },
}

impl TopologyError {
    /// Create a `MalformedGeometry` error with the given message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedGeometry {
            message: message.into(),
        }
    }
}
