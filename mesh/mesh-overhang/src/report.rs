//! Summary of a finished run.

use std::fmt;
use std::time::Duration;

use crate::driver::{SolverDiagnostics, StopReason};
use crate::orientation::OrientationSearch;
use crate::params::FixedOrientation;

/// How the print orientation was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSource {
    /// Grid search.
    Optimized,
    /// Given by the caller.
    Fixed,
    /// Left as loaded.
    Skipped,
}

impl fmt::Display for OrientationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self {
            Self::Optimized => "optimized",
            Self::Fixed => "fixed",
            Self::Skipped => "as loaded",
        };
        f.write_str(source)
    }
}

/// Wall-clock time per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Reading and indexing the input.
    pub load: Duration,
    /// Orientation search or fixed rotation.
    pub orientation: Duration,
    /// First classification.
    pub detection: Duration,
    /// Correction passes.
    pub correction: Duration,
    /// Writing the output.
    pub save: Duration,
}

impl PhaseTimings {
    /// Sum of all phases.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.load + self.orientation + self.detection + self.correction + self.save
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "load {:.3}s, orientation {:.3}s, detection {:.3}s, correction {:.3}s, save {:.3}s (total {:.3}s)",
            self.load.as_secs_f64(),
            self.orientation.as_secs_f64(),
            self.detection.as_secs_f64(),
            self.correction.as_secs_f64(),
            self.save.as_secs_f64(),
            self.total().as_secs_f64()
        )
    }
}

/// Result of [`process`](crate::process) or [`process_mesh`](crate::process_mesh).
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Problematic faces after orientation, before correction.
    pub warnings_before: usize,
    /// Problematic faces left at the end.
    pub warnings_after: usize,
    /// Correction passes run.
    pub iterations: usize,
    /// Why correction stopped.
    pub stop_reason: StopReason,
    /// Total support weight at the end.
    pub total_weight: f64,
    /// Rotation applied to the loaded mesh.
    pub orientation: FixedOrientation,
    /// How `orientation` was chosen.
    pub orientation_source: OrientationSource,
    /// Search details when the orientation was optimized.
    pub orientation_search: Option<OrientationSearch>,
    /// Time per phase.
    pub timings: PhaseTimings,
    /// Edges not shared by exactly two faces.
    pub manifold_violations: usize,
    /// Repeated face-edge associations seen on load.
    pub duplicate_associations: usize,
    /// Solver counters.
    pub diagnostics: SolverDiagnostics,
    /// Number of faces.
    pub face_count: usize,
    /// Number of unique vertices.
    pub vertex_count: usize,
    /// Number of unique edges.
    pub edge_count: usize,
}

impl RunReport {
    /// True if no problematic faces remain.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.warnings_after == 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Overhangs: {} -> {} after {} iterations ({}), weight {:.3}, orientation {} ({}), {} faces",
            self.warnings_before,
            self.warnings_after,
            self.iterations,
            self.stop_reason,
            self.total_weight,
            self.orientation,
            self.orientation_source,
            self.face_count
        )
    }
}
