//! Overhang correction for 3D-print meshes.
//!
//! Moves mesh vertices until as few faces as possible hang below the
//! printable angle `phi_min`, after choosing a print orientation that needs
//! the least support.
//!
//! # Pipeline
//!
//! 1. **Load** the STL into a [`Mesh`](mesh_topology::Mesh)
//! 2. **Orient**: grid search over X/Y rotations ([`find_optimal_orientation`]),
//!    a fixed rotation, or none
//! 3. **Detect** problematic faces
//! 4. **Correct**: [`correct_overhangs`] runs [`solve_face`] on every
//!    problematic face, commits the averaged proposals and reclassifies
//!    until nothing is left or the count plateaus
//! 5. **Save** as ASCII STL
//!
//! [`process`] runs all of it between two files; [`process_mesh`] skips
//! the file I/O.
//!
//! # Example
//!
//! ```
//! use mesh_overhang::{CorrectionParams, OrientationGrid, process_mesh};
//! use mesh_topology::Mesh;
//!
//! let mut cube = Mesh::unit_cube();
//! let params = CorrectionParams::default()
//!     .with_orientation_grid(OrientationGrid::new(3, std::f64::consts::FRAC_PI_2));
//!
//! let report = process_mesh(&mut cube, &params).unwrap();
//! assert_eq!(report.warnings_after, 0);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod driver;
mod error;
mod orientation;
mod params;
mod pipeline;
mod report;
mod solver;
pub mod zero_phi;

pub use driver::{CorrectionOutcome, RunPhase, SolverDiagnostics, StopReason, correct_overhangs};
pub use error::{RunError, RunResult};
pub use orientation::{
    MAX_GRID_STEPS, OrientationCandidate, OrientationGrid, OrientationSearch, RANKED_CANDIDATES,
    apply_fixed_orientation, find_optimal_orientation,
};
pub use params::{CorrectionParams, FixedOrientation, ZeroPhiStrategy};
pub use pipeline::{check_paths, process, process_mesh};
pub use report::{OrientationSource, PhaseTimings, RunReport};
pub use solver::{FaceAction, MIN_CORRECTION_DZ, fix_angle, solve_face};
