//! Convergence loop over all problematic faces.

use std::fmt;

use mesh_topology::{FaceId, Mesh};
use tracing::{debug, info, warn};

use crate::error::RunResult;
use crate::params::CorrectionParams;
use crate::solver::{FaceAction, solve_face};

/// Stage of a correction run, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Reading the input file.
    Loading,
    /// Choosing the print orientation.
    Orienting,
    /// First classification in the final orientation.
    Detecting,
    /// Running correction passes.
    Correcting,
    /// Writing the output file.
    Saving,
    /// Finished.
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Orienting => "orienting",
            Self::Detecting => "detecting",
            Self::Correcting => "correcting",
            Self::Saving => "saving",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why the correction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No problematic faces remain.
    NoWarnings,
    /// The warning count stayed the same for `convergence_depth` passes.
    Converged,
    /// `max_iterations` passes ran.
    IterationLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoWarnings => "no warnings",
            Self::Converged => "converged",
            Self::IterationLimit => "iteration limit",
        };
        f.write_str(reason)
    }
}

/// Counters collected from every [`FaceAction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverDiagnostics {
    /// Faces whose corners were snapped to a pole.
    pub poles_snapped: usize,
    /// Flat overhangs the zero-phi strategy left alone.
    pub flat_skipped: usize,
    /// Flat overhangs the zero-phi strategy staged moves for.
    pub flat_injected: usize,
    /// Corners that received a slope correction.
    pub angle_corrections: usize,
    /// Vertex moves applied over all commits.
    pub displaced_vertices: usize,
}

impl SolverDiagnostics {
    fn record(&mut self, action: FaceAction) {
        match action {
            FaceAction::PoleSnapped { .. } => self.poles_snapped += 1,
            FaceAction::FlatSkipped => self.flat_skipped += 1,
            FaceAction::FlatInjected => self.flat_injected += 1,
            FaceAction::AngleCorrected { staged } => self.angle_corrections += staged,
        }
    }
}

/// Result of [`correct_overhangs`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOutcome {
    /// Correction passes run.
    pub iterations: usize,
    /// Problematic faces before the first pass.
    pub warnings_before: usize,
    /// Problematic faces after the last pass.
    pub warnings_after: usize,
    /// Problematic count after each pass.
    pub history: Vec<usize>,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Solver counters.
    pub diagnostics: SolverDiagnostics,
}

impl CorrectionOutcome {
    /// True if no problematic faces remain.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.warnings_after == 0
    }
}

/// Repeatedly correct every problematic face until none remain, the count
/// plateaus, or the pass cap is hit.
///
/// Each pass visits the problematic faces in id order, commits the mean of
/// the staged proposals per vertex and reclassifies. There is no
/// backtracking: a pass that makes things worse is kept.
///
/// The mesh is classified on entry with `params`, so the caller does not
/// need to classify it first.
///
/// # Errors
///
/// Returns [`RunError::InvalidOption`](crate::RunError::InvalidOption) if
/// `params` fails [`CorrectionParams::validate`], for example an uncapped
/// run without the plateau stop. The mesh is left untouched.
///
/// # Example
///
/// ```
/// use mesh_overhang::{CorrectionParams, StopReason, correct_overhangs};
/// use mesh_topology::Mesh;
///
/// let mut cube = Mesh::unit_cube();
/// let outcome = correct_overhangs(&mut cube, &CorrectionParams::default()).unwrap();
///
/// assert_eq!(outcome.stop_reason, StopReason::NoWarnings);
/// assert_eq!(outcome.iterations, 0);
/// ```
pub fn correct_overhangs(
    mesh: &mut Mesh,
    params: &CorrectionParams,
) -> RunResult<CorrectionOutcome> {
    params.validate()?;
    let classify = params.classify_params();
    mesh.reclassify(&classify);

    let warnings_before = mesh.warning_count();
    info!(
        faces = mesh.faces().len(),
        warnings = warnings_before,
        max_iterations = params.max_iterations,
        strategy = %params.zero_phi_strategy,
        "Starting overhang correction"
    );

    let mut diagnostics = SolverDiagnostics::default();
    let mut history = Vec::new();
    let mut iterations = 0;

    let stop_reason = loop {
        if mesh.warning_count() == 0 {
            break StopReason::NoWarnings;
        }
        if params.max_iterations != 0 && iterations >= params.max_iterations {
            break StopReason::IterationLimit;
        }
        iterations += 1;

        let problematic: Vec<FaceId> = mesh.faces().problematic().to_vec();
        for face in problematic {
            diagnostics.record(solve_face(mesh, face, params));
        }
        let moved = mesh.commit_displacements().len();
        diagnostics.displaced_vertices += moved;
        mesh.reclassify(&classify);

        let warnings = mesh.warning_count();
        history.push(warnings);
        debug!(iteration = iterations, warnings, moved, "Correction pass");

        if params.convergence_break && has_plateaued(&history, params.convergence_depth) {
            break StopReason::Converged;
        }
    };

    let warnings_after = mesh.warning_count();
    if diagnostics.flat_skipped > 0 {
        warn!(
            count = diagnostics.flat_skipped,
            strategy = %params.zero_phi_strategy,
            "Flat overhangs left uncorrected"
        );
    }
    info!(
        iterations,
        warnings_before,
        warnings_after,
        stop = %stop_reason,
        "Overhang correction finished"
    );

    Ok(CorrectionOutcome {
        iterations,
        warnings_before,
        warnings_after,
        history,
        stop_reason,
        diagnostics,
    })
}

/// True when the history is longer than `depth` and its last `depth` entries
/// are all equal.
fn has_plateaued(history: &[usize], depth: usize) -> bool {
    if depth == 0 || history.len() <= depth {
        return false;
    }
    let tail = &history[history.len() - depth..];
    tail.iter().all(|&count| count == tail[0])
}
