//! End-to-end run: load, orient, detect, correct, save.

use std::fs;
use std::path::Path;
use std::time::Instant;

use mesh_stl::{load_stl_with_tolerance, save_stl_ascii};
use mesh_topology::Mesh;
use tracing::{info, warn};

use crate::driver::{RunPhase, correct_overhangs};
use crate::error::{RunError, RunResult};
use crate::orientation::{apply_fixed_orientation, find_optimal_orientation};
use crate::params::{CorrectionParams, FixedOrientation};
use crate::report::{OrientationSource, PhaseTimings, RunReport};

/// Correct the STL at `input` and write the result to `output` as ASCII STL.
///
/// # Errors
///
/// - [`RunError::InvalidOption`] if `params` fails validation
/// - [`RunError::InputNotFound`] if `input` does not exist
/// - [`RunError::OutputExists`] if `output` exists and
///   `params.overwrite_output` is false
/// - [`RunError::InvalidInput`] or [`RunError::MalformedGeometry`] for a bad
///   input file
/// - [`RunError::Io`] for file system failures
///
/// # Example
///
/// ```no_run
/// use mesh_overhang::{CorrectionParams, process};
///
/// let report = process("part.stl", "part_fixed.stl", &CorrectionParams::default()).unwrap();
/// println!("{report}");
/// ```
pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    params: &CorrectionParams,
) -> RunResult<RunReport> {
    params.validate()?;
    let input = input.as_ref();
    let output = output.as_ref();
    check_paths(input, output, params.overwrite_output)?;

    enter(RunPhase::Loading);
    let start = Instant::now();
    let mut mesh = load_stl_with_tolerance(input, params.vertex_tolerance)?;
    let load = start.elapsed();

    let mut report = run(&mut mesh, params)?;
    report.timings.load = load;

    enter(RunPhase::Saving);
    let start = Instant::now();
    save_stl_ascii(&mesh, output)?;
    report.timings.save = start.elapsed();

    finish(&report);
    Ok(report)
}

/// Run orientation, detection and correction on a mesh already in memory.
///
/// Load and save timings in the report are zero.
///
/// # Errors
///
/// Returns [`RunError::InvalidOption`] if `params` fails validation.
///
/// # Example
///
/// ```
/// use mesh_overhang::{CorrectionParams, OrientationSource, process_mesh};
/// use mesh_topology::Mesh;
///
/// let mut cube = Mesh::unit_cube();
/// let params = CorrectionParams::default().with_skip_orientation(true);
/// let report = process_mesh(&mut cube, &params).unwrap();
///
/// assert!(report.is_clean());
/// assert_eq!(report.orientation_source, OrientationSource::Skipped);
/// ```
pub fn process_mesh(mesh: &mut Mesh, params: &CorrectionParams) -> RunResult<RunReport> {
    params.validate()?;
    let report = run(mesh, params)?;
    finish(&report);
    Ok(report)
}

/// Check the input exists and the output is free.
///
/// With `overwrite`, an existing output file is removed.
///
/// # Errors
///
/// [`RunError::InputNotFound`], [`RunError::OutputExists`], or
/// [`RunError::Io`] if removal fails.
pub fn check_paths(input: &Path, output: &Path, overwrite: bool) -> RunResult<()> {
    if !input.exists() {
        return Err(RunError::InputNotFound {
            path: input.to_path_buf(),
        });
    }
    if output.exists() {
        if !overwrite {
            return Err(RunError::OutputExists {
                path: output.to_path_buf(),
            });
        }
        warn!(path = %output.display(), "Removing existing output file");
        fs::remove_file(output)?;
    }
    Ok(())
}

fn run(mesh: &mut Mesh, params: &CorrectionParams) -> RunResult<RunReport> {
    let classify = params.classify_params();
    let mut timings = PhaseTimings::default();

    enter(RunPhase::Orienting);
    let start = Instant::now();
    let (orientation, orientation_source, orientation_search) =
        if let Some(fixed) = params.fixed_orientation {
            apply_fixed_orientation(mesh, fixed)?;
            (fixed, OrientationSource::Fixed, None)
        } else if params.skip_orientation {
            (FixedOrientation::default(), OrientationSource::Skipped, None)
        } else {
            let search = find_optimal_orientation(
                mesh,
                &classify,
                &params.orientation_grid,
                params.grounded_only,
            )?;
            (search.best.orientation(), OrientationSource::Optimized, Some(search))
        };
    timings.orientation = start.elapsed();

    enter(RunPhase::Detecting);
    let start = Instant::now();
    mesh.reclassify(&classify);
    let manifold_violations = mesh.manifold_violations();
    if manifold_violations > 0 {
        warn!(edges = manifold_violations, "Mesh is not closed manifold");
    }
    let duplicate_associations = mesh.edges().duplicate_associations();
    if duplicate_associations > 0 {
        warn!(count = duplicate_associations, "Duplicate face-edge associations");
    }
    info!(
        warnings = mesh.warning_count(),
        weight = mesh.total_weight(),
        "Detected overhangs"
    );
    timings.detection = start.elapsed();

    enter(RunPhase::Correcting);
    let start = Instant::now();
    let outcome = correct_overhangs(mesh, params)?;
    timings.correction = start.elapsed();

    Ok(RunReport {
        warnings_before: outcome.warnings_before,
        warnings_after: outcome.warnings_after,
        iterations: outcome.iterations,
        stop_reason: outcome.stop_reason,
        total_weight: mesh.total_weight(),
        orientation,
        orientation_source,
        orientation_search,
        timings,
        manifold_violations,
        duplicate_associations,
        diagnostics: outcome.diagnostics,
        face_count: mesh.faces().len(),
        vertex_count: mesh.vertices().len(),
        edge_count: mesh.edges().len(),
    })
}

fn enter(phase: RunPhase) {
    info!(%phase, "Entering phase");
}

fn finish(report: &RunReport) {
    enter(RunPhase::Done);
    info!(
        warnings = report.warnings_after,
        total_secs = report.timings.total().as_secs_f64(),
        "Run complete"
    );
}
