//! GeoAlt command-line tool.
//!
//! Reads an STL file, picks a print orientation, moves vertices until as few
//! faces as possible overhang, and writes the result as ASCII STL.
//!
//! ```text
//! geoalt part.stl part_fixed.stl --zero-phi inject --imax 500
//! geoalt part.stl part_fixed.stl --orientation 1.5708,0 --overwrite
//! geoalt part.stl part_fixed.stl --config params.json -v
//! ```
//!
//! Options from `--config` are applied first; flags override them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use mesh_overhang::{CorrectionParams, FixedOrientation, RunReport, ZeroPhiStrategy, process};
use tracing_subscriber::EnvFilter;

/// Overhang correction for 3D-printable meshes
#[derive(Debug, Parser)]
#[command(name = "geoalt")]
#[command(about = "Correct overhangs in STL meshes for 3D printing", long_about = None)]
#[command(version)]
struct Cli {
    /// STL file to correct (ASCII or binary)
    input: PathBuf,

    /// Where to write the corrected ASCII STL
    output: PathBuf,

    /// Maximum correction passes (0 = no cap, needs the convergence break)
    #[arg(long, value_name = "N")]
    imax: Option<usize>,

    /// Correct faces resting on the bed too
    #[arg(long)]
    ignore_ground: bool,

    /// Equal warning counts in a row that end the run
    #[arg(long, value_name = "N")]
    convergence_depth: Option<usize>,

    /// Keep going while the warning count is stuck
    #[arg(long)]
    no_convergence_break: bool,

    /// Minimum printable overhang angle in radians
    #[arg(long, value_name = "RAD")]
    angle: Option<f64>,

    /// Flat overhang handling: none or inject
    #[arg(long, value_name = "STRATEGY")]
    zero_phi: Option<ZeroPhiStrategy>,

    /// Rotate about X then Y by these radians instead of searching
    #[arg(long, value_name = "X,Y", allow_hyphen_values = true)]
    orientation: Option<FixedOrientation>,

    /// Keep the orientation the file was saved in
    #[arg(long)]
    skip_orientation: bool,

    /// Only accept orientations with a face on the bed
    #[arg(long)]
    grounded_only: bool,

    /// Replace the output file if it exists
    #[arg(long)]
    overwrite: bool,

    /// JSON file with correction options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log solver passes
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let params = build_params(&cli)?;
    let report = process(&cli.input, &cli.output, &params).with_context(|| {
        format!(
            "failed to correct {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;

    print_report(&report);
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: &Path) -> Result<CorrectionParams> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn build_params(cli: &Cli) -> Result<CorrectionParams> {
    let mut params = match &cli.config {
        Some(path) => load_config(path)?,
        None => CorrectionParams::default(),
    };

    if let Some(imax) = cli.imax {
        params.max_iterations = imax;
    }
    if let Some(depth) = cli.convergence_depth {
        params.convergence_depth = depth;
    }
    if let Some(angle) = cli.angle {
        params.phi_min = angle;
    }
    if let Some(strategy) = cli.zero_phi {
        params.zero_phi_strategy = strategy;
    }
    if let Some(orientation) = cli.orientation {
        params.fixed_orientation = Some(orientation);
    }
    params.ignore_ground |= cli.ignore_ground;
    params.skip_orientation |= cli.skip_orientation;
    params.grounded_only |= cli.grounded_only;
    params.overwrite_output |= cli.overwrite;
    if cli.no_convergence_break {
        params.convergence_break = false;
    }

    params.validate().context("invalid options")?;
    tracing::debug!(?params, "Resolved options");
    Ok(params)
}

fn print_report(report: &RunReport) {
    println!("{report}");
    println!("Timings: {}", report.timings);

    if let Some(search) = &report.orientation_search {
        println!("Optimal orientation: {}", search.best);
        for candidate in search.ranked.iter().skip(1) {
            println!("  alternative: {candidate}");
        }
    }

    let d = &report.diagnostics;
    println!(
        "Solver: {} pole snaps, {} slope corrections, {} flat skipped, {} flat injected, {} vertex moves",
        d.poles_snapped, d.angle_corrections, d.flat_skipped, d.flat_injected, d.displaced_vertices
    );
    if report.manifold_violations > 0 {
        println!(
            "Warning: {} edges are not shared by exactly two faces",
            report.manifold_violations
        );
    }
}
