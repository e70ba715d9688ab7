//! Run options.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

use mesh_topology::{ClassifyParams, DEFAULT_VERTEX_TOLERANCE};

use crate::error::{RunError, RunResult};
use crate::orientation::OrientationGrid;

/// How flat overhangs (all three corners at the same Z) are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ZeroPhiStrategy {
    /// Leave flat overhangs untouched.
    #[default]
    None,
    /// Pull a shared edge down toward an angled neighbor.
    Inject,
}

impl fmt::Display for ZeroPhiStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Inject => write!(f, "inject"),
        }
    }
}

impl FromStr for ZeroPhiStrategy {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "inject" => Ok(Self::Inject),
            other => Err(RunError::invalid_option(format!(
                "unknown zero-phi strategy '{other}' (expected none or inject)"
            ))),
        }
    }
}

/// Explicit rotation about X then Y, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedOrientation {
    /// Rotation about X.
    pub x: f64,
    /// Rotation about Y, applied after X.
    pub y: f64,
}

impl FixedOrientation {
    /// Create an orientation from two angles in radians.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for FixedOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={:.1}° y={:.1}°",
            self.x.to_degrees(),
            self.y.to_degrees()
        )
    }
}

/// Parses `"x,y"` in radians.
impl FromStr for FixedOrientation {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    RunError::invalid_option(format!("invalid orientation angle '{}'", part.trim()))
                })
        };

        let mut parts = s.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(x), Some(y), None) => Ok(Self::new(parse(x)?, parse(y)?)),
            _ => Err(RunError::invalid_option(format!(
                "orientation must be 'X,Y', got '{s}'"
            ))),
        }
    }
}

/// Options for a correction run.
///
/// # Example
///
/// ```
/// use mesh_overhang::{CorrectionParams, ZeroPhiStrategy};
///
/// let params = CorrectionParams::default()
///     .with_max_iterations(200)
///     .with_zero_phi_strategy(ZeroPhiStrategy::Inject);
///
/// assert!(params.validate().is_ok());
/// assert!(params.convergence_break);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CorrectionParams {
    /// Minimum printable overhang angle in radians.
    pub phi_min: f64,
    /// Treat faces touching the bed like any other face.
    pub ignore_ground: bool,
    /// Max Z distance from the ground level for a vertex to touch the bed.
    pub ground_tolerance: f64,
    /// Faces within this many radians of `phi_min` are accepted.
    pub angle_tolerance: f64,
    /// Cap on correction passes; 0 means no cap.
    pub max_iterations: usize,
    /// Stop once the warning count plateaus.
    pub convergence_break: bool,
    /// Number of equal trailing counts that make a plateau.
    pub convergence_depth: usize,
    /// Remove an existing output file instead of failing.
    pub overwrite_output: bool,
    /// Handling of flat overhangs.
    pub zero_phi_strategy: ZeroPhiStrategy,
    /// Use this orientation instead of searching.
    pub fixed_orientation: Option<FixedOrientation>,
    /// Only consider orientations where some face rests on the bed.
    pub grounded_only: bool,
    /// Keep the mesh as loaded.
    pub skip_orientation: bool,
    /// Per-axis distance under which vertices are merged on load.
    pub vertex_tolerance: f64,
    /// Angles visited by the orientation search.
    pub orientation_grid: OrientationGrid,
}

impl Default for CorrectionParams {
    fn default() -> Self {
        let classify = ClassifyParams::default();
        Self {
            phi_min: FRAC_PI_4,
            ignore_ground: false,
            ground_tolerance: classify.ground_tolerance,
            angle_tolerance: classify.angle_tolerance,
            max_iterations: 2000,
            convergence_break: true,
            convergence_depth: 5,
            overwrite_output: false,
            zero_phi_strategy: ZeroPhiStrategy::None,
            fixed_orientation: None,
            grounded_only: false,
            skip_orientation: false,
            vertex_tolerance: DEFAULT_VERTEX_TOLERANCE,
            orientation_grid: OrientationGrid::default(),
        }
    }
}

impl CorrectionParams {
    /// Set the minimum overhang angle in radians.
    #[must_use]
    pub const fn with_phi_min(mut self, phi_min: f64) -> Self {
        self.phi_min = phi_min;
        self
    }

    /// Set whether bed contact is ignored.
    #[must_use]
    pub const fn with_ignore_ground(mut self, ignore: bool) -> Self {
        self.ignore_ground = ignore;
        self
    }

    /// Set the iteration cap (0 = none).
    #[must_use]
    pub const fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enable or disable the plateau stop.
    #[must_use]
    pub const fn with_convergence_break(mut self, enabled: bool) -> Self {
        self.convergence_break = enabled;
        self
    }

    /// Set the plateau length.
    #[must_use]
    pub const fn with_convergence_depth(mut self, depth: usize) -> Self {
        self.convergence_depth = depth;
        self
    }

    /// Allow replacing an existing output file.
    #[must_use]
    pub const fn with_overwrite_output(mut self, overwrite: bool) -> Self {
        self.overwrite_output = overwrite;
        self
    }

    /// Set the flat-overhang strategy.
    #[must_use]
    pub const fn with_zero_phi_strategy(mut self, strategy: ZeroPhiStrategy) -> Self {
        self.zero_phi_strategy = strategy;
        self
    }

    /// Use a fixed orientation instead of searching.
    #[must_use]
    pub const fn with_fixed_orientation(mut self, orientation: FixedOrientation) -> Self {
        self.fixed_orientation = Some(orientation);
        self
    }

    /// Only accept grounded orientations.
    #[must_use]
    pub const fn with_grounded_only(mut self, grounded_only: bool) -> Self {
        self.grounded_only = grounded_only;
        self
    }

    /// Keep the loaded orientation.
    #[must_use]
    pub const fn with_skip_orientation(mut self, skip: bool) -> Self {
        self.skip_orientation = skip;
        self
    }

    /// Set the vertex merge tolerance.
    #[must_use]
    pub const fn with_vertex_tolerance(mut self, tolerance: f64) -> Self {
        self.vertex_tolerance = tolerance;
        self
    }

    /// Set the orientation search grid.
    #[must_use]
    pub const fn with_orientation_grid(mut self, grid: OrientationGrid) -> Self {
        self.orientation_grid = grid;
        self
    }

    /// Classification options derived from these params.
    #[must_use]
    pub const fn classify_params(&self) -> ClassifyParams {
        ClassifyParams {
            phi_min: self.phi_min,
            ignore_grounded: self.ignore_ground,
            ground_tolerance: self.ground_tolerance,
            angle_tolerance: self.angle_tolerance,
        }
    }

    /// Check that every option is in range.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> RunResult<()> {
        if !(self.phi_min.is_finite() && self.phi_min > 0.0 && self.phi_min <= FRAC_PI_2) {
            return Err(RunError::invalid_option(format!(
                "phi_min must be in (0, pi/2], got {}",
                self.phi_min
            )));
        }
        for (name, value) in [
            ("ground_tolerance", self.ground_tolerance),
            ("angle_tolerance", self.angle_tolerance),
            ("vertex_tolerance", self.vertex_tolerance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RunError::invalid_option(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.max_iterations == 0 && !self.convergence_break {
            return Err(RunError::invalid_option(
                "max_iterations 0 (no cap) requires convergence_break",
            ));
        }
        if self.convergence_break && self.convergence_depth == 0 {
            return Err(RunError::invalid_option(
                "convergence_depth must be at least 1",
            ));
        }
        if let Some(fixed) = self.fixed_orientation {
            if !(fixed.x.is_finite() && fixed.y.is_finite()) {
                return Err(RunError::invalid_option(format!(
                    "fixed orientation must be finite, got {fixed:?}"
                )));
            }
        }
        self.orientation_grid.validate()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let params = CorrectionParams::default();
        assert!((params.phi_min - FRAC_PI_4).abs() < f64::EPSILON);
        assert_eq!(params.max_iterations, 2000);
        assert_eq!(params.convergence_depth, 5);
        assert!(params.convergence_break);
        assert_eq!(params.zero_phi_strategy, ZeroPhiStrategy::None);
        assert_eq!(params.fixed_orientation, None);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn strategy_parsing_is_case_insensitive() {
        assert_eq!(
            "INJECT".parse::<ZeroPhiStrategy>().unwrap(),
            ZeroPhiStrategy::Inject
        );
        assert_eq!(
            " none ".parse::<ZeroPhiStrategy>().unwrap(),
            ZeroPhiStrategy::None
        );
        assert!(matches!(
            "lift".parse::<ZeroPhiStrategy>(),
            Err(RunError::InvalidOption { .. })
        ));
    }

    #[test]
    fn orientation_parsing() {
        let o: FixedOrientation = "0.5, -1.25".parse().unwrap();
        assert!((o.x - 0.5).abs() < f64::EPSILON);
        assert!((o.y + 1.25).abs() < f64::EPSILON);

        for bad in ["", "1", "1,2,3", "a,b", "nan,0"] {
            assert!(
                matches!(
                    bad.parse::<FixedOrientation>(),
                    Err(RunError::InvalidOption { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let params = CorrectionParams::default();
        assert!(params.clone().with_phi_min(0.0).validate().is_err());
        assert!(params.clone().with_phi_min(2.0).validate().is_err());
        assert!(params.clone().with_vertex_tolerance(-1.0).validate().is_err());
        assert!(params.clone().with_convergence_depth(0).validate().is_err());
        assert!(
            params
                .clone()
                .with_max_iterations(0)
                .with_convergence_break(false)
                .validate()
                .is_err()
        );
        assert!(
            params
                .clone()
                .with_orientation_grid(OrientationGrid::new(usize::MAX, 0.1))
                .validate()
                .is_err()
        );
        assert!(params.with_max_iterations(0).validate().is_ok());
    }

    #[test]
    fn classify_params_follow_options() {
        let params = CorrectionParams::default()
            .with_phi_min(0.6)
            .with_ignore_ground(true);
        let classify = params.classify_params();
        assert!((classify.phi_min - 0.6).abs() < f64::EPSILON);
        assert!(classify.ignore_grounded);
        assert!((classify.angle_tolerance - 0.017).abs() < f64::EPSILON);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn params_from_partial_json() {
        let params: CorrectionParams = serde_json::from_str(
            r#"{ "phi_min": 0.5, "zero_phi_strategy": "inject", "fixed_orientation": { "x": 1.0, "y": 0.0 } }"#,
        )
        .unwrap();

        assert!((params.phi_min - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.zero_phi_strategy, ZeroPhiStrategy::Inject);
        assert_eq!(params.fixed_orientation, Some(FixedOrientation::new(1.0, 0.0)));
        assert_eq!(params.max_iterations, 2000);
        assert_eq!(params.orientation_grid, OrientationGrid::default());
    }
}
