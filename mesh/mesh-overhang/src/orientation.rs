//! Print orientation search.
//!
//! Each candidate rotates the loaded mesh about X, then about Y, and scores it
//! by the total support weight of its faces. The lightest candidate wins.

use std::f64::consts::PI;
use std::fmt;

use mesh_topology::{Axis, ClassifyParams, Mesh, TopologyResult, orientation_rotation};
use tracing::{debug, info, warn};

use crate::error::{RunError, RunResult};
use crate::params::FixedOrientation;

/// Number of candidates kept in [`OrientationSearch::ranked`].
pub const RANKED_CANDIDATES: usize = 10;

/// Largest accepted [`OrientationGrid::steps`] (0.1° spacing over a half turn).
pub const MAX_GRID_STEPS: usize = 1801;

/// Angles visited on each axis: `0, step, 2·step, ..` for `steps` values.
///
/// # Example
///
/// ```
/// use mesh_overhang::OrientationGrid;
///
/// let grid = OrientationGrid::default();
/// assert_eq!(grid.steps, 37);
/// assert_eq!(grid.cell_count(), 37 * 37);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrientationGrid {
    /// Angles per axis.
    pub steps: usize,
    /// Spacing in radians.
    pub step: f64,
}

impl Default for OrientationGrid {
    /// 37 steps of 5°, covering 0° to 180° on each axis.
    fn default() -> Self {
        Self {
            steps: 37,
            step: PI / 36.0,
        }
    }
}

impl OrientationGrid {
    /// Create a grid with `steps` angles spaced `step` radians apart.
    #[must_use]
    pub const fn new(steps: usize, step: f64) -> Self {
        Self { steps, step }
    }

    /// Angle at grid index `i`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    // Grid indices are small
    pub fn angle(&self, i: usize) -> f64 {
        i as f64 * self.step
    }

    /// Number of `(x, y)` cells, saturating at `usize::MAX`.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.steps.saturating_mul(self.steps)
    }

    pub(crate) fn validate(&self) -> RunResult<()> {
        if self.steps == 0 {
            return Err(RunError::invalid_option(
                "orientation grid needs at least one step",
            ));
        }
        if self.steps > MAX_GRID_STEPS || self.steps.checked_mul(self.steps).is_none() {
            return Err(RunError::invalid_option(format!(
                "orientation grid steps must be at most {MAX_GRID_STEPS}, got {}",
                self.steps
            )));
        }
        if !self.step.is_finite() {
            return Err(RunError::invalid_option(format!(
                "orientation grid step must be finite, got {}",
                self.step
            )));
        }
        Ok(())
    }
}

/// One evaluated grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationCandidate {
    /// Rotation about X in radians.
    pub x: f64,
    /// Rotation about Y in radians.
    pub y: f64,
    /// Total support weight in this orientation.
    pub total_weight: f64,
    /// Some face rests on the bed.
    pub grounded: bool,
}

impl OrientationCandidate {
    /// The rotation angles as a [`FixedOrientation`].
    #[must_use]
    pub const fn orientation(&self) -> FixedOrientation {
        FixedOrientation::new(self.x, self.y)
    }
}

impl fmt::Display for OrientationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} weight {:.3}{}",
            self.orientation(),
            self.total_weight,
            if self.grounded { " (grounded)" } else { "" }
        )
    }
}

/// Result of [`find_optimal_orientation`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationSearch {
    /// Winning candidate; the mesh is left in this orientation.
    pub best: OrientationCandidate,
    /// Lightest eligible candidates, best first.
    pub ranked: Vec<OrientationCandidate>,
    /// Grid cells evaluated.
    pub evaluated: usize,
    /// `grounded_only` was requested but no candidate was grounded.
    pub grounded_fallback: bool,
}

/// Search the grid for the orientation with the lowest support weight.
///
/// Every cell starts from the orientation the mesh had on entry. Ties go to
/// the first cell in grid order (X outer, Y inner). At most
/// [`MAX_GRID_STEPS`] angles per axis are visited. On return the mesh is
/// rotated to the winner and classified.
///
/// # Errors
///
/// Returns an error only if the mesh changes size during the search, which
/// cannot happen through this function.
///
/// # Example
///
/// ```
/// use mesh_overhang::{OrientationGrid, find_optimal_orientation};
/// use mesh_topology::{ClassifyParams, Mesh};
///
/// let mut mesh = Mesh::unit_cube();
/// let grid = OrientationGrid::new(4, std::f64::consts::FRAC_PI_4);
/// let search =
///     find_optimal_orientation(&mut mesh, &ClassifyParams::default(), &grid, false).unwrap();
///
/// assert_eq!(search.evaluated, 16);
/// assert!(search.best.grounded);
/// ```
pub fn find_optimal_orientation(
    mesh: &mut Mesh,
    params: &ClassifyParams,
    grid: &OrientationGrid,
    grounded_only: bool,
) -> TopologyResult<OrientationSearch> {
    let steps = grid.steps.clamp(1, MAX_GRID_STEPS);
    let cells = steps * steps;
    info!(
        faces = mesh.faces().len(),
        cells,
        grounded_only,
        "Starting orientation search"
    );

    let snapshot = mesh.snapshot();
    let mut candidates = Vec::with_capacity(cells);
    for i in 0..steps {
        let x = grid.angle(i);
        for j in 0..steps {
            let y = grid.angle(j);
            mesh.restore(&snapshot)?;
            mesh.apply_rotation(&orientation_rotation(x, y));
            mesh.reclassify(params);
            candidates.push(OrientationCandidate {
                x,
                y,
                total_weight: mesh.total_weight(),
                grounded: mesh.is_grounded(),
            });
        }
    }
    let evaluated = candidates.len();

    let mut grounded_fallback = false;
    if grounded_only {
        if candidates.iter().any(|c| c.grounded) {
            candidates.retain(|c| c.grounded);
        } else {
            warn!("No grounded orientation found, ranking all candidates");
            grounded_fallback = true;
        }
    }

    // Stable sort keeps grid order among equal weights
    candidates.sort_by(|a, b| a.total_weight.total_cmp(&b.total_weight));
    candidates.truncate(RANKED_CANDIDATES);

    let best = candidates.first().copied().unwrap_or(OrientationCandidate {
        x: 0.0,
        y: 0.0,
        total_weight: mesh.total_weight(),
        grounded: mesh.is_grounded(),
    });

    mesh.restore(&snapshot)?;
    mesh.apply_rotation(&orientation_rotation(best.x, best.y));
    mesh.reclassify(params);

    info!(
        x_deg = best.x.to_degrees(),
        y_deg = best.y.to_degrees(),
        weight = best.total_weight,
        "Optimal orientation"
    );
    for (rank, candidate) in candidates.iter().enumerate().skip(1) {
        debug!(rank, %candidate, "Alternative orientation");
    }

    Ok(OrientationSearch {
        best,
        ranked: candidates,
        evaluated,
        grounded_fallback,
    })
}

/// Rotate the mesh about X by `orientation.x`, then about Y by `orientation.y`.
///
/// # Errors
///
/// Never fails for X and Y; the error type is shared with
/// [`Mesh::rotate`].
pub fn apply_fixed_orientation(
    mesh: &mut Mesh,
    orientation: FixedOrientation,
) -> TopologyResult<()> {
    mesh.rotate(Axis::X, orientation.x)?;
    mesh.rotate(Axis::Y, orientation.y)?;
    info!(%orientation, "Applied fixed orientation");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_topology::Point3;
    use std::f64::consts::FRAC_PI_2;

    /// A ramp-shaped wedge whose best orientation is not the identity.
    fn wedge() -> Mesh {
        let p = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(2.0, 1.0, 2.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 1.0, 1.0),
        ];
        let tris = [
            [0, 4, 2],
            [1, 3, 5],
            [0, 1, 5],
            [0, 5, 4],
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 3],
            [4, 3, 2],
        ];
        let triangles: Vec<_> = tris.iter().map(|&[a, b, c]| [p[a], p[b], p[c]]).collect();
        Mesh::from_triangles(&triangles).unwrap()
    }

    #[test]
    fn default_grid_spans_half_turn() {
        let grid = OrientationGrid::default();
        assert_relative_eq!(grid.angle(36), PI, epsilon = 1e-12);
        assert_relative_eq!(grid.angle(1).to_degrees(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn oversized_grid_is_an_invalid_option() {
        let huge = OrientationGrid::new(usize::MAX / 2, 1e-9);
        assert_eq!(huge.cell_count(), usize::MAX);
        assert!(matches!(huge.validate(), Err(RunError::InvalidOption { .. })));
        assert!(matches!(
            OrientationGrid::new(MAX_GRID_STEPS + 1, 1e-3).validate(),
            Err(RunError::InvalidOption { .. })
        ));
        assert!(OrientationGrid::new(MAX_GRID_STEPS, PI / 1800.0).validate().is_ok());
    }

    #[test]
    fn search_is_deterministic() {
        let params = ClassifyParams::default();
        let grid = OrientationGrid::new(7, PI / 6.0);

        let mut a = wedge();
        let mut b = wedge();
        let first = find_optimal_orientation(&mut a, &params, &grid, false).unwrap();
        let second = find_optimal_orientation(&mut b, &params, &grid, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.evaluated, 49);
        assert_eq!(first.ranked.len(), RANKED_CANDIDATES);
        assert_eq!(a.vertices().positions(), b.vertices().positions());
    }

    #[test]
    fn best_is_lightest_and_mesh_is_left_there() {
        let params = ClassifyParams::default();
        let grid = OrientationGrid::new(5, FRAC_PI_2 / 2.0);
        let mut mesh = wedge();
        let search = find_optimal_orientation(&mut mesh, &params, &grid, false).unwrap();

        for pair in search.ranked.windows(2) {
            assert!(pair[0].total_weight <= pair[1].total_weight);
        }
        assert_relative_eq!(mesh.total_weight(), search.best.total_weight, epsilon = 1e-9);

        let expected = orientation_rotation(search.best.x, search.best.y);
        assert_relative_eq!(*mesh.orientation(), expected, epsilon = 1e-12);
    }

    #[test]
    fn search_starts_from_entry_orientation() {
        let params = ClassifyParams::default();
        let grid = OrientationGrid::new(1, 1.0);
        let mut mesh = Mesh::unit_cube();
        let before = mesh.vertices().positions();

        let search = find_optimal_orientation(&mut mesh, &params, &grid, true).unwrap();
        assert_eq!(search.evaluated, 1);
        assert!(search.best.grounded);
        assert!(!search.grounded_fallback);
        assert_eq!(mesh.vertices().positions(), before);
    }

    #[test]
    fn grounded_only_prefers_grounded_candidates() {
        let params = ClassifyParams::default();
        let grid = OrientationGrid::new(9, PI / 8.0);
        let mut mesh = Mesh::unit_cube();
        let search = find_optimal_orientation(&mut mesh, &params, &grid, true).unwrap();

        assert!(search.ranked.iter().all(|c| c.grounded));
        assert!(mesh.is_grounded());
    }

    #[test]
    fn fixed_orientation_rotates_x_then_y() {
        let mut mesh = Mesh::unit_cube();
        let fixed = FixedOrientation::new(0.3, 1.1);
        apply_fixed_orientation(&mut mesh, fixed).unwrap();
        assert_relative_eq!(
            *mesh.orientation(),
            orientation_rotation(0.3, 1.1),
            epsilon = 1e-12
        );
    }
}
