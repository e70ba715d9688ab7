//! Single-face overhang correction.
//!
//! The solver never moves a vertex directly. It stages proposals which the
//! driver averages and commits once every problematic face has been visited.

use mesh_topology::{FaceId, Mesh, Point3, Vector3, VertexId};

use crate::params::CorrectionParams;
use crate::zero_phi;

/// Height differences below this are not corrected.
pub const MIN_CORRECTION_DZ: f64 = 0.01;

/// Horizontal components below this length count as no direction.
const DIRECTION_EPSILON: f64 = 1e-12;

/// What [`solve_face`] did with one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceAction {
    /// A corner was a pole; the other corners were staged to its height.
    PoleSnapped {
        /// The pole vertex.
        pole: VertexId,
    },
    /// Flat face left alone by the zero-phi strategy.
    FlatSkipped,
    /// Flat face handled by the zero-phi strategy.
    FlatInjected,
    /// Slope corrections staged on the lower corners (0 to 2).
    AngleCorrected {
        /// Corners that received a proposal.
        staged: usize,
    },
}

/// Stage corrections for one problematic face.
///
/// 1. If a corner is a pole (first in face order), the other two corners are
///    staged to the pole's Z and nothing else happens to this face.
/// 2. If all three corners share the exact same Z, the zero-phi strategy
///    decides.
/// 3. Otherwise the highest corner anchors the face and each lower corner
///    is moved horizontally by [`fix_angle`].
///
/// An id that does not belong to `mesh` stages nothing.
pub fn solve_face(mesh: &mut Mesh, face: FaceId, params: &CorrectionParams) -> FaceAction {
    let Some(f) = mesh.faces().get(face) else {
        return FaceAction::AngleCorrected { staged: 0 };
    };
    let ids = f.vertices();
    let live_normal = f.live_unit_normal(mesh.vertices());

    let vertices = mesh.vertices();
    if let Some(pole) = ids.iter().copied().find(|&v| vertices.is_pole(v)) {
        let pole_z = vertices.position(pole).z;
        let moves: Vec<(VertexId, f64)> = ids
            .iter()
            .filter(|&&v| v != pole)
            .map(|&v| (v, pole_z - vertices.position(v).z))
            .collect();
        for (v, dz) in moves {
            mesh.stage_displacement(v, Vector3::new(0.0, 0.0, dz));
        }
        return FaceAction::PoleSnapped { pole };
    }

    let mut corners = ids.map(|v| (v, vertices.position(v)));
    if is_flat(&corners) {
        return if zero_phi::apply(params.zero_phi_strategy, mesh, face, params.angle_tolerance) {
            FaceAction::FlatInjected
        } else {
            FaceAction::FlatSkipped
        };
    }

    corners.sort_by(|a, b| a.1.z.total_cmp(&b.1.z));
    let anchor = corners[2].1;
    let original = mesh.original_normal(face).unwrap_or(live_normal);

    let mut staged = 0;
    for (v, roaming) in &corners[..2] {
        if let Some(shift) = fix_angle(&anchor, roaming, &original, &live_normal, params.phi_min) {
            mesh.stage_displacement(*v, shift);
            staged += 1;
        }
    }
    FaceAction::AngleCorrected { staged }
}

#[allow(clippy::float_cmp)]
// Flat means bit-equal heights
fn is_flat(corners: &[(VertexId, Point3<f64>); 3]) -> bool {
    corners[0].1.z == corners[1].1.z && corners[1].1.z == corners[2].1.z
}

/// Horizontal shift that puts `roaming` at slope `phi_min` below `anchor`.
///
/// The shift runs along the horizontal direction of `original_normal` (the
/// face normal at load, carried through rotations), or of `live_normal`
/// when the original has no horizontal part. Returns `None` when the height
/// difference is below [`MIN_CORRECTION_DZ`] or neither normal gives a
/// direction.
///
/// # Example
///
/// ```
/// use mesh_overhang::fix_angle;
/// use mesh_topology::{Point3, Vector3};
///
/// let anchor = Point3::new(2.0, 0.0, 1.0);
/// let roaming = Point3::new(0.0, 0.0, 0.0);
/// let normal = Vector3::new(1.0, 0.0, -2.0).normalize();
///
/// let shift = fix_angle(&anchor, &roaming, &normal, &normal, std::f64::consts::FRAC_PI_4).unwrap();
/// assert!((shift.x - 1.0).abs() < 1e-12);
/// assert_eq!(shift.z, 0.0);
/// ```
#[must_use]
pub fn fix_angle(
    anchor: &Point3<f64>,
    roaming: &Point3<f64>,
    original_normal: &Vector3<f64>,
    live_normal: &Vector3<f64>,
    phi_min: f64,
) -> Option<Vector3<f64>> {
    let dz = anchor.z - roaming.z;
    if dz <= 0.0 || dz < MIN_CORRECTION_DZ {
        return None;
    }

    let direction = horizontal(original_normal).or_else(|| horizontal(live_normal))?;
    let target = dz / phi_min.tan();
    let current = (anchor - roaming).dot(&direction);
    Some(direction * (current - target))
}

fn horizontal(normal: &Vector3<f64>) -> Option<Vector3<f64>> {
    Vector3::new(normal.x, normal.y, 0.0).try_normalize(DIRECTION_EPSILON)
}
