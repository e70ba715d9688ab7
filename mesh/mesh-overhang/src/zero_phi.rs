//! Staging functions for flat overhangs.
//!
//! A flat overhang has all three corners at the same Z, so there is no anchor
//! to measure a slope from. Each strategy only stages displacements; nothing
//! moves until the driver commits.

use mesh_topology::{FaceId, Mesh, Vector3};

use crate::params::ZeroPhiStrategy;

/// Stage the strategy's displacements for a flat face.
///
/// Returns `true` if anything was staged.
pub fn apply(
    strategy: ZeroPhiStrategy,
    mesh: &mut Mesh,
    face: FaceId,
    angle_tolerance: f64,
) -> bool {
    match strategy {
        ZeroPhiStrategy::None => false,
        ZeroPhiStrategy::Inject => inject(mesh, face, angle_tolerance),
    }
}

/// Pull one shared edge down toward an angled neighbor.
///
/// Edges are tried in face order. The first neighbor whose angle exceeds
/// `angle_tolerance` and whose top is not above this face's top gets its
/// shared edge lowered by half the neighbor's Z span. Nothing is staged if a
/// corner of `face` already holds a proposal this round.
pub fn inject(mesh: &mut Mesh, face: FaceId, angle_tolerance: f64) -> bool {
    let Some(flat) = mesh.faces().get(face) else {
        return false;
    };
    let corners = flat.vertices();
    let edges = flat.edges();
    let top = flat.top_z(mesh.vertices());

    for edge in edges {
        let neighbors: Vec<FaceId> = mesh.neighbors_across(face, edge).collect();
        for neighbor in neighbors {
            if corners.iter().any(|&v| mesh.has_pending(v)) {
                return false;
            }
            let Some(other) = mesh.faces().get(neighbor) else {
                continue;
            };
            let (min_z, max_z) = other.z_range(mesh.vertices());
            if other.angle() > angle_tolerance && top >= max_z {
                let Some(shared) = mesh.edges().get(edge).map(|e| e.vertices()) else {
                    return false;
                };
                let shift = Vector3::new(0.0, 0.0, (min_z - max_z) / 2.0);
                for v in shared {
                    mesh.stage_displacement(v, shift);
                }
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_topology::{ClassifyParams, Point3};

    /// Flat downward face at z = 2 with a neighbor hanging below its first edge.
    fn flat_with_lower_neighbor() -> Mesh {
        let a = Point3::new(0.0, 0.0, 2.0);
        let b = Point3::new(0.0, 1.0, 2.0);
        let c = Point3::new(1.0, 0.0, 2.0);
        let d = Point3::new(-1.0, 0.5, 1.0);
        let mut mesh = Mesh::from_triangles(&[[a, b, c], [b, a, d]]).unwrap();
        mesh.reclassify(&ClassifyParams::default().with_ignore_grounded(true));
        mesh
    }

    #[test]
    fn inject_lowers_shared_edge() {
        let mut mesh = flat_with_lower_neighbor();
        let flat = mesh.faces().iter().next().unwrap().0;
        let [a, b, c] = mesh.faces().get(flat).unwrap().vertices();

        assert!(inject(&mut mesh, flat, 0.017));
        assert!(mesh.has_pending(a));
        assert!(mesh.has_pending(b));
        assert!(!mesh.has_pending(c));

        mesh.commit_displacements();
        assert_relative_eq!(mesh.vertices().position(a).z, 1.5, epsilon = 1e-12);
        assert_relative_eq!(mesh.vertices().position(b).z, 1.5, epsilon = 1e-12);
        assert_relative_eq!(mesh.vertices().position(c).z, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn inject_skips_when_a_corner_is_pending() {
        let mut mesh = flat_with_lower_neighbor();
        let flat = mesh.faces().iter().next().unwrap().0;
        let [_, _, c] = mesh.faces().get(flat).unwrap().vertices();
        mesh.stage_displacement(c, Vector3::new(0.0, 0.0, 0.1));

        assert!(!inject(&mut mesh, flat, 0.017));
        assert_eq!(mesh.vertices().pending_count(), 1);
    }

    #[test]
    fn inject_ignores_flat_neighbors() {
        let a = Point3::new(0.0, 0.0, 2.0);
        let b = Point3::new(0.0, 1.0, 2.0);
        let c = Point3::new(1.0, 0.0, 2.0);
        let d = Point3::new(-1.0, 0.5, 2.0);
        let mut mesh = Mesh::from_triangles(&[[a, b, c], [a, d, b]]).unwrap();
        mesh.reclassify(&ClassifyParams::default().with_ignore_grounded(true));
        let flat = mesh.faces().iter().next().unwrap().0;

        assert!(!inject(&mut mesh, flat, 0.017));
        assert!(!apply(ZeroPhiStrategy::None, &mut mesh, flat, 0.017));
        assert_eq!(mesh.vertices().pending_count(), 0);
    }
}
