//! Property-based tests for the topology kernel.
//!
//! Run with: cargo test -p mesh-topology -- proptest

use std::f64::consts::PI;

use mesh_topology::{
    ClassifyParams, Mesh, Point3, Vector3, VertexTable, WeightModel, classify,
    orientation_rotation,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-10.0..10.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Small coordinate range so points collide often.
fn arb_clustered_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(0.0..0.01f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Distinct integer lattice points, each with up to three jitter offsets
/// smaller than half the default tolerance.
fn arb_jittered_lattice() -> impl Strategy<Value = (Vec<[i32; 3]>, Vec<Vec<[f64; 3]>>)> {
    prop::collection::hash_set(prop::array::uniform3(-20..20i32), 1..40).prop_flat_map(|cells| {
        let cells: Vec<[i32; 3]> = cells.into_iter().collect();
        let jitter = prop::collection::vec(
            prop::collection::vec(prop::array::uniform3(-0.0004..0.0004f64), 0..4),
            cells.len(),
        );
        (Just(cells), jitter)
    })
}

fn within(a: &Point3<f64>, b: &Point3<f64>, tol: f64) -> bool {
    (a - b).iter().all(|d| d.abs() <= tol)
}

/// Cube `[0, s]^3` shifted by `offset`.
fn cube_triangles(offset: Vector3<f64>, s: f64) -> Vec<[Point3<f64>; 3]> {
    let p: Vec<Point3<f64>> = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ]
    .iter()
    .map(|[x, y, z]| Point3::new(x * s, y * s, z * s) + offset)
    .collect();

    [
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ]
    .iter()
    .map(|&[a, b, c]| [p[a], p[b], p[c]])
    .collect()
}

// =============================================================================
// Property Tests: Vertex interning
// =============================================================================

proptest! {
    /// Interning returns a vertex within tolerance of the query.
    #[test]
    fn intern_returns_nearby_vertex(points in prop::collection::vec(arb_clustered_point(), 1..60)) {
        let mut table = VertexTable::new();
        for p in &points {
            let id = table.intern(*p).unwrap();
            prop_assert!(within(&table.position(id), p, table.tolerance()));
        }
        prop_assert!(table.len() <= points.len());
    }

    /// The table holds exactly one vertex per point distinct beyond tolerance.
    #[test]
    fn intern_count_matches_distinct_points((cells, jitter) in arb_jittered_lattice()) {
        let mut table = VertexTable::new();
        for (cell, offsets) in cells.iter().zip(&jitter) {
            let base = Point3::new(f64::from(cell[0]), f64::from(cell[1]), f64::from(cell[2]));
            let id = table.intern(base).unwrap();
            for &[dx, dy, dz] in offsets {
                prop_assert_eq!(table.intern(base + Vector3::new(dx, dy, dz)).unwrap(), id);
            }
        }
        prop_assert_eq!(table.len(), cells.len());
    }

    /// Interning the same coordinate twice yields the same id.
    #[test]
    fn intern_is_idempotent(points in prop::collection::vec(arb_point(), 1..40)) {
        let mut table = VertexTable::new();
        let first: Vec<_> = points.iter().map(|p| table.intern(*p).unwrap()).collect();
        let len = table.len();
        let second: Vec<_> = points.iter().map(|p| table.intern(*p).unwrap()).collect();

        prop_assert_eq!(first, second);
        prop_assert_eq!(table.len(), len);
    }
}

// =============================================================================
// Property Tests: Manifold symmetry
// =============================================================================

proptest! {
    /// Any translated, scaled cube has 8 vertices, 18 edges, no violations.
    #[test]
    fn cube_is_closed(
        offset in prop::array::uniform3(-50.0..50.0f64),
        scale in 0.1..20.0f64,
    ) {
        let offset = Vector3::new(offset[0], offset[1], offset[2]);
        let mesh = Mesh::from_triangles(&cube_triangles(offset, scale)).unwrap();

        prop_assert_eq!(mesh.vertices().len(), 8);
        prop_assert_eq!(mesh.edges().len(), 18);
        prop_assert_eq!(mesh.manifold_violations(), 0);
        for (_, edge) in mesh.edges().iter() {
            prop_assert_eq!(edge.faces().len(), 2);
        }
    }

    /// Rotation never changes topology and a snapshot restores positions.
    #[test]
    fn rotation_preserves_topology(x in 0.0..PI, y in 0.0..PI) {
        let mut mesh = Mesh::unit_cube();
        let snapshot = mesh.snapshot();
        let before = mesh.vertices().positions();

        mesh.apply_rotation(&orientation_rotation(x, y));
        mesh.reclassify(&ClassifyParams::default());
        prop_assert_eq!(mesh.manifold_violations(), 0);
        prop_assert_eq!(mesh.vertices().len(), 8);
        prop_assert!(mesh.ground_level() <= 1e-12);

        mesh.restore(&snapshot).unwrap();
        prop_assert_eq!(mesh.vertices().positions(), before);
    }
}

// =============================================================================
// Property Tests: Classification and weights
// =============================================================================

proptest! {
    /// An elevated face is problematic iff its angle is below `phi_min` and
    /// outside the tolerance band.
    #[test]
    fn classification_boundary(angle in 0.0..PI) {
        let params = ClassifyParams::default();
        let band = params.phi_min - params.angle_tolerance;
        prop_assume!((angle - band).abs() > 1e-6);
        prop_assume!((angle - params.phi_min).abs() > 1e-6);

        let normal = Vector3::new(angle.sin(), 0.0, -angle.cos());
        let corners = [
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(1.0, 0.0, 5.0),
            Point3::new(0.0, 1.0, 5.0),
        ];
        let result = classify(&normal, &corners, 0.0, &params);

        prop_assert!(!result.grounded);
        prop_assert_eq!(result.problematic, angle < band);
    }

    /// Cost per area is non-increasing in the angle on the overhang ramp.
    #[test]
    fn weight_monotone_on_overhang_ramp(a in 0.087..0.785f64, b in 0.087..0.785f64) {
        let model = WeightModel::default();
        let phi = ClassifyParams::default().phi_min;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(
            model.cost_per_area(lo, false, false, phi) >= model.cost_per_area(hi, false, false, phi)
        );
    }

    /// Same on the shallow ramp, which also stays below the overhang ramp.
    #[test]
    fn weight_monotone_on_shallow_ramp(a in 0.786..1.48f64, b in 0.786..1.48f64) {
        let model = WeightModel::default();
        let phi = ClassifyParams::default().phi_min;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let shallow_lo = model.cost_per_area(lo, false, false, phi);

        prop_assert!(shallow_lo >= model.cost_per_area(hi, false, false, phi));
        prop_assert!(shallow_lo < model.cost_per_area(0.78, false, false, phi));
    }

    /// Only a flat face on the bed has negative cost.
    #[test]
    fn weight_negative_only_on_bed(angle in 0.0..PI, grounded in any::<bool>()) {
        let model = WeightModel::default();
        let phi = ClassifyParams::default().phi_min;
        let cost = model.cost_per_area(angle, grounded, false, phi);
        if cost < 0.0 {
            prop_assert!(grounded && angle < model.flat_angle);
        }
    }
}
