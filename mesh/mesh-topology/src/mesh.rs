//! The mesh aggregate: vertex, edge and face tables plus bed state.

use nalgebra::{Point3, Rotation3, Vector3};

use crate::classify::{ClassifyParams, WeightModel};
use crate::edge::{EdgeId, EdgeTable};
use crate::error::{TopologyError, TopologyResult};
use crate::face::{Face, FaceId, FaceSet, triangle_normal};
use crate::transform::{Axis, rotation_about};
use crate::vertex::{VertexId, VertexTable};

/// Positions and orientation captured by [`Mesh::snapshot`].
#[derive(Debug, Clone)]
pub struct MeshSnapshot {
    positions: Vec<Point3<f64>>,
    orientation: Rotation3<f64>,
}

/// A triangle mesh with deduplicated vertices and edge-face incidence.
///
/// Topology is fixed once loading is done; only vertex positions change
/// afterwards, through rigid rotation or committed displacements.
///
/// # Example
///
/// ```
/// use mesh_topology::{ClassifyParams, Mesh};
///
/// let mut cube = Mesh::unit_cube();
/// cube.reclassify(&ClassifyParams::default());
///
/// assert_eq!(cube.vertices().len(), 8);
/// assert_eq!(cube.faces().warning_count(), 0);
/// assert!(cube.is_grounded());
/// ```
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    vertices: VertexTable,
    edges: EdgeTable,
    faces: FaceSet,
    ground_level: f64,
    grounded: bool,
    weight_model: WeightModel,
    orientation: Rotation3<f64>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new("")
    }
}

impl Mesh {
    /// Create an empty mesh with the default vertex tolerance.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_vertex_tolerance(name, crate::vertex::DEFAULT_VERTEX_TOLERANCE)
    }

    /// Create an empty mesh with a custom vertex merge tolerance.
    #[must_use]
    pub fn with_vertex_tolerance(name: impl Into<String>, tolerance: f64) -> Self {
        Self {
            name: name.into(),
            vertices: VertexTable::with_tolerance(tolerance),
            edges: EdgeTable::new(),
            faces: FaceSet::new(),
            ground_level: 0.0,
            grounded: false,
            weight_model: WeightModel::default(),
            orientation: Rotation3::identity(),
        }
    }

    /// Build a mesh from raw triangles, recomputing every normal.
    ///
    /// # Errors
    ///
    /// Fails on the first triangle [`add_facet`](Self::add_facet) rejects.
    pub fn from_triangles(triangles: &[[Point3<f64>; 3]]) -> TopologyResult<Self> {
        let mut mesh = Self::new("");
        for corners in triangles {
            mesh.add_facet(Vector3::zeros(), *corners)?;
        }
        Ok(mesh)
    }

    /// Add one triangle.
    ///
    /// Interns the three corners, interns and associates the three edges,
    /// and records adjacency for each vertex pair. `recorded_normal` is kept
    /// as-is but never classified; the winding of `corners` alone defines the
    /// live and load-time normals, so a file normal that disagrees with the
    /// winding is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MalformedGeometry`] if a coordinate is not
    /// finite or the triangle has zero area after vertex merging.
    pub fn add_facet(
        &mut self,
        recorded_normal: Vector3<f64>,
        corners: [Point3<f64>; 3],
    ) -> TopologyResult<FaceId> {
        let [a, b, c] = [
            self.vertices.intern(corners[0])?,
            self.vertices.intern(corners[1])?,
            self.vertices.intern(corners[2])?,
        ];
        let merged = [a, b, c].map(|id| self.vertices.position(id));
        let normal = triangle_normal(&merged);
        if normal.norm_squared() == 0.0 {
            return Err(TopologyError::malformed(format!(
                "facet {} has zero area ({a}, {b}, {c})",
                self.faces.len()
            )));
        }

        let id = self.faces.next_id()?;
        let edges = [
            self.edges.intern(a, b)?,
            self.edges.intern(b, c)?,
            self.edges.intern(c, a)?,
        ];
        for &edge in &edges {
            self.edges.associate_face(edge, id);
        }
        self.vertices.set_adjacency(a, b);
        self.vertices.set_adjacency(b, c);
        self.vertices.set_adjacency(c, a);

        let lowest = merged.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
        self.ground_level = if self.faces.is_empty() {
            lowest
        } else {
            self.ground_level.min(lowest)
        };

        self.faces
            .push(Face::new([a, b, c], edges, recorded_normal, normal))
    }

    /// Solid name read from the source file.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the solid name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Vertex table.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> &VertexTable {
        &self.vertices
    }

    /// Edge table.
    #[inline]
    #[must_use]
    pub const fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    /// Face set.
    #[inline]
    #[must_use]
    pub const fn faces(&self) -> &FaceSet {
        &self.faces
    }

    /// Lowest vertex Z, as of the last rotation or load.
    #[inline]
    #[must_use]
    pub const fn ground_level(&self) -> f64 {
        self.ground_level
    }

    /// True if the last classification found a flat face on the bed.
    #[inline]
    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Cost model used by [`reclassify`](Self::reclassify).
    #[inline]
    #[must_use]
    pub const fn weight_model(&self) -> &WeightModel {
        &self.weight_model
    }

    /// Replace the cost model. Takes effect on the next classification.
    pub fn set_weight_model(&mut self, model: WeightModel) {
        self.weight_model = model;
    }

    /// Accumulated rigid rotation since load.
    #[inline]
    #[must_use]
    pub const fn orientation(&self) -> &Rotation3<f64> {
        &self.orientation
    }

    /// Sum of face weights from the last classification.
    #[inline]
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.faces.total_weight()
    }

    /// Number of problematic faces from the last classification.
    #[inline]
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.faces.warning_count()
    }

    /// Edges not shared by exactly two faces.
    #[inline]
    #[must_use]
    pub fn manifold_violations(&self) -> usize {
        self.edges.manifold_violations()
    }

    /// Corner positions of a face.
    #[must_use]
    pub fn face_corners(&self, id: FaceId) -> Option<[Point3<f64>; 3]> {
        self.faces.get(id).map(|f| f.corners(&self.vertices))
    }

    /// Load-time unit normal of a face, carried through every rigid rotation
    /// applied since.
    #[must_use]
    pub fn original_normal(&self, id: FaceId) -> Option<Vector3<f64>> {
        self.faces
            .get(id)
            .map(|f| self.orientation * f.original_normal())
    }

    /// Faces sharing `edge`, other than `face`.
    pub fn neighbors_across(
        &self,
        face: FaceId,
        edge: EdgeId,
    ) -> impl Iterator<Item = FaceId> + '_ {
        self.edges
            .faces_of(edge)
            .iter()
            .copied()
            .filter(move |&f| f != face)
    }

    /// Reclassify every face against the current geometry.
    ///
    /// Resets the total weight and the mesh grounded flag first.
    pub fn reclassify(&mut self, params: &ClassifyParams) {
        self.grounded = self.faces.reclassify_all(
            &self.vertices,
            params,
            &self.weight_model,
            self.ground_level,
        );
    }

    /// Rotate the whole mesh about the X or Y axis.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnsupportedAxis`] for [`Axis::Z`].
    pub fn rotate(&mut self, axis: Axis, angle: f64) -> TopologyResult<()> {
        let rotation = rotation_about(axis, angle)?;
        self.apply_rotation(&rotation);
        Ok(())
    }

    /// Apply a rigid rotation about the origin.
    ///
    /// Ground level and pole flags are recomputed; the grounded flag is
    /// cleared until the next classification.
    pub fn apply_rotation(&mut self, rotation: &Rotation3<f64>) {
        self.vertices.transform(rotation);
        self.orientation = rotation * self.orientation;
        self.after_rigid_move();
    }

    /// Capture positions and orientation.
    #[must_use]
    pub fn snapshot(&self) -> MeshSnapshot {
        MeshSnapshot {
            positions: self.vertices.positions(),
            orientation: self.orientation,
        }
    }

    /// Return to a state captured by [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::SnapshotMismatch`] if the snapshot came from
    /// a mesh with a different vertex count.
    pub fn restore(&mut self, snapshot: &MeshSnapshot) -> TopologyResult<()> {
        self.vertices.restore_positions(&snapshot.positions)?;
        self.orientation = snapshot.orientation;
        self.after_rigid_move();
        Ok(())
    }

    /// Stage a displacement on a vertex for the current round.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this mesh.
    pub fn stage_displacement(&mut self, id: VertexId, vector: Vector3<f64>) {
        self.vertices.stage_displacement(id, vector);
    }

    /// True if the vertex already has a proposal this round.
    #[must_use]
    pub fn has_pending(&self, id: VertexId) -> bool {
        self.vertices.has_pending(id)
    }

    /// Apply the mean staged displacement per vertex and refresh pole flags.
    pub fn commit_displacements(&mut self) -> Vec<(VertexId, Vector3<f64>)> {
        let applied = self.vertices.commit_displacements();
        if !applied.is_empty() {
            self.vertices.refresh_poles();
        }
        applied
    }

    /// Recompute the ground level from all vertices.
    pub fn recompute_ground_level(&mut self) {
        self.ground_level = self.vertices.min_z().unwrap_or(0.0);
    }

    fn after_rigid_move(&mut self) {
        self.recompute_ground_level();
        self.vertices.refresh_poles();
        self.grounded = false;
    }

    /// Axis-aligned unit cube `[0, 1]^3`, 12 outward-facing triangles.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn unit_cube() -> Self {
        let p = [
            Point3::new(0.0, 0.0, 0.0), // 0
            Point3::new(1.0, 0.0, 0.0), // 1
            Point3::new(1.0, 1.0, 0.0), // 2
            Point3::new(0.0, 1.0, 0.0), // 3
            Point3::new(0.0, 0.0, 1.0), // 4
            Point3::new(1.0, 0.0, 1.0), // 5
            Point3::new(1.0, 1.0, 1.0), // 6
            Point3::new(0.0, 1.0, 1.0), // 7
        ];
        let triangles: [[usize; 3]; 12] = [
            [0, 2, 1], // bottom
            [0, 3, 2],
            [4, 5, 6], // top
            [4, 6, 7],
            [0, 1, 5], // front
            [0, 5, 4],
            [3, 7, 6], // back
            [3, 6, 2],
            [0, 4, 7], // left
            [0, 7, 3],
            [1, 2, 6], // right
            [1, 6, 5],
        ];

        let mut mesh = Self::new("cube");
        for [a, b, c] in triangles {
            let added = mesh.add_facet(Vector3::zeros(), [p[a], p[b], p[c]]);
            debug_assert!(added.is_ok(), "cube facets are well-formed");
        }
        mesh
    }
}
