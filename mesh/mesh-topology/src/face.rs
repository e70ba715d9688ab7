//! Triangular faces and the classified face set.

use std::fmt;

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::classify::{ClassifyParams, WeightModel, classify};
use crate::edge::EdgeId;
use crate::error::{TopologyError, TopologyResult};
use crate::vertex::{VertexId, VertexTable};

/// Stable index of a face inside a [`FaceSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceId(pub(crate) u32);

impl FaceId {
    /// Position of this face in the set.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Non-normalized normal `(b - a) × (c - a)`.
#[inline]
#[must_use]
pub fn triangle_normal(corners: &[Point3<f64>; 3]) -> Vector3<f64> {
    (corners[1] - corners[0]).cross(&(corners[2] - corners[0]))
}

/// Normalize, mapping the zero vector to itself.
#[inline]
fn unit_or_zero(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(0.0).unwrap_or_else(Vector3::zeros)
}

/// A triangle with its classification state.
#[derive(Debug, Clone)]
pub struct Face {
    vertices: [VertexId; 3],
    edges: [EdgeId; 3],
    recorded_normal: Vector3<f64>,
    normal: Vector3<f64>,
    unit_normal: Vector3<f64>,
    original_normal: Vector3<f64>,
    angle: f64,
    grounded: bool,
    problematic: bool,
    weight: f64,
}

impl Face {
    pub(crate) fn new(
        vertices: [VertexId; 3],
        edges: [EdgeId; 3],
        recorded_normal: Vector3<f64>,
        normal: Vector3<f64>,
    ) -> Self {
        let unit_normal = unit_or_zero(&normal);
        Self {
            vertices,
            edges,
            recorded_normal,
            normal,
            unit_normal,
            original_normal: unit_normal,
            angle: 0.0,
            grounded: false,
            problematic: false,
            weight: 0.0,
        }
    }

    /// Vertex ids in winding order.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [VertexId; 3] {
        self.vertices
    }

    /// Edge ids: `(v0, v1)`, `(v1, v2)`, `(v2, v0)`.
    #[inline]
    #[must_use]
    pub const fn edges(&self) -> [EdgeId; 3] {
        self.edges
    }

    /// Normal as stored in the source file. Informational only.
    #[inline]
    #[must_use]
    pub const fn recorded_normal(&self) -> &Vector3<f64> {
        &self.recorded_normal
    }

    /// Live normal from the last classification, not normalized.
    #[inline]
    #[must_use]
    pub const fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    /// Live unit normal from the last classification.
    #[inline]
    #[must_use]
    pub const fn unit_normal(&self) -> &Vector3<f64> {
        &self.unit_normal
    }

    /// Unit normal captured when the face was loaded, in the load frame.
    ///
    /// See `Mesh::original_normal` for the same direction in the current
    /// orientation.
    #[inline]
    #[must_use]
    pub const fn original_normal(&self) -> &Vector3<f64> {
        &self.original_normal
    }

    /// Angle to straight down, in radians.
    #[inline]
    #[must_use]
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// All corners rest on the ground level.
    #[inline]
    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// The face is an unsupported overhang.
    #[inline]
    #[must_use]
    pub const fn is_problematic(&self) -> bool {
        self.problematic
    }

    /// Support cost of this face.
    #[inline]
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Current corner positions.
    #[must_use]
    pub fn corners(&self, vertices: &VertexTable) -> [Point3<f64>; 3] {
        self.vertices.map(|id| vertices.position(id))
    }

    /// Highest corner Z.
    #[must_use]
    pub fn top_z(&self, vertices: &VertexTable) -> f64 {
        self.z_range(vertices).1
    }

    /// `(min, max)` corner Z.
    #[must_use]
    pub fn z_range(&self, vertices: &VertexTable) -> (f64, f64) {
        self.vertices
            .iter()
            .map(|&id| vertices.position(id).z)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), z| {
                (lo.min(z), hi.max(z))
            })
    }

    /// Unit normal recomputed from the current positions, without touching
    /// the stored state.
    #[must_use]
    pub fn live_unit_normal(&self, vertices: &VertexTable) -> Vector3<f64> {
        unit_or_zero(&triangle_normal(&self.corners(vertices)))
    }
}

/// All faces of a mesh, partitioned into problematic and acceptable.
///
/// Partitions are rebuilt by [`reclassify_all`](Self::reclassify_all) and keep
/// face-id order.
#[derive(Debug, Clone, Default)]
pub struct FaceSet {
    faces: Vec<Face>,
    problematic: Vec<FaceId>,
    acceptable: Vec<FaceId>,
    total_weight: f64,
}

impl FaceSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// True if the set holds no faces.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Id the next pushed face will get.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CapacityExceeded`] past `u32::MAX` faces.
    pub fn next_id(&self) -> TopologyResult<FaceId> {
        u32::try_from(self.faces.len())
            .map(FaceId)
            .map_err(|_| TopologyError::CapacityExceeded { kind: "faces" })
    }

    pub(crate) fn push(&mut self, face: Face) -> TopologyResult<FaceId> {
        let id = self.next_id()?;
        self.faces.push(face);
        Ok(id)
    }

    /// Look up a face.
    #[must_use]
    pub fn get(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.index())
    }

    /// Iterate over all faces with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces.iter().enumerate().map(|(i, f)| {
            #[allow(clippy::cast_possible_truncation)]
            // Length checked against u32 on push
            let id = FaceId(i as u32);
            (id, f)
        })
    }

    /// Faces classified as overhangs, in id order.
    #[must_use]
    pub fn problematic(&self) -> &[FaceId] {
        &self.problematic
    }

    /// Faces classified as printable, in id order.
    #[must_use]
    pub fn acceptable(&self) -> &[FaceId] {
        &self.acceptable
    }

    /// Number of problematic faces.
    #[inline]
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.problematic.len()
    }

    /// Sum of all face weights from the last classification.
    #[inline]
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Recompute normal, angle, grounded flag, weight and partition of every
    /// face against the current vertex positions.
    ///
    /// Returns true if at least one flat face rests on the bed.
    pub fn reclassify_all(
        &mut self,
        vertices: &VertexTable,
        params: &ClassifyParams,
        model: &WeightModel,
        ground_level: f64,
    ) -> bool {
        self.problematic.clear();
        self.acceptable.clear();
        self.total_weight = 0.0;
        let mut resting = false;

        for (i, face) in self.faces.iter_mut().enumerate() {
            let corners = face.corners(vertices);
            face.normal = triangle_normal(&corners);
            face.unit_normal = unit_or_zero(&face.normal);

            let class = classify(&face.unit_normal, &corners, ground_level, params);
            face.angle = class.angle;
            face.grounded = class.grounded;
            face.problematic = class.problematic;
            face.weight = model.weight(&class, &corners, params);
            self.total_weight += face.weight;

            if model.rests_on_bed(class.angle, class.grounded, params.ignore_grounded) {
                resting = true;
            }

            #[allow(clippy::cast_possible_truncation)]
            // Length checked against u32 on push
            let id = FaceId(i as u32);
            if class.problematic {
                self.problematic.push(id);
            } else {
                self.acceptable.push(id);
            }
        }

        debug!(
            problematic = self.problematic.len(),
            total_weight = self.total_weight,
            "Reclassified faces"
        );
        resting
    }
}
