//! Undirected edge table with edge-to-face incidence.

use std::fmt;

use hashbrown::HashMap;
use tracing::warn;

use crate::error::{TopologyError, TopologyResult};
use crate::face::FaceId;
use crate::vertex::VertexId;

/// Stable index of an edge inside an [`EdgeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Position of this edge in the table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// An undirected edge. `(a, b)` and `(b, a)` are the same edge.
#[derive(Debug, Clone)]
pub struct Edge {
    vertices: [VertexId; 2],
    faces: Vec<FaceId>,
}

impl Edge {
    /// Endpoints, lower id first.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [VertexId; 2] {
        self.vertices
    }

    /// Faces that use this edge, in association order.
    #[inline]
    #[must_use]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    /// True if `vertex` is one of the endpoints.
    #[must_use]
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }
}

/// Table of unique undirected edges.
///
/// For a closed surface every edge is shared by exactly two faces. The table
/// only reports deviations; it never rejects them.
///
/// # Example
///
/// ```
/// use mesh_topology::{Mesh, Point3};
///
/// let mesh = Mesh::from_triangles(&[[
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ]])
/// .unwrap();
///
/// // A lone triangle: three boundary edges, each with one face
/// assert_eq!(mesh.edges().len(), 3);
/// assert_eq!(mesh.edges().manifold_violations(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    edges: Vec<Edge>,
    lookup: HashMap<(VertexId, VertexId), EdgeId>,
    duplicate_associations: usize,
}

impl EdgeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unique edges.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True if the table holds no edges.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Look up an edge by id.
    #[must_use]
    pub fn get(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Look up the edge joining two vertices, in either direction.
    #[must_use]
    pub fn find(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.lookup.get(&normalize_edge(a, b)).copied()
    }

    /// Faces incident to an edge. Empty for unknown ids.
    #[must_use]
    pub fn faces_of(&self, id: EdgeId) -> &[FaceId] {
        self.edges.get(id.index()).map_or(&[], |e| e.faces.as_slice())
    }

    /// Iterate over all edges with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().enumerate().map(|(i, e)| {
            #[allow(clippy::cast_possible_truncation)]
            // Length checked against u32 on insert
            let id = EdgeId(i as u32);
            (id, e)
        })
    }

    /// Return the id of the edge `{a, b}`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CapacityExceeded`] past `u32::MAX` edges.
    pub fn intern(&mut self, a: VertexId, b: VertexId) -> TopologyResult<EdgeId> {
        let key = normalize_edge(a, b);
        if let Some(&id) = self.lookup.get(&key) {
            return Ok(id);
        }
        let id = EdgeId(
            u32::try_from(self.edges.len())
                .map_err(|_| TopologyError::CapacityExceeded { kind: "edges" })?,
        );
        self.edges.push(Edge {
            vertices: [key.0, key.1],
            faces: Vec::with_capacity(2),
        });
        self.lookup.insert(key, id);
        Ok(id)
    }

    /// Record that `face` uses `edge`.
    ///
    /// Returns `false` (and logs a warning) if the pair was already recorded,
    /// which means the input contains a duplicated or degenerate facet.
    ///
    /// # Panics
    ///
    /// Panics if `edge` was not issued by this table.
    pub fn associate_face(&mut self, edge: EdgeId, face: FaceId) -> bool {
        let faces = &mut self.edges[edge.index()].faces;
        if faces.contains(&face) {
            self.duplicate_associations += 1;
            warn!(%edge, %face, "Face already associated with edge");
            return false;
        }
        faces.push(face);
        true
    }

    /// Number of edges whose incident-face count is not exactly two.
    #[must_use]
    pub fn manifold_violations(&self) -> usize {
        self.edges.iter().filter(|e| e.faces.len() != 2).count()
    }

    /// Number of edges with exactly one incident face.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.faces.len() == 1).count()
    }

    /// Number of edges with more than two incident faces.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.faces.len() > 2).count()
    }

    /// How many duplicate face associations were rejected so far.
    #[inline]
    #[must_use]
    pub const fn duplicate_associations(&self) -> usize {
        self.duplicate_associations
    }
}

/// Order an edge's endpoints so the lower id comes first.
#[inline]
fn normalize_edge(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b { (a, b) } else { (b, a) }
}
