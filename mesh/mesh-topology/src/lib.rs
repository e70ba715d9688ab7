//! Mesh topology kernel for overhang correction.
//!
//! This crate holds a triangle mesh as three index-linked tables and keeps the
//! per-face state the overhang solver works on.
//!
//! # Tables
//!
//! - [`VertexTable`]: unique positions, merged within a per-axis tolerance,
//!   with adjacency sets, pole flags and staged displacements
//! - [`EdgeTable`]: unique undirected edges with incident faces
//! - [`FaceSet`]: triangles with live and load-time normals, overhang angle,
//!   support weight, and the problematic/acceptable partition
//!
//! [`Mesh`] ties them together and tracks the bed (ground level, grounded
//! flag) across rotations.
//!
//! # Classification
//!
//! A face is an overhang when the angle between its normal and straight down
//! is below `phi_min`. Faces resting on the bed and faces within
//! `angle_tolerance` of `phi_min` are accepted. See [`classify`] and
//! [`WeightModel`].
//!
//! # Example
//!
//! ```
//! use mesh_topology::{ClassifyParams, Mesh, Point3};
//!
//! // A floating triangle facing straight down
//! let mut mesh = Mesh::from_triangles(&[[
//!     Point3::new(0.0, 0.0, 2.0),
//!     Point3::new(0.0, 1.0, 2.0),
//!     Point3::new(1.0, 0.0, 2.0),
//! ]])
//! .unwrap();
//!
//! mesh.reclassify(&ClassifyParams::default().with_ignore_grounded(true));
//! assert_eq!(mesh.warning_count(), 1);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod classify;
mod edge;
mod error;
mod face;
mod mesh;
mod transform;
mod vertex;

pub use classify::{
    Classification, ClassifyParams, WeightModel, classify, is_grounded, overhang_angle,
    projected_area,
};
pub use edge::{Edge, EdgeId, EdgeTable};
pub use error::{TopologyError, TopologyResult};
pub use face::{Face, FaceId, FaceSet, triangle_normal};
pub use mesh::{Mesh, MeshSnapshot};
pub use transform::{Axis, orientation_rotation, rotation_about};
pub use vertex::{DEFAULT_VERTEX_TOLERANCE, POLE_EPSILON, Vertex, VertexId, VertexTable};

// Re-export the geometry types used throughout the API.
pub use nalgebra::{Point3, Rotation3, Vector3};
