//! STL codec for GeoAlt meshes.
//!
//! Reads ASCII, binary and colored-binary STL into a [`mesh_topology::Mesh`]
//! and writes meshes back as ASCII STL.
//!
//! # Example
//!
//! ```no_run
//! use mesh_stl::{load_stl, save_stl_ascii};
//!
//! let mesh = load_stl("model.stl").unwrap();
//! save_stl_ascii(&mesh, "model_fixed.stl").unwrap();
//! ```
//!
//! Output files are created with create-new semantics: writing to an
//! existing path fails with [`StlError::OutputExists`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod stl;
mod writer;

pub use error::{StlError, StlResult};
pub use stl::{
    COLORED_HEADER, HEADER_SIZE, StlFormat, TRIANGLE_SIZE, detect_format, load_stl,
    load_stl_with_tolerance, parse_stl, parse_stl_with_tolerance,
};
pub use writer::{SOLID_NAME, StlWriter, save_stl_ascii, write_stl_ascii};
