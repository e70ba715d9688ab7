//! Binary → ASCII → parse round trips through the file system.
//!
//! To run: cargo test -p mesh-stl --test roundtrip

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mesh_stl::{StlError, load_stl, parse_stl, save_stl_ascii};
use mesh_topology::{ClassifyParams, Mesh};
use tempfile::tempdir;

/// Encode a mesh as binary STL with recomputed normals.
#[allow(clippy::cast_possible_truncation)]
fn to_binary(mesh: &Mesh) -> Vec<u8> {
    let mut bytes = vec![0u8; 80];
    bytes[..11].copy_from_slice(b"binary cube");
    let count = u32::try_from(mesh.faces().len()).unwrap();
    bytes.extend_from_slice(&count.to_le_bytes());

    for (_, face) in mesh.faces().iter() {
        let n = face.live_unit_normal(mesh.vertices());
        let mut push = |x: f64, y: f64, z: f64| {
            for c in [x, y, z] {
                bytes.extend_from_slice(&(c as f32).to_le_bytes());
            }
        };
        push(n.x, n.y, n.z);
        for p in face.corners(mesh.vertices()) {
            push(p.x, p.y, p.z);
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }
    bytes
}

#[test]
fn binary_to_ascii_roundtrip() {
    let cube = Mesh::unit_cube();
    let loaded = parse_stl(&to_binary(&cube)).unwrap();
    assert_eq!(loaded.name(), "binary cube");

    let dir = tempdir().unwrap();
    let path = dir.path().join("cube_ascii.stl");
    save_stl_ascii(&loaded, &path).unwrap();
    let reloaded = load_stl(&path).unwrap();

    assert_eq!(reloaded.name(), "GeoAlt");
    assert_eq!(reloaded.faces().len(), 12);
    assert_eq!(reloaded.vertices().len(), 8);
    assert_eq!(reloaded.edges().len(), 18);
    assert_eq!(reloaded.manifold_violations(), 0);

    for ((_, a), (_, b)) in loaded.vertices().iter().zip(reloaded.vertices().iter()) {
        let d = a.position() - b.position();
        assert!(d.norm() < 1e-6, "vertex drifted by {}", d.norm());
    }

    let params = ClassifyParams::default();
    let mut before = loaded;
    let mut after = reloaded;
    before.reclassify(&params);
    after.reclassify(&params);
    assert_eq!(before.faces().problematic(), after.faces().problematic());
    assert!((before.total_weight() - after.total_weight()).abs() < 1e-6);
}

#[test]
fn save_never_overwrites() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.stl");
    save_stl_ascii(&Mesh::unit_cube(), &path).unwrap();

    let err = save_stl_ascii(&Mesh::unit_cube(), &path).unwrap_err();
    assert!(matches!(err, StlError::OutputExists { .. }));

    // The first file is still intact and loadable
    assert_eq!(load_stl(&path).unwrap().faces().len(), 12);
}
