//! ASCII STL output.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mesh_topology::Mesh;
use tracing::{info, warn};

use crate::error::{StlError, StlResult};

/// Solid name written to every output file.
pub const SOLID_NAME: &str = "GeoAlt";

/// Serialize a mesh as ASCII STL into any writer.
///
/// Normals are recomputed from the current vertex positions and written as
/// unit vectors. All numbers use six decimals.
///
/// # Errors
///
/// Returns [`StlError::Io`] if writing fails.
///
/// # Example
///
/// ```
/// use mesh_topology::Mesh;
///
/// let mut out = Vec::new();
/// mesh_stl::write_stl_ascii(&Mesh::unit_cube(), &mut out).unwrap();
///
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("solid GeoAlt\n"));
/// assert_eq!(text.matches("endfacet").count(), 12);
/// ```
pub fn write_stl_ascii<W: Write>(mesh: &Mesh, mut writer: W) -> StlResult<()> {
    write_header(&mut writer)?;
    write_facets(mesh, &mut writer)?;
    write_footer(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_header<W: Write>(writer: &mut W) -> StlResult<()> {
    writeln!(writer, "solid {SOLID_NAME}")?;
    Ok(())
}

fn write_footer<W: Write>(writer: &mut W) -> StlResult<()> {
    writeln!(writer, "endsolid {SOLID_NAME}")?;
    Ok(())
}

fn write_facets<W: Write>(mesh: &Mesh, writer: &mut W) -> StlResult<()> {
    let vertices = mesh.vertices();
    for (_, face) in mesh.faces().iter() {
        let n = face.live_unit_normal(vertices);
        writeln!(writer, "  facet normal {:.6} {:.6} {:.6}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for p in face.corners(vertices) {
            writeln!(writer, "      vertex {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    Ok(())
}

/// File-backed ASCII STL writer holding at most one open stream.
///
/// The destination is always created fresh; an existing file is never
/// overwritten.
///
/// # Example
///
/// ```no_run
/// use mesh_stl::StlWriter;
/// use mesh_topology::Mesh;
///
/// let mut writer = StlWriter::new();
/// writer.open("out.stl").unwrap();
/// writer.write_mesh(&Mesh::unit_cube()).unwrap();
/// writer.close().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StlWriter {
    stream: Option<(PathBuf, BufWriter<File>)>,
}

impl StlWriter {
    /// Create a writer with no open stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a stream is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Create `path` and write the solid header.
    ///
    /// # Errors
    ///
    /// - [`StlError::IoConflict`] if a stream is already open
    /// - [`StlError::OutputExists`] if `path` exists
    /// - [`StlError::Io`] for other failures
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> StlResult<()> {
        if self.stream.is_some() {
            return Err(StlError::IoConflict {
                reason: "a stream is already open",
            });
        }

        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StlError::OutputExists {
                        path: path.to_path_buf(),
                    }
                } else {
                    StlError::Io(e)
                }
            })?;

        let mut stream = BufWriter::new(file);
        write_header(&mut stream)?;
        self.stream = Some((path.to_path_buf(), stream));
        Ok(())
    }

    /// Append every facet of `mesh` to the open stream.
    ///
    /// # Errors
    ///
    /// Returns [`StlError::IoConflict`] if no stream is open.
    pub fn write_mesh(&mut self, mesh: &Mesh) -> StlResult<()> {
        let (_, stream) = self.stream.as_mut().ok_or(StlError::IoConflict {
            reason: "no stream is open",
        })?;
        write_facets(mesh, stream)
    }

    /// Write the footer, flush and close the stream.
    ///
    /// # Errors
    ///
    /// Returns [`StlError::IoConflict`] if no stream is open.
    pub fn close(&mut self) -> StlResult<()> {
        let (path, mut stream) = self.stream.take().ok_or(StlError::IoConflict {
            reason: "no stream is open",
        })?;
        write_footer(&mut stream)?;
        stream.flush()?;
        info!(path = %path.display(), "Wrote STL");
        Ok(())
    }
}

/// Write `mesh` to a new ASCII STL file.
///
/// A file left incomplete by a failed write is removed.
///
/// # Errors
///
/// Returns [`StlError::OutputExists`] if `path` exists, or [`StlError::Io`].
pub fn save_stl_ascii<P: AsRef<Path>>(mesh: &Mesh, path: P) -> StlResult<()> {
    save_with(path.as_ref(), |writer| writer.write_mesh(mesh))
}

/// Open `path`, run `write`, close. On failure after opening, the partial
/// file is deleted.
fn save_with<F>(path: &Path, write: F) -> StlResult<()>
where
    F: FnOnce(&mut StlWriter) -> StlResult<()>,
{
    let mut writer = StlWriter::new();
    writer.open(path)?;

    let result = write(&mut writer).and_then(|()| writer.close());
    if result.is_err() {
        drop(writer);
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Could not remove partial STL");
        }
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mesh_topology::Point3;

    #[test]
    fn ascii_layout() {
        let mesh = Mesh::from_triangles(&[[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.5),
        ]])
        .unwrap();
        let mut out = Vec::new();
        write_stl_ascii(&mesh, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "solid GeoAlt");
        assert!(lines[1].starts_with("  facet normal "));
        assert_eq!(lines[2], "    outer loop");
        assert_eq!(lines[5], "      vertex 0.000000 1.000000 0.500000");
        assert_eq!(lines[8], "endsolid GeoAlt");
    }

    #[test]
    fn refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists.stl");
        std::fs::write(&path, "keep me").unwrap();

        let mut writer = StlWriter::new();
        assert!(matches!(
            writer.open(&path),
            Err(StlError::OutputExists { .. })
        ));
        assert!(!writer.is_open());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn failed_save_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.stl");
        let cube = Mesh::unit_cube();

        let result = save_with(&path, |writer| {
            writer.write_mesh(&cube)?;
            Err(StlError::Io(std::io::Error::other("disk full")))
        });
        assert!(matches!(result, Err(StlError::Io(_))));
        assert!(!path.exists());

        save_stl_ascii(&cube, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn second_stream_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = StlWriter::new();
        writer.open(dir.path().join("a.stl")).unwrap();

        assert!(matches!(
            writer.open(dir.path().join("b.stl")),
            Err(StlError::IoConflict { .. })
        ));
        assert!(!dir.path().join("b.stl").exists());

        writer.close().unwrap();
        assert!(matches!(writer.close(), Err(StlError::IoConflict { .. })));
        assert!(matches!(
            writer.write_mesh(&Mesh::unit_cube()),
            Err(StlError::IoConflict { .. })
        ));
    }
}
