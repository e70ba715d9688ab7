//! STL parsing.
//!
//! # Format Detection
//!
//! The first five bytes decide how the data is read:
//! - `solid` (any case): ASCII, unless the data is not UTF-8 or the ASCII
//!   reader finds no facet in data whose length fits the binary layout
//! - `color` (any case): colored binary, header discarded
//! - anything else: binary
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header
//! UINT32       – Number of triangles
//! foreach triangle
//!     REAL32[3] – Normal vector
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count
//! end
//! ```
//!
//! # ASCII Format
//!
//! ```text
//! solid name
//!   facet normal ni nj nk
//!     outer loop
//!       vertex v1x v1y v1z
//!       vertex v2x v2y v2z
//!       vertex v3x v3y v3z
//!     endloop
//!   endfacet
//!   ...
//! endsolid name
//! ```

use std::fmt;
use std::path::Path;

use mesh_topology::{DEFAULT_VERTEX_TOLERANCE, Mesh, Point3, Vector3};
use tracing::{debug, info};

use crate::error::{StlError, StlResult};

/// STL binary header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
pub const TRIANGLE_SIZE: usize = 50;

/// Header name given to meshes read from a colored binary file.
pub const COLORED_HEADER: &str = "Colored solid.";

/// On-disk STL variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    /// Text STL starting with `solid`.
    Ascii,
    /// Little-endian binary STL.
    Binary,
    /// Binary STL whose header starts with `COLOR`.
    ColoredBinary,
}

impl fmt::Display for StlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ascii => "ascii",
            Self::Binary => "binary",
            Self::ColoredBinary => "colored-binary",
        };
        f.write_str(name)
    }
}

/// Guess the variant from the first five bytes.
///
/// # Example
///
/// ```
/// use mesh_stl::{detect_format, StlFormat};
///
/// assert_eq!(detect_format(b"SOLID cube"), StlFormat::Ascii);
/// assert_eq!(detect_format(b"COLOR=...."), StlFormat::ColoredBinary);
/// assert_eq!(detect_format(&[0u8; 84]), StlFormat::Binary);
/// ```
#[must_use]
pub fn detect_format(bytes: &[u8]) -> StlFormat {
    let Some(prefix) = bytes.get(..5) else {
        return StlFormat::Binary;
    };
    if prefix.eq_ignore_ascii_case(b"solid") {
        StlFormat::Ascii
    } else if prefix.eq_ignore_ascii_case(b"color") {
        StlFormat::ColoredBinary
    } else {
        StlFormat::Binary
    }
}

/// Load a mesh from an STL file with the default vertex tolerance.
///
/// # Errors
///
/// Returns [`StlError::FileNotFound`] if the file does not exist, or any
/// error from [`parse_stl_with_tolerance`].
///
/// # Example
///
/// ```no_run
/// use mesh_stl::load_stl;
///
/// let mesh = load_stl("model.stl").unwrap();
/// println!("Loaded {} faces", mesh.faces().len());
/// ```
pub fn load_stl<P: AsRef<Path>>(path: P) -> StlResult<Mesh> {
    load_stl_with_tolerance(path, DEFAULT_VERTEX_TOLERANCE)
}

/// Load a mesh from an STL file, merging vertices within `tolerance`.
///
/// # Errors
///
/// Same as [`load_stl`].
pub fn load_stl_with_tolerance<P: AsRef<Path>>(path: P, tolerance: f64) -> StlResult<Mesh> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StlError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StlError::Io(e)
        }
    })?;

    let mesh = parse_stl_with_tolerance(&bytes, tolerance)?;
    info!(
        path = %path.display(),
        faces = mesh.faces().len(),
        vertices = mesh.vertices().len(),
        edges = mesh.edges().len(),
        "Loaded STL"
    );
    Ok(mesh)
}

/// Parse STL bytes with the default vertex tolerance.
///
/// # Errors
///
/// See [`parse_stl_with_tolerance`].
///
/// # Example
///
/// ```
/// let data = b"solid tri
/// facet normal 0 0 -1
///   outer loop
///     vertex 0 0 0
///     vertex 0 1 0
///     vertex 1 0 0
///   endloop
/// endfacet
/// endsolid tri
/// ";
/// let mesh = mesh_stl::parse_stl(data).unwrap();
/// assert_eq!(mesh.name(), "tri");
/// assert_eq!(mesh.faces().len(), 1);
/// ```
pub fn parse_stl(bytes: &[u8]) -> StlResult<Mesh> {
    parse_stl_with_tolerance(bytes, DEFAULT_VERTEX_TOLERANCE)
}

/// Parse STL bytes, merging vertices within `tolerance`.
///
/// # Errors
///
/// - [`StlError::InvalidContent`] for malformed ASCII
/// - [`StlError::InvalidHeader`] / [`StlError::InvalidFaceCount`] for
///   truncated binary data
/// - [`StlError::Topology`] for non-finite coordinates or zero-area facets
pub fn parse_stl_with_tolerance(bytes: &[u8], tolerance: f64) -> StlResult<Mesh> {
    let format = detect_format(bytes);
    let mut mesh = Mesh::with_vertex_tolerance("", tolerance);

    match format {
        StlFormat::Ascii => {
            let Ok(text) = std::str::from_utf8(bytes) else {
                debug!("Data starts with 'solid' but is not UTF-8; reading as binary");
                parse_binary(bytes, &mut mesh, false)?;
                return Ok(mesh);
            };

            match parse_ascii(text, &mut mesh) {
                Ok(facets) if facets > 0 => return Ok(mesh),
                result if has_binary_length(bytes) => {
                    debug!(
                        ascii_error = result.is_err(),
                        "No ASCII facets in binary-sized data; reading as binary"
                    );
                    mesh = Mesh::with_vertex_tolerance("", tolerance);
                    parse_binary(bytes, &mut mesh, false)?;
                }
                result => {
                    result?;
                }
            }
        }
        StlFormat::Binary => parse_binary(bytes, &mut mesh, false)?,
        StlFormat::ColoredBinary => parse_binary(bytes, &mut mesh, true)?,
    }

    Ok(mesh)
}

/// True if the length is exactly `84 + 50 * count` for the declared count.
fn has_binary_length(bytes: &[u8]) -> bool {
    let Some(count) = read_face_count(bytes) else {
        return false;
    };
    usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(TRIANGLE_SIZE))
        .and_then(|n| n.checked_add(HEADER_SIZE + 4))
        == Some(bytes.len())
}

fn read_face_count(bytes: &[u8]) -> Option<u32> {
    let b = bytes.get(HEADER_SIZE..HEADER_SIZE + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read binary records into `mesh`.
fn parse_binary(bytes: &[u8], mesh: &mut Mesh, colored: bool) -> StlResult<()> {
    let Some(face_count) = read_face_count(bytes) else {
        return Err(StlError::InvalidHeader {
            expected: HEADER_SIZE + 4,
            got: bytes.len(),
        });
    };

    let records = &bytes[HEADER_SIZE + 4..];
    let available = records.len() / TRIANGLE_SIZE;
    if available < face_count as usize {
        return Err(StlError::InvalidFaceCount {
            expected: face_count,
            got: u32::try_from(available).unwrap_or(u32::MAX),
        });
    }

    if colored {
        mesh.set_name(COLORED_HEADER);
    } else {
        let header = String::from_utf8_lossy(&bytes[..HEADER_SIZE]);
        mesh.set_name(header.trim_matches(|c: char| c == '\0' || c.is_whitespace()));
    }

    for record in records.chunks_exact(TRIANGLE_SIZE).take(face_count as usize) {
        let normal = read_vector(&record[0..12]);
        let corners = [
            Point3::from(read_vector(&record[12..24])),
            Point3::from(read_vector(&record[24..36])),
            Point3::from(read_vector(&record[36..48])),
        ];
        // The 2-byte attribute count is ignored
        mesh.add_facet(normal, corners)?;
    }

    debug!(faces = face_count, colored, "Parsed binary STL");
    Ok(())
}

/// Read three little-endian f32 values.
fn read_vector(buf: &[u8]) -> Vector3<f64> {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Vector3::new(f64::from(x), f64::from(y), f64::from(z))
}

/// A facet being read from ASCII.
struct OpenFacet {
    normal: Vector3<f64>,
    corners: Vec<Point3<f64>>,
    in_loop: bool,
}

/// Read ASCII facets into `mesh`. Returns the number of facets read.
///
/// The `facet normal` values are parsed and kept as the recorded normal, but
/// orientation always comes from the vertex winding: a facet listed
/// counter-clockwise seen from above faces up whatever its stated normal.
fn parse_ascii(text: &str, mesh: &mut Mesh) -> StlResult<usize> {
    let mut facets = 0;
    let mut open: Option<OpenFacet> = None;
    let mut last_line = 0;
    let mut seen_first_line = false;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        if !seen_first_line {
            seen_first_line = true;
            if keyword.eq_ignore_ascii_case("solid") {
                mesh.set_name(tokens.collect::<Vec<_>>().join(" "));
                continue;
            }
        }

        match keyword.to_ascii_lowercase().as_str() {
            "facet" => {
                if open.is_some() {
                    return Err(StlError::invalid_content(
                        line_no,
                        "facet started before the previous one ended",
                    ));
                }
                if !tokens
                    .next()
                    .is_some_and(|t| t.eq_ignore_ascii_case("normal"))
                {
                    return Err(StlError::invalid_content(line_no, "expected 'facet normal'"));
                }
                let [x, y, z] = parse_triple(&mut tokens, line_no)?;
                open = Some(OpenFacet {
                    normal: Vector3::new(x, y, z),
                    corners: Vec::with_capacity(3),
                    in_loop: false,
                });
            }
            "outer" => {
                let facet = open
                    .as_mut()
                    .ok_or_else(|| StlError::invalid_content(line_no, "'outer loop' outside a facet"))?;
                facet.in_loop = true;
            }
            "vertex" => {
                let facet = open
                    .as_mut()
                    .filter(|f| f.in_loop)
                    .ok_or_else(|| StlError::invalid_content(line_no, "vertex outside a loop"))?;
                if facet.corners.len() == 3 {
                    return Err(StlError::invalid_content(
                        line_no,
                        "facet has more than 3 vertices",
                    ));
                }
                let [x, y, z] = parse_triple(&mut tokens, line_no)?;
                facet.corners.push(Point3::new(x, y, z));
            }
            "endloop" => {
                if let Some(facet) = open.as_mut() {
                    facet.in_loop = false;
                }
            }
            "endfacet" => {
                let facet = open
                    .take()
                    .ok_or_else(|| StlError::invalid_content(line_no, "'endfacet' without a facet"))?;
                let [a, b, c] = <[Point3<f64>; 3]>::try_from(facet.corners).map_err(|v| {
                    StlError::invalid_content(
                        line_no,
                        format!("facet has {} vertices, expected 3", v.len()),
                    )
                })?;
                mesh.add_facet(facet.normal, [a, b, c])?;
                facets += 1;
            }
            "endsolid" => break,
            _ => {
                // Ignore unknown lines
            }
        }
    }

    if open.is_some() {
        return Err(StlError::invalid_content(last_line, "unterminated facet"));
    }

    debug!(facets, "Parsed ASCII STL");
    Ok(facets)
}

/// Parse exactly three numbers from the rest of a line.
fn parse_triple<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> StlResult<[f64; 3]> {
    let mut values = [0.0; 3];
    for value in &mut values {
        let token = tokens
            .next()
            .ok_or_else(|| StlError::invalid_content(line, "expected three numbers"))?;
        *value = token.parse().map_err(|e| {
            StlError::invalid_content(line, format!("invalid number '{token}': {e}"))
        })?;
    }
    if tokens.next().is_some() {
        return Err(StlError::invalid_content(line, "expected three numbers"));
    }
    Ok(values)
}
