//! STL reading (binary and ASCII) and binary STL writing.

use std::fs;
use std::io::Write;
use std::path::Path as FsPath;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::Mesh;
use tiltslice_math::{Point3, Triangle};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Read an STL file from disk.
pub fn load_stl(path: impl AsRef<FsPath>) -> Result<Mesh> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = parse_stl(&data)?;
    debug!(path = %path.display(), triangles = mesh.len(), "Loaded STL");
    Ok(mesh)
}

/// Parse STL bytes, detecting binary or ASCII encoding.
///
/// A document starting with `solid` is read as ASCII unless its size
/// matches the binary facet count exactly.
pub fn parse_stl(data: &[u8]) -> Result<Mesh> {
    let binary_len = declared_facets(data).map(|n| HEADER_LEN + 4 + n * FACET_LEN);
    let mesh = if data.starts_with(b"solid") && binary_len != Some(data.len()) {
        parse_ascii(data)?
    } else {
        parse_binary(data)?
    };
    if mesh.is_empty() {
        return Err(MeshError::Empty);
    }
    Ok(mesh)
}

/// Write `mesh` to `path` as binary STL.
pub fn save_stl(mesh: &Mesh, path: impl AsRef<FsPath>) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::io::BufWriter::new(fs::File::create(path).map_err(io_err)?);
    write_stl(mesh, &mut file)?;
    file.flush().map_err(io_err)?;
    Ok(())
}

/// Serialize `mesh` as binary STL into any writer.
pub fn write_stl<W: Write>(mesh: &Mesh, out: &mut W) -> Result<()> {
    let mut header = [b' '; HEADER_LEN];
    let label = b"tiltslice binary STL";
    header[..label.len()].copy_from_slice(label);
    out.write_all(&header)?;
    out.write_all(&(mesh.len() as u32).to_le_bytes())?;

    let mut facet = Vec::with_capacity(FACET_LEN);
    for tri in &mesh.triangles {
        facet.clear();
        let n = tri.normal().unwrap_or_else(nalgebra::Vector3::zeros);
        for c in [n.x, n.y, n.z] {
            facet.extend_from_slice(&(c as f32).to_le_bytes());
        }
        for v in &tri.vertices {
            for c in [v.x, v.y, v.z] {
                facet.extend_from_slice(&(c as f32).to_le_bytes());
            }
        }
        facet.extend_from_slice(&0u16.to_le_bytes());
        out.write_all(&facet)?;
    }
    Ok(())
}

fn declared_facets(data: &[u8]) -> Option<usize> {
    let bytes = data.get(HEADER_LEN..HEADER_LEN + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

fn read_point(chunk: &[u8]) -> Point3 {
    let f = |i: usize| {
        f32::from_le_bytes([chunk[i], chunk[i + 1], chunk[i + 2], chunk[i + 3]]) as f64
    };
    Point3::new(f(0), f(4), f(8))
}

fn parse_binary(data: &[u8]) -> Result<Mesh> {
    let count = declared_facets(data)
        .ok_or_else(|| MeshError::Malformed("binary header shorter than 84 bytes".into()))?;
    let expected = HEADER_LEN + 4 + count * FACET_LEN;
    if data.len() < expected {
        return Err(MeshError::Malformed(format!(
            "truncated: {count} facets need {expected} bytes, got {}",
            data.len()
        )));
    }

    let triangles = data[HEADER_LEN + 4..expected]
        .chunks_exact(FACET_LEN)
        .map(|facet| {
            Triangle::new(
                read_point(&facet[12..24]),
                read_point(&facet[24..36]),
                read_point(&facet[36..48]),
            )
        })
        .collect();
    Ok(Mesh::new(triangles))
}

fn parse_ascii(data: &[u8]) -> Result<Mesh> {
    let text = std::str::from_utf8(data)
        .map_err(|e| MeshError::Malformed(format!("ASCII STL is not UTF-8: {e}")))?;

    let mut triangles = Vec::new();
    let mut corners: Vec<Point3> = Vec::with_capacity(3);
    for (idx, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("vertex") => {
                let coords = words
                    .map(str::parse::<f64>)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| MeshError::Malformed(format!("line {}: {e}", idx + 1)))?;
                let [x, y, z] = coords[..] else {
                    return Err(MeshError::Malformed(format!(
                        "line {}: vertex needs 3 coordinates",
                        idx + 1
                    )));
                };
                corners.push(Point3::new(x, y, z));
            }
            Some("endloop") => {
                let [a, b, c] = corners[..] else {
                    return Err(MeshError::Malformed(format!(
                        "line {}: facet has {} vertices",
                        idx + 1,
                        corners.len()
                    )));
                };
                triangles.push(Triangle::new(a, b, c));
                corners.clear();
            }
            _ => {}
        }
    }
    Ok(Mesh::new(triangles))
}
