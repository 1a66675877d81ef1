//! STL decoder, binary and ASCII.

use glam::DVec3;
use tracing::debug;

use super::{Decoder, FormatToken, ImportResult, ImportSettings};
use crate::io::{BinaryReader, Endianness, File, FileList};
use crate::model::{Mesh, Model, Triangle};
use crate::util::{Error, Result};

pub(crate) struct StlDecoder;

impl Decoder for StlDecoder {
    fn token(&self) -> FormatToken {
        FormatToken::Stl
    }

    fn decode(
        &self,
        _files: &FileList,
        primary: &File,
        _settings: &ImportSettings,
        _result: &mut ImportResult,
    ) -> Result<Model> {
        let mesh = if is_ascii(&primary.content) {
            decode_ascii(primary)?
        } else {
            decode_binary(primary)?
        };
        debug!(triangles = mesh.triangle_count(), "stl decoded");

        let mut model = Model::new();
        model.add_mesh_to_root(mesh);
        Ok(model)
    }
}

fn mesh_name(primary: &File) -> String {
    primary
        .name
        .rsplit('/')
        .next()
        .and_then(|n| n.rsplit_once('.').map(|(stem, _)| stem.to_string()))
        .unwrap_or_else(|| primary.name.clone())
}

fn is_ascii(content: &[u8]) -> bool {
    if !content.starts_with(b"solid") {
        return false;
    }
    // `solid` headers also appear in binary files; require a facet keyword
    // or the closing tag in the readable head
    let head = &content[..content.len().min(4096)];
    match std::str::from_utf8(head) {
        Ok(text) => text.contains("facet") || text.contains("endsolid"),
        Err(_) => false,
    }
}

/// Binary layout: 80-byte header, u32 triangle count, then 50 bytes per
/// triangle (normal, three vertices, attribute word), all little endian.
fn decode_binary(primary: &File) -> Result<Mesh> {
    let mut reader = BinaryReader::new(&primary.content, Endianness::Little);
    reader.skip(80)?;
    let count = reader.read_u32()?;

    let mut mesh = Mesh::new(mesh_name(primary));
    for _ in 0..count {
        let normal = read_vec3_f32(&mut reader)?;
        let a = mesh.add_vertex(read_vec3_f32(&mut reader)?);
        let b = mesh.add_vertex(read_vec3_f32(&mut reader)?);
        let c = mesh.add_vertex(read_vec3_f32(&mut reader)?);
        reader.skip(2)?;

        let mut triangle = Triangle::new([a, b, c]);
        if normal.length_squared() > 0.0 {
            let n = mesh.add_normal(normal.normalize());
            triangle.normals = Some([n, n, n]);
        }
        mesh.add_triangle(triangle);
    }
    Ok(mesh)
}

fn read_vec3_f32(reader: &mut BinaryReader<'_>) -> Result<DVec3> {
    let x = reader.read_f32()? as f64;
    let y = reader.read_f32()? as f64;
    let z = reader.read_f32()? as f64;
    Ok(DVec3::new(x, y, z))
}

fn decode_ascii(primary: &File) -> Result<Mesh> {
    let text = primary.as_text()?;
    let mut mesh = Mesh::new(mesh_name(primary));

    let mut facet_normal: Option<DVec3> = None;
    let mut loop_vertices: Vec<DVec3> = Vec::with_capacity(3);

    for (line_index, line) in text.lines().enumerate() {
        let line_number = line_index + 1;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else { continue };
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "solid" | "endsolid" | "outer" | "endloop" => {}
            "facet" => {
                // `facet normal x y z`
                if rest.len() >= 4 && rest[0] == "normal" {
                    let n = parse_vec3(&rest[1..4], line_number)?;
                    facet_normal = (n.length_squared() > 0.0).then(|| n.normalize());
                } else {
                    facet_normal = None;
                }
                loop_vertices.clear();
            }
            "vertex" => {
                loop_vertices.push(parse_vec3(&rest, line_number)?);
            }
            "endfacet" => {
                if loop_vertices.len() != 3 {
                    return Err(Error::parse_line(
                        line_number,
                        format!("facet has {} vertices, expected 3", loop_vertices.len()),
                    ));
                }
                let a = mesh.add_vertex(loop_vertices[0]);
                let b = mesh.add_vertex(loop_vertices[1]);
                let c = mesh.add_vertex(loop_vertices[2]);
                let mut triangle = Triangle::new([a, b, c]);
                if let Some(normal) = facet_normal {
                    let n = mesh.add_normal(normal);
                    triangle.normals = Some([n, n, n]);
                }
                mesh.add_triangle(triangle);
                loop_vertices.clear();
            }
            other => {
                return Err(Error::parse_line(line_number, format!("unexpected keyword {other:?}")));
            }
        }
    }

    if !loop_vertices.is_empty() {
        return Err(Error::parse_line(text.lines().count(), "unterminated facet"));
    }
    Ok(mesh)
}

fn parse_vec3(tokens: &[&str], line: usize) -> Result<DVec3> {
    if tokens.len() < 3 {
        return Err(Error::parse_line(line, "expected 3 components"));
    }
    let mut out = [0.0f64; 3];
    for (slot, token) in out.iter_mut().zip(tokens) {
        *slot = token
            .parse()
            .map_err(|_| Error::parse_line(line, format!("invalid number {token:?}")))?;
    }
    Ok(DVec3::from_array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import, ImportSettings};
    use crate::io::FileList;

    fn binary_stl(triangles: &[[f32; 12]]) -> Vec<u8> {
        let mut data = vec![0u8; 80];
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            for value in tri {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&[0u8; 2]);
        }
        data
    }

    #[test]
    fn test_binary_triangle() {
        let content = binary_stl(&[[
            0.0, 0.0, 1.0, // normal
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ]]);
        let mut files = FileList::new();
        files.add(File::from_memory("part.stl", content));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.name, "part");
    }

    #[test]
    fn test_binary_truncated_is_fatal() {
        let mut content = binary_stl(&[[0.0; 12]]);
        content.truncate(100);
        // Keep the declared count at 1 so the payload is short
        let mut files = FileList::new();
        files.add(File::from_memory("part.stl", content));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
        assert!(result.has_fatal());
    }

    #[test]
    fn test_ascii_triangle() {
        let content = "\
solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";
        let mut files = FileList::new();
        files.add(File::from_memory("tri.stl", content.as_bytes().to_vec()));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.triangles[0].normals.is_some());
    }

    #[test]
    fn test_ascii_bad_facet_is_fatal() {
        let content = "\
solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
    endloop
  endfacet
endsolid tri
";
        let mut files = FileList::new();
        files.add(File::from_memory("tri.stl", content.as_bytes().to_vec()));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
    }

    #[test]
    fn test_zero_normal_falls_back_to_computed() {
        let content = binary_stl(&[[
            0.0, 0.0, 0.0, // degenerate normal
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ]]);
        let mut files = FileList::new();
        files.add(File::from_memory("part.stl", content));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        // Finalize computed a normal since the file carried none
        let mesh = &model.meshes()[0];
        assert!(mesh.triangles[0].normals.is_some());
        assert!(!mesh.normals.is_empty());
    }
}
