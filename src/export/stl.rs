//! STL encoder, binary and ASCII.

use glam::DVec3;

use super::{Encoder, ExportSettings, ExportedFile, FileVariant, FlatMesh};
use crate::import::FormatToken;
use crate::io::{BinaryWriter, Endianness, TextWriter};
use crate::model::Model;
use crate::util::Result;

pub(crate) struct StlEncoder;

impl Encoder for StlEncoder {
    fn token(&self) -> FormatToken {
        FormatToken::Stl
    }

    fn encode(
        &self,
        _model: &Model,
        meshes: &[FlatMesh],
        settings: &ExportSettings,
    ) -> Result<Vec<ExportedFile>> {
        let content = match settings.variant {
            FileVariant::Binary => encode_binary(meshes),
            FileVariant::Text => encode_ascii(meshes, &settings.base_name),
        };
        Ok(vec![ExportedFile {
            name: format!("{}.stl", settings.base_name),
            content,
        }])
    }
}

/// Face normal recomputed from the transformed corners; baked vertex
/// normals would disagree after mirroring transforms.
fn face_normal(mesh: &FlatMesh, triangle_index: usize) -> DVec3 {
    let [a, b, c] = mesh.triangles[triangle_index].vertices;
    let v0 = mesh.positions[a as usize];
    let v1 = mesh.positions[b as usize];
    let v2 = mesh.positions[c as usize];
    (v1 - v0).cross(v2 - v0).normalize_or_zero()
}

fn encode_binary(meshes: &[FlatMesh]) -> Vec<u8> {
    let triangle_count: usize = meshes.iter().map(|m| m.triangles.len()).sum();

    let mut writer = BinaryWriter::with_capacity(84 + triangle_count * 50, Endianness::Little);
    writer.write_bytes(&[0u8; 80]);
    writer.write_u32(triangle_count as u32);

    for mesh in meshes {
        for (index, triangle) in mesh.triangles.iter().enumerate() {
            let normal = face_normal(mesh, index);
            for value in [normal.x, normal.y, normal.z] {
                writer.write_f32(value as f32);
            }
            for &corner in &triangle.vertices {
                let p = mesh.positions[corner as usize];
                for value in [p.x, p.y, p.z] {
                    writer.write_f32(value as f32);
                }
            }
            writer.write_u16(0);
        }
    }
    writer.into_bytes()
}

fn encode_ascii(meshes: &[FlatMesh], name: &str) -> Vec<u8> {
    let mut writer = TextWriter::new();
    writer.write_line(&format!("solid {name}"));
    writer.indent();
    for mesh in meshes {
        for (index, triangle) in mesh.triangles.iter().enumerate() {
            let n = face_normal(mesh, index);
            writer.write_line(&format!("facet normal {} {} {}", n.x, n.y, n.z));
            writer.indent();
            writer.write_line("outer loop");
            writer.indent();
            for &corner in &triangle.vertices {
                let p = mesh.positions[corner as usize];
                writer.write_line(&format!("vertex {} {} {}", p.x, p.y, p.z));
            }
            writer.dedent();
            writer.write_line("endloop");
            writer.dedent();
            writer.write_line("endfacet");
        }
    }
    writer.dedent();
    writer.write_line(&format!("endsolid {name}"));
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export;
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::{finalize_model, FinalizeParams};

    fn cuboid() -> Model {
        let mut model = generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());
        model
    }

    #[test]
    fn test_binary_layout() {
        let settings = ExportSettings::default();
        let files = export(&cuboid(), FormatToken::Stl, &settings).unwrap();
        let content = &files[0].content;
        assert_eq!(content.len(), 84 + 12 * 50);
        let count = u32::from_le_bytes(content[80..84].try_into().unwrap());
        assert_eq!(count, 12);
    }

    #[test]
    fn test_ascii_grammar() {
        let settings = ExportSettings { variant: FileVariant::Text, ..Default::default() };
        let files = export(&cuboid(), FormatToken::Stl, &settings).unwrap();
        let text = std::str::from_utf8(&files[0].content).unwrap();
        assert!(text.starts_with("solid model"));
        assert!(text.trim_end().ends_with("endsolid model"));
        assert_eq!(text.matches("facet normal").count(), 12);
        assert_eq!(text.matches("vertex").count(), 36);
    }
}
