//! PLY encoder, binary little endian and ascii.

use super::{Encoder, ExportSettings, ExportedFile, FileVariant, FlatMesh};
use crate::import::FormatToken;
use crate::io::{BinaryWriter, Endianness, TextWriter};
use crate::model::Model;
use crate::util::Result;

pub(crate) struct PlyEncoder;

impl Encoder for PlyEncoder {
    fn token(&self) -> FormatToken {
        FormatToken::Ply
    }

    fn encode(
        &self,
        _model: &Model,
        meshes: &[FlatMesh],
        settings: &ExportSettings,
    ) -> Result<Vec<ExportedFile>> {
        let layout = Layout::of(meshes);
        let header = header(meshes, &layout, settings.variant);
        let content = match settings.variant {
            FileVariant::Binary => {
                let mut data = header.into_bytes();
                data.extend_from_slice(&encode_binary(meshes, &layout));
                data
            }
            FileVariant::Text => {
                let mut data = header.into_bytes();
                data.extend_from_slice(&encode_ascii(meshes, &layout));
                data
            }
        };
        Ok(vec![ExportedFile {
            name: format!("{}.ply", settings.base_name),
            content,
        }])
    }
}

/// Which optional vertex properties the output carries. Present only when
/// every flattened mesh provides them, so rows stay uniform.
struct Layout {
    normals: bool,
    uvs: bool,
    colors: bool,
}

impl Layout {
    fn of(meshes: &[FlatMesh]) -> Self {
        Self {
            normals: meshes.iter().all(|m| m.normals.len() == m.positions.len()),
            uvs: meshes.iter().all(|m| m.uvs.len() == m.positions.len()),
            colors: meshes.iter().all(|m| m.colors.len() == m.positions.len()),
        }
    }
}

fn header(meshes: &[FlatMesh], layout: &Layout, variant: FileVariant) -> String {
    let vertex_count: usize = meshes.iter().map(|m| m.positions.len()).sum();
    let face_count: usize = meshes.iter().map(|m| m.triangles.len()).sum();
    let format = match variant {
        FileVariant::Binary => "binary_little_endian",
        FileVariant::Text => "ascii",
    };

    let mut writer = TextWriter::new();
    writer.write_line("ply");
    writer.write_line(&format!("format {format} 1.0"));
    writer.write_line(&format!("element vertex {vertex_count}"));
    writer.write_line("property float x");
    writer.write_line("property float y");
    writer.write_line("property float z");
    if layout.normals {
        writer.write_line("property float nx");
        writer.write_line("property float ny");
        writer.write_line("property float nz");
    }
    if layout.uvs {
        writer.write_line("property float s");
        writer.write_line("property float t");
    }
    if layout.colors {
        writer.write_line("property uchar red");
        writer.write_line("property uchar green");
        writer.write_line("property uchar blue");
    }
    writer.write_line(&format!("element face {face_count}"));
    writer.write_line("property list uchar uint vertex_indices");
    writer.write_line("end_header");
    String::from_utf8(writer.into_bytes()).unwrap_or_default()
}

fn encode_binary(meshes: &[FlatMesh], layout: &Layout) -> Vec<u8> {
    let mut writer = BinaryWriter::new(Endianness::Little);
    for mesh in meshes {
        for (i, p) in mesh.positions.iter().enumerate() {
            writer.write_f32(p.x as f32);
            writer.write_f32(p.y as f32);
            writer.write_f32(p.z as f32);
            if layout.normals {
                let n = mesh.normals[i];
                writer.write_f32(n.x as f32);
                writer.write_f32(n.y as f32);
                writer.write_f32(n.z as f32);
            }
            if layout.uvs {
                let uv = mesh.uvs[i];
                writer.write_f32(uv.x as f32);
                writer.write_f32(uv.y as f32);
            }
            if layout.colors {
                let c = mesh.colors[i];
                writer.write_u8(c.r);
                writer.write_u8(c.g);
                writer.write_u8(c.b);
            }
        }
    }

    let mut base = 0u32;
    for mesh in meshes {
        for triangle in &mesh.triangles {
            writer.write_u8(3);
            for &corner in &triangle.vertices {
                writer.write_u32(base + corner);
            }
        }
        base += mesh.positions.len() as u32;
    }
    writer.into_bytes()
}

fn encode_ascii(meshes: &[FlatMesh], layout: &Layout) -> Vec<u8> {
    let mut writer = TextWriter::new();
    for mesh in meshes {
        for (i, p) in mesh.positions.iter().enumerate() {
            let mut line = format!("{} {} {}", p.x, p.y, p.z);
            if layout.normals {
                let n = mesh.normals[i];
                line.push_str(&format!(" {} {} {}", n.x, n.y, n.z));
            }
            if layout.uvs {
                let uv = mesh.uvs[i];
                line.push_str(&format!(" {} {}", uv.x, uv.y));
            }
            if layout.colors {
                let c = mesh.colors[i];
                line.push_str(&format!(" {} {} {}", c.r, c.g, c.b));
            }
            writer.write_line(&line);
        }
    }

    let mut base = 0u32;
    for mesh in meshes {
        for triangle in &mesh.triangles {
            let [a, b, c] = triangle.vertices;
            writer.write_line(&format!("3 {} {} {}", base + a, base + b, base + c));
        }
        base += mesh.positions.len() as u32;
    }
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export;
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::{finalize_model, FinalizeParams};

    #[test]
    fn test_header_declares_normals_after_finalize() {
        let mut model = generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());

        let settings = ExportSettings { variant: FileVariant::Text, ..Default::default() };
        let files = export(&model, FormatToken::Ply, &settings).unwrap();
        let text = std::str::from_utf8(&files[0].content).unwrap();
        assert!(text.contains("element vertex 8"));
        assert!(text.contains("property float nx"));
        assert!(text.contains("element face 12"));
    }

    #[test]
    fn test_binary_row_size() {
        let mut model = generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());

        let settings = ExportSettings::default();
        let files = export(&model, FormatToken::Ply, &settings).unwrap();
        let content = &files[0].content;
        let header_end = content
            .windows(b"end_header\n".len())
            .position(|w| w == b"end_header\n")
            .unwrap()
            + b"end_header\n".len();
        // 8 vertices of xyz + normal (24 bytes), 12 faces of 1 + 12 bytes
        assert_eq!(content.len() - header_end, 8 * 24 + 12 * 13);
    }
}
