//! OFF encoder. Text only; emits COFF when vertex colors are present.

use super::{Encoder, ExportSettings, ExportedFile, FlatMesh};
use crate::import::FormatToken;
use crate::io::TextWriter;
use crate::model::Model;
use crate::util::Result;

pub(crate) struct OffEncoder;

impl Encoder for OffEncoder {
    fn token(&self) -> FormatToken {
        FormatToken::Off
    }

    fn encode(
        &self,
        _model: &Model,
        meshes: &[FlatMesh],
        settings: &ExportSettings,
    ) -> Result<Vec<ExportedFile>> {
        let with_colors = meshes.iter().all(|m| m.colors.len() == m.positions.len());
        let vertex_count: usize = meshes.iter().map(|m| m.positions.len()).sum();
        let face_count: usize = meshes.iter().map(|m| m.triangles.len()).sum();

        let mut writer = TextWriter::new();
        writer.write_line(if with_colors { "COFF" } else { "OFF" });
        writer.write_line(&format!("{vertex_count} {face_count} 0"));

        for mesh in meshes {
            for (i, p) in mesh.positions.iter().enumerate() {
                if with_colors {
                    let c = mesh.colors[i];
                    writer.write_line(&format!(
                        "{} {} {} {} {} {} 255",
                        p.x, p.y, p.z, c.r, c.g, c.b
                    ));
                } else {
                    writer.write_line(&format!("{} {} {}", p.x, p.y, p.z));
                }
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

        Ok(vec![ExportedFile {
            name: format!("{}.off", settings.base_name),
            content: writer.into_bytes(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export, FileVariant};
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::{finalize_model, FinalizeParams};

    #[test]
    fn test_counts_line() {
        let mut model = generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());

        let settings = ExportSettings { variant: FileVariant::Text, ..Default::default() };
        let files = export(&model, FormatToken::Off, &settings).unwrap();
        let text = std::str::from_utf8(&files[0].content).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("OFF"));
        assert_eq!(lines.next(), Some("8 12 0"));
    }
}
