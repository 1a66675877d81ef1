//! OFF decoder (Object File Format), with COFF vertex-color support.

use glam::DVec3;

use super::{Decoder, FormatToken, ImportResult, ImportSettings};
use crate::io::{File, FileList};
use crate::model::{Color, Mesh, Model, Triangle};
use crate::util::{Error, Result};

pub(crate) struct OffDecoder;

impl Decoder for OffDecoder {
    fn token(&self) -> FormatToken {
        FormatToken::Off
    }

    fn decode(
        &self,
        _files: &FileList,
        primary: &File,
        _settings: &ImportSettings,
        _result: &mut ImportResult,
    ) -> Result<Model> {
        let text = primary.as_text()?;
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            });

        let (line_number, signature) = lines
            .next()
            .ok_or_else(|| Error::parse_line(1, "empty file"))?;
        let signature = signature.trim();
        let with_colors = match signature {
            "OFF" => false,
            "COFF" => true,
            other => {
                return Err(Error::parse_line(
                    line_number,
                    format!("unknown signature {other:?}"),
                ))
            }
        };

        let (line_number, counts) = lines
            .next()
            .ok_or_else(|| Error::parse_line(line_number, "missing counts line"))?;
        let counts: Vec<usize> = counts
            .split_whitespace()
            .map(|t| t.parse().map_err(|_| Error::parse_line(line_number, format!("bad count {t:?}"))))
            .collect::<Result<_>>()?;
        let [vertex_count, face_count, _edge_count] = counts[..] else {
            return Err(Error::parse_line(line_number, "counts line needs 3 numbers"));
        };

        let name = primary
            .name
            .rsplit('/')
            .next()
            .and_then(|n| n.rsplit_once('.').map(|(stem, _)| stem.to_string()))
            .unwrap_or_else(|| primary.name.clone());
        let mut mesh = Mesh::new(name);

        for _ in 0..vertex_count {
            let (line_number, line) = lines
                .next()
                .ok_or_else(|| Error::parse_line(0, "vertex list truncated"))?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 {
                return Err(Error::parse_line(line_number, "vertex needs 3 coordinates"));
            }
            let mut coords = [0.0f64; 3];
            for (slot, token) in coords.iter_mut().zip(&tokens) {
                *slot = token
                    .parse()
                    .map_err(|_| Error::parse_line(line_number, format!("invalid number {token:?}")))?;
            }
            mesh.add_vertex(DVec3::from_array(coords));

            if with_colors && tokens.len() >= 6 {
                let mut rgb = [0.0f64; 3];
                for (slot, token) in rgb.iter_mut().zip(&tokens[3..6]) {
                    *slot = token.parse().map_err(|_| {
                        Error::parse_line(line_number, format!("invalid color {token:?}"))
                    })?;
                }
                // Colors may be 0..1 floats or 0..255 integers
                let color = if rgb.iter().any(|&c| c > 1.0) {
                    Color::rgb(rgb[0] as u8, rgb[1] as u8, rgb[2] as u8)
                } else {
                    Color::from_floats(rgb[0], rgb[1], rgb[2])
                };
                mesh.colors.push(color);
            }
        }

        for _ in 0..face_count {
            let (line_number, line) = lines
                .next()
                .ok_or_else(|| Error::parse_line(0, "face list truncated"))?;
            let mut tokens = line.split_whitespace();
            let corner_count: usize = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| Error::parse_line(line_number, "bad face corner count"))?;
            if corner_count < 3 {
                return Err(Error::parse_line(line_number, "face needs at least 3 corners"));
            }
            let mut indices = Vec::with_capacity(corner_count);
            for _ in 0..corner_count {
                let token = tokens
                    .next()
                    .ok_or_else(|| Error::parse_line(line_number, "face line truncated"))?;
                let index: u32 = token
                    .parse()
                    .map_err(|_| Error::parse_line(line_number, format!("invalid index {token:?}")))?;
                if index as usize >= vertex_count {
                    return Err(Error::parse_line(
                        line_number,
                        format!("vertex index {index} out of range (count: {vertex_count})"),
                    ));
                }
                indices.push(index);
            }
            // Trailing tokens are an optional face color; ignored
            for i in 1..indices.len() - 1 {
                mesh.add_triangle(Triangle::new([indices[0], indices[i], indices[i + 1]]));
            }
        }

        let mut model = Model::new();
        model.add_mesh_to_root(mesh);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import, ImportResult, ImportSettings};
    use crate::io::FileList;

    fn import_off(content: &str) -> ImportResult {
        let mut files = FileList::new();
        files.add(File::from_memory("shape.off", content.as_bytes().to_vec()));
        import(&files, None, &ImportSettings::default())
    }

    #[test]
    fn test_triangle() {
        let result = import_off("OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n");
        let model = result.model.expect("model");
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.name, "shape");
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let result = import_off("OFF\n# a comment\n\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n");
        assert!(result.model.is_some());
    }

    #[test]
    fn test_quad_triangulated() {
        let result = import_off("OFF\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n");
        let model = result.model.expect("model");
        assert_eq!(model.meshes()[0].triangle_count(), 2);
    }

    #[test]
    fn test_coff_vertex_colors() {
        let result = import_off(
            "COFF\n3 1 0\n0 0 0 255 0 0 255\n1 0 0 0 255 0 255\n0 1 0 0 0 255 255\n3 0 1 2\n",
        );
        let model = result.model.expect("model");
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.colors.len(), 3);
        assert_eq!(mesh.colors[0], Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_truncated_vertex_list_is_fatal() {
        let result = import_off("OFF\n3 1 0\n0 0 0\n1 0 0\n");
        assert!(result.model.is_none());
        assert!(result.has_fatal());
    }

    #[test]
    fn test_bad_signature_is_fatal() {
        let result = import_off("NOFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n");
        assert!(result.model.is_none());
    }

    #[test]
    fn test_out_of_range_index_is_fatal() {
        let result = import_off("OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 9\n");
        assert!(result.model.is_none());
    }
}
