//! OBJ encoder. Produces the .obj file plus a .mtl sibling when the
//! model carries materials.

use super::{Encoder, ExportSettings, ExportedFile, FlatMesh};
use crate::import::FormatToken;
use crate::io::TextWriter;
use crate::model::{Material, Model};
use crate::util::Result;

pub(crate) struct ObjEncoder;

impl Encoder for ObjEncoder {
    fn token(&self) -> FormatToken {
        FormatToken::Obj
    }

    fn encode(
        &self,
        model: &Model,
        meshes: &[FlatMesh],
        settings: &ExportSettings,
    ) -> Result<Vec<ExportedFile>> {
        let mtl_name = format!("{}.mtl", settings.base_name);
        let with_materials = !model.materials().is_empty();

        let mut writer = TextWriter::new();
        if with_materials {
            writer.write_line(&format!("mtllib {mtl_name}"));
        }

        // OBJ indices are global and 1-based
        let mut vertex_base = 1u32;
        let mut normal_base = 1u32;
        let mut uv_base = 1u32;

        for mesh in meshes {
            writer.write_line(&format!("o {}", sanitize(&mesh.name)));
            for p in &mesh.positions {
                writer.write_line(&format!("v {} {} {}", p.x, p.y, p.z));
            }
            for n in &mesh.normals {
                writer.write_line(&format!("vn {} {} {}", n.x, n.y, n.z));
            }
            for uv in &mesh.uvs {
                writer.write_line(&format!("vt {} {}", uv.x, uv.y));
            }

            let mut active_material = None;
            for triangle in &mesh.triangles {
                if with_materials && triangle.material != active_material {
                    if let Some(index) = triangle.material {
                        writer.write_line(&format!(
                            "usemtl {}",
                            sanitize(model.material(index).name())
                        ));
                    }
                    active_material = triangle.material;
                }
                let corner = |i: usize| {
                    let v = triangle.vertices[i] + vertex_base;
                    match (triangle.uvs, triangle.normals) {
                        (Some(uvs), Some(normals)) => {
                            format!("{v}/{}/{}", uvs[i] + uv_base, normals[i] + normal_base)
                        }
                        (Some(uvs), None) => format!("{v}/{}", uvs[i] + uv_base),
                        (None, Some(normals)) => format!("{v}//{}", normals[i] + normal_base),
                        (None, None) => format!("{v}"),
                    }
                };
                writer.write_line(&format!("f {} {} {}", corner(0), corner(1), corner(2)));
            }

            vertex_base += mesh.positions.len() as u32;
            normal_base += mesh.normals.len() as u32;
            uv_base += mesh.uvs.len() as u32;
        }

        let mut files = vec![ExportedFile {
            name: format!("{}.obj", settings.base_name),
            content: writer.into_bytes(),
        }];
        if with_materials {
            files.push(ExportedFile { name: mtl_name, content: encode_mtl(model) });
        }
        Ok(files)
    }
}

fn encode_mtl(model: &Model) -> Vec<u8> {
    let mut writer = TextWriter::new();
    for material in model.materials() {
        writer.write_line(&format!("newmtl {}", sanitize(material.name())));
        let [r, g, b] = material.color().to_floats();
        writer.write_line(&format!("Kd {r} {g} {b}"));
        if let Material::Phong { base: _, ambient, specular, shininess } = material {
            let [r, g, b] = ambient.to_floats();
            writer.write_line(&format!("Ka {r} {g} {b}"));
            let [r, g, b] = specular.to_floats();
            writer.write_line(&format!("Ks {r} {g} {b}"));
            writer.write_line(&format!("Ns {shininess}"));
        }
        let base = material.base();
        if base.transparent {
            writer.write_line(&format!("d {}", base.opacity));
        }
        if let Some(map) = &base.diffuse_map {
            writer.write_line(&format!("map_Kd {}", map.name));
        }
    }
    writer.into_bytes()
}

/// OBJ names cannot contain whitespace.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
