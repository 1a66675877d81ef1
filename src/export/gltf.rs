//! glTF 2.0 encoder: GLB container (binary variant) or JSON document with
//! an external buffer file (text variant).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{Encoder, ExportSettings, ExportedFile, FileVariant, FlatMesh};
use crate::import::FormatToken;
use crate::model::{Material, Model, Triangle};
use crate::util::Result;

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;

// Output document, limited to what the pipeline produces. Empty and
// absent members are skipped so minimal models stay minimal.

#[derive(Serialize)]
struct DocumentOut {
    asset: AssetOut,
    scene: usize,
    scenes: Vec<SceneOut>,
    nodes: Vec<NodeOut>,
    meshes: Vec<MeshOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    materials: Vec<MaterialOut>,
    accessors: Vec<AccessorOut>,
    #[serde(rename = "bufferViews")]
    buffer_views: Vec<BufferViewOut>,
    buffers: Vec<BufferOut>,
}

#[derive(Serialize)]
struct AssetOut {
    version: &'static str,
}

#[derive(Serialize)]
struct SceneOut {
    nodes: Vec<usize>,
}

#[derive(Serialize)]
struct NodeOut {
    name: String,
    mesh: usize,
}

#[derive(Serialize)]
struct MeshOut {
    name: String,
    primitives: Vec<PrimitiveOut>,
}

#[derive(Serialize)]
struct PrimitiveOut {
    attributes: BTreeMap<&'static str, usize>,
    indices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    material: Option<usize>,
}

#[derive(Serialize)]
struct MaterialOut {
    name: String,
    #[serde(rename = "pbrMetallicRoughness")]
    pbr: PbrOut,
    #[serde(rename = "alphaMode", skip_serializing_if = "Option::is_none")]
    alpha_mode: Option<&'static str>,
}

#[derive(Serialize)]
struct PbrOut {
    #[serde(rename = "baseColorFactor")]
    base_color_factor: [f64; 4],
    #[serde(rename = "metallicFactor")]
    metallic_factor: f64,
    #[serde(rename = "roughnessFactor")]
    roughness_factor: f64,
}

#[derive(Serialize)]
struct AccessorOut {
    #[serde(rename = "bufferView")]
    buffer_view: usize,
    #[serde(rename = "componentType")]
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    element_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<Vec<f32>>,
}

#[derive(Serialize)]
struct BufferViewOut {
    buffer: usize,
    #[serde(rename = "byteOffset")]
    byte_offset: usize,
    #[serde(rename = "byteLength")]
    byte_length: usize,
}

#[derive(Serialize)]
struct BufferOut {
    #[serde(rename = "byteLength")]
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

/// Accumulates the single binary buffer plus its views and accessors.
/// All element types here are 4 bytes wide, so offsets stay aligned.
#[derive(Default)]
struct BufferBuilder {
    bin: Vec<u8>,
    views: Vec<BufferViewOut>,
    accessors: Vec<AccessorOut>,
}

impl BufferBuilder {
    fn push_view(&mut self, byte_length: usize) -> usize {
        let byte_offset = self.bin.len() - byte_length;
        self.views.push(BufferViewOut { buffer: 0, byte_offset, byte_length });
        self.views.len() - 1
    }

    /// Write f32 elements, returning the accessor index. Bounds are
    /// declared only for positions, as the format requires.
    fn push_floats(
        &mut self,
        data: &[f32],
        components: usize,
        element_type: &'static str,
        with_bounds: bool,
    ) -> usize {
        for value in data {
            self.bin.extend_from_slice(&value.to_le_bytes());
        }
        let view = self.push_view(data.len() * 4);

        let (min, max) = if with_bounds {
            let mut min = vec![f32::INFINITY; components];
            let mut max = vec![f32::NEG_INFINITY; components];
            for element in data.chunks_exact(components) {
                for (c, &value) in element.iter().enumerate() {
                    min[c] = min[c].min(value);
                    max[c] = max[c].max(value);
                }
            }
            (Some(min), Some(max))
        } else {
            (None, None)
        };

        self.accessors.push(AccessorOut {
            buffer_view: view,
            component_type: COMPONENT_F32,
            count: data.len() / components,
            element_type,
            min,
            max,
        });
        self.accessors.len() - 1
    }

    fn push_indices(&mut self, data: &[u32]) -> usize {
        for value in data {
            self.bin.extend_from_slice(&value.to_le_bytes());
        }
        let view = self.push_view(data.len() * 4);
        self.accessors.push(AccessorOut {
            buffer_view: view,
            component_type: COMPONENT_U32,
            count: data.len(),
            element_type: "SCALAR",
            min: None,
            max: None,
        });
        self.accessors.len() - 1
    }
}

pub(crate) struct GltfEncoder;

impl Encoder for GltfEncoder {
    fn token(&self) -> FormatToken {
        FormatToken::Gltf
    }

    fn encode(
        &self,
        model: &Model,
        meshes: &[FlatMesh],
        settings: &ExportSettings,
    ) -> Result<Vec<ExportedFile>> {
        let mut builder = BufferBuilder::default();
        let mut nodes = Vec::new();
        let mut meshes_out = Vec::new();

        for flat in meshes {
            let primitives = build_primitives(flat, &mut builder);
            if primitives.is_empty() {
                continue;
            }
            nodes.push(NodeOut { name: flat.name.clone(), mesh: meshes_out.len() });
            meshes_out.push(MeshOut { name: flat.name.clone(), primitives });
        }

        let bin_length = builder.bin.len();
        let uri = match settings.variant {
            FileVariant::Binary => None,
            FileVariant::Text => Some(format!("{}.bin", settings.base_name)),
        };
        let document = DocumentOut {
            asset: AssetOut { version: "2.0" },
            scene: 0,
            scenes: vec![SceneOut { nodes: (0..nodes.len()).collect() }],
            nodes,
            meshes: meshes_out,
            materials: model.materials().iter().map(material_out).collect(),
            accessors: builder.accessors,
            buffer_views: builder.views,
            buffers: vec![BufferOut { byte_length: bin_length, uri }],
        };
        let json = serde_json::to_vec(&document)?;

        Ok(match settings.variant {
            FileVariant::Binary => vec![ExportedFile {
                name: format!("{}.glb", settings.base_name),
                content: encode_glb(json, builder.bin),
            }],
            FileVariant::Text => vec![
                ExportedFile { name: format!("{}.gltf", settings.base_name), content: json },
                ExportedFile { name: format!("{}.bin", settings.base_name), content: builder.bin },
            ],
        })
    }
}

/// One primitive per material, triangles in first-appearance order, with
/// corners deduplicated into indexed vertex arrays.
fn build_primitives(flat: &FlatMesh, builder: &mut BufferBuilder) -> Vec<PrimitiveOut> {
    let mut order: Vec<Option<u32>> = Vec::new();
    let mut groups: HashMap<Option<u32>, Vec<&Triangle>> = HashMap::new();
    for triangle in &flat.triangles {
        let group = groups.entry(triangle.material).or_insert_with(|| {
            order.push(triangle.material);
            Vec::new()
        });
        group.push(triangle);
    }

    let mut primitives = Vec::with_capacity(order.len());
    for material in order {
        let triangles = &groups[&material];
        let has_normals =
            !flat.normals.is_empty() && triangles.iter().all(|t| t.normals.is_some());
        let has_uvs = !flat.uvs.is_empty() && triangles.iter().all(|t| t.uvs.is_some());

        let mut remap: HashMap<(u32, Option<u32>, Option<u32>), u32> = HashMap::new();
        let mut positions: Vec<f32> = Vec::new();
        let mut normals: Vec<f32> = Vec::new();
        let mut uvs: Vec<f32> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();

        for triangle in triangles {
            for corner in 0..3 {
                let v = triangle.vertices[corner];
                let n = has_normals.then(|| triangle.normals.unwrap_or_default()[corner]);
                let t = has_uvs.then(|| triangle.uvs.unwrap_or_default()[corner]);
                let index = *remap.entry((v, n, t)).or_insert_with(|| {
                    let p = flat.positions[v as usize];
                    positions.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
                    if let Some(n) = n {
                        let n = flat.normals[n as usize];
                        normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
                    }
                    if let Some(t) = t {
                        let uv = flat.uvs[t as usize];
                        uvs.extend_from_slice(&[uv.x as f32, uv.y as f32]);
                    }
                    (positions.len() / 3 - 1) as u32
                });
                indices.push(index);
            }
        }
        if indices.is_empty() {
            continue;
        }

        let mut attributes = BTreeMap::new();
        attributes.insert("POSITION", builder.push_floats(&positions, 3, "VEC3", true));
        if has_normals {
            attributes.insert("NORMAL", builder.push_floats(&normals, 3, "VEC3", false));
        }
        if has_uvs {
            attributes.insert("TEXCOORD_0", builder.push_floats(&uvs, 2, "VEC2", false));
        }
        primitives.push(PrimitiveOut {
            attributes,
            indices: builder.push_indices(&indices),
            material: material.map(|m| m as usize),
        });
    }
    primitives
}

fn material_out(material: &Material) -> MaterialOut {
    let base = material.base();
    let [r, g, b] = base.color.to_floats();
    let (metallic, roughness) = match material {
        Material::Physical { metalness, roughness, .. } => (*metalness, *roughness),
        Material::Phong { .. } => (0.0, 1.0),
    };
    let opacity = if base.transparent { base.opacity } else { 1.0 };
    MaterialOut {
        name: base.name.clone(),
        pbr: PbrOut {
            base_color_factor: [r, g, b, opacity],
            metallic_factor: metallic,
            roughness_factor: roughness,
        },
        alpha_mode: base.transparent.then_some("BLEND"),
    }
}

/// Assemble a GLB container: 12-byte header, JSON chunk padded with
/// spaces, BIN chunk padded with zeros.
fn encode_glb(mut json: Vec<u8>, mut bin: Vec<u8>) -> Vec<u8> {
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export;
    use crate::import::{import, ImportSettings};
    use crate::io::{File, FileList};
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::{finalize_model, Color, FinalizeParams};

    fn cuboid() -> Model {
        let params = GeneratorParams::named("box").with_color(Color::rgb(0, 200, 40));
        let mut model = generate_cuboid(&params, 2.0, 3.0, 4.0);
        finalize_model(&mut model, &FinalizeParams::default());
        model
    }

    #[test]
    fn test_glb_roundtrip() {
        let model = cuboid();
        let files = export(&model, FormatToken::Gltf, &ExportSettings::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].name.ends_with(".glb"));
        assert!(files[0].content.starts_with(b"glTF"));

        let mut list = FileList::new();
        for file in files {
            list.add(File::from_memory(file.name, file.content));
        }
        let back = import(&list, None, &ImportSettings::default()).model.expect("model");
        assert_eq!(back.meshes()[0].triangle_count(), 12);
        let before = model.bounding_box().unwrap();
        let after = back.bounding_box().unwrap();
        assert!((before.min - after.min).length() < 1.0e-4);
        assert!((before.max - after.max).length() < 1.0e-4);
    }

    #[test]
    fn test_text_variant_writes_json_and_buffer_pair() {
        let model = cuboid();
        let settings = ExportSettings {
            variant: FileVariant::Text,
            base_name: "scene".to_string(),
            ..Default::default()
        };
        let files = export(&model, FormatToken::Gltf, &settings).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "scene.gltf");
        assert_eq!(files[1].name, "scene.bin");
        let json = std::str::from_utf8(&files[0].content).unwrap();
        assert!(json.contains("\"uri\":\"scene.bin\""));

        let mut list = FileList::new();
        for file in files {
            list.add(File::from_memory(file.name, file.content));
        }
        let back = import(&list, None, &ImportSettings::default()).model.expect("model");
        assert_eq!(back.meshes()[0].triangle_count(), 12);
    }

    #[test]
    fn test_material_color_survives() {
        let model = cuboid();
        let files = export(&model, FormatToken::Gltf, &ExportSettings::default()).unwrap();
        let mut list = FileList::new();
        for file in files {
            list.add(File::from_memory(file.name, file.content));
        }
        let back = import(&list, None, &ImportSettings::default()).model.expect("model");
        assert_eq!(back.materials().len(), 1);
        assert_eq!(back.materials()[0].color(), Color::rgb(0, 200, 40));
        assert_eq!(back.materials()[0].name(), "box");
    }
}
