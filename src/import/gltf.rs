//! glTF 2.0 decoder: JSON and GLB containers, external and embedded
//! buffers, node hierarchy with mesh instancing, PBR materials.

use std::collections::{HashMap, HashSet};

use base64::Engine;
use glam::{DMat4, DQuat, DVec2, DVec3};
use serde::Deserialize;
use tracing::debug;

use super::{Decoder, FormatToken, ImportIssue, ImportResult, ImportSettings, IssueCode};
use crate::geom::Transformation;
use crate::io::{BinaryReader, Endianness, File, FileList};
use crate::model::{Color, Material, Mesh, MeshId, Model, NodeId, TextureMap, Triangle};
use crate::runner::run_tasks;
use crate::util::{Error, Result};

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const MODE_TRIANGLES: u32 = 4;

const COMPONENT_I8: u32 = 5120;
const COMPONENT_U8: u32 = 5121;
const COMPONENT_I16: u32 = 5122;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;

pub(crate) struct GltfDecoder;

impl Decoder for GltfDecoder {
    fn token(&self) -> FormatToken {
        FormatToken::Gltf
    }

    fn decode(
        &self,
        files: &FileList,
        primary: &File,
        _settings: &ImportSettings,
        result: &mut ImportResult,
    ) -> Result<Model> {
        let (json, bin_chunk) = if primary.content.starts_with(b"glTF") {
            parse_glb(&primary.content)?
        } else {
            (primary.content.clone(), None)
        };
        let document: Document = serde_json::from_slice(&json)?;
        debug!(
            nodes = document.nodes.len(),
            meshes = document.meshes.len(),
            "gltf document parsed"
        );

        let buffers = resolve_buffers(&document, files, primary, bin_chunk)?;
        let mut builder = ModelBuilder {
            document: &document,
            buffers: &buffers,
            files,
            primary,
            model: Model::new(),
            mesh_ids: HashMap::new(),
            material_ids: HashMap::new(),
            visited_nodes: HashSet::new(),
        };
        builder.build(result)?;
        Ok(builder.model)
    }
}

// Document structure, limited to what the pipeline consumes. Unknown
// JSON members are ignored by serde.

#[derive(Deserialize)]
struct Document {
    asset: Asset,
    #[serde(default)]
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<Scene>,
    #[serde(default)]
    nodes: Vec<GltfNode>,
    #[serde(default)]
    meshes: Vec<GltfMesh>,
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews", default)]
    buffer_views: Vec<BufferView>,
    #[serde(default)]
    buffers: Vec<Buffer>,
    #[serde(default)]
    materials: Vec<GltfMaterial>,
    #[serde(default)]
    textures: Vec<Texture>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct Asset {
    version: String,
}

#[derive(Deserialize)]
struct Scene {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Deserialize)]
struct GltfNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    #[serde(default)]
    mesh: Option<usize>,
    #[serde(default)]
    matrix: Option<[f64; 16]>,
    #[serde(default)]
    translation: Option<[f64; 3]>,
    #[serde(default)]
    rotation: Option<[f64; 4]>,
    #[serde(default)]
    scale: Option<[f64; 3]>,
}

#[derive(Deserialize)]
struct GltfMesh {
    #[serde(default)]
    name: Option<String>,
    primitives: Vec<Primitive>,
}

#[derive(Deserialize)]
struct Primitive {
    attributes: HashMap<String, usize>,
    #[serde(default)]
    indices: Option<usize>,
    #[serde(default)]
    material: Option<usize>,
    #[serde(default = "default_mode")]
    mode: u32,
}

fn default_mode() -> u32 {
    MODE_TRIANGLES
}

#[derive(Deserialize)]
struct Accessor {
    #[serde(rename = "bufferView", default)]
    buffer_view: Option<usize>,
    #[serde(rename = "byteOffset", default)]
    byte_offset: usize,
    #[serde(rename = "componentType")]
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    element_type: String,
}

#[derive(Deserialize)]
struct BufferView {
    buffer: usize,
    #[serde(rename = "byteOffset", default)]
    byte_offset: usize,
    #[serde(rename = "byteLength")]
    byte_length: usize,
    #[serde(rename = "byteStride", default)]
    byte_stride: Option<usize>,
}

#[derive(Deserialize)]
struct Buffer {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Deserialize)]
struct GltfMaterial {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "pbrMetallicRoughness", default)]
    pbr: Option<Pbr>,
    #[serde(rename = "alphaMode", default)]
    alpha_mode: Option<String>,
}

#[derive(Deserialize)]
struct Pbr {
    #[serde(rename = "baseColorFactor", default)]
    base_color_factor: Option<[f64; 4]>,
    #[serde(rename = "baseColorTexture", default)]
    base_color_texture: Option<TextureRef>,
    #[serde(rename = "metallicFactor", default = "default_one")]
    metallic_factor: f64,
    #[serde(rename = "roughnessFactor", default = "default_one")]
    roughness_factor: f64,
}

fn default_one() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct TextureRef {
    index: usize,
}

#[derive(Deserialize)]
struct Texture {
    #[serde(default)]
    source: Option<usize>,
}

#[derive(Deserialize)]
struct Image {
    #[serde(default)]
    uri: Option<String>,
    #[serde(rename = "bufferView", default)]
    buffer_view: Option<usize>,
}

/// Split a GLB container into its JSON chunk and optional BIN chunk.
fn parse_glb(content: &[u8]) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
    let mut reader = BinaryReader::new(content, Endianness::Little);
    let magic = reader.read_u32()?;
    if magic != GLB_MAGIC {
        return Err(Error::parse_at(0, "bad container magic"));
    }
    let version = reader.read_u32()?;
    if version != 2 {
        return Err(Error::parse_at(4, format!("unsupported container version {version}")));
    }
    let declared_length = reader.read_u32()? as usize;
    if declared_length > content.len() {
        return Err(Error::UnexpectedEof(declared_length as u64));
    }

    let mut json = None;
    let mut bin = None;
    while reader.position() < declared_length {
        let chunk_length = reader.read_u32()? as usize;
        let chunk_type = reader.read_u32()?;
        let data = reader.take(chunk_length)?;
        match chunk_type {
            CHUNK_JSON => json = Some(data.to_vec()),
            CHUNK_BIN => bin = Some(data.to_vec()),
            _ => {}
        }
    }
    let json = json.ok_or_else(|| Error::parse_at(12, "container has no JSON chunk"))?;
    Ok((json, bin))
}

/// Fetch all buffers up front, in parallel. Every buffer is mandatory;
/// any failure aborts the import.
fn resolve_buffers(
    document: &Document,
    files: &FileList,
    primary: &File,
    bin_chunk: Option<Vec<u8>>,
) -> Result<Vec<Vec<u8>>> {
    let fetches: Vec<_> = document
        .buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| {
            let uri = buffer.uri.clone();
            let bin = (index == 0).then(|| bin_chunk.clone()).flatten();
            move || -> Result<Vec<u8>> {
                match uri {
                    Some(uri) => fetch_uri(files, primary, &uri),
                    // Only buffer 0 may refer to the GLB BIN chunk
                    None => bin.ok_or_else(|| Error::SiblingResource {
                        name: format!("buffer {index}"),
                        message: "no uri and no binary chunk".to_string(),
                    }),
                }
            }
        })
        .collect();

    run_tasks(fetches).into_iter().collect()
}

/// Resolve a buffer or image uri: data uri or file-list sibling.
fn fetch_uri(files: &FileList, primary: &File, uri: &str) -> Result<Vec<u8>> {
    if let Some(rest) = uri.strip_prefix("data:") {
        let payload = rest
            .split_once(',')
            .ok_or_else(|| Error::SiblingResource {
                name: uri.chars().take(40).collect(),
                message: "malformed data uri".to_string(),
            })?
            .1;
        return base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::SiblingResource {
                name: uri.chars().take(40).collect(),
                message: e.to_string(),
            });
    }
    let resolved = files.resolve_sibling(&primary.name, uri)?;
    Ok(files.get(&resolved)?.content.clone())
}

struct ModelBuilder<'a> {
    document: &'a Document,
    buffers: &'a [Vec<u8>],
    files: &'a FileList,
    primary: &'a File,
    model: Model,
    /// glTF mesh index -> model mesh, shared between instancing nodes.
    mesh_ids: HashMap<usize, MeshId>,
    material_ids: HashMap<usize, u32>,
    /// Nodes already placed. The node graph must be a tree; a repeat means
    /// the document is malformed (shared subtree or cycle).
    visited_nodes: HashSet<usize>,
}

impl ModelBuilder<'_> {
    fn build(&mut self, result: &mut ImportResult) -> Result<()> {
        if !self.document.asset.version.starts_with('2') {
            return Err(Error::other(format!(
                "unsupported asset version {}",
                self.document.asset.version
            )));
        }

        let scene_index = self.document.scene.unwrap_or(0);
        let root_nodes: Vec<usize> = match self.document.scenes.get(scene_index) {
            Some(scene) => scene.nodes.clone(),
            // No scene: treat every node as a root candidate
            None => (0..self.document.nodes.len())
                .filter(|&i| !self.document.nodes.iter().any(|n| n.children.contains(&i)))
                .collect(),
        };

        let root = self.model.root_id();
        for node_index in root_nodes {
            self.build_node(node_index, root, result)?;
        }
        Ok(())
    }

    fn build_node(&mut self, index: usize, parent: NodeId, result: &mut ImportResult) -> Result<()> {
        if !self.visited_nodes.insert(index) {
            return Err(Error::other(format!(
                "node {index} appears more than once in the hierarchy"
            )));
        }
        let gltf_node = self
            .document
            .nodes
            .get(index)
            .ok_or_else(|| Error::other(format!("node index {index} out of range")))?;

        let name = gltf_node.name.clone().unwrap_or_else(|| format!("node_{index}"));
        let node_id = self.model.add_child_node(parent, name);
        self.model.node_mut(node_id).transform = node_transform(gltf_node);

        if let Some(mesh_index) = gltf_node.mesh {
            let mesh_id = self.mesh_for(mesh_index, result)?;
            self.model.add_mesh_instance(node_id, mesh_id);
        }

        for &child in &gltf_node.children.clone() {
            self.build_node(child, node_id, result)?;
        }
        Ok(())
    }

    /// Get or build the model mesh for a glTF mesh index. Instancing
    /// nodes share the result.
    fn mesh_for(&mut self, index: usize, result: &mut ImportResult) -> Result<MeshId> {
        if let Some(&id) = self.mesh_ids.get(&index) {
            return Ok(id);
        }
        let gltf_mesh = self
            .document
            .meshes
            .get(index)
            .ok_or_else(|| Error::other(format!("mesh index {index} out of range")))?;

        let name = gltf_mesh.name.clone().unwrap_or_else(|| format!("mesh_{index}"));
        let mut mesh = Mesh::new(name);

        for primitive in &gltf_mesh.primitives {
            if primitive.mode != MODE_TRIANGLES {
                result.add_issue(ImportIssue::warning(
                    IssueCode::UnsupportedFeature,
                    format!("primitive mode {} skipped", primitive.mode),
                ));
                continue;
            }
            let material = match primitive.material {
                Some(material_index) => Some(self.material_for(material_index, result)?),
                None => None,
            };
            self.append_primitive(primitive, material, &mut mesh)?;
        }

        let id = self.model.add_mesh(mesh);
        self.mesh_ids.insert(index, id);
        Ok(id)
    }

    fn append_primitive(
        &self,
        primitive: &Primitive,
        material: Option<u32>,
        mesh: &mut Mesh,
    ) -> Result<()> {
        let position_accessor = *primitive
            .attributes
            .get("POSITION")
            .ok_or_else(|| Error::other("primitive lacks POSITION attribute"))?;
        let positions = self.read_vec3(position_accessor)?;
        let normals = match primitive.attributes.get("NORMAL") {
            Some(&accessor) => Some(self.read_vec3(accessor)?),
            None => None,
        };
        let uvs = match primitive.attributes.get("TEXCOORD_0") {
            Some(&accessor) => Some(self.read_vec2(accessor)?),
            None => None,
        };

        let base = mesh.vertex_count() as u32;
        for (i, &position) in positions.iter().enumerate() {
            mesh.add_vertex(position);
            if let Some(normals) = &normals {
                mesh.add_normal(normals[i]);
            }
            if let Some(uvs) = &uvs {
                mesh.add_uv(uvs[i]);
            }
        }

        let indices = match primitive.indices {
            Some(accessor) => self.read_indices(accessor)?,
            None => (0..positions.len() as u32).collect(),
        };
        if indices.len() % 3 != 0 {
            return Err(Error::other("triangle index count is not a multiple of 3"));
        }
        for corner in indices.chunks_exact(3) {
            for &index in corner {
                if index as usize >= positions.len() {
                    return Err(Error::ReferentialIntegrity(format!(
                        "index {index} out of range (vertex count: {})",
                        positions.len()
                    )));
                }
            }
            let vertices = [base + corner[0], base + corner[1], base + corner[2]];
            let mut triangle = Triangle::new(vertices);
            if normals.is_some() {
                triangle.normals = Some(vertices);
            }
            if uvs.is_some() {
                triangle.uvs = Some(vertices);
            }
            triangle.material = material;
            mesh.add_triangle(triangle);
        }
        Ok(())
    }

    fn material_for(&mut self, index: usize, result: &mut ImportResult) -> Result<u32> {
        if let Some(&id) = self.material_ids.get(&index) {
            return Ok(id);
        }
        let gltf_material = self
            .document
            .materials
            .get(index)
            .ok_or_else(|| Error::other(format!("material index {index} out of range")))?;

        let name = gltf_material
            .name
            .clone()
            .unwrap_or_else(|| format!("material_{index}"));
        let factor = gltf_material
            .pbr
            .as_ref()
            .and_then(|pbr| pbr.base_color_factor)
            .unwrap_or([1.0, 1.0, 1.0, 1.0]);
        let color = Color::from_floats(factor[0], factor[1], factor[2]);

        let mut material = Material::physical(name, color);
        if let Material::Physical { base, metalness, roughness } = &mut material {
            if let Some(pbr) = &gltf_material.pbr {
                *metalness = pbr.metallic_factor;
                *roughness = pbr.roughness_factor;
                if let Some(texture_ref) = &pbr.base_color_texture {
                    base.diffuse_map = self.fetch_texture(texture_ref.index, result);
                }
            }
            if gltf_material.alpha_mode.as_deref() == Some("BLEND") || factor[3] < 1.0 {
                base.opacity = factor[3];
                base.transparent = true;
            }
        }

        let id = self.model.add_material(material);
        self.material_ids.insert(index, id);
        Ok(id)
    }

    /// Fetch a texture image. Texture data is optional; failures degrade
    /// to a named map without content.
    fn fetch_texture(&self, texture_index: usize, result: &mut ImportResult) -> Option<TextureMap> {
        let image_index = self.document.textures.get(texture_index)?.source?;
        let image = self.document.images.get(image_index)?;

        if let Some(uri) = &image.uri {
            let name = uri.clone();
            return match fetch_uri(self.files, self.primary, uri) {
                Ok(content) => Some(TextureMap { name, content: Some(content) }),
                Err(err) => {
                    result.add_issue(ImportIssue::warning(
                        IssueCode::SiblingResource,
                        format!("texture {name:?} unavailable: {err}"),
                    ));
                    Some(TextureMap { name, content: None })
                }
            };
        }
        if let Some(view_index) = image.buffer_view {
            let name = format!("image_{image_index}");
            return match self.view_bytes(view_index) {
                Ok(bytes) => Some(TextureMap { name, content: Some(bytes.to_vec()) }),
                Err(err) => {
                    result.add_issue(ImportIssue::warning(
                        IssueCode::SiblingResource,
                        format!("texture {name:?} unavailable: {err}"),
                    ));
                    Some(TextureMap { name, content: None })
                }
            };
        }
        None
    }

    fn view_bytes(&self, index: usize) -> Result<&[u8]> {
        let view = self
            .document
            .buffer_views
            .get(index)
            .ok_or_else(|| Error::other(format!("buffer view {index} out of range")))?;
        let buffer = self
            .buffers
            .get(view.buffer)
            .ok_or_else(|| Error::other(format!("buffer {} out of range", view.buffer)))?;
        let end = view
            .byte_offset
            .checked_add(view.byte_length)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                Error::UnexpectedEof((view.byte_offset as u64).saturating_add(view.byte_length as u64))
            })?;
        Ok(&buffer[view.byte_offset..end])
    }

    /// Read accessor components as f64, honoring interleaved strides.
    fn read_components(&self, accessor_index: usize, component_count: usize) -> Result<Vec<f64>> {
        let accessor = self
            .document
            .accessors
            .get(accessor_index)
            .ok_or_else(|| Error::other(format!("accessor {accessor_index} out of range")))?;
        let expected = components_of(&accessor.element_type)?;
        if expected != component_count {
            return Err(Error::other(format!(
                "accessor {accessor_index} is {}, expected {component_count} components",
                accessor.element_type
            )));
        }
        let view_index = accessor
            .buffer_view
            .ok_or_else(|| Error::other("sparse accessors are not supported"))?;
        let view = self
            .document
            .buffer_views
            .get(view_index)
            .ok_or_else(|| Error::other(format!("buffer view {view_index} out of range")))?;
        let bytes = self.view_bytes(view_index)?;

        let component_size = component_size(accessor.component_type)?;
        let packed = component_size * component_count;
        let stride = view.byte_stride.unwrap_or(packed);
        if stride < packed {
            return Err(Error::other(format!(
                "buffer view {view_index} stride {stride} is smaller than element size {packed}"
            )));
        }

        // The declared count is untrusted; check it against the view's
        // byte span before reserving anything
        let available = bytes.len().saturating_sub(accessor.byte_offset);
        let capacity = if available < packed { 0 } else { (available - packed) / stride + 1 };
        if accessor.count > capacity {
            return Err(Error::other(format!(
                "accessor {accessor_index} count {} exceeds its buffer view (room for {capacity})",
                accessor.count
            )));
        }

        let mut out = Vec::with_capacity(accessor.count * component_count);
        for element in 0..accessor.count {
            let start = accessor.byte_offset + element * stride;
            for c in 0..component_count {
                let at = start + c * component_size;
                out.push(read_component(&bytes[at..], accessor.component_type)?);
            }
        }
        Ok(out)
    }

    fn read_vec3(&self, accessor: usize) -> Result<Vec<DVec3>> {
        let flat = self.read_components(accessor, 3)?;
        Ok(flat.chunks_exact(3).map(|c| DVec3::new(c[0], c[1], c[2])).collect())
    }

    fn read_vec2(&self, accessor: usize) -> Result<Vec<DVec2>> {
        let flat = self.read_components(accessor, 2)?;
        Ok(flat.chunks_exact(2).map(|c| DVec2::new(c[0], c[1])).collect())
    }

    fn read_indices(&self, accessor: usize) -> Result<Vec<u32>> {
        let flat = self.read_components(accessor, 1)?;
        Ok(flat.into_iter().map(|v| v as u32).collect())
    }
}

/// Node transform: full matrix wins over TRS components.
fn node_transform(node: &GltfNode) -> Transformation {
    if let Some(values) = node.matrix {
        return Transformation::from_matrix(DMat4::from_cols_array(&values));
    }
    let translation = node.translation.map(DVec3::from_array).unwrap_or(DVec3::ZERO);
    let rotation = node
        .rotation
        .map(|[x, y, z, w]| DQuat::from_xyzw(x, y, z, w))
        .unwrap_or(DQuat::IDENTITY);
    let scale = node.scale.map(DVec3::from_array).unwrap_or(DVec3::ONE);
    Transformation::new(rotation, translation, scale)
}

fn components_of(element_type: &str) -> Result<usize> {
    Ok(match element_type {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" => 4,
        other => return Err(Error::other(format!("unsupported accessor type {other:?}"))),
    })
}

fn component_size(component_type: u32) -> Result<usize> {
    Ok(match component_type {
        COMPONENT_I8 | COMPONENT_U8 => 1,
        COMPONENT_I16 | COMPONENT_U16 => 2,
        COMPONENT_U32 | COMPONENT_F32 => 4,
        other => return Err(Error::other(format!("unsupported component type {other}"))),
    })
}

/// Decode one component at the start of `bytes`. Alignment is not
/// guaranteed inside interleaved views, hence the unaligned reads.
fn read_component(bytes: &[u8], component_type: u32) -> Result<f64> {
    Ok(match component_type {
        COMPONENT_I8 => bytes[0] as i8 as f64,
        COMPONENT_U8 => bytes[0] as f64,
        COMPONENT_I16 => bytemuck::pod_read_unaligned::<i16>(&bytes[..2]) as f64,
        COMPONENT_U16 => bytemuck::pod_read_unaligned::<u16>(&bytes[..2]) as f64,
        COMPONENT_U32 => bytemuck::pod_read_unaligned::<u32>(&bytes[..4]) as f64,
        COMPONENT_F32 => bytemuck::pod_read_unaligned::<f32>(&bytes[..4]) as f64,
        other => return Err(Error::other(format!("unsupported component type {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import, ImportSettings, Severity};
    use crate::io::FileList;

    /// Minimal document: one triangle, f32 positions, u16 indices.
    fn triangle_json(buffer_uri: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [ {{ "nodes": [0] }} ],
  "nodes": [ {{ "name": "tri", "mesh": 0 }} ],
  "meshes": [ {{ "primitives": [ {{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }} ] }} ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
  ],
  "buffers": [ {{ "uri": "{buffer_uri}", "byteLength": 42 }} ]
}}"#
        )
    }

    fn triangle_buffer() -> Vec<u8> {
        let mut data = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u16, 1, 2] {
            data.extend_from_slice(&index.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_external_buffer() {
        let mut files = FileList::new();
        files.add(File::from_memory(
            "scene.gltf",
            triangle_json("geometry.bin").into_bytes(),
        ));
        files.add(File::from_memory("geometry.bin", triangle_buffer()));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        assert_eq!(model.meshes().len(), 1);
        assert_eq!(model.meshes()[0].triangle_count(), 1);
    }

    #[test]
    fn test_missing_buffer_is_fatal() {
        let mut files = FileList::new();
        files.add(File::from_memory(
            "scene.gltf",
            triangle_json("geometry.bin").into_bytes(),
        ));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
        assert!(result.has_fatal());
    }

    #[test]
    fn test_data_uri_buffer() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(triangle_buffer());
        let uri = format!("data:application/octet-stream;base64,{encoded}");
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", triangle_json(&uri).into_bytes()));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_some());
    }

    #[test]
    fn test_glb_container() {
        let json = triangle_json("unused")
            .replace(r#""uri": "unused", "#, "");
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = triangle_buffer();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let mut glb = Vec::new();
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        let total = 12 + 8 + json.len() + 8 + bin.len();
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(&bin);

        let mut files = FileList::new();
        files.add(File::from_memory("scene.glb", glb));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        assert_eq!(model.meshes()[0].triangle_count(), 1);
    }

    #[test]
    fn test_instanced_mesh_shared() {
        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0, 1] } ],
  "nodes": [
    { "name": "left", "mesh": 0, "translation": [-2, 0, 0] },
    { "name": "right", "mesh": 0, "translation": [2, 0, 0] }
  ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1 } ] } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "buffers": [ { "uri": "geometry.bin", "byteLength": 42 } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.as_bytes().to_vec()));
        files.add(File::from_memory("geometry.bin", triangle_buffer()));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        // One mesh, two instances
        assert_eq!(model.meshes().len(), 1);
        assert_eq!(model.instances().len(), 2);
        let bounds = model.bounding_box().unwrap();
        assert!((bounds.min.x - -2.0).abs() < 1.0e-9);
        assert!((bounds.max.x - 3.0).abs() < 1.0e-9);
    }

    #[test]
    fn test_pbr_material() {
        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [ { "mesh": 0 } ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 } ] } ],
  "materials": [
    {
      "name": "metal",
      "pbrMetallicRoughness": {
        "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
        "metallicFactor": 0.9,
        "roughnessFactor": 0.2
      }
    }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "buffers": [ { "uri": "geometry.bin", "byteLength": 42 } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.as_bytes().to_vec()));
        files.add(File::from_memory("geometry.bin", triangle_buffer()));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        assert_eq!(model.materials().len(), 1);
        let material = &model.materials()[0];
        assert_eq!(material.name(), "metal");
        assert_eq!(material.color(), Color::rgb(255, 0, 0));
        assert!(matches!(
            material,
            Material::Physical { metalness, roughness, .. }
                if (*metalness - 0.9).abs() < 1.0e-9 && (*roughness - 0.2).abs() < 1.0e-9
        ));
    }

    #[test]
    fn test_missing_texture_degrades() {
        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [ { "mesh": 0 } ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 } ] } ],
  "materials": [
    { "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }
  ],
  "textures": [ { "source": 0 } ],
  "images": [ { "uri": "missing.png" } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "buffers": [ { "uri": "geometry.bin", "byteLength": 42 } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.as_bytes().to_vec()));
        files.add(File::from_memory("geometry.bin", triangle_buffer()));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        assert!(result
            .issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.message.contains("missing.png")));
        let map = model.materials()[0].base().diffuse_map.as_ref().unwrap();
        assert!(map.content.is_none());
    }

    #[test]
    fn test_node_cycle_is_fatal() {
        // Node 0 lists itself as a child; the walk must fail, not recurse
        let json = br#"{
  "asset": { "version": "2.0" },
  "scenes": [ { "nodes": [0] } ],
  "nodes": [ { "children": [0] } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.to_vec()));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
        assert!(result.has_fatal());
        assert!(result.issues.iter().any(|i| i.message.contains("more than once")));
    }

    #[test]
    fn test_two_node_cycle_is_fatal() {
        let json = br#"{
  "asset": { "version": "2.0" },
  "scenes": [ { "nodes": [0] } ],
  "nodes": [ { "children": [1] }, { "children": [0] } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.to_vec()));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
        assert!(result.has_fatal());
    }

    #[test]
    fn test_hostile_accessor_count_is_fatal() {
        // 12-byte buffer, count claiming 2^62 elements: reject before
        // any allocation happens
        let json = br#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [ { "mesh": 0 } ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 4611686018427387904, "type": "VEC3" }
  ],
  "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 12 } ],
  "buffers": [ { "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAA", "byteLength": 12 } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.to_vec()));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
        assert!(result.issues.iter().any(|i| i.message.contains("exceeds its buffer view")));
    }

    #[test]
    fn test_zero_stride_is_fatal() {
        let json = br#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [ { "mesh": 0 } ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3" }
  ],
  "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 12, "byteStride": 0 } ],
  "buffers": [ { "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAA", "byteLength": 12 } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.to_vec()));
        let result = import(&files, None, &ImportSettings::default());
        assert!(result.model.is_none());
        assert!(result.issues.iter().any(|i| i.message.contains("stride")));
    }

    #[test]
    fn test_node_hierarchy_transforms() {
        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0] } ],
  "nodes": [
    { "name": "parent", "translation": [10, 0, 0], "children": [1] },
    { "name": "child", "mesh": 0, "translation": [0, 5, 0] }
  ],
  "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1 } ] } ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "buffers": [ { "uri": "geometry.bin", "byteLength": 42 } ]
}"#;
        let mut files = FileList::new();
        files.add(File::from_memory("scene.gltf", json.as_bytes().to_vec()));
        files.add(File::from_memory("geometry.bin", triangle_buffer()));
        let result = import(&files, None, &ImportSettings::default());
        let model = result.model.expect("model");
        let bounds = model.bounding_box().unwrap();
        assert!((bounds.min.x - 10.0).abs() < 1.0e-9);
        assert!((bounds.min.y - 5.0).abs() < 1.0e-9);
    }
}
