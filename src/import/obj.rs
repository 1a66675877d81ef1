//! Wavefront OBJ decoder, with MTL sibling material support.

use std::collections::HashMap;

use glam::{DVec2, DVec3};
use tracing::debug;

use super::{Decoder, FormatToken, ImportIssue, ImportResult, ImportSettings, IssueCode};
use crate::io::{File, FileList};
use crate::model::{Color, Material, Mesh, Model, TextureMap, Triangle};
use crate::runner::run_tasks;
use crate::util::{Error, Result};

pub(crate) struct ObjDecoder;

impl Decoder for ObjDecoder {
    fn token(&self) -> FormatToken {
        FormatToken::Obj
    }

    fn decode(
        &self,
        files: &FileList,
        primary: &File,
        _settings: &ImportSettings,
        result: &mut ImportResult,
    ) -> Result<Model> {
        let text = primary.as_text()?;
        let mut state = ObjState::new(primary);

        for (line_index, line) in text.lines().enumerate() {
            let line_number = line_index + 1;
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else { continue };
            let rest: Vec<&str> = tokens.collect();

            match keyword {
                "#" => {}
                "v" => state.read_vertex(&rest, line_number)?,
                "vn" => state.read_normal(&rest, line_number)?,
                "vt" => state.read_uv(&rest, line_number)?,
                "f" => state.read_face(&rest, line_number)?,
                "o" | "g" => state.begin_mesh(rest.first().copied().unwrap_or("")),
                "usemtl" => state.use_material(rest.first().copied().unwrap_or(""), result),
                "mtllib" => {
                    if let Some(name) = rest.first() {
                        state.load_material_library(files, primary, name, result);
                    }
                }
                "s" | "l" | "p" => {
                    // Smoothing groups, lines and points carry no triangle data
                    state.warn_once(result, keyword, line_number);
                }
                other => state.warn_once(result, other, line_number),
            }
        }

        Ok(state.finish())
    }
}

/// Per-file decode state. OBJ indices are global across the whole file, so
/// attribute arrays accumulate here and are remapped per mesh.
struct ObjState {
    model: Model,
    positions: Vec<DVec3>,
    position_colors: Vec<Option<Color>>,
    normals: Vec<DVec3>,
    uvs: Vec<DVec2>,
    current: Mesh,
    /// Global corner (v, n, t) -> position index inside the current mesh.
    vertex_remap: HashMap<(u32, Option<u32>, Option<u32>), u32>,
    /// Global normal index -> index inside the current mesh's normal array.
    normal_remap: HashMap<u32, u32>,
    /// Global uv index -> index inside the current mesh's uv array.
    uv_remap: HashMap<u32, u32>,
    /// Whether any vertex of the current mesh carried a real color.
    current_has_colors: bool,
    current_material: Option<u32>,
    material_names: HashMap<String, u32>,
    warned_keywords: Vec<String>,
    default_mesh_name: String,
}

impl ObjState {
    fn new(primary: &File) -> Self {
        let default_mesh_name = primary
            .name
            .rsplit('/')
            .next()
            .and_then(|n| n.rsplit_once('.').map(|(stem, _)| stem.to_string()))
            .unwrap_or_else(|| primary.name.clone());
        Self {
            model: Model::new(),
            positions: Vec::new(),
            position_colors: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            current: Mesh::new(default_mesh_name.clone()),
            vertex_remap: HashMap::new(),
            normal_remap: HashMap::new(),
            uv_remap: HashMap::new(),
            current_has_colors: false,
            current_material: None,
            material_names: HashMap::new(),
            warned_keywords: Vec::new(),
            default_mesh_name,
        }
    }

    fn read_vertex(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        let [x, y, z] = parse_floats::<3>(tokens, line, "vertex")?;
        self.positions.push(DVec3::new(x, y, z));
        // Optional vertex-color extension: three extra components
        if tokens.len() >= 6 {
            let [r, g, b] = parse_floats::<3>(&tokens[3..6], line, "vertex color")?;
            self.position_colors.push(Some(Color::from_floats(r, g, b)));
        } else {
            self.position_colors.push(None);
        }
        Ok(())
    }

    fn read_normal(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        let [x, y, z] = parse_floats::<3>(tokens, line, "normal")?;
        self.normals.push(DVec3::new(x, y, z));
        Ok(())
    }

    fn read_uv(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        let [u, v] = parse_floats::<2>(tokens, line, "texture coordinate")?;
        self.uvs.push(DVec2::new(u, v));
        Ok(())
    }

    fn read_face(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        if tokens.len() < 3 {
            return Err(Error::parse_line(line, "face needs at least 3 vertices"));
        }
        let mut corners = Vec::with_capacity(tokens.len());
        for token in tokens {
            corners.push(self.resolve_corner(token, line)?);
        }
        // Triangulate as a fan
        for i in 1..corners.len() - 1 {
            let (v0, n0, t0) = corners[0];
            let (v1, n1, t1) = corners[i];
            let (v2, n2, t2) = corners[i + 1];
            let mut triangle = Triangle::new([v0, v1, v2]);
            if let (Some(a), Some(b), Some(c)) = (n0, n1, n2) {
                triangle.normals = Some([a, b, c]);
            }
            if let (Some(a), Some(b), Some(c)) = (t0, t1, t2) {
                triangle.uvs = Some([a, b, c]);
            }
            triangle.material = self.current_material;
            self.current.add_triangle(triangle);
        }
        Ok(())
    }

    /// Parse one `v`, `v/t`, `v//n` or `v/t/n` face corner and remap its
    /// global indices into the current mesh.
    fn resolve_corner(&mut self, token: &str, line: usize) -> Result<(u32, Option<u32>, Option<u32>)> {
        let mut parts = token.split('/');
        let v = self.resolve_index(parts.next(), self.positions.len(), line, "vertex")?
            .ok_or_else(|| Error::parse_line(line, format!("bad face corner {token:?}")))?;
        let t = self.resolve_index(parts.next(), self.uvs.len(), line, "texture")?;
        let n = self.resolve_index(parts.next(), self.normals.len(), line, "normal")?;

        // Normals and uvs carry their own index spaces, remapped
        // independently of the position array.
        let normal = match n {
            Some(n) => Some(match self.normal_remap.get(&n) {
                Some(&mapped) => mapped,
                None => {
                    let mapped = self.current.add_normal(self.normals[n as usize]);
                    self.normal_remap.insert(n, mapped);
                    mapped
                }
            }),
            None => None,
        };
        let uv = match t {
            Some(t) => Some(match self.uv_remap.get(&t) {
                Some(&mapped) => mapped,
                None => {
                    let mapped = self.current.add_uv(self.uvs[t as usize]);
                    self.uv_remap.insert(t, mapped);
                    mapped
                }
            }),
            None => None,
        };

        let key = (v, n, t);
        let mapped = match self.vertex_remap.get(&key) {
            Some(&mapped) => mapped,
            None => {
                let mapped = self.current.add_vertex(self.positions[v as usize]);
                // Colors stay parallel to positions; defaults fill the gaps
                // and flush drops the array when no vertex had one
                match self.position_colors[v as usize] {
                    Some(color) => {
                        self.current.colors.push(color);
                        self.current_has_colors = true;
                    }
                    None => self.current.colors.push(Color::WHITE),
                }
                self.vertex_remap.insert(key, mapped);
                mapped
            }
        };
        Ok((mapped, normal, uv))
    }

    /// Resolve a 1-based (or negative, relative) OBJ index.
    fn resolve_index(
        &self,
        token: Option<&str>,
        len: usize,
        line: usize,
        what: &str,
    ) -> Result<Option<u32>> {
        let Some(token) = token else { return Ok(None) };
        if token.is_empty() {
            return Ok(None);
        }
        let raw: i64 = token
            .parse()
            .map_err(|_| Error::parse_line(line, format!("invalid {what} index {token:?}")))?;
        let index = if raw < 0 { len as i64 + raw } else { raw - 1 };
        if index < 0 || index >= len as i64 {
            return Err(Error::parse_line(
                line,
                format!("{what} index {raw} out of range (count: {len})"),
            ));
        }
        Ok(Some(index as u32))
    }

    fn begin_mesh(&mut self, name: &str) {
        self.flush_mesh();
        let name = if name.is_empty() { self.default_mesh_name.clone() } else { name.to_string() };
        self.current = Mesh::new(name);
        self.vertex_remap.clear();
        self.normal_remap.clear();
        self.uv_remap.clear();
        self.current_has_colors = false;
    }

    fn use_material(&mut self, name: &str, result: &mut ImportResult) {
        match self.material_names.get(name) {
            Some(&index) => self.current_material = Some(index),
            None => {
                // Reference to a material the libraries never declared;
                // create a named placeholder so faces stay grouped
                result.add_issue(ImportIssue::warning(
                    IssueCode::MissingData,
                    format!("material {name:?} is not defined, using placeholder"),
                ));
                let index = self.model.add_material(Material::phong(name, Color::rgb(200, 200, 200)));
                self.material_names.insert(name.to_string(), index);
                self.current_material = Some(index);
            }
        }
    }

    fn load_material_library(
        &mut self,
        files: &FileList,
        primary: &File,
        name: &str,
        result: &mut ImportResult,
    ) {
        let resolved = match files.resolve_sibling(&primary.name, name) {
            Ok(resolved) => resolved,
            Err(_) => {
                // Optional sibling: degrade to default materials
                result.add_issue(ImportIssue::warning(
                    IssueCode::SiblingResource,
                    format!("material library {name:?} not found"),
                ));
                return;
            }
        };
        let content = match files.get(&resolved).and_then(|f| f.as_text().map(str::to_string)) {
            Ok(content) => content,
            Err(err) => {
                result.add_issue(ImportIssue::warning(
                    IssueCode::SiblingResource,
                    format!("material library {name:?} unreadable: {err}"),
                ));
                return;
            }
        };

        let materials = parse_mtl(&content);
        debug!(library = resolved.as_str(), count = materials.len(), "parsed material library");

        // Texture contents are independent fetches; resolve them in parallel
        let texture_names: Vec<Option<String>> =
            materials.iter().map(|m| m.diffuse_map.clone()).collect();
        let fetches: Vec<_> = texture_names
            .iter()
            .map(|name| {
                let name = name.clone();
                move || -> Result<Option<Vec<u8>>> {
                    match name {
                        Some(name) => {
                            let resolved = files.resolve_sibling(&primary.name, &name)?;
                            Ok(Some(files.get(&resolved)?.content.clone()))
                        }
                        None => Ok(None),
                    }
                }
            })
            .collect();
        let fetched = run_tasks(fetches);

        for (parsed, fetch) in materials.into_iter().zip(fetched) {
            let mut material = Material::phong(parsed.name.clone(), parsed.diffuse);
            if let Material::Phong { base, ambient, specular, shininess } = &mut material {
                *ambient = parsed.ambient;
                *specular = parsed.specular;
                *shininess = parsed.shininess;
                if parsed.opacity < 1.0 {
                    base.opacity = parsed.opacity;
                    base.transparent = true;
                }
                if let Some(texture) = &parsed.diffuse_map {
                    let content = match fetch {
                        Ok(content) => content,
                        Err(_) => {
                            // Missing texture is an optional sibling
                            result.add_issue(ImportIssue::warning(
                                IssueCode::SiblingResource,
                                format!("texture {texture:?} not found"),
                            ));
                            None
                        }
                    };
                    base.diffuse_map = Some(TextureMap { name: texture.clone(), content });
                }
            }
            let index = self.model.add_material(material);
            self.material_names.insert(parsed.name, index);
        }
    }

    fn warn_once(&mut self, result: &mut ImportResult, keyword: &str, line: usize) {
        if self.warned_keywords.iter().any(|k| k == keyword) {
            return;
        }
        self.warned_keywords.push(keyword.to_string());
        result.add_issue(ImportIssue::warning_at_line(
            IssueCode::UnsupportedFeature,
            line,
            format!("unsupported keyword {keyword:?} skipped"),
        ));
    }

    fn flush_mesh(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut mesh = std::mem::replace(&mut self.current, Mesh::new(""));
        if !self.current_has_colors {
            mesh.colors.clear();
        }
        self.current_has_colors = false;
        self.model.add_mesh_to_root(mesh);
    }

    fn finish(mut self) -> Model {
        self.flush_mesh();
        self.model
    }
}

/// Parse N whitespace-separated floats.
fn parse_floats<const N: usize>(tokens: &[&str], line: usize, what: &str) -> Result<[f64; N]> {
    if tokens.len() < N {
        return Err(Error::parse_line(line, format!("{what} needs {N} components")));
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(tokens) {
        *slot = token
            .parse()
            .map_err(|_| Error::parse_line(line, format!("invalid {what} component {token:?}")))?;
    }
    Ok(out)
}

/// One material parsed from an MTL library.
struct MtlMaterial {
    name: String,
    diffuse: Color,
    ambient: Color,
    specular: Color,
    shininess: f64,
    opacity: f64,
    diffuse_map: Option<String>,
}

impl MtlMaterial {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            diffuse: Color::rgb(200, 200, 200),
            ambient: Color::BLACK,
            specular: Color::BLACK,
            shininess: 0.0,
            opacity: 1.0,
            diffuse_map: None,
        }
    }
}

/// Parse an MTL library. Malformed statements are skipped; a material
/// library never fails an import on its own.
fn parse_mtl(content: &str) -> Vec<MtlMaterial> {
    let mut materials: Vec<MtlMaterial> = Vec::new();
    for line in content.lines() {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else { continue };
        let rest: Vec<&str> = tokens.collect();

        let color = |rest: &[&str]| -> Option<Color> {
            let [r, g, b] = parse_floats::<3>(rest, 0, "color").ok()?;
            Some(Color::from_floats(r, g, b))
        };

        match keyword {
            "newmtl" => {
                if let Some(name) = rest.first() {
                    materials.push(MtlMaterial::new(name));
                }
            }
            "Kd" => {
                if let (Some(m), Some(c)) = (materials.last_mut(), color(&rest)) {
                    m.diffuse = c;
                }
            }
            "Ka" => {
                if let (Some(m), Some(c)) = (materials.last_mut(), color(&rest)) {
                    m.ambient = c;
                }
            }
            "Ks" => {
                if let (Some(m), Some(c)) = (materials.last_mut(), color(&rest)) {
                    m.specular = c;
                }
            }
            "Ns" => {
                if let (Some(m), Some(v)) = (materials.last_mut(), rest.first().and_then(|t| t.parse().ok())) {
                    m.shininess = v;
                }
            }
            "d" => {
                if let (Some(m), Some(v)) = (materials.last_mut(), rest.first().and_then(|t| t.parse().ok())) {
                    m.opacity = v;
                }
            }
            "Tr" => {
                if let (Some(m), Some(v)) = (materials.last_mut(), rest.first().and_then(|t| t.parse::<f64>().ok())) {
                    m.opacity = 1.0 - v;
                }
            }
            "map_Kd" => {
                if let (Some(m), Some(name)) = (materials.last_mut(), rest.last()) {
                    m.diffuse_map = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    materials
}
