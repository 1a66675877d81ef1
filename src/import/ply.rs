//! PLY decoder: header-driven, ascii and both binary flavors.
//!
//! The header declares elements and their typed properties, so unknown
//! elements and properties can be skipped exactly, in binary as well as
//! ascii.

use glam::{DVec2, DVec3};
use tracing::debug;

use super::{Decoder, FormatToken, ImportIssue, ImportResult, ImportSettings, IssueCode};
use crate::io::{BinaryReader, Endianness, File, FileList};
use crate::model::{Color, Mesh, Model, Triangle};
use crate::util::{Error, Result};

pub(crate) struct PlyDecoder;

impl Decoder for PlyDecoder {
    fn token(&self) -> FormatToken {
        FormatToken::Ply
    }

    fn decode(
        &self,
        _files: &FileList,
        primary: &File,
        _settings: &ImportSettings,
        result: &mut ImportResult,
    ) -> Result<Model> {
        let header = parse_header(&primary.content)?;
        debug!(
            format = ?header.format,
            elements = header.elements.len(),
            "ply header parsed"
        );

        for element in &header.elements {
            if element.name != "vertex" && element.name != "face" {
                result.add_issue(ImportIssue::warning(
                    IssueCode::UnsupportedFeature,
                    format!("element {:?} skipped", element.name),
                ));
            }
        }

        let mesh = match header.format {
            PlyFormat::Ascii => decode_ascii(&header, primary)?,
            PlyFormat::BinaryLittle => decode_binary(&header, primary, Endianness::Little)?,
            PlyFormat::BinaryBig => decode_binary(&header, primary, Endianness::Big)?,
        };

        let mut model = Model::new();
        model.add_mesh_to_root(mesh);
        Ok(model)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    BinaryLittle,
    BinaryBig,
}

/// Scalar types a property can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn read(self, reader: &mut BinaryReader<'_>) -> Result<f64> {
        Ok(match self {
            Self::I8 => reader.read_u8()? as i8 as f64,
            Self::U8 => reader.read_u8()? as f64,
            Self::I16 => reader.read_u16()? as i16 as f64,
            Self::U16 => reader.read_u16()? as f64,
            Self::I32 => reader.read_i32()? as f64,
            Self::U32 => reader.read_u32()? as f64,
            Self::F32 => reader.read_f32()? as f64,
            Self::F64 => reader.read_f64()?,
        })
    }
}

#[derive(Clone, Debug)]
enum PropertyKind {
    Scalar(ScalarType),
    /// Count type plus item type.
    List(ScalarType, ScalarType),
}

#[derive(Clone, Debug)]
struct PlyProperty {
    name: String,
    kind: PropertyKind,
}

#[derive(Clone, Debug)]
struct PlyElement {
    name: String,
    count: usize,
    properties: Vec<PlyProperty>,
}

struct PlyHeader {
    format: PlyFormat,
    elements: Vec<PlyElement>,
    /// Byte offset of the first data row.
    data_start: usize,
}

fn parse_header(content: &[u8]) -> Result<PlyHeader> {
    // The header is ascii even in binary files; find its end first
    let end_tag = b"end_header";
    let end = content
        .windows(end_tag.len())
        .position(|w| w == end_tag)
        .ok_or_else(|| Error::parse_line(1, "missing end_header"))?;
    let newline = content[end..]
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Error::parse_line(1, "missing newline after end_header"))?;
    let data_start = end + newline + 1;

    let header_text = std::str::from_utf8(&content[..end])?;
    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();

    for (line_index, line) in header_text.lines().enumerate() {
        let line_number = line_index + 1;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else { continue };
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "ply" | "comment" | "obj_info" => {}
            "format" => {
                format = Some(match rest.first().copied() {
                    Some("ascii") => PlyFormat::Ascii,
                    Some("binary_little_endian") => PlyFormat::BinaryLittle,
                    Some("binary_big_endian") => PlyFormat::BinaryBig,
                    other => {
                        return Err(Error::parse_line(
                            line_number,
                            format!("unknown format {other:?}"),
                        ))
                    }
                });
            }
            "element" => {
                let [name, count] = rest[..] else {
                    return Err(Error::parse_line(line_number, "element needs name and count"));
                };
                let count = count
                    .parse()
                    .map_err(|_| Error::parse_line(line_number, format!("bad count {count:?}")))?;
                elements.push(PlyElement { name: name.to_string(), count, properties: Vec::new() });
            }
            "property" => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| Error::parse_line(line_number, "property before element"))?;
                let kind = match rest.as_slice() {
                    ["list", count_type, item_type, _name] => {
                        let count = scalar(count_type, line_number)?;
                        let item = scalar(item_type, line_number)?;
                        PropertyKind::List(count, item)
                    }
                    [type_name, _name] => PropertyKind::Scalar(scalar(type_name, line_number)?),
                    _ => return Err(Error::parse_line(line_number, "malformed property")),
                };
                let name = rest.last().unwrap_or(&"").to_string();
                element.properties.push(PlyProperty { name, kind });
            }
            other => {
                return Err(Error::parse_line(line_number, format!("unknown keyword {other:?}")));
            }
        }
    }

    let format = format.ok_or_else(|| Error::parse_line(1, "missing format statement"))?;
    Ok(PlyHeader { format, elements, data_start })
}

fn scalar(name: &str, line: usize) -> Result<ScalarType> {
    ScalarType::from_name(name)
        .ok_or_else(|| Error::parse_line(line, format!("unknown property type {name:?}")))
}

/// Column roles recognized on the vertex element.
struct VertexLayout {
    x: Option<usize>,
    y: Option<usize>,
    z: Option<usize>,
    nx: Option<usize>,
    ny: Option<usize>,
    nz: Option<usize>,
    u: Option<usize>,
    v: Option<usize>,
    red: Option<usize>,
    green: Option<usize>,
    blue: Option<usize>,
}

impl VertexLayout {
    fn from_element(element: &PlyElement) -> Result<Self> {
        let find = |name: &str| element.properties.iter().position(|p| p.name == name);
        let layout = Self {
            x: find("x"),
            y: find("y"),
            z: find("z"),
            nx: find("nx"),
            ny: find("ny"),
            nz: find("nz"),
            u: find("u").or_else(|| find("s")).or_else(|| find("texture_u")),
            v: find("v").or_else(|| find("t")).or_else(|| find("texture_v")),
            red: find("red"),
            green: find("green"),
            blue: find("blue"),
        };
        if layout.x.is_none() || layout.y.is_none() || layout.z.is_none() {
            return Err(Error::parse_line(1, "vertex element lacks x/y/z properties"));
        }
        Ok(layout)
    }

    fn has_normals(&self) -> bool {
        self.nx.is_some() && self.ny.is_some() && self.nz.is_some()
    }

    fn has_uvs(&self) -> bool {
        self.u.is_some() && self.v.is_some()
    }

    fn has_colors(&self) -> bool {
        self.red.is_some() && self.green.is_some() && self.blue.is_some()
    }

    /// Append one decoded vertex row to the mesh.
    fn apply(&self, row: &[f64], mesh: &mut Mesh) {
        let at = |i: Option<usize>| i.map(|i| row[i]).unwrap_or(0.0);
        mesh.add_vertex(DVec3::new(at(self.x), at(self.y), at(self.z)));
        if self.has_normals() {
            mesh.add_normal(DVec3::new(at(self.nx), at(self.ny), at(self.nz)));
        }
        if self.has_uvs() {
            mesh.add_uv(DVec2::new(at(self.u), at(self.v)));
        }
        if self.has_colors() {
            // Color properties are uchar 0..255
            mesh.colors.push(Color::rgb(
                at(self.red) as u8,
                at(self.green) as u8,
                at(self.blue) as u8,
            ));
        }
    }
}

fn mesh_from_parts(
    primary: &File,
    layout: &VertexLayout,
) -> (Mesh, bool, bool) {
    let name = primary
        .name
        .rsplit('/')
        .next()
        .and_then(|n| n.rsplit_once('.').map(|(stem, _)| stem.to_string()))
        .unwrap_or_else(|| primary.name.clone());
    (Mesh::new(name), layout.has_normals(), layout.has_uvs())
}

fn push_face(mesh: &mut Mesh, indices: &[u32], with_normals: bool, with_uvs: bool, line: usize) -> Result<()> {
    if indices.len() < 3 {
        return Err(Error::parse_line(line, "face needs at least 3 indices"));
    }
    let vertex_count = mesh.vertex_count() as u32;
    for &index in indices {
        if index >= vertex_count {
            return Err(Error::parse_line(
                line,
                format!("vertex index {index} out of range (count: {vertex_count})"),
            ));
        }
    }
    for i in 1..indices.len() - 1 {
        let corners = [indices[0], indices[i], indices[i + 1]];
        let mut triangle = Triangle::new(corners);
        if with_normals {
            triangle.normals = Some(corners);
        }
        if with_uvs {
            triangle.uvs = Some(corners);
        }
        mesh.add_triangle(triangle);
    }
    Ok(())
}

fn decode_ascii(header: &PlyHeader, primary: &File) -> Result<Mesh> {
    let text = std::str::from_utf8(&primary.content[header.data_start..])?;
    let mut lines = text.lines().enumerate();

    let mut mesh: Option<Mesh> = None;
    let mut with_normals = false;
    let mut with_uvs = false;

    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                let layout = VertexLayout::from_element(element)?;
                let (mut m, n, t) = mesh_from_parts(primary, &layout);
                with_normals = n;
                with_uvs = t;
                for _ in 0..element.count {
                    let (line_number, line) = next_data_line(&mut lines)?;
                    let row = parse_row(element, line, line_number)?;
                    layout.apply(&row, &mut m);
                }
                mesh = Some(m);
            }
            "face" => {
                let mesh = mesh
                    .as_mut()
                    .ok_or_else(|| Error::parse_line(1, "face element before vertex element"))?;
                let list_column = list_column(element)?;
                for _ in 0..element.count {
                    let (line_number, line) = next_data_line(&mut lines)?;
                    let indices = parse_ascii_list(element, list_column, line, line_number)?;
                    push_face(mesh, &indices, with_normals, with_uvs, line_number)?;
                }
            }
            _ => {
                // Unknown element: its rows are whole lines in ascii
                for _ in 0..element.count {
                    next_data_line(&mut lines)?;
                }
            }
        }
    }

    mesh.ok_or_else(|| Error::parse_line(1, "no vertex element"))
}

fn next_data_line<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
) -> Result<(usize, &'a str)> {
    for (index, line) in lines.by_ref() {
        if !line.trim().is_empty() {
            return Ok((index + 1, line));
        }
    }
    Err(Error::parse_line(0, "unexpected end of data"))
}

/// Parse one ascii row of scalar properties.
fn parse_row(element: &PlyElement, line: &str, line_number: usize) -> Result<Vec<f64>> {
    let mut row = Vec::with_capacity(element.properties.len());
    let mut tokens = line.split_whitespace();
    for property in &element.properties {
        match property.kind {
            PropertyKind::Scalar(_) => {
                let token = tokens
                    .next()
                    .ok_or_else(|| Error::parse_line(line_number, "row too short"))?;
                row.push(token.parse().map_err(|_| {
                    Error::parse_line(line_number, format!("invalid value {token:?}"))
                })?);
            }
            PropertyKind::List(_, _) => {
                // Lists on the vertex element are skipped by consuming
                // count + items
                let count: usize = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| Error::parse_line(line_number, "bad list count"))?;
                for _ in 0..count {
                    tokens
                        .next()
                        .ok_or_else(|| Error::parse_line(line_number, "row too short"))?;
                }
                row.push(0.0);
            }
        }
    }
    Ok(row)
}

/// Index of the vertex-index list column on the face element.
fn list_column(element: &PlyElement) -> Result<usize> {
    element
        .properties
        .iter()
        .position(|p| {
            matches!(p.kind, PropertyKind::List(_, _))
                && (p.name == "vertex_indices" || p.name == "vertex_index")
        })
        .or_else(|| element.properties.iter().position(|p| matches!(p.kind, PropertyKind::List(_, _))))
        .ok_or_else(|| Error::parse_line(1, "face element has no index list"))
}

fn parse_ascii_list(
    element: &PlyElement,
    list_column: usize,
    line: &str,
    line_number: usize,
) -> Result<Vec<u32>> {
    let mut tokens = line.split_whitespace();
    let mut indices = Vec::new();
    for (column, property) in element.properties.iter().enumerate() {
        match property.kind {
            PropertyKind::Scalar(_) => {
                tokens
                    .next()
                    .ok_or_else(|| Error::parse_line(line_number, "row too short"))?;
            }
            PropertyKind::List(_, _) => {
                let count: usize = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| Error::parse_line(line_number, "bad list count"))?;
                for _ in 0..count {
                    let token = tokens
                        .next()
                        .ok_or_else(|| Error::parse_line(line_number, "row too short"))?;
                    if column == list_column {
                        indices.push(token.parse().map_err(|_| {
                            Error::parse_line(line_number, format!("invalid index {token:?}"))
                        })?);
                    }
                }
            }
        }
    }
    Ok(indices)
}

fn decode_binary(header: &PlyHeader, primary: &File, endianness: Endianness) -> Result<Mesh> {
    let mut reader = BinaryReader::new(&primary.content, endianness);
    reader.seek(header.data_start)?;

    let mut mesh: Option<Mesh> = None;
    let mut with_normals = false;
    let mut with_uvs = false;

    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                let layout = VertexLayout::from_element(element)?;
                let (mut m, n, t) = mesh_from_parts(primary, &layout);
                with_normals = n;
                with_uvs = t;
                let mut row = vec![0.0; element.properties.len()];
                for _ in 0..element.count {
                    for (slot, property) in row.iter_mut().zip(&element.properties) {
                        *slot = match property.kind {
                            PropertyKind::Scalar(scalar) => scalar.read(&mut reader)?,
                            PropertyKind::List(count_type, item_type) => {
                                let count = count_type.read(&mut reader)? as usize;
                                reader.skip(count * item_type.size())?;
                                0.0
                            }
                        };
                    }
                    layout.apply(&row, &mut m);
                }
                mesh = Some(m);
            }
            "face" => {
                let mesh = mesh
                    .as_mut()
                    .ok_or_else(|| Error::parse_line(1, "face element before vertex element"))?;
                let list = list_column(element)?;
                for _ in 0..element.count {
                    let mut indices = Vec::new();
                    for (column, property) in element.properties.iter().enumerate() {
                        match property.kind {
                            PropertyKind::Scalar(scalar) => {
                                scalar.read(&mut reader)?;
                            }
                            PropertyKind::List(count_type, item_type) => {
                                let count = count_type.read(&mut reader)? as usize;
                                if column == list {
                                    indices.reserve(count);
                                    for _ in 0..count {
                                        indices.push(item_type.read(&mut reader)? as u32);
                                    }
                                } else {
                                    reader.skip(count * item_type.size())?;
                                }
                            }
                        }
                    }
                    let offset = reader.position();
                    push_face(mesh, &indices, with_normals, with_uvs, 0)
                        .map_err(|_| Error::parse_at(offset as u64, "bad face index list"))?;
                }
            }
            _ => {
                // Unknown element: skip its exact byte span
                for _ in 0..element.count {
                    for property in &element.properties {
                        match property.kind {
                            PropertyKind::Scalar(scalar) => reader.skip(scalar.size())?,
                            PropertyKind::List(count_type, item_type) => {
                                let count = count_type.read(&mut reader)? as usize;
                                reader.skip(count * item_type.size())?;
                            }
                        }
                    }
                }
            }
        }
    }

    mesh.ok_or_else(|| Error::parse_line(1, "no vertex element"))
}
