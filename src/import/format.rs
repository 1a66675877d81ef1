//! Format registry and detection.
//!
//! Adding a format means registering its entry in [`FORMATS`] (extension
//! list plus content sniffer) and a decoder/encoder pair; nothing else in
//! the pipeline changes.

use crate::io::FileList;
use crate::util::{Error, Result};

/// Identifier of one supported file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatToken {
    Obj,
    Stl,
    Ply,
    Off,
    Gltf,
}

impl FormatToken {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Stl => "stl",
            Self::Ply => "ply",
            Self::Off => "off",
            Self::Gltf => "gltf",
        }
    }

    /// Parse a format name or extension.
    pub fn from_name(name: &str) -> Option<Self> {
        FORMATS
            .iter()
            .find(|spec| spec.extensions.contains(&name.to_ascii_lowercase().as_str()))
            .map(|spec| spec.token)
    }
}

/// One registry entry: extensions plus a content sniffer.
pub struct FormatSpec {
    pub token: FormatToken,
    pub extensions: &'static [&'static str],
    /// Magic-byte / leading-token heuristic over the file content.
    pub sniff: fn(&[u8]) -> bool,
}

/// The static format registry.
pub static FORMATS: &[FormatSpec] = &[
    FormatSpec { token: FormatToken::Obj, extensions: &["obj"], sniff: sniff_obj },
    FormatSpec { token: FormatToken::Stl, extensions: &["stl"], sniff: sniff_stl },
    FormatSpec { token: FormatToken::Ply, extensions: &["ply"], sniff: sniff_ply },
    FormatSpec { token: FormatToken::Off, extensions: &["off"], sniff: sniff_off },
    FormatSpec { token: FormatToken::Gltf, extensions: &["gltf", "glb"], sniff: sniff_gltf },
];

fn sniff_obj(content: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(&content[..content.len().min(4096)]) else {
        return false;
    };
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            None | Some("#") => continue,
            Some("v") | Some("vn") | Some("vt") | Some("f") | Some("mtllib") | Some("usemtl")
            | Some("o") | Some("g") => return true,
            _ => return false,
        }
    }
    false
}

fn sniff_stl(content: &[u8]) -> bool {
    // ASCII: leading `solid` keyword followed by a facet section or the
    // closing `endsolid` (empty solids are legal)
    if content.starts_with(b"solid") {
        let head = &content[..content.len().min(4096)];
        if let Ok(text) = std::str::from_utf8(head) {
            if text.contains("facet") || text.contains("endsolid") {
                return true;
            }
        }
        return false;
    }
    // Binary: 80-byte header + u32 triangle count + 50 bytes per triangle
    if content.len() >= 84 {
        let count = u32::from_le_bytes([content[80], content[81], content[82], content[83]]);
        return content.len() as u64 == 84 + count as u64 * 50;
    }
    false
}

fn sniff_ply(content: &[u8]) -> bool {
    content.starts_with(b"ply")
}

fn sniff_off(content: &[u8]) -> bool {
    content.starts_with(b"OFF") || content.starts_with(b"COFF")
}

fn sniff_gltf(content: &[u8]) -> bool {
    if content.starts_with(b"glTF") {
        return true;
    }
    let head = match std::str::from_utf8(&content[..content.len().min(4096)]) {
        Ok(t) => t,
        Err(_) => return false,
    };
    head.trim_start().starts_with('{') && head.contains("\"asset\"")
}

/// Detect the format of a file list.
///
/// An explicit hint always wins. Otherwise each file is examined in order:
/// the content sniff is preferred over the extension table when they
/// disagree and the sniff is unambiguous; an ambiguous sniff without a
/// matching extension fails fast with [`Error::AmbiguousFormat`].
pub fn detect_format(files: &FileList, hint: Option<FormatToken>) -> Result<FormatToken> {
    if let Some(token) = hint {
        return Ok(token);
    }

    let mut first_name = None;
    for file in files.iter() {
        if first_name.is_none() {
            first_name = Some(file.name.clone());
        }

        let ext = file.extension();
        let ext_token = FormatToken::from_name(&ext);
        let sniffed: Vec<FormatToken> = FORMATS
            .iter()
            .filter(|spec| (spec.sniff)(&file.content))
            .map(|spec| spec.token)
            .collect();

        match (ext_token, sniffed.as_slice()) {
            (_, [single]) => return Ok(*single),
            (Some(ext_token), multiple) if multiple.contains(&ext_token) => return Ok(ext_token),
            (Some(_), [_, _, ..]) => {
                return Err(Error::AmbiguousFormat(file.name.clone()));
            }
            (Some(ext_token), []) => return Ok(ext_token),
            (None, [_, _, ..]) => {
                return Err(Error::AmbiguousFormat(file.name.clone()));
            }
            (None, []) => continue,
        }
    }

    Err(Error::UnknownFormat(first_name.unwrap_or_else(|| "<empty file list>".into())))
}

/// Pick the primary file for a detected format: the first file whose
/// extension or content matches the token.
pub fn primary_file_name(files: &FileList, token: FormatToken) -> Result<String> {
    let spec = FORMATS
        .iter()
        .find(|spec| spec.token == token)
        .ok_or_else(|| Error::UnknownFormat(token.name().to_string()))?;

    for file in files.iter() {
        if spec.extensions.contains(&file.extension().as_str()) || (spec.sniff)(&file.content) {
            return Ok(file.name.clone());
        }
    }
    Err(Error::UnknownFormat(token.name().to_string()))
}
