//! Named byte-buffer collection feeding the import pipeline.
//!
//! Importers never touch the filesystem directly: every buffer they read,
//! including sibling resources referenced by name from inside another file,
//! comes through a [`FileList`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::util::{Error, Result};

/// Where a file's bytes came from. Informational only; the pipeline treats
/// all sources identically once the bytes are in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSource {
    Memory,
    Disk(PathBuf),
    Url(String),
}

/// One named byte buffer.
#[derive(Clone, Debug)]
pub struct File {
    /// Name as referenced by other files, with `/` separators.
    pub name: String,
    /// Raw content.
    pub content: Vec<u8>,
    /// Origin of the content.
    pub source: FileSource,
}

impl File {
    /// Create an in-memory file.
    pub fn from_memory(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self { name: normalize_name(&name.into()), content, source: FileSource::Memory }
    }

    /// Lowercased extension without the dot, empty if none.
    pub fn extension(&self) -> String {
        file_extension(&self.name)
    }

    /// Content interpreted as UTF-8 text.
    pub fn as_text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.content)?)
    }
}

/// Ordered collection of files with unique names.
pub struct FileList {
    files: Vec<File>,
    /// Some formats reference siblings case-insensitively.
    case_sensitive: bool,
}

impl FileList {
    /// Create an empty, case-sensitive list.
    pub fn new() -> Self {
        Self { files: Vec::new(), case_sensitive: true }
    }

    /// Set reference case sensitivity (builder style).
    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Load the given paths from disk into a list.
    pub fn from_disk<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut list = Self::new();
        for path in paths {
            let path = path.as_ref();
            let content = fs::read(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FileNotFound(path.to_path_buf())
                } else {
                    Error::Io(e)
                }
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            list.add(File {
                name: normalize_name(&name),
                content,
                source: FileSource::Disk(path.to_path_buf()),
            });
        }
        Ok(list)
    }

    /// Add a file; an existing entry with the same name is replaced in place.
    pub fn add(&mut self, file: File) {
        let name = normalize_name(&file.name);
        let case_sensitive = self.case_sensitive;
        let matches = |existing: &str| {
            if case_sensitive {
                existing == name
            } else {
                existing.eq_ignore_ascii_case(&name)
            }
        };
        if let Some(existing) = self.files.iter_mut().find(|f| matches(&f.name)) {
            *existing = File { name, ..file };
        } else {
            self.files.push(File { name, ..file });
        }
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when the list holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over the files in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.iter()
    }

    /// Look up a file by name.
    pub fn get(&self, name: &str) -> Result<&File> {
        let name = normalize_name(name);
        self.files
            .iter()
            .find(|f| self.names_match(&f.name, &name))
            .ok_or_else(|| Error::BufferNotFound(name))
    }

    /// Resolve a relative reference against the directory of `base`.
    ///
    /// Returns the stored name of the matching entry. Falls back to a bare
    /// file-name match for lists that were flattened on ingest.
    pub fn resolve_sibling(&self, base: &str, relative: &str) -> Result<String> {
        let relative = normalize_name(relative);
        let base = normalize_name(base);

        let dir = match base.rfind('/') {
            Some(idx) => &base[..=idx],
            None => "",
        };
        let candidate = collapse_dots(&format!("{dir}{relative}"));
        if let Ok(f) = self.get(&candidate) {
            return Ok(f.name.clone());
        }

        let bare = relative.rsplit('/').next().unwrap_or(&relative);
        if let Ok(f) = self.get(bare) {
            return Ok(f.name.clone());
        }

        Err(Error::Unresolvable { base, relative })
    }

    fn names_match(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

impl Default for FileList {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize separators to `/` and strip a leading `./`.
fn normalize_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    name.strip_prefix("./").unwrap_or(&name).to_string()
}

/// Resolve `.` and `..` components in a normalized name.
fn collapse_dots(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Lowercased extension of a file name, without the dot.
pub fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(file_extension("model.OBJ"), "obj");
        assert_eq!(file_extension("dir/scene.gltf"), "gltf");
        assert_eq!(file_extension("noext"), "");
    }

    #[test]
    fn test_get_and_replace() {
        let mut list = FileList::new();
        list.add(File::from_memory("a.obj", vec![1]));
        list.add(File::from_memory("a.obj", vec![2]));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("a.obj").unwrap().content, vec![2]);
        assert!(matches!(list.get("b.obj"), Err(Error::BufferNotFound(_))));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut list = FileList::new().with_case_sensitivity(false);
        list.add(File::from_memory("Texture.PNG", vec![]));
        assert!(list.get("texture.png").is_ok());
    }

    #[test]
    fn test_resolve_sibling() {
        let mut list = FileList::new();
        list.add(File::from_memory("models/scene.gltf", vec![]));
        list.add(File::from_memory("models/scene.bin", vec![]));
        list.add(File::from_memory("flat.bin", vec![]));

        let name = list.resolve_sibling("models/scene.gltf", "scene.bin").unwrap();
        assert_eq!(name, "models/scene.bin");

        // Backslash references and ./ prefixes normalize away
        let name = list.resolve_sibling("models/scene.gltf", ".\\scene.bin").unwrap();
        assert_eq!(name, "models/scene.bin");

        // Bare-name fallback for flattened lists
        let name = list.resolve_sibling("models/scene.gltf", "sub/flat.bin").unwrap();
        assert_eq!(name, "flat.bin");

        assert!(list.resolve_sibling("models/scene.gltf", "missing.bin").is_err());
    }

    #[test]
    fn test_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.stl");
        fs::write(&path, b"solid cube\nendsolid cube\n").unwrap();

        let list = FileList::from_disk(&[&path]).unwrap();
        assert_eq!(list.len(), 1);
        let f = list.get("cube.stl").unwrap();
        assert_eq!(f.extension(), "stl");
        assert!(matches!(f.source, FileSource::Disk(_)));
    }
}
