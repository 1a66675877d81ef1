//! Import pipeline: format detection, decoder dispatch, diagnostics.

mod format;
mod gltf;
mod obj;
mod off;
mod ply;
mod stl;

pub use format::{detect_format, primary_file_name, FormatSpec, FormatToken, FORMATS};

use glam::{DQuat, DVec3};
use tracing::{debug, warn};

use crate::geom::Transformation;
use crate::io::{File, FileList};
use crate::model::{check_model, finalize_model, Color, FinalizeParams, Model};
use crate::util::{Error, Result};

/// Up axis of the incoming data. The normalized model is Z-up; Y-up input
/// is rotated into it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpVector {
    Y,
    #[default]
    Z,
}

/// Options recognized by every decoder.
#[derive(Clone, Debug)]
pub struct ImportSettings {
    /// Color of the default material created for unassigned triangles.
    pub default_color: Color,
    /// Whether the default material is created transparent.
    pub default_material_transparency: bool,
    /// Up axis of the source data.
    pub up_vector: UpVector,
    /// Scale multiplier applied to the whole scene.
    pub unit_scale: f64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default_color: Color::rgb(200, 200, 200),
            default_material_transparency: false,
            up_vector: UpVector::Z,
            unit_scale: 1.0,
        }
    }
}

/// Diagnostic severity. A fatal issue means the model was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Warning,
}

/// Classification of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueCode {
    FileAccess,
    FormatDetection,
    Parse,
    UnsupportedFeature,
    SiblingResource,
    MissingData,
    Integrity,
    Internal,
}

/// Source position of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Offset(u64),
    Line(usize),
}

/// One import diagnostic.
#[derive(Clone, Debug)]
pub struct ImportIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    pub position: Option<Position>,
}

impl ImportIssue {
    /// Non-fatal diagnostic without a position.
    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self { code, severity: Severity::Warning, message: message.into(), position: None }
    }

    /// Non-fatal diagnostic at a text line.
    pub fn warning_at_line(code: IssueCode, line: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            position: Some(Position::Line(line)),
        }
    }
}

/// Outcome of one import call. `model` is present iff no fatal issue
/// occurred.
#[derive(Debug, Default)]
pub struct ImportResult {
    pub model: Option<Model>,
    pub issues: Vec<ImportIssue>,
}

impl ImportResult {
    /// Record a non-fatal diagnostic.
    pub fn add_issue(&mut self, issue: ImportIssue) {
        self.issues.push(issue);
    }

    /// True when any recorded issue is fatal.
    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Fatal)
    }
}

/// Capability set of one format decoder.
pub(crate) trait Decoder {
    /// Format this decoder handles.
    fn token(&self) -> FormatToken;

    /// Decode the primary file (and any siblings it references) into a
    /// fresh model, appending non-fatal diagnostics to `result`.
    fn decode(
        &self,
        files: &FileList,
        primary: &File,
        settings: &ImportSettings,
        result: &mut ImportResult,
    ) -> Result<Model>;
}

fn decoder_for(token: FormatToken) -> Box<dyn Decoder> {
    match token {
        FormatToken::Obj => Box::new(obj::ObjDecoder),
        FormatToken::Stl => Box::new(stl::StlDecoder),
        FormatToken::Ply => Box::new(ply::PlyDecoder),
        FormatToken::Off => Box::new(off::OffDecoder),
        FormatToken::Gltf => Box::new(gltf::GltfDecoder),
    }
}

/// Import a file list into a finalized, validated model.
pub fn import(files: &FileList, hint: Option<FormatToken>, settings: &ImportSettings) -> ImportResult {
    let mut result = ImportResult::default();

    let token = match detect_format(files, hint) {
        Ok(token) => token,
        Err(err) => {
            result.issues.push(issue_from_error(&err));
            return result;
        }
    };
    debug!(format = token.name(), "format detected");

    let primary_name = match primary_file_name(files, token) {
        Ok(name) => name,
        Err(err) => {
            result.issues.push(issue_from_error(&err));
            return result;
        }
    };
    let primary = match files.get(&primary_name) {
        Ok(file) => file,
        Err(err) => {
            result.issues.push(issue_from_error(&err));
            return result;
        }
    };

    let decoder = decoder_for(token);
    let mut model = match decoder.decode(files, primary, settings, &mut result) {
        Ok(model) => model,
        Err(err) => {
            warn!(format = token.name(), error = %err, "decode failed");
            result.issues.push(issue_from_error(&err));
            return result;
        }
    };

    apply_settings_transform(&mut model, settings);

    let finalize_params = FinalizeParams {
        default_color: settings.default_color,
        default_material_transparent: settings.default_material_transparency,
    };
    finalize_model(&mut model, &finalize_params);

    let integrity = check_model(&model);
    if !integrity.is_empty() {
        for issue in integrity {
            result.issues.push(ImportIssue {
                code: IssueCode::Integrity,
                severity: Severity::Fatal,
                message: issue.to_string(),
                position: None,
            });
        }
        return result;
    }

    if model.is_empty() {
        result.issues.push(ImportIssue {
            code: IssueCode::MissingData,
            severity: Severity::Fatal,
            message: "imported model contains no geometry".to_string(),
            position: None,
        });
        return result;
    }

    result.model = Some(model);
    result
}

/// Fold the up-axis and unit-scale settings into the root transform.
fn apply_settings_transform(model: &mut Model, settings: &ImportSettings) {
    let rotation = match settings.up_vector {
        UpVector::Z => DQuat::IDENTITY,
        // Y-up to Z-up: rotate +90 degrees around X
        UpVector::Y => DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2),
    };
    if rotation == DQuat::IDENTITY && settings.unit_scale == 1.0 {
        return;
    }
    let root = model.root_id();
    let current = model.node(root).transform;
    model.node_mut(root).transform = Transformation::new(
        rotation * current.rotation,
        rotation * (current.translation * settings.unit_scale),
        current.scale * DVec3::splat(settings.unit_scale),
    );
}

/// Map a fatal error to its diagnostic record.
fn issue_from_error(err: &Error) -> ImportIssue {
    let (code, position) = match err {
        Error::FileNotFound(_) | Error::BufferNotFound(_) | Error::Io(_) => (IssueCode::FileAccess, None),
        Error::UnknownFormat(_) | Error::AmbiguousFormat(_) => (IssueCode::FormatDetection, None),
        Error::UnexpectedEof(offset) => (IssueCode::Parse, Some(Position::Offset(*offset))),
        Error::ParseBinary { offset, .. } => (IssueCode::Parse, Some(Position::Offset(*offset))),
        Error::ParseText { line, .. } => (IssueCode::Parse, Some(Position::Line(*line))),
        Error::Unresolvable { .. } | Error::SiblingResource { .. } => (IssueCode::SiblingResource, None),
        Error::ReferentialIntegrity(_) => (IssueCode::Integrity, None),
        Error::Utf8(_) | Error::Json(_) => (IssueCode::Parse, None),
        _ => (IssueCode::Internal, None),
    };
    ImportIssue {
        code,
        severity: Severity::Fatal,
        message: err.to_string(),
        position,
    }
}
