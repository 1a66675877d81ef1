//! Export pipeline: walks finalized instances, bakes world transforms and
//! unit conversion into vertex data, then hands flattened meshes to a
//! format encoder. Output is atomic: any error discards all partial files.

mod gltf;
mod obj;
mod off;
mod ply;
mod stl;

use glam::{DMat4, DQuat, DVec2, DVec3};
use tracing::debug;

use crate::import::{FormatToken, UpVector};
use crate::model::{Color, Model, Triangle};
use crate::util::{Error, Result};

/// Output flavor for formats that support both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileVariant {
    #[default]
    Binary,
    Text,
}

/// Options recognized by every encoder.
#[derive(Clone, Debug)]
pub struct ExportSettings {
    /// Up axis of the produced file.
    pub up_vector: UpVector,
    /// Scale multiplier applied to all coordinates.
    pub unit_scale: f64,
    pub variant: FileVariant,
    /// Base name of the produced files, without extension.
    pub base_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            up_vector: UpVector::Z,
            unit_scale: 1.0,
            variant: FileVariant::Binary,
            base_name: "model".to_string(),
        }
    }
}

/// One produced file. Siblings (an OBJ's MTL) follow the primary file.
#[derive(Clone, Debug)]
pub struct ExportedFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// A mesh instance with its transform baked in, ready for serialization.
pub(crate) struct FlatMesh {
    pub name: String,
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub uvs: Vec<DVec2>,
    pub colors: Vec<Color>,
    pub triangles: Vec<Triangle>,
}

pub(crate) trait Encoder {
    fn token(&self) -> FormatToken;

    fn encode(
        &self,
        model: &Model,
        meshes: &[FlatMesh],
        settings: &ExportSettings,
    ) -> Result<Vec<ExportedFile>>;
}

fn encoder_for(token: FormatToken) -> Box<dyn Encoder> {
    match token {
        FormatToken::Obj => Box::new(obj::ObjEncoder),
        FormatToken::Stl => Box::new(stl::StlEncoder),
        FormatToken::Ply => Box::new(ply::PlyEncoder),
        FormatToken::Off => Box::new(off::OffEncoder),
        FormatToken::Gltf => Box::new(gltf::GltfEncoder),
    }
}

/// Export a model to the given format.
pub fn export(model: &Model, token: FormatToken, settings: &ExportSettings) -> Result<Vec<ExportedFile>> {
    if model.is_empty() {
        return Err(Error::ExportFailed("model has no geometry".to_string()));
    }
    let meshes = flatten_model(model, settings);
    let encoder = encoder_for(token);
    let files = encoder.encode(model, &meshes, settings)?;
    debug!(format = token.name(), files = files.len(), "export finished");
    Ok(files)
}

/// Bake every instance into world space, applying unit scale and the
/// target up axis.
fn flatten_model(model: &Model, settings: &ExportSettings) -> Vec<FlatMesh> {
    let axis = match settings.up_vector {
        UpVector::Z => DMat4::IDENTITY,
        // Z-up internal data into a Y-up file: rotate -90 degrees around X
        UpVector::Y => DMat4::from_quat(DQuat::from_rotation_x(-std::f64::consts::FRAC_PI_2)),
    };
    let scale = DMat4::from_scale(DVec3::splat(settings.unit_scale));

    let mut out = Vec::with_capacity(model.instances().len());
    for instance in model.instances() {
        let world = instance.world_transform.unwrap_or(DMat4::IDENTITY);
        let matrix = scale * axis * world;
        // Rotation-ish part for normals; renormalized per vector below
        let normal_matrix = matrix.inverse().transpose();

        let mesh = model.mesh(instance.mesh);
        let positions = mesh
            .positions
            .iter()
            .map(|&p| matrix.transform_point3(p))
            .collect();
        let normals = mesh
            .normals
            .iter()
            .map(|&n| normal_matrix.transform_vector3(n).normalize_or_zero())
            .collect();

        out.push(FlatMesh {
            name: mesh.name.clone(),
            positions,
            normals,
            uvs: mesh.uvs.clone(),
            colors: mesh.colors.clone(),
            triangles: mesh.triangles.clone(),
        });
    }
    out
}
