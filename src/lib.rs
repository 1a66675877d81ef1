//! meshport: a 3D model import/export pipeline.
//!
//! Triangle-mesh interchange between OBJ, STL, PLY, OFF and glTF with a
//! normalized in-memory scene model in between. The pipeline is
//!
//! 1. [`io::FileList`]: the primary file plus any siblings it references
//!    (MTL libraries, glTF buffers, textures), memory- or disk-backed.
//! 2. [`import::import`]: format detection, decoding, finalization
//!    (normals, default material, world transforms) and validation.
//! 3. [`model::Model`]: node hierarchy, shared meshes, materials.
//! 4. [`export::export`] or [`convert::convert_model_to_render_tree`].
//!
//! # Example
//!
//! ```no_run
//! use meshport::io::FileList;
//! use meshport::import::{import, ImportSettings};
//!
//! # fn main() -> meshport::Result<()> {
//! let files = FileList::from_disk(&["bracket.obj"])?;
//! let result = import(&files, None, &ImportSettings::default());
//! for issue in &result.issues {
//!     eprintln!("{:?}: {}", issue.severity, issue.message);
//! }
//! if let Some(model) = result.model {
//!     println!("{} meshes", model.meshes().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod export;
pub mod geom;
pub mod import;
pub mod io;
pub mod model;
pub mod runner;
pub mod util;

pub use util::{Error, Result};

/// Commonly used types.
pub mod prelude {
    pub use crate::convert::{convert_model_to_render_tree, ConversionParams, RenderTree};
    pub use crate::export::{export, ExportSettings, ExportedFile, FileVariant};
    pub use crate::geom::{Octree, Transformation};
    pub use crate::import::{
        detect_format, import, FormatToken, ImportResult, ImportSettings, UpVector,
    };
    pub use crate::io::{File, FileList};
    pub use crate::model::{
        check_model, finalize_model, Color, FinalizeParams, Material, Mesh, Model, Triangle,
    };
    pub use crate::util::{BBox3, Error, Result};
}
