//! Materials: tagged Phong/Physical variants with structural equality.

use super::color::Color;

/// Reference to a texture image, resolved from a sibling file during decode.
///
/// The decoded bytes travel with the reference so exporters can emit the
/// image again without re-reading the source list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureMap {
    /// Name as referenced by the source format.
    pub name: String,
    /// Raw image bytes, when the sibling was found.
    pub content: Option<Vec<u8>>,
}

impl TextureMap {
    /// Reference without resolved content.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), content: None }
    }
}

/// Fields shared by both material variants.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialBase {
    pub name: String,
    pub color: Color,
    /// Opacity in [0, 1]; meaningful when `transparent` is set.
    pub opacity: f64,
    pub transparent: bool,
    pub diffuse_map: Option<TextureMap>,
    pub normal_map: Option<TextureMap>,
}

impl MaterialBase {
    /// Opaque single-color base.
    pub fn colored(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            opacity: 1.0,
            transparent: false,
            diffuse_map: None,
            normal_map: None,
        }
    }
}

/// A surface material. Structural equality (`PartialEq`) is what the
/// default-material deduplication in finalize relies on.
#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    Phong {
        base: MaterialBase,
        ambient: Color,
        specular: Color,
        shininess: f64,
    },
    Physical {
        base: MaterialBase,
        metalness: f64,
        roughness: f64,
    },
}

impl Material {
    /// Phong material with defaults derived from a single color.
    pub fn phong(name: impl Into<String>, color: Color) -> Self {
        Self::Phong {
            base: MaterialBase::colored(name, color),
            ambient: Color::BLACK,
            specular: Color::BLACK,
            shininess: 0.0,
        }
    }

    /// Physical (PBR) material with defaults derived from a single color.
    pub fn physical(name: impl Into<String>, color: Color) -> Self {
        Self::Physical {
            base: MaterialBase::colored(name, color),
            metalness: 0.0,
            roughness: 1.0,
        }
    }

    /// Shared fields.
    pub fn base(&self) -> &MaterialBase {
        match self {
            Self::Phong { base, .. } | Self::Physical { base, .. } => base,
        }
    }

    /// Shared fields, mutable.
    pub fn base_mut(&mut self) -> &mut MaterialBase {
        match self {
            Self::Phong { base, .. } | Self::Physical { base, .. } => base,
        }
    }

    /// Material name.
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Base color.
    pub fn color(&self) -> Color {
        self.base().color
    }

    /// Whether the material renders transparently.
    pub fn is_transparent(&self) -> bool {
        self.base().transparent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Material::phong("default", Color::rgb(200, 200, 200));
        let b = Material::phong("default", Color::rgb(200, 200, 200));
        let c = Material::phong("default", Color::rgb(100, 100, 100));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Material::physical("default", Color::rgb(200, 200, 200)));
    }

    #[test]
    fn test_base_access() {
        let mut m = Material::physical("metal", Color::WHITE);
        m.base_mut().transparent = true;
        m.base_mut().opacity = 0.5;
        assert!(m.is_transparent());
        assert_eq!(m.name(), "metal");
    }
}
