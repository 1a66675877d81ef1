//! Named, typed metadata attached to nodes and meshes.
//!
//! Property groups are carried through the pipeline untouched; geometry
//! code never interprets them.

/// A single typed value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Ratio in [0, 1], displayed as a percentage by consumers.
    Percent(f64),
}

/// One named property.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self { name: name.into(), value }
    }
}

/// Ordered collection of properties under one heading.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyGroup {
    pub name: String,
    properties: Vec<Property>,
}

impl PropertyGroup {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), properties: Vec::new() }
    }

    /// Append a property, keeping insertion order.
    pub fn add(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when the group holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Look up a property by name (first match).
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }
}
