//! Shared data model for the scenecheck validation engine.
//!
//! Entities, property values and the commands that edit them. The model is
//! purely declarative: [`Scene`] is a reference in-memory implementation that
//! can apply commands, but validation itself lives in the `scenecheck`
//! crate and only reads entities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod command;
mod scene;

pub use command::{next_command_id, Command, CommandAction, CommandId, CommandKind, PropertyKey};
pub use scene::{Scene, SceneError};

/// Unique identifier for an entity in the scene.
pub type EntityId = u64;

/// Identity axis-angle rotation `[x, y, z, angle]`.
pub const NO_ROTATION: [f64; 4] = [0.0, 1.0, 0.0, 0.0];

/// What an entity is, as far as rules care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A placed catalog item (primitive, fence panel, appliance...).
    #[default]
    Model,
    /// A surface other entities are placed on (floor, wall). Never a
    /// collision target.
    Zone,
    /// A wall or fence segment between two vertices.
    Segment,
    /// An end point of segments.
    Vertex,
}

/// Typed value of a named entity property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Free text.
    Text(String),
    /// Three-component vector.
    Vector([f64; 3]),
}

impl PropertyValue {
    /// Numeric view of the value, if it has one.
    ///
    /// Text is parsed; booleans and vectors are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            PropertyValue::Bool(_) | PropertyValue::Vector(_) => None,
        }
    }
}

/// A scene entity with its transform, declared size and properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Entity category.
    #[serde(default)]
    pub kind: EntityKind,
    /// Parent entity; positions are relative to it.
    #[serde(default)]
    pub parent: Option<EntityId>,
    /// Child entities, in insertion order.
    #[serde(default)]
    pub children: Vec<EntityId>,
    /// Position relative to the parent.
    #[serde(default)]
    pub position: [f64; 3],
    /// Axis-angle rotation `[x, y, z, angle]` relative to the parent.
    #[serde(default = "default_rotation")]
    pub rotation: [f64; 4],
    /// Per-axis scale applied to `size`.
    #[serde(default = "default_scale")]
    pub scale: [f64; 3],
    /// Unscaled size, centered on the entity origin.
    pub size: [f64; 3],
    /// Smallest extent the entity may occupy along each axis for collision
    /// purposes. Thin items are inflated to this size in extended bounds.
    #[serde(default)]
    pub minimum_extent: Option<[f64; 3]>,
    /// Border added to each face of the bounds.
    #[serde(default)]
    pub bounds_border: [f64; 3],
    /// Property sheets: sheet name to property name to value.
    #[serde(default)]
    pub properties: BTreeMap<String, BTreeMap<String, PropertyValue>>,
    /// Optional local-space triangles refining the box for collisions.
    #[serde(default)]
    pub mesh: Vec<[[f64; 3]; 3]>,
}

fn default_rotation() -> [f64; 4] {
    NO_ROTATION
}

fn default_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

impl Entity {
    /// Create an entity of `kind` with the given size at the origin.
    pub fn new(id: EntityId, kind: EntityKind, size: [f64; 3]) -> Self {
        Self {
            id,
            name: String::new(),
            kind,
            parent: None,
            children: Vec::new(),
            position: [0.0; 3],
            rotation: NO_ROTATION,
            scale: default_scale(),
            size,
            minimum_extent: None,
            bounds_border: [0.0; 3],
            properties: BTreeMap::new(),
            mesh: Vec::new(),
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the position.
    pub fn at(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self
    }

    /// Set the rotation.
    pub fn rotated(mut self, rotation: [f64; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the scale.
    pub fn scaled(mut self, scale: [f64; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Set the minimum collision extent.
    pub fn with_minimum_extent(mut self, extent: [f64; 3]) -> Self {
        self.minimum_extent = Some(extent);
        self
    }

    /// Set a property value.
    pub fn with_property(
        mut self,
        sheet: impl Into<String>,
        name: impl Into<String>,
        value: PropertyValue,
    ) -> Self {
        self.set_property(sheet, name, value);
        self
    }

    /// Look up a property value.
    pub fn property(&self, sheet: &str, name: &str) -> Option<&PropertyValue> {
        self.properties.get(sheet).and_then(|s| s.get(name))
    }

    /// Set a property value, creating the sheet if needed.
    pub fn set_property(
        &mut self,
        sheet: impl Into<String>,
        name: impl Into<String>,
        value: PropertyValue,
    ) {
        self.properties
            .entry(sheet.into())
            .or_default()
            .insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lookup() {
        let e = Entity::new(1, EntityKind::Model, [1.0, 1.0, 1.0]).with_property(
            "dimensions",
            "height",
            PropertyValue::Float(2.5),
        );
        assert_eq!(
            e.property("dimensions", "height"),
            Some(&PropertyValue::Float(2.5))
        );
        assert_eq!(e.property("dimensions", "width"), None);
        assert_eq!(e.property("other", "height"), None);
    }

    #[test]
    fn numeric_property_values() {
        assert_eq!(PropertyValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(PropertyValue::Text(" 1.5 ".into()).as_f64(), Some(1.5));
        assert_eq!(PropertyValue::Text("tall".into()).as_f64(), None);
        assert_eq!(PropertyValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn entity_defaults_from_json() {
        let e: Entity = serde_json::from_str(r#"{"id": 7, "size": [1.0, 2.0, 3.0]}"#).unwrap();
        assert_eq!(e.kind, EntityKind::Model);
        assert_eq!(e.scale, [1.0, 1.0, 1.0]);
        assert_eq!(e.rotation, NO_ROTATION);
        assert!(e.children.is_empty());
    }
}
