//! Speculative entity state.
//!
//! A surrogate carries what an entity would look like if the commands
//! approved so far in the current pass had already been applied, without
//! touching the live scene.

use scenecheck_bounds::Obb;
use scenecheck_ir::{Command, CommandAction, Entity, EntityId, EntityKind};
use scenecheck_math::{vec3, AxisAngle, Point3, Transform, Vec3};

/// Local-space triangle list used for narrow-phase checks.
pub type Mesh = Vec<[[f64; 3]; 3]>;

/// Mutable proxy for one entity under evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySurrogate {
    entity_id: EntityId,
    kind: EntityKind,
    parent: Option<EntityId>,
    position: [f64; 3],
    rotation: AxisAngle,
    scale: [f64; 3],
    size: [f64; 3],
    minimum_extent: Option<[f64; 3]>,
    border: [f64; 3],
    mesh: Mesh,
    default_bounds: Obb,
    extended_bounds: Option<Obb>,
    enabled: bool,
}

impl EntitySurrogate {
    /// Snapshot an entity's current placement and bounds.
    pub fn from_entity(entity: &Entity) -> Self {
        let mut surrogate = Self {
            entity_id: entity.id,
            kind: entity.kind,
            parent: entity.parent,
            position: entity.position,
            rotation: entity.rotation,
            scale: entity.scale,
            size: entity.size,
            minimum_extent: entity.minimum_extent,
            border: entity.bounds_border,
            mesh: entity.mesh.clone(),
            default_bounds: Obb::new(Point3::origin(), Point3::origin(), Vec3::repeat(1.0)),
            extended_bounds: None,
            enabled: true,
        };
        surrogate.rebuild_bounds();
        surrogate
    }

    /// Apply the geometric effect of `command` on top of this state.
    ///
    /// Returns `false` when the command does not change placement (property
    /// edits, composites, or a command for another entity).
    pub fn apply(&mut self, command: &Command) -> bool {
        if command.entity_id() != Some(self.entity_id) {
            return false;
        }
        match &command.action {
            CommandAction::RemoveEntity { .. }
            | CommandAction::RemoveSegment { .. }
            | CommandAction::RemoveVertex { .. } => {
                self.enabled = false;
            }
            CommandAction::AddEntity { entity }
            | CommandAction::AddSegment { entity }
            | CommandAction::AddVertex { entity } => {
                *self = Self::from_entity(entity);
            }
            CommandAction::MoveEntity { end_position, .. } => {
                self.position = *end_position;
            }
            CommandAction::RotateEntity { end_rotation, .. } => {
                self.rotation = *end_rotation;
            }
            CommandAction::ScaleEntity {
                end_position,
                end_scale,
                ..
            } => {
                self.position = *end_position;
                self.scale = *end_scale;
                self.rebuild_bounds();
            }
            CommandAction::ReparentEntity {
                end_parent,
                end_position,
                ..
            } => {
                self.parent = *end_parent;
                self.position = *end_position;
            }
            CommandAction::ChangeProperty { .. } | CommandAction::Composite { .. } => {
                return false;
            }
        }
        true
    }

    fn rebuild_bounds(&mut self) {
        let half = vec3(self.size) * 0.5;
        let border = vec3(self.border);
        self.default_bounds =
            Obb::new(Point3::from(-half), Point3::from(half), vec3(self.scale)).with_border(border);

        self.extended_bounds = self.minimum_extent.and_then(|minimum| {
            let mut extended = [0.0; 3];
            let mut inflated = false;
            for i in 0..3 {
                let scaled = (self.size[i] * self.scale[i]).abs();
                extended[i] = if scaled < minimum[i] {
                    inflated = true;
                    minimum[i]
                } else {
                    scaled
                };
            }
            inflated.then(|| {
                let half = vec3(extended) * 0.5;
                Obb::new(Point3::from(-half), Point3::from(half), Vec3::repeat(1.0))
                    .with_border(border)
            })
        });
    }

    /// Entity this surrogate stands in for.
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Kind of the entity.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Speculative parent.
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Speculative position, relative to the parent.
    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// Speculative rotation, relative to the parent.
    pub fn rotation(&self) -> AxisAngle {
        self.rotation
    }

    /// Speculative scale. Applies to this entity's size only.
    pub fn scale(&self) -> [f64; 3] {
        self.scale
    }

    /// Local triangles, if the entity has a mesh.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Rigid placement relative to the parent.
    pub fn local_transform(&self) -> Transform {
        Transform::from_position_rotation(&self.position, &self.rotation)
    }

    /// Unplaced box from size, scale and border.
    pub fn default_bounds(&self) -> &Obb {
        &self.default_bounds
    }

    /// Unplaced box inflated to the minimum extent, if any axis needed it.
    pub fn extended_bounds(&self) -> Option<&Obb> {
        self.extended_bounds.as_ref()
    }

    /// The extended box when requested and present, else the default box.
    pub fn bounds(&self, extended: bool) -> &Obb {
        match (&self.extended_bounds, extended) {
            (Some(obb), true) => obb,
            _ => &self.default_bounds,
        }
    }

    /// Mesh triangles scaled into the entity's local frame.
    pub fn scaled_mesh(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        let scale = vec3(self.scale);
        self.mesh.iter().map(move |tri| {
            tri.map(|v| Point3::from(vec3(v).component_mul(&scale)))
        })
    }

    /// Whether the entity still takes part in collisions.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the surrogate.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Return a disabled copy.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Exact comparison against the live position.
    pub fn position_changed(&self, entity: &Entity) -> bool {
        self.position != entity.position
    }

    /// Exact comparison against the live rotation.
    pub fn rotation_changed(&self, entity: &Entity) -> bool {
        self.rotation != entity.rotation
    }

    /// Exact comparison against the live scale.
    pub fn scale_changed(&self, entity: &Entity) -> bool {
        self.scale != entity.scale
    }

    /// Whether the surrogate has a different parent than the live entity.
    pub fn parent_changed(&self, entity: &Entity) -> bool {
        self.parent != entity.parent
    }

    /// `[position, rotation, scale, parent]` change flags.
    pub fn params_changed(&self, entity: &Entity) -> [bool; 4] {
        [
            self.position_changed(entity),
            self.rotation_changed(entity),
            self.scale_changed(entity),
            self.parent_changed(entity),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scenecheck_ir::{PropertyKey, PropertyValue};

    fn crate_entity() -> Entity {
        Entity::new(7, EntityKind::Model, [2.0, 1.0, 0.5])
            .with_parent(1)
            .at([1.0, 0.0, 3.0])
    }

    #[test]
    fn test_fresh_surrogate_reports_no_change() {
        let entity = crate_entity();
        let s = EntitySurrogate::from_entity(&entity);
        assert_eq!(s.params_changed(&entity), [false; 4]);
        assert!(s.is_enabled());
    }

    #[test]
    fn test_default_bounds_from_size_and_scale() {
        let entity = crate_entity().scaled([2.0, 1.0, 1.0]);
        let s = EntitySurrogate::from_entity(&entity);
        let size = s.default_bounds().size();
        assert_relative_eq!(size.x, 4.0, epsilon = 1e-12);
        assert_relative_eq!(size.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(size.z, 0.5, epsilon = 1e-12);
        assert!(s.extended_bounds().is_none());
    }

    #[test]
    fn test_extended_bounds_inflate_thin_axis() {
        let entity = crate_entity().with_minimum_extent([1.0, 1.0, 1.0]);
        let s = EntitySurrogate::from_entity(&entity);
        let extended = s.extended_bounds().expect("z is below minimum");
        let size = extended.size();
        assert_relative_eq!(size.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(size.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(extended.center().z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(s.bounds(false).size().z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_move_and_scale() {
        let entity = crate_entity();
        let mut s = EntitySurrogate::from_entity(&entity);

        assert!(s.apply(&Command::move_entity(7, entity.position, [5.0, 0.0, 0.0])));
        assert_eq!(s.params_changed(&entity), [true, false, false, false]);

        assert!(s.apply(&Command::scale_entity(
            7,
            [5.0, 0.0, 0.0],
            [1.0; 3],
            [1.0, 3.0, 1.0]
        )));
        assert!(s.scale_changed(&entity));
        assert_relative_eq!(s.default_bounds().size().y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_ignores_other_entities_and_properties() {
        let entity = crate_entity();
        let mut s = EntitySurrogate::from_entity(&entity);
        assert!(!s.apply(&Command::move_entity(8, [0.0; 3], [1.0; 3])));
        assert!(!s.apply(&Command::change_property(
            7,
            PropertyKey::new("finish", "color"),
            PropertyValue::Text("oak".into()),
            PropertyValue::Text("ash".into()),
        )));
        assert_eq!(s.params_changed(&entity), [false; 4]);
    }

    #[test]
    fn test_remove_disables() {
        let entity = crate_entity();
        let mut s = EntitySurrogate::from_entity(&entity);
        assert!(s.apply(&Command::remove_entity(7)));
        assert!(!s.is_enabled());
    }

    #[test]
    fn test_exact_comparison() {
        let entity = crate_entity();
        let mut s = EntitySurrogate::from_entity(&entity);
        let nudged = [1.0 + f64::EPSILON * 2.0, 0.0, 3.0];
        s.apply(&Command::move_entity(7, entity.position, nudged));
        assert!(s.position_changed(&entity));
    }
}
