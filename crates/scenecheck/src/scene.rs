//! Read-only view of the live scene.

use scenecheck_ir::{Entity, EntityId, Scene};

use crate::error::ValidationError;

/// What the validation pipeline needs from the host scene.
///
/// Validation never writes through this trait; approved commands are
/// handed back to the caller to apply.
pub trait SceneAccess {
    /// Look up an entity.
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    /// Ids of every entity in the scene.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// The zone edits are confined to, if any.
    fn active_zone(&self) -> Option<EntityId>;

    /// Look up an entity that must exist.
    fn require(&self, id: EntityId) -> Result<&Entity, ValidationError> {
        self.entity(id).ok_or(ValidationError::EntityNotFound(id))
    }
}

impl SceneAccess for Scene {
    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.get(id)
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    fn active_zone(&self) -> Option<EntityId> {
        self.active_zone
    }
}
