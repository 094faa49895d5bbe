//! Reference in-memory scene.
//!
//! Holds entities by id, keeps parent/child links consistent and applies
//! validated commands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::{Command, CommandAction, Entity, EntityId};

/// Errors from applying commands to a [`Scene`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// The command references an entity that is not in the scene.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An add command reuses an existing id.
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityId),

    /// Reparenting would make an entity its own ancestor.
    #[error("reparenting {entity} under {parent} would create a cycle")]
    Cycle {
        /// Entity being moved.
        entity: EntityId,
        /// Requested parent.
        parent: EntityId,
    },
}

/// A flat entity store with parent links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// All entities, keyed by id.
    pub entities: BTreeMap<EntityId, Entity>,
    /// The zone edits currently happen in; `None` means the whole scene.
    #[serde(default)]
    pub active_zone: Option<EntityId>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Look up an entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        self.entities
            .get_mut(&id)
            .ok_or(SceneError::EntityNotFound(id))
    }

    /// Insert an entity and link it into its parent's child list.
    pub fn insert(&mut self, entity: Entity) -> Result<(), SceneError> {
        if self.entities.contains_key(&entity.id) {
            return Err(SceneError::DuplicateEntity(entity.id));
        }
        if let Some(parent) = entity.parent {
            let parent = self.get_mut(parent)?;
            if !parent.children.contains(&entity.id) {
                parent.children.push(entity.id);
            }
        }
        self.entities.insert(entity.id, entity);
        Ok(())
    }

    /// Remove an entity.
    ///
    /// Its children are handed to its parent with their positions unchanged,
    /// so removing a whole subtree takes one remove per entity.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity, SceneError> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(SceneError::EntityNotFound(id))?;
        if let Some(parent) = entity.parent.and_then(|p| self.entities.get_mut(&p)) {
            parent.children.retain(|&c| c != id);
            parent.children.extend(entity.children.iter().copied());
        }
        for child in &entity.children {
            if let Some(child) = self.entities.get_mut(child) {
                child.parent = entity.parent;
            }
        }
        if self.active_zone == Some(id) {
            self.active_zone = None;
        }
        Ok(entity)
    }

    /// Whether `ancestor` is `id` itself or above it in the hierarchy.
    pub fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.entities.len() {
                return false;
            }
            current = self.entities.get(&c).and_then(|e| e.parent);
        }
        false
    }

    /// Apply a command. Composites apply their members in order.
    pub fn apply(&mut self, command: &Command) -> Result<(), SceneError> {
        match &command.action {
            CommandAction::AddEntity { entity }
            | CommandAction::AddSegment { entity }
            | CommandAction::AddVertex { entity } => self.insert(entity.clone()),
            CommandAction::RemoveEntity { entity_id }
            | CommandAction::RemoveSegment { entity_id }
            | CommandAction::RemoveVertex { entity_id } => self.remove(*entity_id).map(|_| ()),
            CommandAction::MoveEntity {
                entity_id,
                end_position,
                ..
            } => {
                self.get_mut(*entity_id)?.position = *end_position;
                Ok(())
            }
            CommandAction::RotateEntity {
                entity_id,
                end_rotation,
                ..
            } => {
                self.get_mut(*entity_id)?.rotation = *end_rotation;
                Ok(())
            }
            CommandAction::ScaleEntity {
                entity_id,
                end_position,
                end_scale,
                ..
            } => {
                let entity = self.get_mut(*entity_id)?;
                entity.position = *end_position;
                entity.scale = *end_scale;
                Ok(())
            }
            CommandAction::ReparentEntity {
                entity_id,
                end_parent,
                end_position,
                ..
            } => self.reparent(*entity_id, *end_parent, *end_position),
            CommandAction::ChangeProperty {
                entity_id,
                key,
                end_value,
                ..
            } => {
                self.get_mut(*entity_id)?.set_property(
                    key.sheet.clone(),
                    key.name.clone(),
                    end_value.clone(),
                );
                Ok(())
            }
            CommandAction::Composite { commands, .. } => {
                for c in commands {
                    self.apply(c)?;
                }
                Ok(())
            }
        }
    }

    fn reparent(
        &mut self,
        id: EntityId,
        parent: Option<EntityId>,
        position: [f64; 3],
    ) -> Result<(), SceneError> {
        if let Some(p) = parent {
            if !self.entities.contains_key(&p) {
                return Err(SceneError::EntityNotFound(p));
            }
            if self.is_ancestor(id, p) {
                return Err(SceneError::Cycle {
                    entity: id,
                    parent: p,
                });
            }
        }
        let old_parent = self.get_mut(id)?.parent;
        if old_parent == parent {
            self.get_mut(id)?.position = position;
            return Ok(());
        }
        if let Some(old) = old_parent.and_then(|p| self.entities.get_mut(&p)) {
            old.children.retain(|&c| c != id);
        }
        if let Some(p) = parent {
            self.get_mut(p)?.children.push(id);
        }
        let entity = self.get_mut(id)?;
        entity.parent = parent;
        entity.position = position;
        Ok(())
    }
}
