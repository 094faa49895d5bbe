//! Scene edit commands.
//!
//! Every edit carries its start and end values so it can be reverted in
//! place with [`Command::reset_to_start`].

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Entity, EntityId, PropertyValue};

/// Unique identifier for a command instance.
pub type CommandId = u64;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh command id.
pub fn next_command_id() -> CommandId {
    NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed)
}

// keeps later allocations above ids read from a replayed file
fn reserve_command_id(id: CommandId) {
    NEXT_COMMAND_ID.fetch_max(id.saturating_add(1), Ordering::Relaxed);
}

fn deserialize_command_id<'de, D>(deserializer: D) -> Result<CommandId, D::Error>
where
    D: Deserializer<'de>,
{
    let id = CommandId::deserialize(deserializer)?;
    reserve_command_id(id);
    Ok(id)
}

/// Address of a property: the sheet it lives on and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyKey {
    /// Property sheet name.
    pub sheet: String,
    /// Property name within the sheet.
    pub name: String,
}

impl PropertyKey {
    /// Create a key.
    pub fn new(sheet: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            name: name.into(),
        }
    }
}

/// The edit a command performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandAction {
    /// Insert an entity under its declared parent.
    AddEntity {
        /// The entity to insert.
        entity: Entity,
    },
    /// Remove an entity and detach it from its parent.
    RemoveEntity {
        /// The entity to remove.
        entity_id: EntityId,
    },
    /// Insert a wall / fence segment.
    AddSegment {
        /// The segment entity.
        entity: Entity,
    },
    /// Remove a segment.
    RemoveSegment {
        /// The segment to remove.
        entity_id: EntityId,
    },
    /// Insert a segment end point.
    AddVertex {
        /// The vertex entity.
        entity: Entity,
    },
    /// Remove a segment end point.
    RemoveVertex {
        /// The vertex to remove.
        entity_id: EntityId,
    },
    /// Translate an entity.
    MoveEntity {
        /// The entity to move.
        entity_id: EntityId,
        /// Position before the edit.
        start_position: [f64; 3],
        /// Position after the edit.
        end_position: [f64; 3],
    },
    /// Rotate an entity.
    RotateEntity {
        /// The entity to rotate.
        entity_id: EntityId,
        /// Rotation before the edit.
        start_rotation: [f64; 4],
        /// Rotation after the edit.
        end_rotation: [f64; 4],
    },
    /// Scale an entity. Scaling about an edge also shifts the position.
    ScaleEntity {
        /// The entity to scale.
        entity_id: EntityId,
        /// Position before the edit.
        start_position: [f64; 3],
        /// Position after the edit.
        end_position: [f64; 3],
        /// Scale before the edit.
        start_scale: [f64; 3],
        /// Scale after the edit.
        end_scale: [f64; 3],
    },
    /// Move an entity under a different parent.
    ReparentEntity {
        /// The entity to reparent.
        entity_id: EntityId,
        /// Parent before the edit.
        start_parent: Option<EntityId>,
        /// Parent after the edit.
        end_parent: Option<EntityId>,
        /// Position relative to the old parent.
        start_position: [f64; 3],
        /// Position relative to the new parent.
        end_position: [f64; 3],
    },
    /// Change a named property.
    ChangeProperty {
        /// The entity owning the property.
        entity_id: EntityId,
        /// Which property.
        key: PropertyKey,
        /// Value before the edit.
        start_value: PropertyValue,
        /// Value after the edit.
        end_value: PropertyValue,
    },
    /// Several commands executed as one edit.
    Composite {
        /// Label for logs and undo history.
        #[serde(default)]
        description: String,
        /// Member commands, in execution order.
        commands: Vec<Command>,
    },
}

/// Runtime type of a command, used to route it to a rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// [`CommandAction::AddEntity`]
    AddEntity,
    /// [`CommandAction::RemoveEntity`]
    RemoveEntity,
    /// [`CommandAction::AddSegment`]
    AddSegment,
    /// [`CommandAction::RemoveSegment`]
    RemoveSegment,
    /// [`CommandAction::AddVertex`]
    AddVertex,
    /// [`CommandAction::RemoveVertex`]
    RemoveVertex,
    /// [`CommandAction::MoveEntity`]
    MoveEntity,
    /// [`CommandAction::RotateEntity`]
    RotateEntity,
    /// [`CommandAction::ScaleEntity`]
    ScaleEntity,
    /// [`CommandAction::ReparentEntity`]
    ReparentEntity,
    /// [`CommandAction::ChangeProperty`]
    ChangeProperty,
    /// [`CommandAction::Composite`]
    Composite,
}

impl CommandKind {
    /// All kinds, in declaration order.
    pub const ALL: [CommandKind; 12] = [
        CommandKind::AddEntity,
        CommandKind::RemoveEntity,
        CommandKind::AddSegment,
        CommandKind::RemoveSegment,
        CommandKind::AddVertex,
        CommandKind::RemoveVertex,
        CommandKind::MoveEntity,
        CommandKind::RotateEntity,
        CommandKind::ScaleEntity,
        CommandKind::ReparentEntity,
        CommandKind::ChangeProperty,
        CommandKind::Composite,
    ];

    /// The snake_case name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::AddEntity => "add_entity",
            CommandKind::RemoveEntity => "remove_entity",
            CommandKind::AddSegment => "add_segment",
            CommandKind::RemoveSegment => "remove_segment",
            CommandKind::AddVertex => "add_vertex",
            CommandKind::RemoveVertex => "remove_vertex",
            CommandKind::MoveEntity => "move_entity",
            CommandKind::RotateEntity => "rotate_entity",
            CommandKind::ScaleEntity => "scale_entity",
            CommandKind::ReparentEntity => "reparent_entity",
            CommandKind::ChangeProperty => "change_property",
            CommandKind::Composite => "composite",
        }
    }

    /// Parse a configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// A request to edit the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Instance id; unique within the process. Deserialized ids are
    /// reserved so fresh ones never repeat them.
    #[serde(default = "next_command_id", deserialize_with = "deserialize_command_id")]
    pub id: CommandId,
    /// The edit.
    #[serde(flatten)]
    pub action: CommandAction,
    /// Intermediate edit issued while the user is still dragging.
    #[serde(default)]
    pub transient: bool,
    /// The command has been superseded and must not be applied.
    #[serde(default)]
    pub die: bool,
    /// Skip rule checking entirely (forced execution).
    #[serde(default)]
    pub bypass_rules: bool,
}

impl Command {
    /// Wrap an action in a new command with a fresh id.
    pub fn new(action: CommandAction) -> Self {
        Self {
            id: next_command_id(),
            action,
            transient: false,
            die: false,
            bypass_rules: false,
        }
    }

    /// Add an entity.
    pub fn add_entity(entity: Entity) -> Self {
        Self::new(CommandAction::AddEntity { entity })
    }

    /// Remove an entity.
    pub fn remove_entity(entity_id: EntityId) -> Self {
        Self::new(CommandAction::RemoveEntity { entity_id })
    }

    /// Move an entity from `start` to `end`.
    pub fn move_entity(entity_id: EntityId, start: [f64; 3], end: [f64; 3]) -> Self {
        Self::new(CommandAction::MoveEntity {
            entity_id,
            start_position: start,
            end_position: end,
        })
    }

    /// Rotate an entity from `start` to `end`.
    pub fn rotate_entity(entity_id: EntityId, start: [f64; 4], end: [f64; 4]) -> Self {
        Self::new(CommandAction::RotateEntity {
            entity_id,
            start_rotation: start,
            end_rotation: end,
        })
    }

    /// Scale an entity in place from `start` to `end`.
    pub fn scale_entity(entity_id: EntityId, position: [f64; 3], start: [f64; 3], end: [f64; 3]) -> Self {
        Self::new(CommandAction::ScaleEntity {
            entity_id,
            start_position: position,
            end_position: position,
            start_scale: start,
            end_scale: end,
        })
    }

    /// Change a property from `start` to `end`.
    pub fn change_property(
        entity_id: EntityId,
        key: PropertyKey,
        start: PropertyValue,
        end: PropertyValue,
    ) -> Self {
        Self::new(CommandAction::ChangeProperty {
            entity_id,
            key,
            start_value: start,
            end_value: end,
        })
    }

    /// Group commands into one edit.
    pub fn composite(description: impl Into<String>, commands: Vec<Command>) -> Self {
        Self::new(CommandAction::Composite {
            description: description.into(),
            commands,
        })
    }

    /// Mark as transient.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Mark as superseded.
    pub fn dying(mut self) -> Self {
        self.die = true;
        self
    }

    /// Mark as forced: rule checking is skipped.
    pub fn forced(mut self) -> Self {
        self.bypass_rules = true;
        self
    }

    /// The routing tag for this command.
    pub fn kind(&self) -> CommandKind {
        match &self.action {
            CommandAction::AddEntity { .. } => CommandKind::AddEntity,
            CommandAction::RemoveEntity { .. } => CommandKind::RemoveEntity,
            CommandAction::AddSegment { .. } => CommandKind::AddSegment,
            CommandAction::RemoveSegment { .. } => CommandKind::RemoveSegment,
            CommandAction::AddVertex { .. } => CommandKind::AddVertex,
            CommandAction::RemoveVertex { .. } => CommandKind::RemoveVertex,
            CommandAction::MoveEntity { .. } => CommandKind::MoveEntity,
            CommandAction::RotateEntity { .. } => CommandKind::RotateEntity,
            CommandAction::ScaleEntity { .. } => CommandKind::ScaleEntity,
            CommandAction::ReparentEntity { .. } => CommandKind::ReparentEntity,
            CommandAction::ChangeProperty { .. } => CommandKind::ChangeProperty,
            CommandAction::Composite { .. } => CommandKind::Composite,
        }
    }

    /// The entity this command edits. `None` for composites.
    pub fn entity_id(&self) -> Option<EntityId> {
        match &self.action {
            CommandAction::AddEntity { entity }
            | CommandAction::AddSegment { entity }
            | CommandAction::AddVertex { entity } => Some(entity.id),
            CommandAction::RemoveEntity { entity_id }
            | CommandAction::RemoveSegment { entity_id }
            | CommandAction::RemoveVertex { entity_id }
            | CommandAction::MoveEntity { entity_id, .. }
            | CommandAction::RotateEntity { entity_id, .. }
            | CommandAction::ScaleEntity { entity_id, .. }
            | CommandAction::ReparentEntity { entity_id, .. }
            | CommandAction::ChangeProperty { entity_id, .. } => Some(*entity_id),
            CommandAction::Composite { .. } => None,
        }
    }

    /// The property a [`CommandAction::ChangeProperty`] edits.
    pub fn property_key(&self) -> Option<&PropertyKey> {
        match &self.action {
            CommandAction::ChangeProperty { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether this command inserts or deletes an entity, segment or vertex.
    pub fn is_add_or_remove(&self) -> bool {
        matches!(
            self.kind(),
            CommandKind::AddEntity
                | CommandKind::RemoveEntity
                | CommandKind::AddSegment
                | CommandKind::RemoveSegment
                | CommandKind::AddVertex
                | CommandKind::RemoveVertex
        )
    }

    /// Whether this command removes something from the scene.
    pub fn is_remove(&self) -> bool {
        matches!(
            self.kind(),
            CommandKind::RemoveEntity | CommandKind::RemoveSegment | CommandKind::RemoveVertex
        )
    }

    /// Whether the command has been superseded and must be discarded.
    pub fn should_die(&self) -> bool {
        self.die
    }

    /// Member commands of a composite; empty for anything else.
    pub fn children(&self) -> &[Command] {
        match &self.action {
            CommandAction::Composite { commands, .. } => commands,
            _ => &[],
        }
    }

    /// Revert the command's end state to its start state, in place.
    ///
    /// Executing the reset command restores what the scene looked like
    /// before the original edit. Adds and removes have no start state and
    /// are left untouched; composites reset every member.
    pub fn reset_to_start(&mut self) {
        match &mut self.action {
            CommandAction::MoveEntity {
                start_position,
                end_position,
                ..
            } => *end_position = *start_position,
            CommandAction::RotateEntity {
                start_rotation,
                end_rotation,
                ..
            } => *end_rotation = *start_rotation,
            CommandAction::ScaleEntity {
                start_position,
                end_position,
                start_scale,
                end_scale,
                ..
            } => {
                *end_position = *start_position;
                *end_scale = *start_scale;
            }
            CommandAction::ReparentEntity {
                start_parent,
                end_parent,
                start_position,
                end_position,
                ..
            } => {
                *end_parent = *start_parent;
                *end_position = *start_position;
            }
            CommandAction::ChangeProperty {
                start_value,
                end_value,
                ..
            } => *end_value = start_value.clone(),
            CommandAction::Composite { commands, .. } => {
                for command in commands {
                    command.reset_to_start();
                }
            }
            CommandAction::AddEntity { .. }
            | CommandAction::RemoveEntity { .. }
            | CommandAction::AddSegment { .. }
            | CommandAction::RemoveSegment { .. }
            | CommandAction::AddVertex { .. }
            | CommandAction::RemoveVertex { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;

    #[test]
    fn ids_are_unique() {
        let a = Command::remove_entity(1);
        let b = Command::remove_entity(1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CommandKind::from_name("teleport"), None);
    }

    #[test]
    fn reset_move_restores_start() {
        let mut c = Command::move_entity(3, [0.0, 0.0, 0.0], [5.0, 1.0, 0.0]);
        c.reset_to_start();
        match c.action {
            CommandAction::MoveEntity { end_position, .. } => {
                assert_eq!(end_position, [0.0, 0.0, 0.0])
            }
            _ => panic!("expected MoveEntity"),
        }
    }

    #[test]
    fn reset_scale_restores_scale_and_position() {
        let mut c = Command::new(CommandAction::ScaleEntity {
            entity_id: 2,
            start_position: [0.0, 0.0, 0.0],
            end_position: [0.5, 0.0, 0.0],
            start_scale: [1.0, 1.0, 1.0],
            end_scale: [2.0, 1.0, 1.0],
        });
        c.reset_to_start();
        match c.action {
            CommandAction::ScaleEntity {
                end_position,
                end_scale,
                ..
            } => {
                assert_eq!(end_position, [0.0, 0.0, 0.0]);
                assert_eq!(end_scale, [1.0, 1.0, 1.0]);
            }
            _ => panic!("expected ScaleEntity"),
        }
    }

    #[test]
    fn reset_leaves_adds_alone() {
        let entity = Entity::new(9, EntityKind::Model, [1.0, 1.0, 1.0]);
        let mut c = Command::add_entity(entity.clone());
        c.reset_to_start();
        assert_eq!(c.action, CommandAction::AddEntity { entity });
    }

    #[test]
    fn accessors() {
        let c = Command::change_property(
            4,
            PropertyKey::new("dimensions", "height"),
            PropertyValue::Float(1.0),
            PropertyValue::Float(2.0),
        );
        assert_eq!(c.kind(), CommandKind::ChangeProperty);
        assert_eq!(c.entity_id(), Some(4));
        assert_eq!(c.property_key().map(|k| k.name.as_str()), Some("height"));
        assert!(!c.is_add_or_remove());
        assert!(Command::remove_entity(1).is_add_or_remove());

        let group = Command::composite("group", vec![c]);
        assert_eq!(group.entity_id(), None);
        assert_eq!(group.children().len(), 1);
    }

    #[test]
    fn serde_tagged_command() {
        let c = Command::move_entity(1, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]).transient();
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains(r#""type":"move_entity""#));
        let restored: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(c, restored);

        let parsed: Command = serde_json::from_str(
            r#"{"type": "remove_entity", "entity_id": 5}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind(), CommandKind::RemoveEntity);
        assert!(!parsed.transient);
    }

    #[test]
    fn deserialized_ids_are_reserved() {
        let replayed: Command = serde_json::from_str(
            r#"{"id": 1099511627776, "type": "remove_entity", "entity_id": 5}"#,
        )
        .unwrap();
        assert_eq!(replayed.id, 1 << 40);
        let fresh = Command::remove_entity(5);
        assert!(fresh.id > replayed.id);
        assert!(next_command_id() > replayed.id);
    }
}
