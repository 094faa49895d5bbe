//! Rules about whether a command should happen at all and what it drags
//! along.

use scenecheck_ir::{Command, CommandAction, EntityId, EntityKind};

use crate::error::ValidationError;
use crate::result::{FailureAction, RuleResult};
use crate::rule::{Rule, RuleContext};
use crate::surrogate::EntitySurrogate;

/// Rejects commands flagged to die, without restoring the scene.
#[derive(Debug, Clone, Default)]
pub struct DieCheckRule;

impl DieCheckRule {
    /// Registered name.
    pub const NAME: &'static str = "die_check";

    /// Create the rule.
    pub fn new() -> Self {
        Self
    }
}

impl Rule for DieCheckRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        _ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        if command.should_die() {
            return Ok(result.reject(
                FailureAction::ClearCurrentNoReset,
                format!("command {} was superseded", command.id),
            ));
        }
        Ok(result)
    }
}

/// Removing an entity also removes its children.
///
/// A remove command is issued for every direct child; those commands are
/// validated later in the same pass and cascade further. The whole subtree
/// is disabled right away so edits queued before the follow-ups do not
/// collide with entities that are about to disappear.
#[derive(Debug, Clone, Default)]
pub struct CascadeRemoveRule;

impl CascadeRemoveRule {
    /// Registered name.
    pub const NAME: &'static str = "cascade_remove";

    /// Create the rule.
    pub fn new() -> Self {
        Self
    }
}

fn removal_for(id: EntityId, kind: EntityKind) -> Command {
    match kind {
        EntityKind::Segment => Command::new(CommandAction::RemoveSegment { entity_id: id }),
        EntityKind::Vertex => Command::new(CommandAction::RemoveVertex { entity_id: id }),
        EntityKind::Model | EntityKind::Zone => Command::remove_entity(id),
    }
}

impl Rule for CascadeRemoveRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        if !command.is_remove() {
            return Ok(result);
        }
        let Some(entity) = command.entity_id().and_then(|id| ctx.scene().entity(id)) else {
            return Ok(result);
        };

        let mut issued = Vec::new();
        for &id in &entity.children {
            issued.push(removal_for(id, ctx.scene().require(id)?.kind));
        }

        let mut staged = Vec::new();
        let mut frontier = entity.children.clone();
        while let Some(id) = frontier.pop() {
            let child = ctx.scene().require(id)?;
            frontier.extend(child.children.iter().copied());
            let current = ctx
                .checker()
                .surrogate(id)
                .cloned()
                .unwrap_or_else(|| EntitySurrogate::from_entity(child));
            if current.is_enabled() {
                staged.push(current.disabled());
            }
        }

        for surrogate in staged {
            ctx.stage_surrogate(surrogate);
        }
        for removal in issued {
            ctx.issue_command(removal);
        }
        Ok(result)
    }
}
