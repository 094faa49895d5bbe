//! The rule seam.

use std::fmt;

use scenecheck_ir::Command;

use crate::collision::{CollisionChecker, CollisionOptions, SurrogateTransaction};
use crate::config::ValidationConfig;
use crate::error::ValidationError;
use crate::result::RuleResult;
use crate::scene::SceneAccess;
use crate::sequencer::CommandSequencer;
use crate::surrogate::EntitySurrogate;

/// One validation check.
///
/// A rule sees the result accumulated by the rules before it and returns
/// the updated result. It may rewrite the command (e.g. snap a position),
/// issue follow-up commands and stage speculative surrogates through the
/// context.
pub trait Rule: fmt::Debug {
    /// Name the rule is registered under.
    fn name(&self) -> &str;

    /// Evaluate `command`.
    fn process(
        &self,
        ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError>;
}

/// What a rule can reach while it runs.
pub struct RuleContext<'a, 'c> {
    scene: &'a dyn SceneAccess,
    surrogates: &'a mut SurrogateTransaction<'c>,
    sequencer: &'a mut CommandSequencer,
    config: &'a ValidationConfig,
}

impl<'a, 'c> RuleContext<'a, 'c> {
    /// Bundle the pieces of a validation pass for one command.
    pub fn new(
        scene: &'a dyn SceneAccess,
        surrogates: &'a mut SurrogateTransaction<'c>,
        sequencer: &'a mut CommandSequencer,
        config: &'a ValidationConfig,
    ) -> Self {
        Self {
            scene,
            surrogates,
            sequencer,
            config,
        }
    }

    /// The live scene.
    pub fn scene(&self) -> &'a dyn SceneAccess {
        self.scene
    }

    /// Collision queries over the current speculative state.
    pub fn checker(&self) -> &CollisionChecker {
        self.surrogates.checker()
    }

    /// Active configuration.
    pub fn config(&self) -> &ValidationConfig {
        self.config
    }

    /// Collision options from the configuration.
    pub fn collision_options(&self) -> CollisionOptions {
        self.config.collision.options()
    }

    /// Make a speculative change visible to later queries. It is kept if
    /// the command is approved and rolled back otherwise.
    pub fn stage_surrogate(&mut self, surrogate: EntitySurrogate) {
        self.surrogates.stage(surrogate);
    }

    /// Queue a follow-up command. It is validated later in the same pass.
    pub fn issue_command(&mut self, command: Command) {
        self.sequencer.issue_command(command);
    }
}

impl fmt::Debug for RuleContext<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("staged", &self.surrogates.touched())
            .field("newly_issued", &self.sequencer.newly_issued().len())
            .finish_non_exhaustive()
    }
}
