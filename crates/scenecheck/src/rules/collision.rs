//! Overlap rules.

use scenecheck_ir::Command;

use crate::error::ValidationError;
use crate::result::{FailureAction, RuleResult};
use crate::rule::{Rule, RuleContext};
use crate::status::Severity;

/// Rejects commands that leave the entity, or anything under it,
/// overlapping another entity.
///
/// Transient commands (drag previews) are only flagged unless configured
/// otherwise, so the preview keeps following the pointer.
#[derive(Debug, Clone)]
pub struct CollisionRule {
    failure_action: FailureAction,
    reject_transient: bool,
}

impl CollisionRule {
    /// Registered name.
    pub const NAME: &'static str = "collision";

    /// Reject with `failure_action` on overlap.
    pub fn new(failure_action: FailureAction) -> Self {
        Self {
            failure_action,
            reject_transient: false,
        }
    }

    /// Also reject transient commands.
    pub fn rejecting_transient(mut self, reject: bool) -> Self {
        self.reject_transient = reject;
        self
    }
}

impl Rule for CollisionRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        let hits =
            ctx.checker()
                .submit_command_extended(ctx.scene(), command, ctx.collision_options())?;
        let Some(hits) = hits else {
            return Ok(result);
        };
        let note = format!(
            "entity {} would overlap {:?}",
            command.entity_id().unwrap_or_default(),
            hits
        );
        if command.transient && !self.reject_transient {
            return Ok(result.escalate(Severity::Error, note));
        }
        Ok(result.reject(self.failure_action, note))
    }
}

/// Warns when the edited entity ends up within `margin` of another.
#[derive(Debug, Clone)]
pub struct ProximityWarningRule {
    margin: f64,
}

impl ProximityWarningRule {
    /// Registered name.
    pub const NAME: &'static str = "proximity_warning";

    /// Warn within `margin`.
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }
}

impl Rule for ProximityWarningRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        let mut options = ctx.collision_options();
        options.margin = self.margin;
        match ctx.checker().submit_command(ctx.scene(), command, options)? {
            Some(near) => Ok(result.escalate(
                Severity::Warning,
                format!("close to {:?}", near),
            )),
            None => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::rules::testing::{run, zone_scene};

    #[test]
    fn test_overlap_rejects_with_configured_action() {
        let scene = zone_scene();
        let rule = CollisionRule::new(FailureAction::ClearNewlyIssued);
        let out = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [2.5, 0.5, 0.0]),
        );
        assert!(!out.result.approved);
        assert_eq!(out.result.failure_action, FailureAction::ClearNewlyIssued);
        assert_eq!(out.result.severity, Severity::Error);
    }

    #[test]
    fn test_clear_move_passes() {
        let scene = zone_scene();
        let rule = CollisionRule::new(FailureAction::ClearAll);
        let out = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [-2.0, 0.5, 0.0]),
        );
        assert!(out.result.approved);
        assert_eq!(out.result.severity, Severity::Ok);
    }

    #[test]
    fn test_transient_overlap_only_flags() {
        let scene = zone_scene();
        let cmd = Command::move_entity(2, [0.0, 0.5, 0.0], [2.5, 0.5, 0.0]).transient();

        let lenient = CollisionRule::new(FailureAction::ClearAll);
        let out = run(&lenient, &scene, &ValidationConfig::default(), cmd.clone());
        assert!(out.result.approved);
        assert_eq!(out.result.severity, Severity::Error);

        let strict = CollisionRule::new(FailureAction::ClearAll).rejecting_transient(true);
        let out = run(&strict, &scene, &ValidationConfig::default(), cmd);
        assert!(!out.result.approved);
    }

    #[test]
    fn test_proximity_warns_inside_margin() {
        let scene = zone_scene();
        let rule = ProximityWarningRule::new(0.2);
        // 0.1 gap to crate 3
        let out = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [1.9, 0.5, 0.0]),
        );
        assert!(out.result.approved);
        assert_eq!(out.result.severity, Severity::Warning);

        let out = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [1.0, 0.5, 0.0]),
        );
        assert_eq!(out.result.severity, Severity::Ok);
    }
}
