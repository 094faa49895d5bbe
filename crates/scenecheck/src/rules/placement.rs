//! Placement rules: grid snapping, scale limits and zone confinement.

use scenecheck_ir::{Command, CommandAction};

use crate::error::ValidationError;
use crate::result::{FailureAction, RuleResult};
use crate::rule::{Rule, RuleContext};

/// Rounds move targets and added entity positions to a grid.
#[derive(Debug, Clone)]
pub struct GridSnapRule {
    step: f64,
}

impl GridSnapRule {
    /// Registered name.
    pub const NAME: &'static str = "grid_snap";

    /// Snap to multiples of `step`. A non-positive step disables the rule.
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    fn snap(&self, position: &mut [f64; 3]) -> Result<(), ValidationError> {
        if position.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::Rule {
                rule: Self::NAME.to_string(),
                reason: format!("cannot snap position {:?}", position),
            });
        }
        for v in position.iter_mut() {
            *v = (*v / self.step).round() * self.step;
        }
        Ok(())
    }
}

impl Rule for GridSnapRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        _ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        if self.step <= 0.0 {
            return Ok(result);
        }
        match &mut command.action {
            CommandAction::MoveEntity { end_position, .. } => self.snap(end_position)?,
            CommandAction::AddEntity { entity }
            | CommandAction::AddSegment { entity }
            | CommandAction::AddVertex { entity } => self.snap(&mut entity.position)?,
            _ => {}
        }
        Ok(result)
    }
}

/// Rejects scales with any component outside `[min, max]`.
#[derive(Debug, Clone)]
pub struct ScaleRangeRule {
    min: f64,
    max: f64,
}

impl ScaleRangeRule {
    /// Registered name.
    pub const NAME: &'static str = "scale_range";

    /// Accept component magnitudes in `[min, max]`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Rule for ScaleRangeRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        _ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        let CommandAction::ScaleEntity { end_scale, .. } = &command.action else {
            return Ok(result);
        };
        let in_range = end_scale
            .iter()
            .all(|s| (self.min..=self.max).contains(&s.abs()));
        if in_range {
            Ok(result)
        } else {
            Ok(result.reject(
                FailureAction::ClearCurrent,
                format!(
                    "scale {:?} outside [{}, {}]",
                    end_scale, self.min, self.max
                ),
            ))
        }
    }
}

/// Rejects edits whose entity center leaves the active zone's footprint.
///
/// The footprint is the zone box with its thinnest axis ignored, so
/// entities standing on a floor zone count as inside it.
#[derive(Debug, Clone, Default)]
pub struct ZoneBoundsRule;

impl ZoneBoundsRule {
    /// Registered name.
    pub const NAME: &'static str = "zone_bounds";

    /// Create the rule.
    pub fn new() -> Self {
        Self
    }
}

impl Rule for ZoneBoundsRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        let Some(zone) = ctx.scene().active_zone() else {
            return Ok(result);
        };
        if command.entity_id() == Some(zone) {
            return Ok(result);
        }
        let Some(zone_box) = ctx.checker().world_bounds(ctx.scene(), zone, false)? else {
            return Ok(result);
        };
        let Some(entity_box) = ctx
            .checker()
            .world_bounds_for_command(ctx.scene(), command, false)?
        else {
            return Ok(result);
        };

        let half = zone_box.half_extents();
        let thinnest = (0..3)
            .min_by(|&a, &b| half[a].total_cmp(&half[b]))
            .unwrap_or(1);
        let offset = entity_box.center() - zone_box.center();
        let inside = (0..3)
            .filter(|&i| i != thinnest)
            .all(|i| offset.dot(&zone_box.axes()[i]).abs() <= half[i]);
        if inside {
            Ok(result)
        } else {
            Ok(result.reject(
                FailureAction::ClearCurrent,
                format!("entity {} would leave zone {}", command.entity_id().unwrap_or_default(), zone),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::rules::testing::{run, try_run, zone_scene};
    use crate::status::Severity;
    use scenecheck_ir::{Entity, EntityKind};

    #[test]
    fn test_grid_snap_rewrites_move() {
        let scene = zone_scene();
        let out = run(
            &GridSnapRule::new(0.5),
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [1.26, 0.5, -0.74]),
        );
        assert!(out.result.approved);
        match out.command.action {
            CommandAction::MoveEntity { end_position, .. } => {
                assert_eq!(end_position, [1.5, 0.5, -0.5]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_grid_snap_disabled_at_zero() {
        let scene = zone_scene();
        let cmd = Command::add_entity(
            Entity::new(9, EntityKind::Model, [1.0; 3]).at([0.3, 0.0, 0.7]),
        );
        let out = run(&GridSnapRule::new(0.0), &scene, &ValidationConfig::default(), cmd.clone());
        assert_eq!(out.command, cmd);
    }

    #[test]
    fn test_grid_snap_covers_segments_and_rejects_nan() {
        let scene = zone_scene();
        let rule = GridSnapRule::new(1.0);
        let segment = Command::new(CommandAction::AddSegment {
            entity: Entity::new(9, EntityKind::Segment, [2.0, 1.0, 0.1]).at([0.4, 0.0, 2.6]),
        });
        let out = run(&rule, &scene, &ValidationConfig::default(), segment);
        match out.command.action {
            CommandAction::AddSegment { entity } => assert_eq!(entity.position, [0.0, 0.0, 3.0]),
            other => panic!("unexpected {other:?}"),
        }

        let err = try_run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [f64::NAN, 0.5, 0.0]),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ValidationError::Rule { .. }));
    }

    #[test]
    fn test_scale_range() {
        let scene = zone_scene();
        let rule = ScaleRangeRule::new(0.1, 10.0);
        let ok = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::scale_entity(2, [0.0, 0.5, 0.0], [1.0; 3], [2.0, 0.5, -3.0]),
        );
        assert!(ok.result.approved);

        let bad = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::scale_entity(2, [0.0, 0.5, 0.0], [1.0; 3], [20.0, 1.0, 1.0]),
        );
        assert!(!bad.result.approved);
        assert_eq!(bad.result.failure_action, FailureAction::ClearCurrent);
        assert_eq!(bad.result.severity, Severity::Error);
    }

    #[test]
    fn test_zone_bounds() {
        let scene = zone_scene();
        let rule = ZoneBoundsRule::new();
        // zone spans x and z in [-5, 5]; the thin y axis is ignored
        let inside = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [4.5, 3.0, -4.5]),
        );
        assert!(inside.result.approved);

        let outside = run(
            &rule,
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [6.0, 0.5, 0.0]),
        );
        assert!(!outside.result.approved);
    }

    #[test]
    fn test_zone_bounds_without_active_zone() {
        let mut scene = zone_scene();
        scene.active_zone = None;
        let out = run(
            &ZoneBoundsRule::new(),
            &scene,
            &ValidationConfig::default(),
            Command::move_entity(2, [0.0, 0.5, 0.0], [60.0, 0.5, 0.0]),
        );
        assert!(out.result.approved);
    }
}
