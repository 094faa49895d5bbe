//! Top-level validation of one edit.
//!
//! A validating interpreter expands the edit into its member commands, runs
//! each through the rule engine bound to it, and collects what survived into
//! a single forced composite for the caller to apply. Rejections roll the
//! batch back according to the rule's failure action and append commands
//! that restore the scene.

use std::fmt;

use scenecheck_ir::{Command, CommandAction, CommandKind};

use crate::collision::CollisionChecker;
use crate::config::ValidationConfig;
use crate::directory::CommandDirectory;
use crate::error::ValidationError;
use crate::factory::RuleFactory;
use crate::reset::reset_to_start_commands;
use crate::result::{FailureAction, RuleResult};
use crate::rule::RuleContext;
use crate::scene::SceneAccess;
use crate::sequencer::CommandSequencer;
use crate::status::{Severity, StatusReporter};

/// Result of validating one top-level command.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// What the caller should execute. A forced composite of the approved
    /// commands, or the original command when nothing was checked.
    pub command: Command,
    /// Whether every member command was approved.
    pub approved: bool,
    /// Worst severity seen in the pass.
    pub severity: Severity,
    /// Notes from every rule that ran, in order.
    pub notes: Vec<String>,
    /// First internal error hit during the pass, if any.
    pub fault: Option<ValidationError>,
}

impl ValidationOutcome {
    fn unchecked(command: &Command) -> Self {
        Self {
            command: command.clone(),
            approved: true,
            severity: Severity::Ok,
            notes: Vec::new(),
            fault: None,
        }
    }
}

/// Exclusive state of one validation pass.
///
/// Owned by the caller and reset at the start of every pass, so nothing
/// leaks between edits. After a pass it still holds the surrogates and
/// queues of that pass for inspection.
#[derive(Debug, Default)]
pub struct ValidationSession {
    checker: CollisionChecker,
    sequencer: CommandSequencer,
}

impl ValidationSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surrogates and collision queries of the last pass.
    pub fn checker(&self) -> &CollisionChecker {
        &self.checker
    }

    /// Queues of the last pass.
    pub fn sequencer(&self) -> &CommandSequencer {
        &self.sequencer
    }

    fn reset(&mut self, epsilon: f64) {
        self.checker.clear_side_pocketed_original_surrogate_states();
        self.checker.clear_surrogates();
        self.checker.set_epsilon(epsilon);
        self.sequencer.clear_all();
    }
}

/// Turns a user edit into the command that should actually run.
pub trait CommandInterpreter {
    /// Validate `command` against `scene`.
    fn validate(
        &mut self,
        session: &mut ValidationSession,
        scene: &dyn SceneAccess,
        command: &Command,
    ) -> ValidationOutcome;
}

/// Approves everything unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughInterpreter;

impl CommandInterpreter for PassThroughInterpreter {
    fn validate(
        &mut self,
        _session: &mut ValidationSession,
        _scene: &dyn SceneAccess,
        command: &Command,
    ) -> ValidationOutcome {
        ValidationOutcome::unchecked(command)
    }
}

/// Runs every member command through its bound rule engine.
pub struct ValidatingInterpreter {
    directory: CommandDirectory,
    config: ValidationConfig,
    reporter: Option<Box<dyn StatusReporter>>,
}

#[derive(Default)]
struct PassState {
    severity: Severity,
    failed: bool,
    notes: Vec<String>,
    fault: Option<ValidationError>,
    reset_issued: bool,
}

impl ValidatingInterpreter {
    /// Interpreter over an explicit directory.
    pub fn new(directory: CommandDirectory, config: ValidationConfig) -> Self {
        Self {
            directory,
            config,
            reporter: None,
        }
    }

    /// Interpreter whose directory is built from `config` with the
    /// built-in rules.
    pub fn from_config(config: ValidationConfig) -> Result<Self, ValidationError> {
        let directory = RuleFactory::with_builtins().build_directory(&config)?;
        Ok(Self::new(directory, config))
    }

    /// Report pass severities to `reporter`.
    pub fn with_reporter(mut self, reporter: impl StatusReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Rule bindings.
    pub fn directory(&self) -> &CommandDirectory {
        &self.directory
    }

    /// Evaluate one member command and, if approved, commit its effect to
    /// the surrogate set. Speculative changes of a rejected command are
    /// rolled back when the transaction drops.
    fn run_command(
        &self,
        session: &mut ValidationSession,
        scene: &dyn SceneAccess,
        current: &mut Command,
    ) -> Result<RuleResult, ValidationError> {
        let engine = if current.bypass_rules {
            None
        } else {
            self.directory.match_command(current)
        };

        let mut tx = session.checker.transaction();
        let result = match engine {
            Some(engine) => {
                let mut ctx =
                    RuleContext::new(scene, &mut tx, &mut session.sequencer, &self.config);
                engine.evaluate(&mut ctx, current)?
            }
            None => {
                tracing::debug!(
                    "no rules bound to {} command {}, passing unchecked",
                    current.kind().name(),
                    current.id
                );
                RuleResult::approved()
            }
        };

        if result.approved {
            if let Some(surrogate) = tx.checker().surrogate_for_command(scene, current)? {
                tx.stage(surrogate);
            }
            tx.commit();
        }
        Ok(result)
    }

    fn roll_back(
        session: &mut ValidationSession,
        original: &Command,
        action: FailureAction,
        pass: &mut PassState,
    ) {
        pass.failed = true;
        match action {
            FailureAction::ClearAll => {
                session.sequencer.clear_all();
                session.checker.clear_side_pocketed_original_surrogate_states();
                session.checker.clear_surrogates();
                pass.reset_issued = false;
            }
            FailureAction::ClearCurrent | FailureAction::ClearCurrentNoReset => {
                session.sequencer.move_newly_issued_commands_to_pending();
            }
            FailureAction::ClearNewlyIssued => {
                session.sequencer.clear_newly_issued_commands();
            }
        }
        if action.resets_scene() && !pass.reset_issued {
            for reset in reset_to_start_commands(original) {
                session.sequencer.add_approved_command(reset);
            }
            pass.reset_issued = true;
        }
    }
}

impl CommandInterpreter for ValidatingInterpreter {
    fn validate(
        &mut self,
        session: &mut ValidationSession,
        scene: &dyn SceneAccess,
        command: &Command,
    ) -> ValidationOutcome {
        if !self.config.rule_checking || command.bypass_rules {
            return ValidationOutcome::unchecked(command);
        }

        session.reset(self.config.collision.epsilon);
        let mut members = Vec::new();
        expand(command, &mut members);
        tracing::debug!(
            "validating command {} with {} member(s)",
            command.id,
            members.len()
        );
        for member in members {
            session.sequencer.add_pending_command(member);
        }

        let mut pass = PassState::default();
        while let Some(mut current) = session.sequencer.next_pending() {
            if let Some(reporter) = self.reporter.as_mut() {
                reporter.clear_transient();
            }
            let id = current.id;
            match self.run_command(session, scene, &mut current) {
                Ok(RuleResult {
                    approved,
                    severity,
                    failure_action,
                    notes,
                }) => {
                    pass.severity = pass.severity.escalate(severity);
                    if approved {
                        session.sequencer.add_approved_command(current);
                        session.sequencer.move_newly_issued_commands_to_pending();
                    } else {
                        tracing::warn!(
                            "{} command {} rejected ({:?}): {}",
                            current.kind().name(),
                            id,
                            failure_action,
                            notes.join("; ")
                        );
                        Self::roll_back(session, command, failure_action, &mut pass);
                    }
                    pass.notes.extend(notes);
                }
                Err(err) => {
                    tracing::warn!("command {} faulted: {}", id, err);
                    pass.severity = Severity::Error;
                    pass.notes.push(err.to_string());
                    pass.fault.get_or_insert(err);
                    Self::roll_back(session, command, FailureAction::ClearAll, &mut pass);
                }
            }
        }
        session
            .checker
            .clear_side_pocketed_original_surrogate_states();

        if let Some(reporter) = self.reporter.as_mut() {
            reporter.report(pass.severity, pass.severity.rgb());
        }

        let approved = session.sequencer.approved().to_vec();
        tracing::debug!(
            "command {} {} with {} command(s) to execute",
            command.id,
            if pass.failed { "rejected" } else { "approved" },
            approved.len()
        );
        ValidationOutcome {
            command: Command::composite(format!("validated {}", describe(command)), approved)
                .forced(),
            approved: !pass.failed,
            severity: pass.severity,
            notes: pass.notes,
            fault: pass.fault,
        }
    }
}

impl fmt::Debug for ValidatingInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatingInterpreter")
            .field("directory", &self.directory)
            .field("config", &self.config)
            .field("reporter", &self.reporter.is_some())
            .finish()
    }
}

/// Flatten nested composites into their leaf commands, in order.
fn expand(command: &Command, out: &mut Vec<Command>) {
    if command.kind() == CommandKind::Composite {
        for child in command.children() {
            expand(child, out);
        }
    } else {
        out.push(command.clone());
    }
}

fn describe(command: &Command) -> String {
    match &command.action {
        CommandAction::Composite { description, .. } => description.clone(),
        _ => command.kind().name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngine;
    use crate::rule::Rule;
    use scenecheck_ir::{Entity, EntityKind, Scene};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Active zone 1 with unit crates 2, 3 and 4 at x = 0, 3 and 5.
    fn scene() -> Scene {
        let mut s = Scene::new();
        s.insert(Entity::new(1, EntityKind::Zone, [20.0, 0.1, 20.0]))
            .unwrap();
        for (id, x) in [(2, 0.0), (3, 3.0), (4, 5.0)] {
            s.insert(
                Entity::new(id, EntityKind::Model, [1.0, 1.0, 1.0])
                    .with_parent(1)
                    .at([x, 0.5, 0.0]),
            )
            .unwrap();
        }
        s.active_zone = Some(1);
        s
    }

    fn interpreter(action: FailureAction) -> ValidatingInterpreter {
        let mut config = ValidationConfig::default();
        config.rules.collision_failure_action = action;
        ValidatingInterpreter::from_config(config).unwrap()
    }

    fn end_position(command: &Command) -> [f64; 3] {
        match &command.action {
            CommandAction::MoveEntity { end_position, .. } => *end_position,
            other => panic!("not a move: {other:?}"),
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        reports: Rc<RefCell<Vec<Severity>>>,
        clears: Rc<RefCell<usize>>,
    }

    impl StatusReporter for Recorder {
        fn clear_transient(&mut self) {
            *self.clears.borrow_mut() += 1;
        }

        fn report(&mut self, severity: Severity, rgb: [u8; 3]) {
            assert_eq!(rgb, severity.rgb());
            self.reports.borrow_mut().push(severity);
        }
    }

    #[test]
    fn test_approved_move() {
        let scene = scene();
        let mut session = ValidationSession::new();
        let mut interp = interpreter(FailureAction::ClearCurrent);
        let cmd = Command::move_entity(2, [0.0, 0.5, 0.0], [-3.0, 0.5, 0.0]);

        let outcome = interp.validate(&mut session, &scene, &cmd);
        assert!(outcome.approved);
        assert_eq!(outcome.severity, Severity::Ok);
        assert_eq!(session.sequencer().approved(), &[cmd.clone()]);
        assert_eq!(outcome.command.children(), &[cmd]);
        assert!(outcome.command.bypass_rules);
        assert_eq!(
            session.checker().surrogate(2).unwrap().position(),
            [-3.0, 0.5, 0.0]
        );
    }

    #[test]
    fn test_rejected_scale_resets_scale() {
        let scene = scene();
        let mut session = ValidationSession::new();
        let mut interp = interpreter(FailureAction::ClearNewlyIssued);
        let cmd = Command::scale_entity(3, [3.0, 0.5, 0.0], [1.0; 3], [4.0, 1.0, 1.0]);

        let outcome = interp.validate(&mut session, &scene, &cmd);
        assert!(!outcome.approved);
        assert_eq!(outcome.severity, Severity::Error);
        assert!(outcome.fault.is_none());

        let approved = session.sequencer().approved();
        assert_eq!(approved.len(), 1);
        match &approved[0].action {
            CommandAction::ScaleEntity {
                entity_id,
                end_scale,
                end_position,
                ..
            } => {
                assert_eq!(*entity_id, 3);
                assert_eq!(*end_scale, [1.0; 3]);
                assert_eq!(*end_position, [3.0, 0.5, 0.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(session.checker().surrogate(3).is_none());
        assert!(session.checker().surrogate(4).is_none());
        assert!(approved.iter().all(|c| c.entity_id() != Some(4)));
    }

    #[test]
    fn test_rejected_move_in_composite_drops_add_from_reset() {
        let scene = scene();
        let add = Command::add_entity(
            Entity::new(9, EntityKind::Model, [1.0; 3])
                .with_parent(1)
                .at([-4.0, 0.5, 0.0]),
        );
        let mv = Command::move_entity(2, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]);
        let composite = Command::composite("drop and shove", vec![add.clone(), mv]);

        let mut session = ValidationSession::new();
        let outcome =
            interpreter(FailureAction::ClearAll).validate(&mut session, &scene, &composite);
        assert!(!outcome.approved);
        let executed = outcome.command.children();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].entity_id(), Some(2));
        assert_eq!(end_position(&executed[0]), [0.0, 0.5, 0.0]);
        assert_eq!(session.checker().surrogate_count(), 0);

        // keeping earlier approvals keeps the add, but the reset still skips it
        let outcome =
            interpreter(FailureAction::ClearCurrent).validate(&mut session, &scene, &composite);
        let executed = outcome.command.children();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0], add);
        assert_eq!(executed[1].kind(), CommandKind::MoveEntity);
        assert!(session.checker().surrogate(9).is_some());
        assert!(session.checker().surrogate(2).is_none());
    }

    #[test]
    fn test_cascade_follow_ups_run_in_same_pass() {
        let mut scene = scene();
        scene
            .insert(
                Entity::new(5, EntityKind::Model, [0.5; 3])
                    .with_parent(2)
                    .at([1.5, 0.0, 0.0]),
            )
            .unwrap();
        let remove = Command::remove_entity(2);
        let mv = Command::move_entity(3, [3.0, 0.5, 0.0], [1.6, 0.5, 0.0]);
        let composite = Command::composite("clear and slide", vec![remove.clone(), mv.clone()]);

        let mut session = ValidationSession::new();
        let outcome =
            interpreter(FailureAction::ClearAll).validate(&mut session, &scene, &composite);
        assert!(outcome.approved, "notes: {:?}", outcome.notes);

        let executed = outcome.command.children();
        assert_eq!(executed.len(), 3);
        assert_eq!(executed[0], remove);
        assert_eq!(executed[1], mv);
        assert_eq!(executed[2].kind(), CommandKind::RemoveEntity);
        assert_eq!(executed[2].entity_id(), Some(5));

        let mut applied = scene.clone();
        applied.apply(&outcome.command).unwrap();
        assert!(applied.get(2).is_none());
        assert!(applied.get(5).is_none());
        assert_eq!(applied.get(3).unwrap().position, [1.6, 0.5, 0.0]);
    }

    #[test]
    fn test_fault_rolls_back_everything() {
        let scene = scene();
        let composite = Command::composite(
            "ghost",
            vec![
                Command::move_entity(2, [0.0, 0.5, 0.0], [-3.0, 0.5, 0.0]),
                Command::move_entity(42, [0.0; 3], [1.0; 3]),
            ],
        );
        let mut session = ValidationSession::new();
        let outcome =
            interpreter(FailureAction::ClearCurrent).validate(&mut session, &scene, &composite);
        assert!(!outcome.approved);
        assert_eq!(outcome.severity, Severity::Error);
        assert_eq!(outcome.fault, Some(ValidationError::EntityNotFound(42)));
        assert_eq!(session.checker().surrogate_count(), 0);
        let executed = outcome.command.children();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].entity_id(), Some(42));
        assert_eq!(end_position(&executed[1]), [0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_dying_command_is_dropped_without_reset() {
        let scene = scene();
        let cmd = Command::move_entity(2, [0.0, 0.5, 0.0], [-3.0, 0.5, 0.0]).dying();
        let mut session = ValidationSession::new();
        let outcome =
            interpreter(FailureAction::ClearAll).validate(&mut session, &scene, &cmd);
        assert!(!outcome.approved);
        assert!(outcome.command.children().is_empty());
    }

    #[test]
    fn test_disabled_checking_and_bypass_return_original() {
        let scene = scene();
        let cmd = Command::move_entity(2, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]);
        let mut session = ValidationSession::new();

        let mut config = ValidationConfig::default();
        config.rule_checking = false;
        let outcome = ValidatingInterpreter::from_config(config)
            .unwrap()
            .validate(&mut session, &scene, &cmd);
        assert!(outcome.approved);
        assert_eq!(outcome.command, cmd);

        let forced = cmd.clone().forced();
        let outcome =
            interpreter(FailureAction::ClearAll).validate(&mut session, &scene, &forced);
        assert_eq!(outcome.command, forced);

        let outcome = PassThroughInterpreter.validate(&mut session, &scene, &cmd);
        assert_eq!(outcome.command, cmd);
        assert!(session.sequencer().is_empty());
    }

    #[test]
    fn test_transient_collision_flags_without_rejecting() {
        let scene = scene();
        let cmd = Command::move_entity(2, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]).transient();
        let mut session = ValidationSession::new();
        let outcome =
            interpreter(FailureAction::ClearAll).validate(&mut session, &scene, &cmd);
        assert!(outcome.approved);
        assert_eq!(outcome.severity, Severity::Error);
    }

    #[test]
    fn test_severity_accumulates_and_is_reported() {
        let scene = scene();
        let composite = Command::composite(
            "nudge",
            vec![
                // 0.03 gap to crate 3, inside the default proximity margin
                Command::move_entity(2, [0.0, 0.5, 0.0], [1.97, 0.5, 0.0]),
                Command::move_entity(4, [5.0, 0.5, 0.0], [8.0, 0.5, 0.0]),
            ],
        );
        let recorder = Recorder::default();
        let mut interp = interpreter(FailureAction::ClearAll).with_reporter(recorder.clone());
        let mut session = ValidationSession::new();
        let outcome = interp.validate(&mut session, &scene, &composite);
        assert!(outcome.approved);
        assert_eq!(outcome.severity, Severity::Warning);
        assert_eq!(*recorder.reports.borrow(), vec![Severity::Warning]);
        assert_eq!(*recorder.clears.borrow(), 2);
    }

    #[test]
    fn test_rejected_command_surrogate_is_restored() {
        let scene = scene();
        let composite = Command::composite(
            "two moves",
            vec![
                Command::move_entity(2, [0.0, 0.5, 0.0], [-3.0, 0.5, 0.0]),
                Command::move_entity(3, [3.0, 0.5, 0.0], [5.0, 0.5, 0.0]),
            ],
        );
        let mut session = ValidationSession::new();
        let outcome =
            interpreter(FailureAction::ClearCurrent).validate(&mut session, &scene, &composite);
        assert!(!outcome.approved);
        assert_eq!(
            session.checker().surrogate(2).unwrap().position(),
            [-3.0, 0.5, 0.0]
        );
        assert!(session.checker().surrogate(3).is_none());
        assert!(!session.checker().is_side_pocketed(2));
    }

    #[test]
    fn test_unbound_commands_pass_and_update_surrogates() {
        let scene = scene();
        let mut interp =
            ValidatingInterpreter::new(CommandDirectory::new(), ValidationConfig::default());
        let cmd = Command::move_entity(2, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]);
        let mut session = ValidationSession::new();
        let outcome = interp.validate(&mut session, &scene, &cmd);
        assert!(outcome.approved);
        assert_eq!(outcome.command.children(), &[cmd]);
        assert_eq!(
            session.checker().surrogate(2).unwrap().position(),
            [3.0, 0.5, 0.0]
        );
    }

    #[test]
    fn test_replacement_commands_survive_clear_current() {
        /// Rejects moves of entity 2 and issues a gentler move instead.
        #[derive(Debug)]
        struct Soften;

        impl Rule for Soften {
            fn name(&self) -> &str {
                "soften"
            }

            fn process(
                &self,
                ctx: &mut RuleContext<'_, '_>,
                command: &mut Command,
                result: RuleResult,
            ) -> Result<RuleResult, ValidationError> {
                if end_position(command) == [9.0, 0.5, 0.0] {
                    ctx.issue_command(Command::move_entity(2, [0.0, 0.5, 0.0], [-1.0, 0.5, 0.0]));
                    return Ok(result.reject(FailureAction::ClearCurrentNoReset, "too far"));
                }
                Ok(result)
            }
        }

        let scene = scene();
        let mut directory = CommandDirectory::new();
        directory.add_binding(
            [CommandKind::MoveEntity],
            None,
            RuleEngine::new().with_rule(Soften),
        );
        let mut interp = ValidatingInterpreter::new(directory, ValidationConfig::default());
        let mut session = ValidationSession::new();
        let outcome = interp.validate(
            &mut session,
            &scene,
            &Command::move_entity(2, [0.0, 0.5, 0.0], [9.0, 0.5, 0.0]),
        );
        assert!(!outcome.approved);
        let executed = outcome.command.children();
        assert_eq!(executed.len(), 1);
        assert_eq!(end_position(&executed[0]), [-1.0, 0.5, 0.0]);
    }
}
