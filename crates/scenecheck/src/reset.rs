//! Commands that undo an attempted edit.

use scenecheck_ir::{next_command_id, Command, CommandAction, CommandKind};

/// Commands restoring the scene to its state before `original` ran.
///
/// Members are visited in reverse. Commands flagged to die and every add or
/// remove are dropped; adds and removes are never undone by issuing their
/// inverse. Nested composites are rebuilt the same way. Everything else is
/// reset to its start values. Each reset command gets a fresh id and
/// bypasses rule checking.
pub fn reset_to_start_commands(original: &Command) -> Vec<Command> {
    if original.kind() != CommandKind::Composite {
        return reset_member(original).into_iter().collect();
    }
    original
        .children()
        .iter()
        .rev()
        .filter_map(reset_member)
        .collect()
}

fn reset_member(command: &Command) -> Option<Command> {
    if command.should_die() || command.is_add_or_remove() {
        return None;
    }
    let mut reset = if command.kind() == CommandKind::Composite {
        let members = reset_to_start_commands(command);
        if members.is_empty() {
            return None;
        }
        let mut nested = command.clone();
        if let CommandAction::Composite { commands, .. } = &mut nested.action {
            *commands = members;
        }
        nested
    } else {
        let mut single = command.clone();
        single.reset_to_start();
        single
    };
    reset.id = next_command_id();
    reset.transient = false;
    reset.bypass_rules = true;
    Some(reset)
}
