//! Command queues for one validation pass.
//!
//! Three queues: pending work, approved commands and commands issued by
//! rules for the command currently being evaluated. A command sits in at
//! most one of them.

use std::collections::VecDeque;

use scenecheck_ir::{Command, CommandId};

/// Pending / approved / newly-issued queues.
#[derive(Debug, Clone, Default)]
pub struct CommandSequencer {
    pending: VecDeque<Command>,
    approved: Vec<Command>,
    newly_issued: Vec<Command>,
}

impl CommandSequencer {
    /// Create empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the pending work list.
    pub fn add_pending_command(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Append to the approved list.
    pub fn add_approved_command(&mut self, command: Command) {
        self.approved.push(command);
    }

    /// Record a command issued by a rule.
    pub fn issue_command(&mut self, command: Command) {
        self.newly_issued.push(command);
    }

    /// Take the next pending command.
    ///
    /// Commands appended while the pass runs are returned too, after
    /// everything queued before them.
    pub fn next_pending(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    /// Remove a command from whichever queue holds it.
    pub fn remove_command(&mut self, id: CommandId) -> Option<Command> {
        if let Some(i) = self.pending.iter().position(|c| c.id == id) {
            return self.pending.remove(i);
        }
        if let Some(i) = self.approved.iter().position(|c| c.id == id) {
            return Some(self.approved.remove(i));
        }
        if let Some(i) = self.newly_issued.iter().position(|c| c.id == id) {
            return Some(self.newly_issued.remove(i));
        }
        None
    }

    /// Splice issued commands onto the end of the pending list.
    pub fn move_newly_issued_commands_to_pending(&mut self) {
        self.pending.extend(self.newly_issued.drain(..));
    }

    /// Discard issued commands.
    pub fn clear_newly_issued_commands(&mut self) {
        self.newly_issued.clear();
    }

    /// Empty every queue.
    pub fn clear_all(&mut self) {
        self.pending.clear();
        self.approved.clear();
        self.newly_issued.clear();
    }

    /// Pending commands in processing order.
    pub fn pending(&self) -> &VecDeque<Command> {
        &self.pending
    }

    /// Approved commands in approval order.
    pub fn approved(&self) -> &[Command] {
        &self.approved
    }

    /// Commands issued for the command under evaluation.
    pub fn newly_issued(&self) -> &[Command] {
        &self.newly_issued
    }

    /// Whether all three queues are empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.approved.is_empty() && self.newly_issued.is_empty()
    }
}
