//! Command-to-engine lookup.

use std::collections::BTreeSet;

use scenecheck_ir::{Command, CommandKind, PropertyKey};

use crate::engine::RuleEngine;

/// One `(command kinds, property) -> engine` entry.
#[derive(Debug)]
pub struct Binding {
    kinds: BTreeSet<CommandKind>,
    property: Option<PropertyKey>,
    engine: RuleEngine,
}

impl Binding {
    /// Whether this binding handles `command`.
    ///
    /// The kind must be listed. A binding limited to a property only
    /// constrains property changes; every other listed kind matches
    /// regardless.
    pub fn matches(&self, command: &Command) -> bool {
        if !self.kinds.contains(&command.kind()) {
            return false;
        }
        match (&self.property, command.property_key()) {
            (None, _) | (Some(_), None) => true,
            (Some(wanted), Some(key)) => wanted == key,
        }
    }

    /// Command kinds routed here.
    pub fn kinds(&self) -> &BTreeSet<CommandKind> {
        &self.kinds
    }

    /// Property constraint, if any.
    pub fn property(&self) -> Option<&PropertyKey> {
        self.property.as_ref()
    }

    /// The engine run for matching commands.
    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }
}

/// Ordered bindings; the first match wins.
#[derive(Debug, Default)]
pub struct CommandDirectory {
    bindings: Vec<Binding>,
}

impl CommandDirectory {
    /// Create an empty directory. Every command passes unchecked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding.
    pub fn add_binding(
        &mut self,
        kinds: impl IntoIterator<Item = CommandKind>,
        property: Option<PropertyKey>,
        engine: RuleEngine,
    ) {
        self.bindings.push(Binding {
            kinds: kinds.into_iter().collect(),
            property,
            engine,
        });
    }

    /// Engine for `command`, or `None` when nothing is bound.
    pub fn match_command(&self, command: &Command) -> Option<&RuleEngine> {
        self.bindings
            .iter()
            .find(|b| b.matches(command))
            .map(|b| &b.engine)
    }

    /// Bindings in lookup order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the directory has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{GridSnapRule, ScaleRangeRule};
    use scenecheck_ir::PropertyValue;

    fn height() -> PropertyKey {
        PropertyKey::new("dimensions", "height")
    }

    fn change(key: PropertyKey) -> Command {
        Command::change_property(1, key, PropertyValue::Float(1.0), PropertyValue::Float(2.0))
    }

    fn directory() -> CommandDirectory {
        let mut dir = CommandDirectory::new();
        dir.add_binding(
            [CommandKind::ChangeProperty, CommandKind::MoveEntity],
            Some(height()),
            RuleEngine::new().with_rule(GridSnapRule::new(1.0)),
        );
        dir.add_binding(
            [CommandKind::ChangeProperty, CommandKind::ScaleEntity],
            None,
            RuleEngine::new().with_rule(ScaleRangeRule::new(0.1, 10.0)),
        );
        dir
    }

    #[test]
    fn test_property_binding_matches_its_property() {
        let dir = directory();
        let engine = dir.match_command(&change(height())).unwrap();
        assert_eq!(engine.rule_names(), vec!["grid_snap"]);
    }

    #[test]
    fn test_other_property_falls_through() {
        let dir = directory();
        let engine = dir
            .match_command(&change(PropertyKey::new("dimensions", "width")))
            .unwrap();
        assert_eq!(engine.rule_names(), vec!["scale_range"]);
    }

    #[test]
    fn test_property_binding_matches_non_property_kinds() {
        let dir = directory();
        let engine = dir
            .match_command(&Command::move_entity(1, [0.0; 3], [1.0; 3]))
            .unwrap();
        assert_eq!(engine.rule_names(), vec!["grid_snap"]);
    }

    #[test]
    fn test_unbound_kind_has_no_engine() {
        let dir = directory();
        assert!(dir.match_command(&Command::remove_entity(1)).is_none());
        assert!(CommandDirectory::new()
            .match_command(&Command::remove_entity(1))
            .is_none());
    }
}
