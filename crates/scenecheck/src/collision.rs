//! Collision checking against speculative scene state.
//!
//! The checker owns the working set of [`EntitySurrogate`]s for one
//! validation pass. Commands are evaluated by building the surrogate they
//! would produce and testing its oriented box against every other entity in
//! the active zone, without committing anything.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use scenecheck_bounds::{point_in_mesh, Obb};
use scenecheck_ir::{Command, CommandAction, EntityId, EntityKind};
use scenecheck_math::{Point3, Transform};

use crate::error::ValidationError;
use crate::scene::SceneAccess;
use crate::surrogate::EntitySurrogate;

/// Which state and which boxes a collision query uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOptions {
    /// Prefer surrogates over live entity state.
    pub use_surrogates: bool,
    /// Test with the command entity's extended box.
    pub use_entity_extended_bounds: bool,
    /// Test against the targets' extended boxes.
    pub use_targets_extended_bounds: bool,
    /// Extra distance added to the checker epsilon.
    pub margin: f64,
}

impl Default for CollisionOptions {
    fn default() -> Self {
        Self {
            use_surrogates: true,
            use_entity_extended_bounds: false,
            use_targets_extended_bounds: false,
            margin: 0.0,
        }
    }
}

/// Surrogate working set plus the collision queries that read it.
#[derive(Debug, Clone, Default)]
pub struct CollisionChecker {
    surrogates: BTreeMap<EntityId, EntitySurrogate>,
    // `None` records that no surrogate existed when the entity was pocketed.
    side_pocket: BTreeMap<EntityId, Option<EntitySurrogate>>,
    epsilon: f64,
}

impl CollisionChecker {
    /// Create a checker with a strict overlap test.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a checker whose overlap tests are relaxed by `epsilon`.
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    /// Tolerance used by every overlap test.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Change the overlap tolerance.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    // =========================================================================
    // Surrogate set
    // =========================================================================

    /// Insert or replace the surrogate for its entity.
    pub fn add_surrogate(&mut self, surrogate: EntitySurrogate) -> Option<EntitySurrogate> {
        self.surrogates.insert(surrogate.entity_id(), surrogate)
    }

    /// Drop the surrogate for `id`.
    pub fn remove_surrogate(&mut self, id: EntityId) -> Option<EntitySurrogate> {
        self.surrogates.remove(&id)
    }

    /// Drop every surrogate.
    pub fn clear_surrogates(&mut self) {
        self.surrogates.clear();
    }

    /// Current surrogate for `id`.
    pub fn surrogate(&self, id: EntityId) -> Option<&EntitySurrogate> {
        self.surrogates.get(&id)
    }

    /// Number of surrogates in the working set.
    pub fn surrogate_count(&self) -> usize {
        self.surrogates.len()
    }

    // =========================================================================
    // Side-pocketed snapshots
    // =========================================================================

    /// Snapshot the surrogate of `id` before it is speculatively changed.
    ///
    /// Only the first call per entity records anything, so the snapshot is
    /// always the state before the first speculative change.
    pub fn set_side_pocketed_original_surrogate_state(&mut self, id: EntityId) {
        if !self.side_pocket.contains_key(&id) {
            let original = self.surrogates.get(&id).cloned();
            self.side_pocket.insert(id, original);
        }
    }

    /// The snapshot taken for `id`, if one exists and a surrogate was present.
    pub fn get_side_pocketed_original_surrogate_state(
        &self,
        id: EntityId,
    ) -> Option<&EntitySurrogate> {
        self.side_pocket.get(&id).and_then(Option::as_ref)
    }

    /// Whether `id` has been pocketed in this pass.
    pub fn is_side_pocketed(&self, id: EntityId) -> bool {
        self.side_pocket.contains_key(&id)
    }

    /// Restore `id` to its snapshot.
    ///
    /// If no surrogate existed when it was pocketed, the speculative one is
    /// removed. Calling this for an entity that was never pocketed does
    /// nothing.
    pub fn remove_side_pocketed_original_surrogate_state(&mut self, id: EntityId) {
        match self.side_pocket.remove(&id) {
            Some(Some(original)) => {
                self.surrogates.insert(id, original);
            }
            Some(None) => {
                self.surrogates.remove(&id);
            }
            None => {}
        }
    }

    /// Keep the current surrogate of `id` and forget its snapshot.
    pub fn commit_side_pocketed_original_surrogate_state(&mut self, id: EntityId) {
        self.side_pocket.remove(&id);
    }

    /// Restore every pocketed entity.
    pub fn clear_side_pocketed_original_surrogate_states(&mut self) {
        let pocketed: Vec<EntityId> = self.side_pocket.keys().copied().collect();
        for id in pocketed {
            self.remove_side_pocketed_original_surrogate_state(id);
        }
    }

    /// Start a scoped set of speculative changes.
    pub fn transaction(&mut self) -> SurrogateTransaction<'_> {
        SurrogateTransaction {
            checker: self,
            touched: Vec::new(),
            committed: false,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The surrogate `command` would produce, built on the current working
    /// set. `None` when the command has no geometric effect.
    pub fn surrogate_for_command(
        &self,
        scene: &dyn SceneAccess,
        command: &Command,
    ) -> Result<Option<EntitySurrogate>, ValidationError> {
        self.speculate(scene, command, true)
    }

    fn speculate(
        &self,
        scene: &dyn SceneAccess,
        command: &Command,
        use_surrogates: bool,
    ) -> Result<Option<EntitySurrogate>, ValidationError> {
        let Some(id) = command.entity_id() else {
            return Ok(None);
        };
        let mut surrogate = match &command.action {
            CommandAction::AddEntity { entity }
            | CommandAction::AddSegment { entity }
            | CommandAction::AddVertex { entity } => EntitySurrogate::from_entity(entity),
            _ => self.state(scene, id, use_surrogates)?.into_owned(),
        };
        Ok(surrogate.apply(command).then_some(surrogate))
    }

    fn state<'a>(
        &'a self,
        scene: &dyn SceneAccess,
        id: EntityId,
        use_surrogates: bool,
    ) -> Result<Cow<'a, EntitySurrogate>, ValidationError> {
        if use_surrogates {
            if let Some(s) = self.surrogates.get(&id) {
                return Ok(Cow::Borrowed(s));
            }
        }
        if let Some(entity) = scene.entity(id) {
            return Ok(Cow::Owned(EntitySurrogate::from_entity(entity)));
        }
        // entities added earlier in the pass only exist as surrogates
        self.surrogates
            .get(&id)
            .map(Cow::Borrowed)
            .ok_or(ValidationError::EntityNotFound(id))
    }

    /// World-placed box of `id` as the working set currently sees it.
    /// `None` when the entity is disabled.
    pub fn world_bounds(
        &self,
        scene: &dyn SceneAccess,
        id: EntityId,
        extended: bool,
    ) -> Result<Option<Obb>, ValidationError> {
        let view = View::new(self, scene, true, None);
        view.world_bounds(id, extended)
    }

    /// World-placed box of the command's entity after the command.
    pub fn world_bounds_for_command(
        &self,
        scene: &dyn SceneAccess,
        command: &Command,
        extended: bool,
    ) -> Result<Option<Obb>, ValidationError> {
        let Some(candidate) = self.speculate(scene, command, true)? else {
            return Ok(None);
        };
        let view = View::new(self, scene, true, Some(&candidate));
        view.world_bounds(candidate.entity_id(), extended)
    }

    /// Entities the command's entity would overlap, or `None`.
    pub fn submit_command(
        &self,
        scene: &dyn SceneAccess,
        command: &Command,
        options: CollisionOptions,
    ) -> Result<Option<Vec<EntityId>>, ValidationError> {
        self.collide(scene, command, options, false)
    }

    /// As [`CollisionChecker::submit_command`], also testing every
    /// descendant of the command's entity.
    pub fn submit_command_extended(
        &self,
        scene: &dyn SceneAccess,
        command: &Command,
        options: CollisionOptions,
    ) -> Result<Option<Vec<EntityId>>, ValidationError> {
        self.collide(scene, command, options, true)
    }

    fn collide(
        &self,
        scene: &dyn SceneAccess,
        command: &Command,
        options: CollisionOptions,
        with_descendants: bool,
    ) -> Result<Option<Vec<EntityId>>, ValidationError> {
        if command.is_remove() {
            return Ok(None);
        }
        let Some(candidate) = self.speculate(scene, command, options.use_surrogates)? else {
            return Ok(None);
        };
        if candidate.kind() == EntityKind::Zone || !candidate.is_enabled() {
            return Ok(None);
        }

        let id = candidate.entity_id();
        let view = View::new(self, scene, options.use_surrogates, Some(&candidate));
        let descendants = view.descendants(id)?;

        let mut family: BTreeSet<EntityId> = view.ancestors(id)?.into_iter().collect();
        family.insert(id);
        family.extend(descendants.iter().copied());

        let mut probes = Vec::new();
        let tested = if with_descendants {
            std::iter::once(id).chain(descendants).collect()
        } else {
            vec![id]
        };
        for probe in tested {
            if let Some(obb) = view.world_bounds(probe, options.use_entity_extended_bounds)? {
                probes.push(obb);
            }
        }

        let epsilon = self.epsilon + options.margin;
        let zone = scene.active_zone();
        let mut hits = Vec::new();
        for target in view.known_ids() {
            if family.contains(&target) {
                continue;
            }
            let state = view.state(target)?;
            if !state.is_enabled() || state.kind() == EntityKind::Zone {
                continue;
            }
            if let Some(zone) = zone {
                if !view.ancestors(target)?.contains(&zone) {
                    continue;
                }
            }

            let world = view.world_transform(target)?;
            let mut target_box = state.bounds(options.use_targets_extended_bounds).clone();
            target_box.transform(&world);

            let triangles: Vec<[Point3; 3]> = state
                .scaled_mesh()
                .map(|tri| tri.map(|v| world.apply_point(&v)))
                .collect();

            // a box wholly inside a closed mesh touches no triangle
            let hit = probes.iter().any(|probe| {
                probe.intersects(&target_box, epsilon)
                    && (triangles.is_empty()
                        || triangles.iter().any(|tri| probe.intersects_triangle(tri))
                        || point_in_mesh(&probe.center(), &triangles))
            });
            if hit {
                hits.push(target);
            }
        }

        tracing::trace!("entity {} collides with {:?}", id, hits);
        Ok((!hits.is_empty()).then_some(hits))
    }
}

/// Read-only resolution of entity state for one query.
///
/// The optional speculative surrogate shadows everything else for its
/// entity, so descendants follow a moved parent.
struct View<'a> {
    checker: &'a CollisionChecker,
    scene: &'a dyn SceneAccess,
    use_surrogates: bool,
    speculative: Option<&'a EntitySurrogate>,
}

impl<'a> View<'a> {
    fn new(
        checker: &'a CollisionChecker,
        scene: &'a dyn SceneAccess,
        use_surrogates: bool,
        speculative: Option<&'a EntitySurrogate>,
    ) -> Self {
        Self {
            checker,
            scene,
            use_surrogates,
            speculative,
        }
    }

    fn state(&self, id: EntityId) -> Result<Cow<'a, EntitySurrogate>, ValidationError> {
        match self.speculative {
            Some(s) if s.entity_id() == id => Ok(Cow::Borrowed(s)),
            _ => self.checker.state(self.scene, id, self.use_surrogates),
        }
    }

    fn known_ids(&self) -> BTreeSet<EntityId> {
        let mut ids: BTreeSet<EntityId> = self.scene.entity_ids().into_iter().collect();
        if self.use_surrogates {
            ids.extend(self.checker.surrogates.keys().copied());
        }
        if let Some(s) = self.speculative {
            ids.insert(s.entity_id());
        }
        ids
    }

    /// Parent chain of `id`, nearest first, not including `id`.
    fn ancestors(&self, id: EntityId) -> Result<Vec<EntityId>, ValidationError> {
        let mut chain = Vec::new();
        let mut current = self.state(id)?.parent();
        while let Some(c) = current {
            if c == id || chain.contains(&c) {
                return Err(ValidationError::CyclicHierarchy(id));
            }
            chain.push(c);
            current = self.state(c)?.parent();
        }
        Ok(chain)
    }

    fn descendants(&self, id: EntityId) -> Result<Vec<EntityId>, ValidationError> {
        let mut parents: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
        for other in self.known_ids() {
            if let Some(parent) = self.state(other)?.parent() {
                parents.entry(parent).or_default().push(other);
            }
        }
        let mut found = Vec::new();
        let mut frontier = vec![id];
        while let Some(next) = frontier.pop() {
            for &child in parents.get(&next).into_iter().flatten() {
                if child == id || found.contains(&child) {
                    return Err(ValidationError::CyclicHierarchy(id));
                }
                found.push(child);
                frontier.push(child);
            }
        }
        Ok(found)
    }

    fn world_transform(&self, id: EntityId) -> Result<Transform, ValidationError> {
        let mut locals = vec![self.state(id)?.local_transform()];
        for ancestor in self.ancestors(id)? {
            locals.push(self.state(ancestor)?.local_transform());
        }
        let world = locals
            .iter()
            .rev()
            .fold(Transform::identity(), |acc, local| acc.then(local));
        if world.matrix.iter().all(|v| v.is_finite()) {
            Ok(world)
        } else {
            Err(ValidationError::DegenerateTransform(id))
        }
    }

    fn world_bounds(&self, id: EntityId, extended: bool) -> Result<Option<Obb>, ValidationError> {
        let state = self.state(id)?;
        if !state.is_enabled() {
            return Ok(None);
        }
        let mut obb = state.bounds(extended).clone();
        obb.transform(&self.world_transform(id)?);
        Ok(Some(obb))
    }
}

/// Scoped speculative changes to a [`CollisionChecker`].
///
/// Every surrogate staged through the transaction is side-pocketed first.
/// Dropping the transaction without [`SurrogateTransaction::commit`]
/// restores all of them.
#[derive(Debug)]
pub struct SurrogateTransaction<'a> {
    checker: &'a mut CollisionChecker,
    touched: Vec<EntityId>,
    committed: bool,
}

impl SurrogateTransaction<'_> {
    /// Read access to the checker, including staged changes.
    pub fn checker(&self) -> &CollisionChecker {
        self.checker
    }

    /// Replace the surrogate for its entity, remembering the prior state.
    pub fn stage(&mut self, surrogate: EntitySurrogate) {
        let id = surrogate.entity_id();
        self.checker.set_side_pocketed_original_surrogate_state(id);
        if !self.touched.contains(&id) {
            self.touched.push(id);
        }
        self.checker.add_surrogate(surrogate);
    }

    /// Entities staged so far.
    pub fn touched(&self) -> &[EntityId] {
        &self.touched
    }

    /// Keep every staged change.
    pub fn commit(mut self) {
        for &id in &self.touched {
            self.checker.commit_side_pocketed_original_surrogate_state(id);
        }
        self.committed = true;
    }
}

impl Drop for SurrogateTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for &id in self.touched.iter().rev() {
            self.checker.remove_side_pocketed_original_surrogate_state(id);
        }
    }
}
