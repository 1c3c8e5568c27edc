//! The tree engine and the queries built on top of the store contract.
//!
//! [`TreeRepository`] is written once for any [`Encoding`] and any
//! [`NodeStore`]. Every structural operation reloads the records it depends
//! on, checks its preconditions and writes its changes inside a single unit
//! of work, so a failed precondition never leaves a partial change behind.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::marker::PhantomData;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::encoding::{Encoding, Predicate};
use crate::error::{NestsetError, Result};
use crate::node::{Node, NodeId, TreeId};
use crate::settings::Settings;
use crate::store::{NodeStore, UnitOfWork};

pub const DEFAULT_TREE_ID_ATTEMPTS: u32 = 16;

// ------------- Tree identities -------------
/// Supplies candidate identifiers for new trees. Candidates already in use
/// are rejected by the repository, which then asks for another one.
pub trait TreeIdSource: Send {
    fn next_tree_id(&mut self) -> TreeId;
}

#[derive(Debug)]
pub struct RandomTreeIds {
    rng: StdRng,
}

impl RandomTreeIds {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}
impl Default for RandomTreeIds {
    fn default() -> Self {
        Self::new()
    }
}
impl TreeIdSource for RandomTreeIds {
    fn next_tree_id(&mut self) -> TreeId {
        self.rng.gen_range(1..=TreeId::MAX)
    }
}
impl<F: FnMut() -> TreeId + Send> TreeIdSource for F {
    fn next_tree_id(&mut self) -> TreeId {
        self()
    }
}

// ------------- Repository -------------
pub struct TreeRepository<E: Encoding, S: NodeStore<E>> {
    store: S,
    tree_ids: Mutex<Box<dyn TreeIdSource>>,
    tree_id_attempts: u32,
    _encoding: PhantomData<E>,
}

impl<E: Encoding, S: NodeStore<E>> TreeRepository<E, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tree_ids: Mutex::new(Box::new(RandomTreeIds::new())),
            tree_id_attempts: DEFAULT_TREE_ID_ATTEMPTS,
            _encoding: PhantomData,
        }
    }
    pub fn with_settings(store: S, settings: &Settings) -> Self {
        Self::new(store).with_tree_id_attempts(settings.tree_id_attempts)
    }
    pub fn with_tree_id_source(self, source: impl TreeIdSource + 'static) -> Self {
        Self {
            tree_ids: Mutex::new(Box::new(source)),
            ..self
        }
    }
    pub fn with_tree_id_attempts(self, attempts: u32) -> Self {
        Self {
            tree_id_attempts: attempts.max(1),
            ..self
        }
    }
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------- Structural operations -------------
    /// Makes a detached node the root of a new tree and returns the tree's id.
    pub fn start_tree(&self, node: &mut Node<E>) -> Result<TreeId> {
        ensure_detached(node)?;
        let (tree_id, planted) = self.store.run_atomically(|unit| {
            ensure_stored_detached(unit, node)?;
            let tree_id = self.unused_tree_id(unit)?;
            Ok((tree_id, plant_root(unit, node, tree_id)?))
        })?;
        *node = planted;
        Ok(tree_id)
    }

    /// Like [`TreeRepository::start_tree`] with a caller-chosen tree id.
    pub fn start_tree_with_id(&self, node: &mut Node<E>, tree_id: TreeId) -> Result<()> {
        ensure_detached(node)?;
        let planted = self.store.run_atomically(|unit| {
            ensure_stored_detached(unit, node)?;
            if root_of(unit, tree_id)?.is_some() {
                return Err(NestsetError::TreeIdInUse(tree_id));
            }
            plant_root(unit, node, tree_id)
        })?;
        *node = planted;
        Ok(())
    }

    fn unused_tree_id(&self, unit: &mut dyn UnitOfWork<E>) -> Result<TreeId> {
        let mut source = self
            .tree_ids
            .lock()
            .map_err(|e| NestsetError::Lock(e.to_string()))?;
        for attempt in 1..=self.tree_id_attempts {
            let candidate = source.next_tree_id();
            if root_of(unit, candidate)?.is_none() {
                return Ok(candidate);
            }
            warn!(tree_id = candidate, attempt, "tree id already in use");
        }
        Err(NestsetError::TreeIdGenerationFailed {
            attempts: self.tree_id_attempts,
        })
    }

    pub fn find_tree_root(&self, tree_id: TreeId) -> Result<Node<E>> {
        self.store
            .read(|unit| root_of(unit, tree_id))?
            .ok_or(NestsetError::TreeNotFound(tree_id))
    }

    /// Appends `child` after the current rightmost child of `parent`.
    ///
    /// On success both copies are brought up to date with the store: `child`
    /// carries its new position and `parent` its possibly widened interval.
    /// Other copies of nodes in the same tree may be stale afterwards.
    ///
    /// Both nodes are resolved against their stored records first: a parent
    /// whose record is gone is not attached, and a child whose record already
    /// sits in a tree is rejected even when the copy passed in looks detached.
    pub fn add_child(&self, parent: &mut Node<E>, child: &mut Node<E>) -> Result<()> {
        if !parent.has_tree_id() {
            return Err(NestsetError::ParentNotAttached(parent.to_string()));
        }
        ensure_detached(child)?;
        let (refreshed, attached) = self.store.run_atomically(|unit| {
            let Some(current) = current(unit, parent)? else {
                return Err(NestsetError::ParentNotAttached(parent.to_string()));
            };
            let Some((tree_id, position, depth)) = current.placement() else {
                return Err(NestsetError::ParentNotAttached(current.to_string()));
            };
            ensure_stored_detached(unit, child)?;
            let rightmost = unit
                .query(tree_id, &E::rightmost_child(position, depth))?
                .pop();
            let (child_position, child_depth) = match &rightmost {
                None => E::first_child_position(position, depth)?,
                Some(sibling) => {
                    let (_, sibling_position, sibling_depth) = placed(sibling)?;
                    E::next_sibling_position(sibling_position, sibling_depth)?
                }
            };
            let mut refreshed = current.clone();
            if let Some(shift) = E::insertion_shift(&child_position) {
                for mut node in unit.query(tree_id, &E::shifted_by(&shift))? {
                    let moved = E::shift(placed(&node)?.1, &shift);
                    node.move_to(moved);
                    unit.update(&node)?;
                    if node.id() == refreshed.id() {
                        refreshed = node;
                    }
                }
            }
            let mut attached = child.clone();
            attached.attach(tree_id, child_position, child_depth);
            persist(unit, &mut attached)?;
            debug!(
                encoding = E::NAME,
                tree_id,
                parent = %refreshed,
                child = %attached,
                "child added"
            );
            Ok((refreshed, attached))
        })?;
        *parent = refreshed;
        *child = attached;
        Ok(())
    }

    /// Removes `child` and its whole subtree from the tree `parent` belongs to.
    ///
    /// `child` may be any proper descendant of `parent`. The removed nodes are
    /// returned detached, `child` first and then its descendants in the order
    /// [`TreeRepository::find_sub_tree`] reports them. Their records no longer
    /// exist in the store. A child whose record is already gone is not a
    /// descendant of anything.
    pub fn remove_child(&self, parent: &Node<E>, child: &Node<E>) -> Result<Vec<Node<E>>> {
        if !parent.has_tree_id() {
            return Err(NestsetError::ParentNotAttached(parent.to_string()));
        }
        let mut removed = self.store.run_atomically(|unit| {
            let Some(parent) = current(unit, parent)? else {
                return Err(NestsetError::ParentNotAttached(parent.to_string()));
            };
            let Some((tree_id, parent_position, _)) = parent.placement() else {
                return Err(NestsetError::ParentNotAttached(parent.to_string()));
            };
            let Some(child) = current(unit, child)? else {
                return Err(NestsetError::NotADescendant {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            };
            let not_a_descendant = || NestsetError::NotADescendant {
                parent: parent.to_string(),
                child: child.to_string(),
            };
            let (child_tree_id, child_position, child_depth) =
                child.placement().ok_or_else(not_a_descendant)?;
            if child_tree_id != tree_id || !E::contains(parent_position, child_position) {
                return Err(not_a_descendant());
            }
            let removed = sub_tree_of(unit, tree_id, child_position, child_depth)?;
            if let Some(shift) = E::width_delta(child_position) {
                for mut node in unit.query(tree_id, &E::shifted_by(&shift))? {
                    // the removed subtree lies entirely before the pivot
                    let moved = E::shift(placed(&node)?.1, &shift);
                    node.move_to(moved);
                    unit.update(&node)?;
                }
            }
            for node in &removed {
                unit.delete(node)?;
            }
            debug!(
                encoding = E::NAME,
                tree_id,
                child = %child,
                removed = removed.len(),
                "subtree removed"
            );
            Ok(removed)
        })?;
        for node in &mut removed {
            node.detach();
        }
        Ok(removed)
    }

    // ------------- Queries -------------
    // Queries look `node` up by id first, so a stale copy still answers from
    // the stored position and a removed node has nothing left below or above it.

    /// Direct children of `node`, left to right.
    pub fn find_children(&self, node: &Node<E>) -> Result<Vec<Node<E>>> {
        self.store.read(|unit| {
            let Some(current) = current(unit, node)? else {
                return Ok(Vec::new());
            };
            match current.placement() {
                Some((tree_id, position, depth)) => {
                    unit.query(tree_id, &Predicate::ChildrenOf(*position, depth))
                }
                None => Ok(Vec::new()),
            }
        })
    }

    /// `node` together with all of its direct and indirect children.
    pub fn find_sub_tree(&self, node: &Node<E>) -> Result<Vec<Node<E>>> {
        self.store.read(|unit| {
            let Some(current) = current(unit, node)? else {
                return Ok(Vec::new());
            };
            match current.placement() {
                Some((tree_id, position, depth)) => sub_tree_of(unit, tree_id, position, depth),
                None => Ok(Vec::new()),
            }
        })
    }

    /// Every ancestor of `node`, root first; empty for a root.
    pub fn find_ancestors(&self, node: &Node<E>) -> Result<Vec<Node<E>>> {
        self.store.read(|unit| {
            let Some(current) = current(unit, node)? else {
                return Ok(Vec::new());
            };
            match current.placement() {
                Some((tree_id, position, depth)) => {
                    unit.query(tree_id, &Predicate::Enclosing(*position, depth))
                }
                None => Ok(Vec::new()),
            }
        })
    }

    /// The nearest ancestor of `node`, `None` for a root.
    pub fn find_parent(&self, node: &Node<E>) -> Result<Option<Node<E>>> {
        Ok(self.find_ancestors(node)?.pop())
    }

    /// The last child added below `node`, which is also the rightmost one.
    pub fn find_rightmost_child(&self, node: &Node<E>) -> Result<Option<Node<E>>> {
        self.store.read(|unit| {
            let Some(current) = current(unit, node)? else {
                return Ok(None);
            };
            match current.placement() {
                Some((tree_id, position, depth)) => Ok(unit
                    .query(tree_id, &E::rightmost_child(position, depth))?
                    .pop()),
                None => Ok(None),
            }
        })
    }

    // ------------- Plain record access -------------
    /// Persists a detached node so it has an id before joining a tree.
    pub fn save(&self, node: &mut Node<E>) -> Result<()> {
        ensure_detached(node)?;
        let saved = self.store.run_atomically(|unit| {
            ensure_stored_detached(unit, node)?;
            let mut saved = node.clone();
            persist(unit, &mut saved)?;
            Ok(saved)
        })?;
        *node = saved;
        Ok(())
    }
    pub fn find_by_id(&self, id: NodeId) -> Result<Option<Node<E>>> {
        self.store.read(|unit| unit.get(id))
    }
    pub fn find_by_name(&self, name: &str) -> Result<Option<Node<E>>> {
        self.store.read(|unit| unit.find_by_name(name))
    }
    pub fn count(&self) -> Result<u64> {
        self.store.read(|unit| unit.count())
    }
    /// The stored state of `node`; a node without a record is returned as is.
    pub fn refresh(&self, node: &Node<E>) -> Result<Node<E>> {
        self.store.read(|unit| reload(unit, node))
    }
}

// ------------- Helpers -------------
fn ensure_detached<E: Encoding>(node: &Node<E>) -> Result<()> {
    match node.tree_id() {
        Some(tree_id) => Err(NestsetError::NodeAlreadyInTree { tree_id }),
        None => Ok(()),
    }
}

fn placed<E: Encoding>(node: &Node<E>) -> Result<(TreeId, &E::Position, i64)> {
    node.placement()
        .ok_or_else(|| NestsetError::Invariant(format!("{} has no position", node)))
}

fn reload<E: Encoding>(unit: &mut dyn UnitOfWork<E>, node: &Node<E>) -> Result<Node<E>> {
    match node.id() {
        Some(id) => Ok(unit.get(id)?.unwrap_or_else(|| node.clone())),
        None => Ok(node.clone()),
    }
}

// A copy may look detached while its record already sits in a tree.
fn ensure_stored_detached<E: Encoding>(unit: &mut dyn UnitOfWork<E>, node: &Node<E>) -> Result<()> {
    let stored = current(unit, node)?.ok_or_else(|| {
        NestsetError::Invariant(format!("{} has an id but no record", node))
    })?;
    ensure_detached(&stored)
}

// `None` once the record behind `node` has been deleted
fn current<E: Encoding>(unit: &mut dyn UnitOfWork<E>, node: &Node<E>) -> Result<Option<Node<E>>> {
    match node.id() {
        Some(id) => unit.get(id),
        None => Ok(Some(node.clone())),
    }
}

fn persist<E: Encoding>(unit: &mut dyn UnitOfWork<E>, node: &mut Node<E>) -> Result<()> {
    match node.id() {
        Some(_) => unit.update(node),
        None => unit.insert(node),
    }
}

fn root_of<E: Encoding>(unit: &mut dyn UnitOfWork<E>, tree_id: TreeId) -> Result<Option<Node<E>>> {
    let mut roots = unit.query(tree_id, &Predicate::Root)?;
    if roots.len() > 1 {
        return Err(NestsetError::Invariant(format!(
            "tree {} has {} roots",
            tree_id,
            roots.len()
        )));
    }
    Ok(roots.pop())
}

fn plant_root<E: Encoding>(
    unit: &mut dyn UnitOfWork<E>,
    node: &Node<E>,
    tree_id: TreeId,
) -> Result<Node<E>> {
    let mut planted = node.clone();
    planted.attach(tree_id, E::root_position(), 0);
    persist(unit, &mut planted)?;
    debug!(encoding = E::NAME, tree_id, root = %planted, "tree started");
    Ok(planted)
}

fn sub_tree_of<E: Encoding>(
    unit: &mut dyn UnitOfWork<E>,
    tree_id: TreeId,
    position: &E::Position,
    depth: i64,
) -> Result<Vec<Node<E>>> {
    let mut nodes: Vec<Node<E>> = unit
        .query(tree_id, &Predicate::ContainedIn(*position))?
        .into_iter()
        .filter(|node| node.depth().is_some_and(|d| d >= depth))
        .collect();
    nodes.sort_by(E::sub_tree_order);
    Ok(nodes)
}
