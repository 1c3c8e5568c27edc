//! The record store contract the tree engine is written against.
//!
//! The engine never talks to a database directly. Everything it needs is a
//! unit of work that can read nodes by range predicate within one tree and
//! insert, update and delete single records, plus a way to run such a unit
//! all-or-nothing. [`crate::persist::Persistor`] provides this on SQLite.

use crate::encoding::{Encoding, Predicate};
use crate::error::Result;
use crate::node::{Node, NodeId, TreeId};

pub trait UnitOfWork<E: Encoding> {
    /// Persists a new record and assigns its id to `node`.
    fn insert(&mut self, node: &mut Node<E>) -> Result<()>;
    /// Overwrites the record carrying `node`'s id.
    fn update(&mut self, node: &Node<E>) -> Result<()>;
    fn delete(&mut self, node: &Node<E>) -> Result<()>;
    fn get(&mut self, id: NodeId) -> Result<Option<Node<E>>>;
    /// Nodes of `tree_id` accepted by `predicate`, in document order.
    fn query(&mut self, tree_id: TreeId, predicate: &Predicate<E>) -> Result<Vec<Node<E>>>;
    fn find_by_name(&mut self, name: &str) -> Result<Option<Node<E>>>;
    fn count(&mut self) -> Result<u64>;
}

pub trait NodeStore<E: Encoding> {
    /// Runs `work` with exclusive write access; its writes are committed only
    /// when it returns `Ok`.
    fn run_atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn UnitOfWork<E>) -> Result<T>;
    /// Runs `work` against a consistent snapshot. Writes made through the
    /// unit of work are discarded.
    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn UnitOfWork<E>) -> Result<T>;
}
