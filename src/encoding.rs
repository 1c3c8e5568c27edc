//! The position encoding contract shared by the integer interval encoding
//! ([`crate::interval::IntervalEncoding`]) and the dyadic fraction encoding
//! ([`crate::dyadic::DyadicEncoding`]).
//!
//! An encoding owns all the arithmetic: where a root goes, where a new first
//! child or next sibling goes, how positions compare and how existing
//! positions move when a subtree is inserted or removed. The tree engine is
//! written once against this trait.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use crate::error::Result;
use crate::node::{Depth, Node};

pub trait Encoding:
    fmt::Debug + Clone + Copy + PartialEq + Eq + Default + Send + Sync + 'static
{
    /// One node's interval.
    type Position: fmt::Debug + fmt::Display + Clone + Copy + PartialEq + Eq + Hash + Send + Sync;
    /// A single interval endpoint.
    type Bound: fmt::Debug + fmt::Display + Clone + Copy + Ord + Hash + Send + Sync;
    /// How remaining positions move after an insertion or removal.
    type Shift: fmt::Debug + Clone + Copy + Send + Sync;

    const NAME: &'static str;

    fn root_position() -> Self::Position;
    fn first_child_position(
        parent: &Self::Position,
        parent_depth: Depth,
    ) -> Result<(Self::Position, Depth)>;
    fn next_sibling_position(
        last_sibling: &Self::Position,
        last_sibling_depth: Depth,
    ) -> Result<(Self::Position, Depth)>;

    fn lower(position: &Self::Position) -> Self::Bound;
    fn upper(position: &Self::Position) -> Self::Bound;
    /// Strict containment: `outer` properly contains `inner`.
    fn contains(outer: &Self::Position, inner: &Self::Position) -> bool;
    /// Inclusive containment, the interval itself included.
    fn encloses(outer: &Self::Position, inner: &Self::Position) -> bool {
        outer == inner || Self::contains(outer, inner)
    }
    fn is_root(position: &Self::Position) -> bool {
        *position == Self::root_position()
    }

    /// Predicate locating the current rightmost child of `parent`; the engine
    /// takes the last node of the result.
    fn rightmost_child(parent: &Self::Position, parent_depth: Depth) -> Predicate<Self>;
    /// Shift making room for a node about to be inserted at `inserted`.
    fn insertion_shift(inserted: &Self::Position) -> Option<Self::Shift>;
    /// Shift closing the gap left by removing the subtree at `removed`.
    fn width_delta(removed: &Self::Position) -> Option<Self::Shift>;
    /// Predicate selecting every node a shift may touch.
    fn shifted_by(shift: &Self::Shift) -> Predicate<Self>;
    fn shift(position: &Self::Position, shift: &Self::Shift) -> Self::Position;

    /// Document order: ascending lower bound, ancestors before descendants
    /// sharing the same lower bound.
    fn document_order(a: &Node<Self>, b: &Node<Self>) -> Ordering {
        let lower = |n: &Node<Self>| n.position().map(Self::lower);
        lower(a).cmp(&lower(b)).then(a.depth().cmp(&b.depth()))
    }
    /// Order in which a subtree query reports its nodes.
    fn sub_tree_order(a: &Node<Self>, b: &Node<Self>) -> Ordering {
        Self::document_order(a, b)
    }
}

// ------------- Predicates -------------
/// Range predicates over the position fields of nodes in one tree.
///
/// Stores may evaluate them however they like (SQL, index scans) as long as
/// the returned set is exactly what [`Predicate::matches`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate<E: Encoding> {
    All,
    LowerAbove(E::Bound),
    LowerAtLeast(E::Bound),
    UpperAbove(E::Bound),
    UpperEquals(E::Bound),
    UpperBelow(E::Bound),
    /// Inclusive containment in the given interval.
    ContainedIn(E::Position),
    /// Proper descendants of a node at the given position and depth.
    StrictlyInside(E::Position, Depth),
    /// Direct children of a node at the given position and depth.
    ChildrenOf(E::Position, Depth),
    /// Proper ancestors of a node at the given position and depth.
    Enclosing(E::Position, Depth),
    Root,
}

impl<E: Encoding> Predicate<E> {
    pub fn matches(&self, position: &E::Position, depth: Depth) -> bool {
        match self {
            Predicate::All => true,
            Predicate::LowerAbove(b) => E::lower(position) > *b,
            Predicate::LowerAtLeast(b) => E::lower(position) >= *b,
            Predicate::UpperAbove(b) => E::upper(position) > *b,
            Predicate::UpperEquals(b) => E::upper(position) == *b,
            Predicate::UpperBelow(b) => E::upper(position) < *b,
            Predicate::ContainedIn(outer) => E::encloses(outer, position),
            Predicate::StrictlyInside(outer, outer_depth) => {
                E::contains(outer, position) && depth > *outer_depth
            }
            Predicate::ChildrenOf(outer, outer_depth) => {
                E::contains(outer, position) && depth == outer_depth + 1
            }
            Predicate::Enclosing(inner, inner_depth) => {
                E::contains(position, inner) && depth < *inner_depth
            }
            Predicate::Root => E::is_root(position),
        }
    }
}
