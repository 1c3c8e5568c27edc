//! Classic nested sets: every node holds an integer `lft`/`rgt` pair and a
//! node's descendants are exactly the nodes whose bounds lie between its own.
//!
//! ```text
//! .
//! └── root [lft: 1 | rgt: 14]
//!     ├── child1 [lft: 2 | rgt: 9]
//!     │   ├── subChild1 [lft: 3 | rgt: 6]
//!     │   │   └── subSubChild [lft: 4 | rgt: 5]
//!     │   └── subChild2 [lft: 7 | rgt: 8]
//!     └── child2 [lft: 10 | rgt: 13]
//!         └── lastSubChild [lft: 11 | rgt: 12]
//! ```
//!
//! Reads are single range scans; the price is paid on writes, where every
//! bound after the insertion or removal point is renumbered.

use std::fmt;

use crate::encoding::{Encoding, Predicate};
use crate::error::{NestsetError, Result};
use crate::node::Depth;

pub const ROOT_LFT: i64 = 1;
pub const ROOT_RGT: i64 = 2;
// every node occupies two consecutive numbers
pub const NODE_WIDTH: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    lft: i64,
    rgt: i64,
}

impl Interval {
    pub fn new(lft: i64, rgt: i64) -> Option<Self> {
        if lft < rgt { Some(Self { lft, rgt }) } else { None }
    }
    pub fn lft(&self) -> i64 {
        self.lft
    }
    pub fn rgt(&self) -> i64 {
        self.rgt
    }
    /// Number of positions taken by the node and its subtree.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }
}
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lft: {} | rgt: {}", self.lft, self.rgt)
    }
}

/// Bounds strictly greater than `pivot` move by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalShift {
    pub pivot: i64,
    pub delta: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntervalEncoding;

impl Encoding for IntervalEncoding {
    type Position = Interval;
    type Bound = i64;
    type Shift = IntervalShift;

    const NAME: &'static str = "interval";

    fn root_position() -> Interval {
        Interval { lft: ROOT_LFT, rgt: ROOT_RGT }
    }
    fn first_child_position(parent: &Interval, parent_depth: Depth) -> Result<(Interval, Depth)> {
        let lft = parent.lft.checked_add(1).ok_or_else(|| overflow(parent))?;
        Ok((Interval { lft, rgt: lft + 1 }, parent_depth + 1))
    }
    fn next_sibling_position(
        last_sibling: &Interval,
        last_sibling_depth: Depth,
    ) -> Result<(Interval, Depth)> {
        let lft = last_sibling
            .rgt
            .checked_add(1)
            .ok_or_else(|| overflow(last_sibling))?;
        Ok((Interval { lft, rgt: lft + 1 }, last_sibling_depth))
    }
    fn lower(position: &Interval) -> i64 {
        position.lft
    }
    fn upper(position: &Interval) -> i64 {
        position.rgt
    }
    fn contains(outer: &Interval, inner: &Interval) -> bool {
        outer.lft < inner.lft && inner.rgt < outer.rgt
    }
    fn is_root(position: &Interval) -> bool {
        position.lft == ROOT_LFT
    }
    // the rightmost child closes immediately before its parent does
    fn rightmost_child(parent: &Interval, _parent_depth: Depth) -> Predicate<Self> {
        Predicate::UpperEquals(parent.rgt - 1)
    }
    fn insertion_shift(inserted: &Interval) -> Option<IntervalShift> {
        Some(IntervalShift {
            pivot: inserted.lft - 1,
            delta: NODE_WIDTH,
        })
    }
    fn width_delta(removed: &Interval) -> Option<IntervalShift> {
        Some(IntervalShift {
            pivot: removed.rgt,
            delta: -removed.width(),
        })
    }
    // lft > pivot implies rgt > pivot, so this catches both kinds of update
    fn shifted_by(shift: &IntervalShift) -> Predicate<Self> {
        Predicate::UpperAbove(shift.pivot)
    }
    fn shift(position: &Interval, shift: &IntervalShift) -> Interval {
        let moved = |bound: i64| {
            if bound > shift.pivot { bound + shift.delta } else { bound }
        };
        Interval {
            lft: moved(position.lft),
            rgt: moved(position.rgt),
        }
    }
}

fn overflow(position: &Interval) -> NestsetError {
    NestsetError::EncodingExhausted(format!("no integer position left after [{}]", position))
}
