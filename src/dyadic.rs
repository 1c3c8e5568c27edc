//! Nested intervals over dyadic fractions (denominators are powers of two).
//!
//! ```text
//! .
//! └── root [lft: 0/1 | rgt: 1/1]
//!     ├── child1 [lft: 0/1 | rgt: 1/2]
//!     │   ├── subChild1 [lft: 0/1 | rgt: 1/4]
//!     │   │   └── subSubChild [lft: 0/1 | rgt: 1/8]
//!     │   └── subChild2 [lft: 1/4 | rgt: 3/8]
//!     └── child2 [lft: 1/2 | rgt: 3/4]
//!         └── lastSubChild [lft: 1/2 | rgt: 5/8]
//! ```
//!
//! A first child takes the lower half of its parent, every following sibling
//! takes half of what its predecessor's tail leaves over. Nothing that already
//! exists ever moves, so insertion touches exactly one record. The cost is that
//! denominators double with every level and every sibling, and nothing is
//! renumbered on removal: a new child always goes after the current rightmost
//! one, so space freed in front of it is never handed out again. A parent that
//! keeps gaining and losing children eventually runs out of `i64` room and
//! insertion below it fails with [`NestsetError::EncodingExhausted`].
//!
//! Because a node and its first child share the same head, the head alone does
//! not order a tree; depth breaks the tie and is part of every containment test.

use std::cmp::Ordering;
use std::fmt;

use crate::encoding::{Encoding, Predicate};
use crate::error::{NestsetError, Result};
use crate::node::{Depth, Node};

pub const START: i64 = 0;
pub const END: i64 = 1;

// ------------- Fraction -------------
/// An exact, reduced fraction with a positive power-of-two denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction { num: START, den: END };
    pub const ONE: Fraction = Fraction { num: END, den: END };

    /// `None` unless `den` is a positive power of two.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        if den <= 0 || den.count_ones() != 1 {
            return None;
        }
        Some(Self { num, den }.reduced())
    }
    pub fn num(&self) -> i64 {
        self.num
    }
    pub fn den(&self) -> i64 {
        self.den
    }
    pub fn to_f64(&self) -> f64 {
        // exact division by a power of two, so this is round-to-nearest of the true value
        self.num as f64 / self.den as f64
    }
    fn reduced(mut self) -> Self {
        if self.num == 0 {
            return Self::ZERO;
        }
        while self.den > 1 && self.num % 2 == 0 {
            self.num /= 2;
            self.den /= 2;
        }
        self
    }
    /// Exact midpoint of `self` and `other`.
    fn midpoint(&self, other: &Fraction) -> Option<Fraction> {
        let den = self.den.max(other.den);
        let a = self.num.checked_mul(den / self.den)?;
        let b = other.num.checked_mul(den / other.den)?;
        Some(
            Fraction {
                num: a.checked_add(b)?,
                den: den.checked_mul(2)?,
            }
            .reduced(),
        )
    }
    /// `(2 * num + 1) / (2 * den)`: half a denominator step past `self`.
    fn half_step(&self) -> Option<Fraction> {
        Some(Fraction {
            num: self.num.checked_mul(2)?.checked_add(1)?,
            den: self.den.checked_mul(2)?,
        })
    }
}
impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}
impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

// ------------- Interval -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DyadicInterval {
    head: Fraction,
    tail: Fraction,
}

impl DyadicInterval {
    pub fn new(head: Fraction, tail: Fraction) -> Option<Self> {
        if head < tail { Some(Self { head, tail }) } else { None }
    }
    pub fn head(&self) -> Fraction {
        self.head
    }
    pub fn tail(&self) -> Fraction {
        self.tail
    }
}
impl fmt::Display for DyadicInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lft: {} | rgt: {}", self.head, self.tail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DyadicEncoding;

impl Encoding for DyadicEncoding {
    type Position = DyadicInterval;
    type Bound = Fraction;
    type Shift = ();

    const NAME: &'static str = "dyadic";

    fn root_position() -> DyadicInterval {
        DyadicInterval {
            head: Fraction::ZERO,
            tail: Fraction::ONE,
        }
    }
    fn first_child_position(
        parent: &DyadicInterval,
        parent_depth: Depth,
    ) -> Result<(DyadicInterval, Depth)> {
        let tail = parent
            .head
            .midpoint(&parent.tail)
            .ok_or_else(|| exhausted("first child", parent))?;
        Ok((
            DyadicInterval {
                head: parent.head,
                tail,
            },
            parent_depth + 1,
        ))
    }
    fn next_sibling_position(
        last_sibling: &DyadicInterval,
        last_sibling_depth: Depth,
    ) -> Result<(DyadicInterval, Depth)> {
        let tail = last_sibling
            .tail
            .half_step()
            .ok_or_else(|| exhausted("next sibling", last_sibling))?;
        Ok((
            DyadicInterval {
                head: last_sibling.tail,
                tail,
            },
            last_sibling_depth,
        ))
    }
    fn lower(position: &DyadicInterval) -> Fraction {
        position.head
    }
    fn upper(position: &DyadicInterval) -> Fraction {
        position.tail
    }
    fn contains(outer: &DyadicInterval, inner: &DyadicInterval) -> bool {
        outer != inner && outer.head <= inner.head && inner.tail <= outer.tail
    }
    // there is no fixed epsilon below the parent's tail, so take the
    // direct child that starts last
    fn rightmost_child(parent: &DyadicInterval, parent_depth: Depth) -> Predicate<Self> {
        Predicate::ChildrenOf(*parent, parent_depth)
    }
    fn insertion_shift(_inserted: &DyadicInterval) -> Option<()> {
        None
    }
    fn width_delta(_removed: &DyadicInterval) -> Option<()> {
        None
    }
    fn shifted_by(_shift: &()) -> Predicate<Self> {
        Predicate::All
    }
    fn shift(position: &DyadicInterval, _shift: &()) -> DyadicInterval {
        *position
    }
    // level by level, left to right within a level
    fn sub_tree_order(a: &Node<Self>, b: &Node<Self>) -> Ordering {
        a.depth()
            .cmp(&b.depth())
            .then_with(|| Self::document_order(a, b))
    }
}

fn exhausted(what: &str, position: &DyadicInterval) -> NestsetError {
    NestsetError::EncodingExhausted(format!(
        "no {} fraction left after [{}]",
        what, position
    ))
}
