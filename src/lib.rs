//! nestset – trees kept inside a flat, range-queryable record store.
//!
//! Every node of a tree carries an interval, and intervals nest exactly the
//! way the nodes do. Asking for the subtree, the ancestors or the children
//! of a node is then a single range scan over one tree's records instead of
//! a recursive walk.
//!
//! Two interchangeable encodings back the same repository:
//! * [`interval::IntervalEncoding`] – classic nested sets with integer
//!   `lft`/`rgt` bounds. Compact and fast to read, but inserting or removing
//!   a node renumbers everything positioned after it.
//! * [`dyadic::DyadicEncoding`] – nested intervals over exact dyadic fractions.
//!   Insertion writes a single record and never moves existing nodes, at the
//!   cost of denominators that double with depth and sibling count and of
//!   interval space that is never reclaimed after removal.
//!
//! ## Modules
//! * [`node`] – The [`node::Node`] record shape shared by both encodings.
//! * [`encoding`] – The [`encoding::Encoding`] trait and range [`encoding::Predicate`]s.
//! * [`interval`], [`dyadic`] – The two encodings.
//! * [`store`] – The unit-of-work contract the engine is written against.
//! * [`persist`] – SQLite implementation of that contract.
//! * [`engine`] – [`engine::TreeRepository`]: structural operations and queries.
//! * [`render`] – Box-drawing text rendering of a (sub)tree.
//! * [`settings`] – Configuration file and environment handling.
//!
//! ## Quick Start
//! ```
//! use nestset::{engine::TreeRepository, interval::IntervalEncoding, node::Node};
//! use nestset::persist::{PersistenceMode, Persistor};
//! let store = Persistor::<IntervalEncoding>::new(PersistenceMode::InMemory).unwrap();
//! let repo = TreeRepository::new(store);
//! let mut root = Node::new("root");
//! let mut child = Node::new("child");
//! repo.start_tree_with_id(&mut root, 100).unwrap();
//! repo.add_child(&mut root, &mut child).unwrap();
//! assert_eq!(
//!     nestset::render::render(&repo, &root).unwrap(),
//!     ".\n└── root (id: 1) [treeId: 100 | lft: 1 | rgt: 4]\n    └── child (id: 2) [treeId: 100 | lft: 2 | rgt: 3]"
//! );
//! ```
//!
//! ## Concurrency
//! Structural operations on one tree must not interleave. The SQLite store
//! runs each of them in an immediate transaction, which serializes them
//! through the database write lock. Callers using another store have to
//! provide the same guarantee per tree.

pub mod dyadic;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod interval;
pub mod node;
pub mod persist;
pub mod render;
pub mod settings;
pub mod store;

pub use error::{NestsetError, Result};
