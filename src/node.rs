// used to print out readable forms of a node
use std::fmt;

use crate::encoding::Encoding;

// ------------- Identities -------------
/// Record identity assigned by the store on first insert.
pub type NodeId = i64;
/// Discriminates independent trees kept in the same node collection.
pub type TreeId = i64;
/// Distance from the tree root, the root itself being at depth 0.
pub type Depth = i64;

// ------------- Node -------------
/// A node as it is held in memory for the duration of an operation.
///
/// The store owns the records; a `Node` is a transient copy. After a
/// structural change other copies of nodes in the same tree may be stale,
/// in which case [`crate::engine::TreeRepository::refresh`] re-reads them.
///
/// A node without a tree identifier is detached and carries neither a
/// position nor a depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<E: Encoding> {
    id: Option<NodeId>,
    name: String,
    tree_id: Option<TreeId>,
    position: Option<E::Position>,
    depth: Option<Depth>,
}

impl<E: Encoding> Node<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            tree_id: None,
            position: None,
            depth: None,
        }
    }
    // used by stores when materializing records
    pub fn restore(
        id: NodeId,
        name: String,
        tree_id: Option<TreeId>,
        position: Option<E::Position>,
        depth: Option<Depth>,
    ) -> Self {
        let mut node = Self {
            id: Some(id),
            name,
            tree_id: None,
            position: None,
            depth: None,
        };
        if let (Some(tree_id), Some(position)) = (tree_id, position) {
            node.attach(tree_id, position, depth.unwrap_or_default());
        }
        node
    }
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn tree_id(&self) -> Option<TreeId> {
        self.tree_id
    }
    pub fn has_tree_id(&self) -> bool {
        self.tree_id.is_some()
    }
    pub fn position(&self) -> Option<&E::Position> {
        self.position.as_ref()
    }
    pub fn depth(&self) -> Option<Depth> {
        self.depth
    }
    /// Tree, position and depth of an attached node, all or nothing.
    pub fn placement(&self) -> Option<(TreeId, &E::Position, Depth)> {
        match (self.tree_id, self.position.as_ref(), self.depth) {
            (Some(tree_id), Some(position), Some(depth)) => Some((tree_id, position, depth)),
            _ => None,
        }
    }
    pub(crate) fn assign_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }
    pub(crate) fn attach(&mut self, tree_id: TreeId, position: E::Position, depth: Depth) {
        self.tree_id = Some(tree_id);
        self.position = Some(position);
        self.depth = Some(depth);
    }
    pub(crate) fn move_to(&mut self, position: E::Position) {
        self.position = Some(position);
    }
    // the record no longer exists once a node is detached by removal
    pub(crate) fn detach(&mut self) {
        self.id = None;
        self.tree_id = None;
        self.position = None;
        self.depth = None;
    }
}

// The label used when rendering trees, stable as long as the ids are.
impl<E: Encoding> fmt::Display for Node<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (id: ", self.name)?;
        match self.id {
            Some(id) => write!(f, "{}", id)?,
            None => write!(f, "-")?,
        }
        match (self.tree_id, &self.position) {
            (Some(tree_id), Some(position)) => {
                write!(f, ") [treeId: {} | {}]", tree_id, position)
            }
            _ => write!(f, ") [detached]"),
        }
    }
}
