use nestset::engine::TreeRepository;
use nestset::interval::{Interval, IntervalEncoding};
use nestset::node::Node;
use nestset::persist::{PersistenceMode, Persistor};
use nestset::render::render;

type Repo = TreeRepository<IntervalEncoding, Persistor<IntervalEncoding>>;

fn repo() -> Repo {
    TreeRepository::new(Persistor::new(PersistenceMode::InMemory).expect("store"))
}

fn bounds(node: &Node<IntervalEncoding>) -> (i64, i64) {
    let p = node.position().expect("attached");
    (p.lft(), p.rgt())
}

fn names(nodes: &[Node<IntervalEncoding>]) -> Vec<&str> {
    nodes.iter().map(|n| n.name()).collect()
}

// root, child-1 { subChild-1 { subSubChild }, subChild-2 }, child-2 { lastSubChild }
fn sample_tree(repo: &Repo) -> Vec<Node<IntervalEncoding>> {
    let mut root = Node::new("root");
    repo.start_tree_with_id(&mut root, 1).unwrap();
    let mut child1 = Node::new("child-1");
    repo.add_child(&mut root, &mut child1).unwrap();
    let mut sub_child1 = Node::new("subChild-1");
    repo.add_child(&mut child1, &mut sub_child1).unwrap();
    let mut sub_sub_child = Node::new("subSubChild");
    repo.add_child(&mut sub_child1, &mut sub_sub_child).unwrap();
    let mut sub_child2 = Node::new("subChild-2");
    repo.add_child(&mut child1, &mut sub_child2).unwrap();
    let mut child2 = Node::new("child-2");
    repo.add_child(&mut root, &mut child2).unwrap();
    let mut last_sub_child = Node::new("lastSubChild");
    repo.add_child(&mut child2, &mut last_sub_child).unwrap();
    vec![root, child1, sub_child1, sub_sub_child, sub_child2, child2, last_sub_child]
}

#[test]
fn two_level_tree() {
    let repo = repo();
    let mut root = Node::new("root");
    let mut child = Node::new("child");
    repo.start_tree_with_id(&mut root, 100).expect("start");
    assert_eq!(bounds(&root), (1, 2));
    repo.add_child(&mut root, &mut child).expect("add");
    assert_eq!(bounds(&root), (1, 4));
    assert_eq!(bounds(&child), (2, 3));
    assert_eq!(child.depth(), Some(1));
    assert_eq!(child.tree_id(), Some(100));
    assert_eq!(
        render(&repo, &root).unwrap(),
        ".\n└── root (id: 1) [treeId: 100 | lft: 1 | rgt: 4]\n    └── child (id: 2) [treeId: 100 | lft: 2 | rgt: 3]"
    );
}

#[test]
fn started_tree_is_found_by_its_id() {
    let repo = repo();
    let mut root = Node::new("root");
    let tree_id = repo.start_tree(&mut root).expect("start");
    assert!(tree_id > 0);
    assert_eq!(root.tree_id(), Some(tree_id));
    assert_eq!(root.position(), Interval::new(1, 2).as_ref());
    assert_eq!(root.depth(), Some(0));
    assert_eq!(repo.find_tree_root(tree_id).unwrap(), root);
}

#[test]
fn sample_tree_renders() {
    let repo = repo();
    sample_tree(&repo);
    let root = repo.find_tree_root(1).unwrap();
    let expected = "\
.
└── root (id: 1) [treeId: 1 | lft: 1 | rgt: 14]
    ├── child-1 (id: 2) [treeId: 1 | lft: 2 | rgt: 9]
    │   ├── subChild-1 (id: 3) [treeId: 1 | lft: 3 | rgt: 6]
    │   │   └── subSubChild (id: 4) [treeId: 1 | lft: 4 | rgt: 5]
    │   └── subChild-2 (id: 5) [treeId: 1 | lft: 7 | rgt: 8]
    └── child-2 (id: 6) [treeId: 1 | lft: 10 | rgt: 13]
        └── lastSubChild (id: 7) [treeId: 1 | lft: 11 | rgt: 12]";
    assert_eq!(render(&repo, &root).unwrap(), expected);

    let child1 = repo.find_by_name("child-1").unwrap().expect("child-1");
    let expected = "\
.
└── child-1 (id: 2) [treeId: 1 | lft: 2 | rgt: 9]
    ├── subChild-1 (id: 3) [treeId: 1 | lft: 3 | rgt: 6]
    │   └── subSubChild (id: 4) [treeId: 1 | lft: 4 | rgt: 5]
    └── subChild-2 (id: 5) [treeId: 1 | lft: 7 | rgt: 8]";
    assert_eq!(render(&repo, &child1).unwrap(), expected);
}

#[test]
fn removing_a_branch_reflows_the_rest() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    let root = repo.find_tree_root(1).unwrap();
    let removed = repo.remove_child(&root, &nodes[1]).expect("remove");
    assert_eq!(
        names(&removed),
        vec!["child-1", "subChild-1", "subSubChild", "subChild-2"]
    );
    let root = repo.find_tree_root(1).unwrap();
    let expected = "\
.
└── root (id: 1) [treeId: 1 | lft: 1 | rgt: 6]
    └── child-2 (id: 6) [treeId: 1 | lft: 2 | rgt: 5]
        └── lastSubChild (id: 7) [treeId: 1 | lft: 3 | rgt: 4]";
    assert_eq!(render(&repo, &root).unwrap(), expected);
    assert_eq!(repo.count().unwrap(), 3);
}

#[test]
fn sibling_removal_shifts_right_sibling() {
    let repo = repo();
    let mut root = Node::new("root");
    repo.start_tree_with_id(&mut root, 5).unwrap();
    let mut a = Node::new("A");
    let mut b = Node::new("B");
    repo.add_child(&mut root, &mut a).unwrap();
    repo.add_child(&mut root, &mut b).unwrap();
    assert_eq!(bounds(&a), (2, 3));
    assert_eq!(bounds(&b), (4, 5));

    repo.remove_child(&root, &a).unwrap();
    let b = repo.refresh(&b).unwrap();
    assert_eq!(bounds(&b), (2, 3));
    let children = repo.find_children(&root).unwrap();
    assert_eq!(names(&children), vec!["B"]);
    assert_eq!(bounds(&repo.find_tree_root(5).unwrap()), (1, 4));
}

#[test]
fn adding_to_a_leaf_widens_only_its_ancestors() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    let before: Vec<_> = nodes
        .iter()
        .map(|n| bounds(&repo.refresh(n).unwrap()))
        .collect();
    // subChild-2 is a leaf in the middle of the tree
    let mut leaf = repo.refresh(&nodes[4]).unwrap();
    let mut extra = Node::new("extra");
    repo.add_child(&mut leaf, &mut extra).unwrap();
    assert_eq!(bounds(&extra), (8, 9));

    let widths = |(lft, rgt): (i64, i64)| rgt - lft + 1;
    let ancestors = ["root", "child-1", "subChild-2"];
    for (node, old) in nodes.iter().zip(before) {
        let now = bounds(&repo.refresh(node).unwrap());
        if ancestors.contains(&node.name()) {
            assert_eq!(widths(now), widths(old) + 2, "{} should widen", node.name());
        } else {
            assert_eq!(widths(now), widths(old), "{} should keep its width", node.name());
        }
    }
}

#[test]
fn queries_follow_the_hierarchy() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    let sub_sub_child = &nodes[3];

    let ancestors = repo.find_ancestors(sub_sub_child).unwrap();
    assert_eq!(names(&ancestors), vec!["root", "child-1", "subChild-1"]);
    let parent = repo.find_parent(sub_sub_child).unwrap().expect("parent");
    assert_eq!(parent.name(), "subChild-1");
    assert!(repo.find_parent(&nodes[0]).unwrap().is_none());
    assert!(repo.find_ancestors(&nodes[0]).unwrap().is_empty());

    let children = repo.find_children(&nodes[0]).unwrap();
    assert_eq!(names(&children), vec!["child-1", "child-2"]);
    let sub_tree = repo.find_sub_tree(&nodes[1]).unwrap();
    assert_eq!(
        names(&sub_tree),
        vec!["child-1", "subChild-1", "subSubChild", "subChild-2"]
    );
    let rightmost = repo.find_rightmost_child(&nodes[1]).unwrap().expect("rightmost");
    assert_eq!(rightmost.name(), "subChild-2");
    assert!(repo.find_rightmost_child(sub_sub_child).unwrap().is_none());
    assert!(repo.find_children(sub_sub_child).unwrap().is_empty());
}

#[test]
fn every_node_is_reachable_from_its_ancestors() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    for node in &nodes {
        let ancestors = repo.find_ancestors(node).unwrap();
        let mut path = ancestors.clone();
        path.push(repo.refresh(node).unwrap());
        assert_eq!(path[0].name(), "root");
        for pair in path.windows(2) {
            let children = repo.find_children(&pair[0]).unwrap();
            assert!(children.contains(&pair[1]), "{} under {}", pair[1], pair[0]);
            assert_eq!(repo.find_parent(&pair[1]).unwrap().as_ref(), Some(&pair[0]));
        }
    }
}

#[test]
fn removal_returns_the_subtree_detached() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    let stale_child1 = nodes[1].clone();
    let expected = repo.find_sub_tree(&stale_child1).unwrap();
    let root = repo.find_tree_root(1).unwrap();
    let removed = repo.remove_child(&root, &stale_child1).unwrap();

    assert_eq!(names(&removed), names(&expected));
    assert!(removed.iter().all(|n| !n.has_tree_id() && n.id().is_none()));
    assert!(repo.find_sub_tree(&stale_child1).unwrap().is_empty());
    for node in &expected {
        assert!(repo.find_by_id(node.id().unwrap()).unwrap().is_none());
    }
}

#[test]
fn deep_descendant_can_be_removed_through_an_ancestor() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    let root = repo.find_tree_root(1).unwrap();
    let removed = repo.remove_child(&root, &nodes[3]).unwrap();
    assert_eq!(names(&removed), vec!["subSubChild"]);
    let sub_child1 = repo.refresh(&nodes[2]).unwrap();
    assert_eq!(bounds(&sub_child1), (3, 4));
    assert_eq!(bounds(&repo.find_tree_root(1).unwrap()), (1, 12));
}

#[test]
fn saved_node_keeps_its_id_when_planted() {
    let repo = repo();
    let mut node = Node::new("saved");
    repo.save(&mut node).unwrap();
    let id = node.id().expect("id after save");
    assert!(!node.has_tree_id());
    assert_eq!(repo.find_by_name("saved").unwrap().as_ref(), Some(&node));

    repo.start_tree_with_id(&mut node, 9).unwrap();
    assert_eq!(node.id(), Some(id));
    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.find_by_id(id).unwrap().as_ref(), Some(&node));
}

#[test]
fn trees_are_independent() {
    let repo = repo();
    let mut a = Node::new("a");
    let mut b = Node::new("b");
    repo.start_tree_with_id(&mut a, 1).unwrap();
    repo.start_tree_with_id(&mut b, 2).unwrap();
    let mut a_child = Node::new("a-child");
    repo.add_child(&mut a, &mut a_child).unwrap();
    assert_eq!(bounds(&repo.find_tree_root(2).unwrap()), (1, 2));
    assert!(repo.find_children(&b).unwrap().is_empty());
    assert_eq!(names(&repo.find_children(&a).unwrap()), vec!["a-child"]);
}
