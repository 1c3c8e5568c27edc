use nestset::dyadic::{DyadicEncoding, Fraction};
use nestset::engine::TreeRepository;
use nestset::node::Node;
use nestset::persist::{PersistenceMode, Persistor};
use nestset::render::render;

type Repo = TreeRepository<DyadicEncoding, Persistor<DyadicEncoding>>;

fn repo() -> Repo {
    TreeRepository::new(Persistor::new(PersistenceMode::InMemory).expect("store"))
}

fn bounds(node: &Node<DyadicEncoding>) -> (String, String) {
    let p = node.position().expect("attached");
    (p.head().to_string(), p.tail().to_string())
}

fn interval(text: &str) -> (String, String) {
    let (head, tail) = text.split_once(',').unwrap();
    (head.trim().to_string(), tail.trim().to_string())
}

fn names(nodes: &[Node<DyadicEncoding>]) -> Vec<&str> {
    nodes.iter().map(|n| n.name()).collect()
}

fn sample_tree(repo: &Repo) -> Vec<Node<DyadicEncoding>> {
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
fn fractions_are_reduced_and_ordered() {
    assert_eq!(Fraction::new(2, 4), Fraction::new(1, 2));
    assert_eq!(Fraction::new(0, 8), Some(Fraction::ZERO));
    assert!(Fraction::new(1, 3).is_none());
    assert!(Fraction::new(1, 0).is_none());
    let (a, b) = (Fraction::new(3, 8).unwrap(), Fraction::new(1, 2).unwrap());
    assert!(a < b);
    assert_eq!(Fraction::new(5, 8).unwrap().to_string(), "5/8");
}

#[test]
fn append_only_insertion() {
    let repo = repo();
    let mut root = Node::new("root");
    repo.start_tree_with_id(&mut root, 100).unwrap();
    assert_eq!(bounds(&root), interval("0/1, 1/1"));

    let mut child1 = Node::new("child1");
    repo.add_child(&mut root, &mut child1).unwrap();
    assert_eq!(bounds(&child1), interval("0/1, 1/2"));
    let mut child2 = Node::new("child2");
    repo.add_child(&mut root, &mut child2).unwrap();
    assert_eq!(bounds(&child2), interval("1/2, 3/4"));
    assert_eq!(bounds(&root), interval("0/1, 1/1"));

    repo.remove_child(&root, &child1).unwrap();
    assert_eq!(repo.refresh(&child2).unwrap(), child2);
    assert_eq!(names(&repo.find_children(&root).unwrap()), vec!["child2"]);
}

#[test]
fn only_space_after_the_rightmost_child_is_handed_out() {
    let repo = repo();
    let mut root = Node::new("root");
    repo.start_tree_with_id(&mut root, 3).unwrap();
    let mut first = Node::new("first");
    repo.add_child(&mut root, &mut first).unwrap();
    let mut second = Node::new("second");
    repo.add_child(&mut root, &mut second).unwrap();
    repo.remove_child(&root, &second).unwrap();

    let mut third = Node::new("third");
    repo.add_child(&mut root, &mut third).unwrap();
    assert_eq!(bounds(&third), interval("1/2, 3/4"));
    repo.remove_child(&root, &first).unwrap();
    let mut fourth = Node::new("fourth");
    repo.add_child(&mut root, &mut fourth).unwrap();
    assert_eq!(bounds(&fourth), interval("3/4, 7/8"));
}

#[test]
fn sample_tree_renders() {
    let repo = repo();
    sample_tree(&repo);
    let root = repo.find_tree_root(1).unwrap();
    let expected = "\
.
└── root (id: 1) [treeId: 1 | lft: 0/1 | rgt: 1/1]
    ├── child-1 (id: 2) [treeId: 1 | lft: 0/1 | rgt: 1/2]
    │   ├── subChild-1 (id: 3) [treeId: 1 | lft: 0/1 | rgt: 1/4]
    │   │   └── subSubChild (id: 4) [treeId: 1 | lft: 0/1 | rgt: 1/8]
    │   └── subChild-2 (id: 5) [treeId: 1 | lft: 1/4 | rgt: 3/8]
    └── child-2 (id: 6) [treeId: 1 | lft: 1/2 | rgt: 3/4]
        └── lastSubChild (id: 7) [treeId: 1 | lft: 1/2 | rgt: 5/8]";
    assert_eq!(render(&repo, &root).unwrap(), expected);

    let removed = repo.remove_child(&root, &repo.find_by_name("child-1").unwrap().unwrap()).unwrap();
    assert_eq!(removed.len(), 4);
    let expected = "\
.
└── root (id: 1) [treeId: 1 | lft: 0/1 | rgt: 1/1]
    └── child-2 (id: 6) [treeId: 1 | lft: 1/2 | rgt: 3/4]
        └── lastSubChild (id: 7) [treeId: 1 | lft: 1/2 | rgt: 5/8]";
    assert_eq!(render(&repo, &root).unwrap(), expected);
}

#[test]
fn sub_tree_is_reported_level_by_level() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    let sub_tree = repo.find_sub_tree(&nodes[0]).unwrap();
    assert_eq!(
        names(&sub_tree),
        vec![
            "root",
            "child-1",
            "child-2",
            "subChild-1",
            "subChild-2",
            "lastSubChild",
            "subSubChild"
        ]
    );
    let root = repo.find_tree_root(1).unwrap();
    let removed = repo.remove_child(&root, &nodes[1]).unwrap();
    assert_eq!(
        names(&removed),
        vec!["child-1", "subChild-1", "subChild-2", "subSubChild"]
    );
}

#[test]
fn shared_heads_are_told_apart_by_depth() {
    let repo = repo();
    let nodes = sample_tree(&repo);
    // root, child-1, subChild-1 and subSubChild all start at 0/1
    let ancestors = repo.find_ancestors(&nodes[3]).unwrap();
    assert_eq!(names(&ancestors), vec!["root", "child-1", "subChild-1"]);
    assert_eq!(
        names(&repo.find_children(&nodes[2]).unwrap()),
        vec!["subSubChild"]
    );
    assert_eq!(
        names(&repo.find_children(&nodes[1]).unwrap()),
        vec!["subChild-1", "subChild-2"]
    );
    let parent = repo.find_parent(&nodes[6]).unwrap().unwrap();
    assert_eq!(parent.name(), "child-2");
    let rightmost = repo.find_rightmost_child(&nodes[0]).unwrap().unwrap();
    assert_eq!(rightmost.name(), "child-2");
}

#[test]
fn many_siblings_keep_doubling_denominators() {
    let repo = repo();
    let mut root = Node::new("root");
    repo.start_tree_with_id(&mut root, 8).unwrap();
    let mut tails = Vec::new();
    for i in 0..10 {
        let mut child = Node::new(format!("c{}", i));
        repo.add_child(&mut root, &mut child).unwrap();
        tails.push(child.position().unwrap().tail().den());
    }
    assert_eq!(tails, vec![2, 4, 8, 16, 32, 64, 128, 256, 512, 1024]);
    let children = repo.find_children(&root).unwrap();
    assert_eq!(children.len(), 10);
    for pair in children.windows(2) {
        assert_eq!(
            pair[0].position().unwrap().tail(),
            pair[1].position().unwrap().head()
        );
    }
}
