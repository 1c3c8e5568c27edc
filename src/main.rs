use tracing::info;
use tracing_subscriber::EnvFilter;

use nestset::dyadic::DyadicEncoding;
use nestset::engine::TreeRepository;
use nestset::interval::IntervalEncoding;
use nestset::node::Node;
use nestset::persist::{Persistor, Schema};
use nestset::render::render;
use nestset::settings::{EncodingKind, Settings, DEFAULT_CONFIG_FILE};

// Builds the sample tree and logs it before and after pruning a branch.
// Parent copies go stale as the tree grows; add_child reloads them by id.
fn demo<E: Schema>(settings: &Settings) -> nestset::Result<()> {
    let store = Persistor::<E>::with_busy_timeout(settings.persistence_mode(), settings.busy_timeout())?;
    let repo = TreeRepository::with_settings(store, settings);

    let mut root = Node::new("root");
    let tree_id = repo.start_tree(&mut root)?;
    info!(encoding = E::NAME, tree_id, "started tree");

    let mut child1 = Node::new("child-1");
    repo.add_child(&mut root, &mut child1)?;
    let mut sub_child1 = Node::new("subChild-1");
    repo.add_child(&mut child1, &mut sub_child1)?;
    let mut sub_sub_child = Node::new("subSubChild");
    repo.add_child(&mut sub_child1, &mut sub_sub_child)?;
    let mut sub_child2 = Node::new("subChild-2");
    repo.add_child(&mut child1, &mut sub_child2)?;
    let mut child2 = Node::new("child-2");
    repo.add_child(&mut root, &mut child2)?;
    let mut last_sub_child = Node::new("lastSubChild");
    repo.add_child(&mut child2, &mut last_sub_child)?;

    let root = repo.find_tree_root(tree_id)?;
    info!("render(root)\n{}", render(&repo, &root)?);

    let removed = repo.remove_child(&root, &child1)?;
    info!(removed = removed.len(), "removed child-1");
    let root = repo.find_tree_root(tree_id)?;
    info!("render(root)\n{}", render(&repo, &root)?);
    Ok(())
}

fn main() -> nestset::Result<()> {
    let settings = Settings::load(DEFAULT_CONFIG_FILE)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();
    match settings.encoding {
        EncodingKind::Interval => demo::<IntervalEncoding>(&settings),
        EncodingKind::Dyadic => demo::<DyadicEncoding>(&settings),
    }
}
