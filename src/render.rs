//! Text rendering of a tree or subtree, for logs and golden-output tests.
//!
//! ```text
//! .
//! └── root
//!     ├── child-1
//!     │   └── subChild
//!     └── child-2
//! ```

use crate::encoding::Encoding;
use crate::engine::TreeRepository;
use crate::error::Result;
use crate::node::Node;
use crate::store::NodeStore;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";

/// Renders `node` and everything below it, one line per node, using only
/// [`TreeRepository::find_children`]. No trailing newline.
pub fn render<E: Encoding, S: NodeStore<E>>(
    repo: &TreeRepository<E, S>,
    node: &Node<E>,
) -> Result<String> {
    let mut lines = vec![".".to_string(), format!("{}{}", LAST_BRANCH, node)];
    // the starting node is drawn as the last child of the "." line
    let mut levels = vec![false];
    render_children(repo, node, &mut levels, &mut lines)?;
    Ok(lines.join("\n"))
}

// `levels` holds, per ancestor level, whether more siblings follow at that level
fn render_children<E: Encoding, S: NodeStore<E>>(
    repo: &TreeRepository<E, S>,
    node: &Node<E>,
    levels: &mut Vec<bool>,
    lines: &mut Vec<String>,
) -> Result<()> {
    let children = repo.find_children(node)?;
    let count = children.len();
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == count;
        let prefix: String = levels
            .iter()
            .map(|pending| if *pending { PIPE } else { BLANK })
            .collect();
        let branch = if last { LAST_BRANCH } else { BRANCH };
        lines.push(format!("{}{}{}", prefix, branch, child));
        levels.push(!last);
        render_children(repo, child, levels, lines)?;
        levels.pop();
    }
    Ok(())
}
