use thiserror::Error;

use crate::node::TreeId;

#[derive(Error, Debug)]
pub enum NestsetError {
    #[error("Node already has treeId set to {tree_id}")]
    NodeAlreadyInTree { tree_id: TreeId },
    #[error("Tree id {0} is already in use")]
    TreeIdInUse(TreeId),
    #[error("Parent node not attached to any tree: {0}")]
    ParentNotAttached(String),
    #[error("No tree with treeId {0}")]
    TreeNotFound(TreeId),
    #[error("{child} is not a descendant of {parent}")]
    NotADescendant { parent: String, child: String },
    #[error("Could not generate an unused treeId in {attempts} attempts")]
    TreeIdGenerationFailed { attempts: u32 },
    #[error("Encoding exhausted: {0}")]
    EncodingExhausted(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, NestsetError>;

// Helper conversions
impl From<rusqlite::Error> for NestsetError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<config::ConfigError> for NestsetError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
