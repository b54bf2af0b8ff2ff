use context_code_chunker::ChunkerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Parser error: {0}")]
    Parser(#[from] ChunkerError),

    #[error("Parse produced an empty tree")]
    EmptyTree,

    #[error("Traversal budget of {limit} nodes exceeded")]
    TraversalBudget { limit: usize },

    #[error("Node not found: {0}")]
    NodeNotFound(String),
}
