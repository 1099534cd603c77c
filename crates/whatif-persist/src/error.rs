use thiserror::Error;
use whatif_tree::TreeError;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The saved state decoded but violates a tree invariant
    #[error("Corrupt saved state: {0}")]
    Corrupt(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, PersistError>;
