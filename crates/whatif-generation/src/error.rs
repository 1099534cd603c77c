use thiserror::Error;

/// Everything that can go wrong between asking for milestones and having a
/// validated list ready for the tree.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// A credential or other setting is missing. Not retryable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The payload decoded but broke the milestone contract
    #[error("Validation error: {0}")]
    Validation(String),

    /// The payload was not JSON at all
    #[error("Failed to parse JSON response: {0}")]
    Parse(String),

    #[error("Maximum branching depth ({0}) reached")]
    DepthLimit(usize),

    /// Network or provider failure
    #[error("Generation failed: {0}")]
    Provider(#[from] anyhow::Error),
}

impl GenerationError {
    /// Whether asking again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
