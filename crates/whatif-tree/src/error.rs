use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Timeline not found: {0}")]
    TimelineNotFound(String),

    #[error("Maximum branching depth ({max}) reached")]
    DepthLimitExceeded { depth: usize, max: usize },

    #[error("Cannot delete root node: {0}")]
    CannotDeleteRoot(String),

    #[error("At least one milestone is required")]
    EmptyMilestones,

    #[error("No active timeline")]
    NoActiveTimeline,

    #[error("Stale write to timeline {timeline_id}: expected version {expected}, found {actual}")]
    StaleVersion {
        timeline_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Corrupt tree: {0}")]
    Corrupt(String),
}

impl TreeError {
    /// True for errors that reference a missing node or timeline
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::TimelineNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;
