mod milestone;
mod node;

pub use milestone::{format_date, Milestone};
pub use node::{NodeType, TimelineNode};
