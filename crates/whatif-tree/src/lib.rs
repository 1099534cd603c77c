pub mod models;
pub mod store;
pub mod ops;
pub mod timeline;
pub mod manager;
pub mod layout;
pub mod clock;
pub mod error;

pub use models::{format_date, Milestone, NodeType, TimelineNode};
pub use store::{NodeStore, MAX_BRANCH_DEPTH};
pub use ops::{context_window, generate_id, leaves, max_depth, path_to_root, subtree_ids, BRANCH_CONTEXT_LEN};
pub use timeline::Timeline;
pub use manager::{ManagerState, TimelineManager, MAX_TIMELINES};
pub use layout::{
    responsive_direction, Layout, LayoutDirection, LayoutEdge, LayoutEngine, LayoutOptions, Position, TreeLayout,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, TreeError};
