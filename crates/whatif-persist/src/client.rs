use async_trait::async_trait;
use std::sync::Arc;
use whatif_tree::{Clock, ManagerState, TimelineManager};

use crate::error::Result;

/// Where the manager's state lives between runs.
///
/// `load` returns `None` when nothing has been saved yet.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    async fn load(&self) -> Result<Option<ManagerState>>;

    /// Replace whatever was saved with `state`
    async fn save(&self, state: &ManagerState) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Rebuild a manager from storage, starting empty if nothing was saved.
///
/// Saved state is checked against every tree invariant before use.
pub async fn load_manager(
    client: &dyn PersistenceClient,
    clock: Arc<dyn Clock>,
    max_timelines: usize,
) -> Result<TimelineManager> {
    let manager = match client.load().await? {
        Some(state) => {
            let count = state.timelines.len();
            let manager = TimelineManager::from_state(state)?;
            tracing::info!(timelines = count, "Restored saved timelines");
            manager
        }
        None => {
            tracing::info!("No saved timelines, starting empty");
            TimelineManager::new()
        }
    };

    Ok(manager.with_clock(clock).with_max_timelines(max_timelines))
}
