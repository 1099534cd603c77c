use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use whatif_generation::GenerationGateway;
use whatif_persist::PersistenceClient;
use whatif_tree::TimelineManager;

use crate::config::Config;
use crate::error::ApiResult;
use crate::tracker::GenerationTracker;

/// Shared application state passed to all handlers
///
/// The manager is the single writer of tree state. Generation runs without
/// holding its lock; results are applied afterwards under a write lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<RwLock<TimelineManager>>,
    pub gateway: GenerationGateway,
    pub persist: Arc<dyn PersistenceClient>,
    pub tracker: Arc<GenerationTracker>,
    flush_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        config: Config,
        manager: TimelineManager,
        gateway: GenerationGateway,
        persist: Arc<dyn PersistenceClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            manager: Arc::new(RwLock::new(manager)),
            gateway,
            persist,
            tracker: Arc::new(GenerationTracker::new()),
            flush_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write the manager's current state to storage.
    ///
    /// Flushes are serialized and each snapshots after taking its turn, so
    /// the last write always carries the newest state.
    pub async fn flush(&self) -> ApiResult<()> {
        let _turn = self.flush_lock.lock().await;
        let snapshot = self.manager.read().await.state().clone();
        self.persist.save(&snapshot).await?;
        Ok(())
    }
}
