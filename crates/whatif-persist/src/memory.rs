use async_trait::async_trait;
use tokio::sync::RwLock;
use whatif_tree::ManagerState;

use crate::client::PersistenceClient;
use crate::error::Result;

/// Process-local storage, for tests and ephemeral servers
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Option<ManagerState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ManagerState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl PersistenceClient for MemoryStore {
    async fn load(&self) -> Result<Option<ManagerState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &ManagerState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.state.write().await = None;
        Ok(())
    }
}
