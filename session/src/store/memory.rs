//! In-memory `StateStore`, for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use game::types::PlayerId;

use super::StateStore;

#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<(PlayerId, String), String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, player: PlayerId, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self.entries.lock().await;

        Ok(entries.get(&(player, key.to_string())).cloned())
    }

    async fn save(&self, player: PlayerId, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert((player, key.to_string()), value.to_string());

        Ok(())
    }

    async fn remove(&self, player: PlayerId, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(&(player, key.to_string()));

        Ok(())
    }
}
