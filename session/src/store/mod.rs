pub mod memory;
pub mod sqlite_store;

use async_trait::async_trait;

use game::types::PlayerId;

/// String-valued key-value persistence, namespaced by player identity.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, player: PlayerId, key: &str) -> anyhow::Result<Option<String>>;

    async fn save(&self, player: PlayerId, key: &str, value: &str) -> anyhow::Result<()>;

    async fn remove(&self, player: PlayerId, key: &str) -> anyhow::Result<()>;
}
