//! SQLite-backed implementation of the `StateStore` trait.
//!
//! One row per (player, key); upsert semantics on save. Values are opaque
//! serialized blobs owned by the caller.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use game::types::PlayerId;

use super::StateStore;

pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the backing database and ensure the schema exists.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_state (
                player_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (player_id, key)
            );
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self, player: PlayerId, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM player_state WHERE player_id = ? AND key = ?")
            .bind(player as i64)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn save(&self, player: PlayerId, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO player_state (player_id, key, value) VALUES (?, ?, ?)
            ON CONFLICT (player_id, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(player as i64)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, player: PlayerId, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM player_state WHERE player_id = ? AND key = ?")
            .bind(player as i64)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
