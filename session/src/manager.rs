//! Per-player persisted profile: the rotation-cursor snapshot and the
//! last-used settings blob. Both are small JSON records; absence and
//! corruption reset to defaults rather than erroring.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use common::time::now_ms;
use game::types::{PlayerId, VillageId};

use crate::model::CursorSnapshot;
use crate::store::StateStore;

const CURSORS_KEY: &str = "autofarm_indexes";
const SETTINGS_KEY: &str = "autofarm_settings";

pub struct Profile {
    store: Arc<dyn StateStore>,
    player: PlayerId,
}

impl Profile {
    pub fn new(store: Arc<dyn StateStore>, player: PlayerId) -> Self {
        Self { store, player }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player
    }

    /// Load the cursor snapshot. Absent, corrupt or expired snapshots yield
    /// an empty map; expired ones are also removed from the store.
    pub async fn load_cursors(&self, expiry: Duration) -> HashMap<VillageId, usize> {
        let raw = match self.store.load(self.player, CURSORS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                warn!(error = %e, "cursor snapshot load failed");
                return HashMap::new();
            }
        };

        let snapshot: CursorSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "corrupt cursor snapshot, resetting");
                return HashMap::new();
            }
        };

        let age_ms = now_ms().saturating_sub(snapshot.saved_at_ms);
        if age_ms > expiry.as_millis() as u64 {
            debug!(age_ms, "cursor snapshot expired");

            if let Err(e) = self.store.remove(self.player, CURSORS_KEY).await {
                warn!(error = %e, "failed to drop expired cursor snapshot");
            }

            return HashMap::new();
        }

        snapshot.cursors
    }

    pub async fn save_cursors(&self, cursors: HashMap<VillageId, usize>) -> anyhow::Result<()> {
        let snapshot = CursorSnapshot {
            cursors,
            saved_at_ms: now_ms(),
        };

        self.store
            .save(self.player, CURSORS_KEY, &serde_json::to_string(&snapshot)?)
            .await
    }

    /// The last-used settings blob, or `None` when absent or corrupt.
    pub async fn load_settings<T: DeserializeOwned>(&self) -> Option<T> {
        let raw = self.store.load(self.player, SETTINGS_KEY).await.ok().flatten()?;

        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!(error = %e, "corrupt settings blob, using defaults");
                None
            }
        }
    }

    pub async fn save_settings<T: Serialize + Sync>(&self, settings: &T) -> anyhow::Result<()> {
        self.store
            .save(self.player, SETTINGS_KEY, &serde_json::to_string(settings)?)
            .await
    }
}
