use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use game::types::VillageId;

/// Rotation-cursor snapshot, persisted per player.
///
/// Plain serialized record with no schema versioning: readers tolerate
/// absence or corruption by resetting to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    #[serde(default)]
    pub cursors: HashMap<VillageId, usize>,
    #[serde(default)]
    pub saved_at_ms: u64,
}
