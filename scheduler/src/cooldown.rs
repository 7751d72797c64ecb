//! Cooldown bookkeeping for villages that hit the command cap or ran out of
//! dispatchable troops.

use std::collections::{HashMap, HashSet};

use tokio::task::JoinHandle;

use game::types::{Command, CommandType, Direction, VillageId};

/// Safety margin added on top of the nearest return time.
pub const RETURN_MARGIN_MS: u64 = 5_000;

/// Milliseconds until the nearest outstanding command returns, plus the
/// safety margin. Forward support is not coming back and is excluded; other
/// forward orders still have the return leg ahead of them. `None` when no
/// command qualifies.
pub fn next_return_delay_ms(commands: &[Command], now_secs: f64) -> Option<u64> {
    let mut nearest: Option<f64> = None;

    for command in commands {
        if command.command_type == CommandType::Support
            && command.direction == Direction::Forward
        {
            continue;
        }

        let duration = command.time_completed - command.time_start;
        let mut remain = command.time_completed - now_secs;

        if command.direction == Direction::Forward {
            remain += duration;
        }

        nearest = Some(match nearest {
            Some(n) => n.min(remain),
            None => remain,
        });
    }

    nearest.map(|secs| ((secs * 1000.0).round() + RETURN_MARGIN_MS as f64).max(0.0) as u64)
}

#[derive(Debug)]
struct CooldownEntry {
    deadline_ms: u64,
    timer: JoinHandle<()>,
}

impl Drop for CooldownEntry {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Active cooldown entries. A village in this map is never selected by the
/// rotation; the backing timer removes the entry when it elapses.
#[derive(Debug, Default)]
pub struct CooldownMap {
    entries: HashMap<VillageId, CooldownEntry>,
}

impl CooldownMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cooldown. A previous entry for the same village is
    /// replaced and its timer cancelled.
    pub fn insert(&mut self, village: VillageId, deadline_ms: u64, timer: JoinHandle<()>) {
        self.entries
            .insert(village, CooldownEntry { deadline_ms, timer });
    }

    /// Drop the entry when its timer elapsed (or is no longer wanted).
    pub fn remove(&mut self, village: VillageId) -> bool {
        self.entries.remove(&village).is_some()
    }

    pub fn contains(&self, village: VillageId) -> bool {
        self.entries.contains_key(&village)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> HashSet<VillageId> {
        self.entries.keys().copied().collect()
    }

    /// Entry with the least remaining time, for fleet-wide recovery.
    pub fn earliest(&self, now_ms: u64) -> Option<(VillageId, u64)> {
        self.entries
            .iter()
            .map(|(village, entry)| (*village, entry.deadline_ms.saturating_sub(now_ms)))
            .min_by_key(|(_, remaining)| *remaining)
    }
}
