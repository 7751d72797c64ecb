//! Lifecycle events published by the engine.
//!
//! Observers subscribe through a broadcast channel; the bus additionally
//! retains the most recent events in a capped ring so late subscribers can
//! show history. Emission can be suppressed around settings mutations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use game::types::{Village, VillageId};

use crate::targets::Target;

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum FarmEvent {
    Start,
    Pause,
    /// No preset matches the configured name; nothing can be dispatched.
    NoPreset,
    NoVillageSelected,
    NextVillage(Village),
    /// Every village is ignored or cooling down.
    NoVillages,
    NextTarget(Target),
    IgnoredTarget(Target),
    NoTargets,
    /// A village hit the outstanding-command cap. The village is carried
    /// when a specific one triggered the limit.
    CommandLimit { village: Option<Village> },
    NoUnits(Village),
    /// Unique village with no troops and nothing on the way back.
    NoUnitsNoCommands,
    SendCommand { origin: Village, target: Target },
    NextCommandIn(Duration),
    CommandReturn(VillageId),
    PresetsChange,
    GroupsChanged,
    PlayerVillagesUpdate,
}

struct RecentLog {
    buf: VecDeque<FarmEvent>,
    limit: usize,
}

pub struct EventBus {
    tx: broadcast::Sender<FarmEvent>,
    enabled: AtomicBool,
    recent: Mutex<RecentLog>,
}

impl EventBus {
    pub fn new(limit: usize) -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);

        Self {
            tx,
            enabled: AtomicBool::new(true),
            recent: Mutex::new(RecentLog {
                buf: VecDeque::new(),
                limit,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FarmEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: FarmEvent) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }

        {
            let mut recent = self.recent.lock();
            if recent.limit > 0 {
                if recent.buf.len() == recent.limit {
                    recent.buf.pop_front();
                }
                recent.buf.push_back(event.clone());
            }
        }

        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_limit(&self, limit: usize) {
        let mut recent = self.recent.lock();
        recent.limit = limit;
        while recent.buf.len() > limit {
            recent.buf.pop_front();
        }
    }

    /// The retained tail of the event stream, oldest first.
    pub fn recent(&self) -> Vec<FarmEvent> {
        self.recent.lock().buf.iter().cloned().collect()
    }
}
