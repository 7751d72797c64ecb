//! Runtime configuration of the farm loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Flat configuration record. Group options hold group *names*; an empty
/// name means the option is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Farthest a target may be, in fields.
    pub max_distance: f64,
    /// Closest a target may be, in fields.
    pub min_distance: f64,
    /// Upper bound on one-way travel time for a dispatchable preset.
    pub max_travel_time: Duration,
    /// Base interval between commands; actual waits are jittered ±50 %.
    pub random_base: Duration,
    /// Name of the preset(s) used for dispatches.
    pub preset_name: String,
    /// Villages and targets in this group are never used.
    pub group_ignore: String,
    /// Owned targets in this group are attackable anyway.
    pub group_include: String,
    /// When set, only villages in this group take part in the rotation.
    pub group_only: String,
    /// How many recent events the bus retains.
    pub events_limit: usize,
    /// Cadence of the keep-alive supervisor.
    pub keep_running_interval: Duration,
    /// Consecutive keep-alive checks a pending wake may survive before it
    /// is force-cleared.
    pub keep_running_trys: u32,
    /// Age after which a persisted cursor snapshot is discarded.
    pub index_expire: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_distance: 10.0,
            min_distance: 0.0,
            max_travel_time: Duration::from_secs(60 * 60),
            random_base: Duration::from_secs(3),
            preset_name: String::new(),
            group_ignore: String::new(),
            group_include: String::new(),
            group_only: String::new(),
            events_limit: 20,
            keep_running_interval: Duration::from_secs(60),
            keep_running_trys: 10,
            index_expire: Duration::from_secs(30 * 60),
        }
    }
}

/// Partial settings update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub max_distance: Option<f64>,
    pub min_distance: Option<f64>,
    pub max_travel_time: Option<Duration>,
    pub random_base: Option<Duration>,
    pub preset_name: Option<String>,
    pub group_ignore: Option<String>,
    pub group_include: Option<String>,
    pub group_only: Option<String>,
    pub events_limit: Option<usize>,
    pub keep_running_interval: Option<Duration>,
    pub keep_running_trys: Option<u32>,
    pub index_expire: Option<Duration>,
}

/// Derived caches a settings change forces to be recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidations {
    pub groups: bool,
    pub villages: bool,
    pub presets: bool,
    /// Clears the target directory for ALL origins, not just the selected
    /// one.
    pub targets: bool,
}

impl Settings {
    /// Merge `update` into self, reporting which caches it invalidated.
    pub fn apply(&mut self, update: SettingsUpdate) -> Invalidations {
        let mut invalidate = Invalidations::default();

        if let Some(value) = update.group_ignore {
            if value != self.group_ignore {
                invalidate.groups = true;
            }
            self.group_ignore = value;
        }

        if let Some(value) = update.group_include {
            if value != self.group_include {
                invalidate.groups = true;
                invalidate.targets = true;
            }
            self.group_include = value;
        }

        if let Some(value) = update.group_only {
            if value != self.group_only {
                invalidate.groups = true;
                invalidate.villages = true;
                invalidate.targets = true;
            }
            self.group_only = value;
        }

        if let Some(value) = update.preset_name {
            if value != self.preset_name {
                invalidate.presets = true;
            }
            self.preset_name = value;
        }

        if let Some(value) = update.min_distance {
            if value != self.min_distance {
                invalidate.targets = true;
            }
            self.min_distance = value;
        }

        if let Some(value) = update.max_distance {
            if value != self.max_distance {
                invalidate.targets = true;
            }
            self.max_distance = value;
        }

        if let Some(value) = update.max_travel_time {
            self.max_travel_time = value;
        }
        if let Some(value) = update.random_base {
            self.random_base = value;
        }
        if let Some(value) = update.events_limit {
            self.events_limit = value;
        }
        if let Some(value) = update.keep_running_interval {
            self.keep_running_interval = value;
        }
        if let Some(value) = update.keep_running_trys {
            self.keep_running_trys = value;
        }
        if let Some(value) = update.index_expire {
            self.index_expire = value;
        }

        invalidate
    }
}
