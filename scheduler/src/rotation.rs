//! Ordered rotation over the player's villages.

use std::collections::HashSet;

use game::types::{Village, VillageId};

#[derive(Debug, Clone, PartialEq)]
pub enum RotationOutcome {
    /// Moved to this village.
    Next(Village),
    /// A single-village account cannot rotate.
    Unique,
    /// Every candidate is ignored or cooling down.
    Exhausted,
}

#[derive(Debug, Default)]
pub struct VillageRotation {
    villages: Vec<Village>,
    selected: usize,
}

impl VillageRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the village list (already filtered by the only-group when one
    /// is configured). Selection resets to the first entry.
    pub fn set_villages(&mut self, villages: Vec<Village>) {
        self.villages = villages;
        self.selected = 0;
    }

    pub fn villages(&self) -> &[Village] {
        &self.villages
    }

    pub fn is_unique(&self) -> bool {
        self.villages.len() == 1
    }

    pub fn selected(&self) -> Option<&Village> {
        self.villages.get(self.selected)
    }

    /// Move to the next eligible village, skipping ignored and cooling-down
    /// ones. Bounded by one full pass over the list.
    pub fn advance(
        &mut self,
        ignored: &HashSet<VillageId>,
        cooling: &HashSet<VillageId>,
    ) -> RotationOutcome {
        if self.is_unique() {
            return RotationOutcome::Unique;
        }
        if self.villages.is_empty() {
            return RotationOutcome::Exhausted;
        }

        let len = self.villages.len();
        let mut index = self.selected;

        for _ in 0..len {
            index = (index + 1) % len;
            let village = &self.villages[index];

            if ignored.contains(&village.id) || cooling.contains(&village.id) {
                continue;
            }

            self.selected = index;
            return RotationOutcome::Next(village.clone());
        }

        RotationOutcome::Exhausted
    }

    /// Direct jump by id, used when a cooldown elsewhere in the fleet
    /// expires.
    pub fn select_by_id(&mut self, id: VillageId) -> bool {
        match self.villages.iter().position(|v| v.id == id) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }
}
