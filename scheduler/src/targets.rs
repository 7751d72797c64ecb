//! Per-origin cache of candidate targets within the configured distance
//! annulus, sorted by distance, with a rotating cursor.

use std::collections::{HashMap, HashSet};

use game::geometry::actual_distance;
use game::types::{MapVillage, Position, Village, VillageId};

/// Ephemeral candidate derived from a map snapshot. Rebuilt whenever the
/// snapshot is refetched; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: VillageId,
    pub name: String,
    pub position: Position,
    pub distance: f64,
}

/// Distance-sorted target list plus its rotation cursor.
#[derive(Debug, Clone)]
pub struct TargetList {
    entries: Vec<Target>,
    cursor: usize,
}

impl TargetList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[Target] {
        &self.entries
    }
}

/// Result of one cursor movement.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAdvance {
    /// `None` when every candidate is in the ignored set.
    pub selected: Option<Target>,
    /// Ignored entries passed over, in the order they were skipped.
    pub skipped: Vec<Target>,
}

#[derive(Debug, Default)]
pub struct TargetDirectory {
    lists: HashMap<VillageId, TargetList>,
    seeds: HashMap<VillageId, usize>,
}

impl TargetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positions restored from the persisted snapshot. Each seed is
    /// consumed the first time a list is built for its origin.
    pub fn set_seeds(&mut self, seeds: HashMap<VillageId, usize>) {
        self.seeds = seeds;
    }

    pub fn contains(&self, origin: VillageId) -> bool {
        self.lists.contains_key(&origin)
    }

    pub fn get(&self, origin: VillageId) -> Option<&TargetList> {
        self.lists.get(&origin)
    }

    /// Drop every cached list, for all origins. Called when distance bounds
    /// or include/only groups change.
    pub fn clear(&mut self) {
        self.lists.clear();
    }

    /// Current cursor per origin, for persistence.
    pub fn cursors(&self) -> HashMap<VillageId, usize> {
        self.lists
            .iter()
            .map(|(origin, list)| (*origin, list.cursor))
            .collect()
    }

    /// Filter and sort a map snapshot into the target list for `origin`.
    /// Returns `false` when no candidate survives filtering (nothing is
    /// cached in that case).
    pub fn build(
        &mut self,
        origin: &Village,
        snapshot: Vec<MapVillage>,
        min_distance: f64,
        max_distance: f64,
        included: &HashSet<VillageId>,
    ) -> bool {
        let origin_pos = origin.position();

        let mut nearby: Vec<Target> = snapshot
            .into_iter()
            .filter_map(|candidate| {
                if candidate.id == origin.id {
                    return None;
                }

                // Owned villages are off-limits unless explicitly included.
                if candidate.character_id.is_some() && !included.contains(&candidate.id) {
                    return None;
                }

                let distance = actual_distance(origin_pos, candidate.position());
                if distance < min_distance || distance > max_distance {
                    return None;
                }

                Some(Target {
                    id: candidate.id,
                    name: candidate.name,
                    position: Position::new(candidate.x, candidate.y),
                    distance,
                })
            })
            .collect();

        if nearby.is_empty() {
            return false;
        }

        // Stable: equal distances keep their snapshot order.
        nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let cursor = self
            .seeds
            .remove(&origin.id)
            .filter(|seed| *seed < nearby.len())
            .unwrap_or(0);

        self.lists.insert(
            origin.id,
            TargetList {
                entries: nearby,
                cursor,
            },
        );

        true
    }

    /// Select the target under the cursor (`initial`) or the next one,
    /// wrapping past the end. Ignored targets are skipped with an explicit
    /// bound of one full pass, never recursion.
    pub fn advance(
        &mut self,
        origin: VillageId,
        ignored: &HashSet<VillageId>,
        initial: bool,
    ) -> Option<TargetAdvance> {
        let list = self.lists.get_mut(&origin)?;
        let len = list.entries.len();
        let mut skipped = Vec::new();

        if !initial {
            list.cursor = (list.cursor + 1) % len;
        }

        for _ in 0..len {
            let target = list.entries[list.cursor].clone();

            if !ignored.contains(&target.id) {
                return Some(TargetAdvance {
                    selected: Some(target),
                    skipped,
                });
            }

            skipped.push(target);
            list.cursor = (list.cursor + 1) % len;
        }

        Some(TargetAdvance {
            selected: None,
            skipped,
        })
    }
}
