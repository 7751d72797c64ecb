//! Asynchronous events pushed by the game session, decoupled from any
//! request the client made.

use crate::types::{GroupId, VillageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameNotification {
    /// The server registered a sent command against `target_id`. Dispatch
    /// acknowledgments arrive only through this channel.
    CommandAcknowledged { target_id: VillageId },
    /// An army preset was created, edited or deleted.
    PresetCatalogChanged,
    /// A group was created, renamed or destroyed.
    GroupMembershipChanged,
    /// A village was linked to a group.
    VillageGroupLinked { group_id: GroupId },
    /// A village was unlinked from a group.
    VillageGroupUnlinked { group_id: GroupId },
}
