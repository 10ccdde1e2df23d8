//! State diff engine
//!
//! Pure comparison of two snapshot sets. The poller feeds it the previous
//! cycle's snapshots and player sets together with the freshly probed
//! snapshots; it returns the notifications to dispatch and the updated
//! player sets. No I/O, no clocks, no shared state - everything the
//! engine knows arrives through its arguments, which keeps it trivially
//! testable with injected snapshots.
//!
//! ## Rules, per server (matched by configured name)
//!
//! 1. `online` flipping false→true emits SERVER_UP, true→false SERVER_DOWN.
//! 2. Player sets are only compared when the new snapshot carries detail.
//!    Names in the symmetric difference are classified in lexicographic
//!    order: present in the new set → PLAYER_JOIN, otherwise PLAYER_LEAVE.
//! 3. A snapshot without detail (offline, or online but unqueryable)
//!    leaves the stored player set untouched. In particular a down
//!    transition does not clear it, so a later recovery with the same
//!    players emits no spurious joins.
//! 4. A server with no previous snapshot is a cold start: its player set
//!    is seeded from the new detail and nothing is emitted.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::{Notification, Snapshot};

/// Latest completed snapshot per server, keyed by configured name.
pub type SnapshotSet = BTreeMap<String, Snapshot>;

/// Stored player names per server, carried forward across cycles
/// independently of snapshot detail.
pub type PlayerSets = BTreeMap<String, BTreeSet<String>>;

/// Result of diffing one poll cycle against the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Notifications in emission order: per server (name order), the
    /// availability transition first, then player events.
    pub notifications: Vec<Notification>,
    /// Player sets to carry into the next cycle.
    pub players: PlayerSets,
}

/// Compares `new` against `prev` and returns the resulting notifications
/// together with the updated player sets.
///
/// Servers present in `prev` but missing from `new` keep their stored
/// player set and emit nothing. The very first cycle (empty `prev`) is a
/// cold start for every server and therefore emits nothing at all.
pub fn diff(prev: &SnapshotSet, players: &PlayerSets, new: &SnapshotSet) -> CycleOutcome {
    let mut notifications = Vec::new();
    let mut updated = players.clone();

    for (name, snapshot) in new {
        let stored = updated.entry(name.clone()).or_default();

        let Some(previous) = prev.get(name) else {
            // Cold start for this server: establish the baseline only.
            if let Some(detail) = &snapshot.detail {
                *stored = detail.players.clone();
            }
            trace!("{name}: no previous snapshot, establishing baseline");
            continue;
        };

        if snapshot.online != previous.online {
            notifications.push(if snapshot.online {
                Notification::server_up(name)
            } else {
                Notification::server_down(name)
            });
        }

        let Some(detail) = &snapshot.detail else {
            trace!("{name}: snapshot without detail, skipping player diff");
            continue;
        };

        // BTreeSet::symmetric_difference iterates in ascending order,
        // which is the documented deterministic classification order.
        let difference = stored
            .symmetric_difference(&detail.players)
            .cloned()
            .collect::<Vec<_>>();

        for player in difference {
            if detail.players.contains(&player) {
                notifications.push(Notification::player_join(&player, name));
                stored.insert(player);
            } else {
                notifications.push(Notification::player_leave(&player, name));
                stored.remove(&player);
            }
        }
    }

    CycleOutcome {
        notifications,
        players: updated,
    }
}
