pub mod actors;
pub mod commands;
pub mod config;
pub mod diff;
pub mod gateway;
pub mod probe;
pub mod rate_limit;
pub mod subscribers;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One server's probe result for a single poll cycle.
///
/// An offline snapshot never carries detail. An online snapshot usually
/// does, but a probe may report a server as reachable without being able
/// to list its players - in that case `detail` is `None` and the diff
/// engine skips player comparison for the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub online: bool,
    pub detail: Option<ServerDetail>,
}

impl Snapshot {
    pub fn offline() -> Self {
        Self {
            online: false,
            detail: None,
        }
    }

    pub fn online(detail: ServerDetail) -> Self {
        Self {
            online: true,
            detail: Some(detail),
        }
    }

    /// Reachable, but the query gave us nothing usable beyond that.
    pub fn online_without_detail() -> Self {
        Self {
            online: true,
            detail: None,
        }
    }
}

/// Detail block of an online snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDetail {
    pub name: Option<String>,
    pub map: Option<String>,
    pub max_players: Option<u32>,
    #[serde(default)]
    pub players: BTreeSet<String>,
}

/// Kind of state transition detected between two poll cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    ServerUp,
    ServerDown,
    PlayerJoin,
    PlayerLeave,
}

/// A single subscriber-facing event produced by the diff engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Configured name of the server this event belongs to.
    pub server: String,
    /// Set for player join/leave events.
    pub player: Option<String>,
    /// Ready-to-send message text.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn server_up(server: &str) -> Self {
        Self {
            kind: NotificationKind::ServerUp,
            server: server.to_string(),
            player: None,
            message: format!("{server} is now online"),
            timestamp: Utc::now(),
        }
    }

    pub fn server_down(server: &str) -> Self {
        Self {
            kind: NotificationKind::ServerDown,
            server: server.to_string(),
            player: None,
            message: format!("{server} is now offline"),
            timestamp: Utc::now(),
        }
    }

    pub fn player_join(player: &str, server: &str) -> Self {
        Self {
            kind: NotificationKind::PlayerJoin,
            server: server.to_string(),
            player: Some(player.to_string()),
            message: format!("{player} joined {server}"),
            timestamp: Utc::now(),
        }
    }

    pub fn player_leave(player: &str, server: &str) -> Self {
        Self {
            kind: NotificationKind::PlayerLeave,
            server: server.to_string(),
            player: Some(player.to_string()),
            message: format!("{player} left {server}"),
            timestamp: Utc::now(),
        }
    }
}
