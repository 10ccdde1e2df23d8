//! Command surface
//!
//! Textual commands arriving through the messaging gateway are parsed
//! into a [`Command`] and executed by the [`CommandHandler`], which only
//! talks to actor handles. Parsing is separated from execution so the
//! grammar can be tested without any running actor.
//!
//! Grammar (case-insensitive):
//!
//! ```text
//! !help
//! !sentinel [help]
//! !sentinel status
//! !sentinel notifications enable
//! !sentinel notifications disable
//! ```
//!
//! Anything else addressed to the bot answers with the usage text; other
//! messages are ignored entirely.

use tracing::{debug, error};

use crate::actors::messages::StatusReport;
use crate::actors::poller::PollHandle;
use crate::actors::rate_limit::RateLimitHandle;
use crate::actors::subscriber::SubscriberHandle;
use crate::rate_limit::Decision;
use crate::subscribers::{DisableOutcome, EnableOutcome};

pub const COMMAND_PREFIX: &str = "!sentinel";

const USAGE: &str = "Usage:\n!sentinel help\n!sentinel status\n!sentinel notifications enable\n!sentinel notifications disable";

/// A parsed inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    NotificationsEnable,
    NotificationsDisable,
}

impl Command {
    /// Parses one inbound message.
    ///
    /// `None` means the message is not addressed to the bot. Messages
    /// that carry the prefix but do not match the grammar parse to
    /// [`Command::Help`] so the sender gets the usage text back.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();

        if input == "!help" {
            return Some(Self::Help);
        }

        if input != COMMAND_PREFIX && !input.starts_with(&format!("{COMMAND_PREFIX} ")) {
            return None;
        }

        let parts = input.split_whitespace().collect::<Vec<_>>();
        match parts.get(1).copied() {
            None | Some("help") => Some(Self::Help),
            Some("status") => Some(Self::Status),
            Some("notifications") => match (parts.get(2).copied(), parts.len()) {
                (Some("enable"), 3) => Some(Self::NotificationsEnable),
                (Some("disable"), 3) => Some(Self::NotificationsDisable),
                _ => Some(Self::Help),
            },
            Some(_) => Some(Self::Help),
        }
    }
}

/// Executes parsed commands against the running actors.
#[derive(Clone)]
pub struct CommandHandler {
    poller: PollHandle,
    subscribers: SubscriberHandle,
    rate_limiter: RateLimitHandle,
}

impl CommandHandler {
    pub fn new(
        poller: PollHandle,
        subscribers: SubscriberHandle,
        rate_limiter: RateLimitHandle,
    ) -> Self {
        Self {
            poller,
            subscribers,
            rate_limiter,
        }
    }

    /// Handles one inbound message from `sender_id` and returns the reply
    /// text, or `None` when the message is not addressed to the bot.
    pub async fn handle(&self, sender_id: &str, text: &str) -> Option<String> {
        let command = Command::parse(text)?;
        debug!("{sender_id} issued {command:?}");

        Some(match command {
            Command::Help => USAGE.to_string(),
            Command::Status => self.status(sender_id).await,
            Command::NotificationsEnable => self.enable(sender_id).await,
            Command::NotificationsDisable => self.disable(sender_id).await,
        })
    }

    /// The only rate-limited path: the gate runs before any probing, and
    /// a banned sender gets the remaining ban duration without triggering
    /// a single probe.
    async fn status(&self, sender_id: &str) -> String {
        match self.rate_limiter.record(sender_id).await {
            Ok(Decision::Banned { windows_remaining }) => {
                return format!(
                    "You have been rate limited. Please try again in {windows_remaining} minute(s)"
                );
            }
            Ok(Decision::Allowed) => {}
            Err(e) => {
                // Limiter gone is an internal fault; fail open.
                error!("rate limiter unavailable: {e:#}");
            }
        }

        match self.poller.status_now().await {
            Ok(reports) => format_status(&reports),
            Err(e) => {
                error!("status probe failed: {e:#}");
                "Status check failed, please try again later".to_string()
            }
        }
    }

    async fn enable(&self, sender_id: &str) -> String {
        match self.subscribers.enable(sender_id).await {
            Ok(EnableOutcome::Enabled) => "Notifications enabled".to_string(),
            Ok(EnableOutcome::AlreadyEnabled) => "Notifications already enabled".to_string(),
            Err(e) => {
                error!("enable failed: {e:#}");
                "Could not update notification settings".to_string()
            }
        }
    }

    async fn disable(&self, sender_id: &str) -> String {
        match self.subscribers.disable(sender_id).await {
            Ok(DisableOutcome::Disabled) => "Notifications disabled".to_string(),
            Ok(DisableOutcome::AlreadyDisabled) => "Notifications already disabled".to_string(),
            Err(e) => {
                error!("disable failed: {e:#}");
                "Could not update notification settings".to_string()
            }
        }
    }
}

/// One block per server: name, availability and (if known) detail.
fn format_status(reports: &[StatusReport]) -> String {
    let mut text = String::from("Server status:");

    for report in reports {
        text += &format!("\n----- {} -----", report.server.name);
        text += &format!(
            "\nStatus: {}",
            if report.snapshot.online {
                "Online"
            } else {
                "Offline"
            }
        );

        if let Some(detail) = &report.snapshot.detail {
            if let Some(name) = &detail.name {
                text += &format!("\nName: {name}");
            }
            let max_players = detail
                .max_players
                .map_or_else(|| "?".to_string(), |max| max.to_string());
            text += &format!("\nPlayers: {}/{max_players}", detail.players.len());
            if let Some(map) = &detail.map {
                text += &format!("\nMap: {map}");
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast;

    use super::*;
    use crate::config::{RateLimitConfig, ServerConfig};
    use crate::probe::Prober;
    use crate::subscribers::SubscriberStore;
    use crate::{ServerDetail, Snapshot};

    #[test]
    fn grammar_table() {
        assert_eq!(Command::parse("!help"), Some(Command::Help));
        assert_eq!(Command::parse("!sentinel"), Some(Command::Help));
        assert_eq!(Command::parse("!sentinel help"), Some(Command::Help));
        assert_eq!(Command::parse("!SENTINEL STATUS"), Some(Command::Status));
        assert_eq!(Command::parse("  !sentinel status  "), Some(Command::Status));
        assert_eq!(
            Command::parse("!sentinel notifications enable"),
            Some(Command::NotificationsEnable)
        );
        assert_eq!(
            Command::parse("!sentinel notifications disable"),
            Some(Command::NotificationsDisable)
        );

        // Malformed bot commands answer with usage.
        assert_eq!(Command::parse("!sentinel notifications"), Some(Command::Help));
        assert_eq!(
            Command::parse("!sentinel notifications enable now"),
            Some(Command::Help)
        );
        assert_eq!(Command::parse("!sentinel frobnicate"), Some(Command::Help));

        // Unrelated chatter is ignored.
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse("!sentinels unite"), None);
        assert_eq!(Command::parse(""), None);
    }

    /// Prober that always reports the same snapshot for every target.
    struct FixedProber(Snapshot);

    #[async_trait]
    impl Prober for FixedProber {
        async fn probe(&self, _server: &ServerConfig) -> Snapshot {
            self.0.clone()
        }
    }

    async fn handler(snapshot: Snapshot, rate_limit: RateLimitConfig) -> (CommandHandler, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SubscriberStore::load_or_init(dir.path().join("data.json"))
            .await
            .unwrap();

        let (event_tx, _) = broadcast::channel(16);
        let poller = PollHandle::spawn(
            vec![ServerConfig {
                name: "Ragnarok".to_string(),
                host: "127.0.0.1".to_string(),
                port: 7777,
            }],
            Arc::new(FixedProber(snapshot)),
            Duration::from_secs(3600),
            event_tx,
        );

        let handler = CommandHandler::new(
            poller,
            SubscriberHandle::spawn(store),
            RateLimitHandle::spawn(rate_limit),
        );
        (handler, dir)
    }

    fn online_snapshot() -> Snapshot {
        Snapshot::online(ServerDetail {
            name: Some("Ragnarok PvE".to_string()),
            map: Some("Ragnarok".to_string()),
            max_players: Some(70),
            players: ["bob".to_string(), "alice".to_string()].into(),
        })
    }

    #[tokio::test]
    async fn unaddressed_messages_are_ignored() {
        let (handler, _dir) = handler(Snapshot::offline(), RateLimitConfig::default()).await;

        assert_eq!(handler.handle("u1", "good morning").await, None);
    }

    #[tokio::test]
    async fn help_returns_usage() {
        let (handler, _dir) = handler(Snapshot::offline(), RateLimitConfig::default()).await;

        assert_eq!(handler.handle("u1", "!help").await.as_deref(), Some(USAGE));
    }

    #[tokio::test]
    async fn status_formats_one_block_per_server() {
        let (handler, _dir) = handler(online_snapshot(), RateLimitConfig::default()).await;

        let reply = handler.handle("u1", "!sentinel status").await.unwrap();
        assert_eq!(
            reply,
            "Server status:\n----- Ragnarok -----\nStatus: Online\nName: Ragnarok PvE\nPlayers: 2/70\nMap: Ragnarok"
        );
    }

    #[tokio::test]
    async fn offline_status_has_no_detail_lines() {
        let (handler, _dir) = handler(Snapshot::offline(), RateLimitConfig::default()).await;

        let reply = handler.handle("u1", "!sentinel status").await.unwrap();
        assert_eq!(
            reply,
            "Server status:\n----- Ragnarok -----\nStatus: Offline"
        );
    }

    #[tokio::test]
    async fn status_is_rate_limited_per_sender() {
        let rate_limit = RateLimitConfig {
            enabled: true,
            max_messages_per_window: 1,
            ban_windows: 5,
        };
        let (handler, _dir) = handler(Snapshot::offline(), rate_limit).await;

        let first = handler.handle("u1", "!sentinel status").await.unwrap();
        assert!(first.starts_with("Server status:"));

        let second = handler.handle("u1", "!sentinel status").await.unwrap();
        assert_eq!(
            second,
            "You have been rate limited. Please try again in 5 minute(s)"
        );

        // Other senders and other commands stay unaffected.
        let other = handler.handle("u2", "!sentinel status").await.unwrap();
        assert!(other.starts_with("Server status:"));
        assert_eq!(
            handler.handle("u1", "!sentinel notifications enable").await.as_deref(),
            Some("Notifications enabled")
        );
    }

    #[tokio::test]
    async fn notification_toggles_report_idempotence() {
        let (handler, _dir) = handler(Snapshot::offline(), RateLimitConfig::default()).await;

        assert_eq!(
            handler.handle("u1", "!sentinel notifications enable").await.as_deref(),
            Some("Notifications enabled")
        );
        assert_eq!(
            handler.handle("u1", "!sentinel notifications enable").await.as_deref(),
            Some("Notifications already enabled")
        );
        assert_eq!(
            handler.handle("u1", "!sentinel notifications disable").await.as_deref(),
            Some("Notifications disabled")
        );
        assert_eq!(
            handler.handle("u1", "!sentinel notifications disable").await.as_deref(),
            Some("Notifications already disabled")
        );
    }
}
