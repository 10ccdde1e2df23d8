//! Messaging gateway
//!
//! Outbound message transport to subscribers. The dispatcher only knows
//! the [`Gateway`] trait: resolve a recipient, send one text, maybe fail.
//! Delivery is fire-and-forget - callers log failures and move on, there
//! is no retry or queueing.
//!
//! The production implementation talks to the Discord REST API: it opens
//! (or reuses) the DM channel for the recipient and posts the message to
//! that channel.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, trace};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Sends `text` to the recipient identified by `recipient_id`.
    async fn send(&self, recipient_id: &str, text: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

/// Gateway delivering direct messages through the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordGateway {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl DiscordGateway {
    pub fn new(token: impl ToString) -> Self {
        Self::with_api_base(token, DISCORD_API_BASE)
    }

    pub fn with_api_base(token: impl ToString, api_base: impl ToString) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
            api_base: api_base.to_string(),
        }
    }

    /// Opens the DM channel for a user. Discord returns the existing
    /// channel if one was opened before.
    async fn open_dm_channel(&self, recipient_id: &str) -> anyhow::Result<DmChannel> {
        let response = self
            .client
            .post(format!("{}/users/@me/channels", self.api_base))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "recipient_id": recipient_id }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Gateway for DiscordGateway {
    #[instrument(skip(self, text))]
    async fn send(&self, recipient_id: &str, text: &str) -> anyhow::Result<()> {
        let channel = self.open_dm_channel(recipient_id).await?;

        self.client
            .post(format!("{}/channels/{}/messages", self.api_base, channel.id))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "content": text }))
            .send()
            .await?
            .error_for_status()?;

        trace!("delivered message to {recipient_id}");
        Ok(())
    }
}
