//! RateLimitActor - drives the rate-limit window timer
//!
//! Owns a [`RateLimiter`] and the independent periodic task that resets
//! request counters and ages bans. The window ticker is entirely
//! decoupled from poll cycles; by default it fires once a minute.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, instrument, warn};

use crate::config::RateLimitConfig;
use crate::rate_limit::{Decision, RateLimiter};

use super::messages::RateLimitCommand;

/// Default reset window.
const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimitActor {
    limiter: RateLimiter,
    window: Duration,
    command_rx: mpsc::Receiver<RateLimitCommand>,
}

impl RateLimitActor {
    pub fn new(
        config: RateLimitConfig,
        window: Duration,
        command_rx: mpsc::Receiver<RateLimitCommand>,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(config),
            window,
            command_rx,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting rate limit actor with window {:?}", self.window);

        let mut ticker = interval(self.window);
        // The first tick of a tokio interval fires immediately; the first
        // window reset belongs one full window in the future.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.limiter.tick();
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        RateLimitCommand::Record { id, respond_to } => {
                            let _ = respond_to.send(self.limiter.record(&id));
                        }

                        RateLimitCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("rate limit actor stopped");
    }
}

/// Handle for talking to the [`RateLimitActor`].
#[derive(Clone)]
pub struct RateLimitHandle {
    sender: mpsc::Sender<RateLimitCommand>,
}

impl RateLimitHandle {
    /// Spawns the actor with the default one-minute window.
    pub fn spawn(config: RateLimitConfig) -> Self {
        Self::spawn_with_window(config, WINDOW)
    }

    pub fn spawn_with_window(config: RateLimitConfig, window: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = RateLimitActor::new(config, window, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Records one request for `id` and returns the limiter's decision.
    pub async fn record(&self, id: &str) -> Result<Decision> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RateLimitCommand::Record {
                id: id.to_string(),
                respond_to: tx,
            })
            .await?;

        Ok(rx.await?)
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RateLimitCommand::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: u32, ban_windows: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_messages_per_window: max,
            ban_windows,
        }
    }

    #[tokio::test]
    async fn over_limit_request_is_banned() {
        let handle = RateLimitHandle::spawn(config(2, 3));

        assert_eq!(handle.record("u1").await.unwrap(), Decision::Allowed);
        assert_eq!(handle.record("u1").await.unwrap(), Decision::Allowed);
        assert_eq!(
            handle.record("u1").await.unwrap(),
            Decision::Banned {
                windows_remaining: 3
            }
        );

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn window_timer_expires_bans() {
        let handle = RateLimitHandle::spawn_with_window(config(1, 1), Duration::from_millis(50));

        handle.record("u1").await.unwrap();
        assert_eq!(
            handle.record("u1").await.unwrap(),
            Decision::Banned {
                windows_remaining: 1
            }
        );

        // After one window the ban is cleared and the counter reset.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(handle.record("u1").await.unwrap(), Decision::Allowed);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn disabled_config_always_allows() {
        let handle = RateLimitHandle::spawn(RateLimitConfig::default());

        for _ in 0..10 {
            assert_eq!(handle.record("u1").await.unwrap(), Decision::Allowed);
        }

        handle.shutdown().await;
    }
}
