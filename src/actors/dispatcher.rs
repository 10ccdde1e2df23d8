//! DispatchActor - fans notifications out to subscribers
//!
//! Subscribes to the poller's broadcast channel. For every notification
//! it snapshots the current subscriber set and sends the message text to
//! each recipient through the gateway. Delivery is at-most-once and
//! independent per subscriber: one failed send is logged and the rest of
//! the fan-out continues. Notifications of a cycle are handled in the
//! order the diff engine produced them.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, instrument, trace, warn};

use crate::Notification;
use crate::gateway::Gateway;

use super::messages::DispatchCommand;
use super::subscriber::SubscriberHandle;

pub struct DispatchActor {
    notification_rx: broadcast::Receiver<Notification>,
    command_rx: mpsc::Receiver<DispatchCommand>,
    subscribers: SubscriberHandle,
    gateway: Arc<dyn Gateway>,
}

impl DispatchActor {
    pub fn new(
        notification_rx: broadcast::Receiver<Notification>,
        command_rx: mpsc::Receiver<DispatchCommand>,
        subscribers: SubscriberHandle,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        Self {
            notification_rx,
            command_rx,
            subscribers,
            gateway,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting dispatch actor");

        loop {
            tokio::select! {
                result = self.notification_rx.recv() => {
                    match result {
                        Ok(notification) => self.dispatch(notification).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("dispatcher lagged, dropped {skipped} notification(s)");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("notification channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        DispatchCommand::Shutdown => {
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

        debug!("dispatch actor stopped");
    }

    #[instrument(skip(self, notification), fields(server = %notification.server))]
    async fn dispatch(&self, notification: Notification) {
        let recipients = match self.subscribers.list().await {
            Ok(recipients) => recipients,
            Err(e) => {
                error!("cannot resolve subscribers, dropping notification: {e:#}");
                return;
            }
        };

        trace!(
            "dispatching '{}' to {} subscriber(s)",
            notification.message,
            recipients.len()
        );

        for recipient in recipients {
            if let Err(e) = self.gateway.send(&recipient, &notification.message).await {
                // No retry, no dead-letter: log and move on.
                error!("failed to send to {recipient}: {e:#}");
            }
        }
    }
}

/// Handle for controlling the [`DispatchActor`].
#[derive(Clone)]
pub struct DispatchHandle {
    sender: mpsc::Sender<DispatchCommand>,
}

impl DispatchHandle {
    pub fn spawn(
        notification_rx: broadcast::Receiver<Notification>,
        subscribers: SubscriberHandle,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = DispatchActor::new(notification_rx, cmd_rx, subscribers, gateway);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(DispatchCommand::Shutdown).await;
    }
}
