//! SubscriberActor - single writer of the persisted subscriber store
//!
//! All enable/disable mutations funnel through this actor's command
//! channel, so concurrent commands are serialized and cannot lose an
//! update. The store persists before each response is sent, which gives
//! callers the write-before-acknowledge guarantee.

use std::collections::BTreeSet;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

use crate::subscribers::{DisableOutcome, EnableOutcome, SubscriberStore};

use super::messages::SubscriberCommand;

pub struct SubscriberActor {
    store: SubscriberStore,
    command_rx: mpsc::Receiver<SubscriberCommand>,
}

impl SubscriberActor {
    pub fn new(store: SubscriberStore, command_rx: mpsc::Receiver<SubscriberCommand>) -> Self {
        Self { store, command_rx }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting subscriber actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                SubscriberCommand::Enable { id, respond_to } => {
                    let outcome = self.store.enable(&id).await;
                    let _ = respond_to.send(outcome);
                }

                SubscriberCommand::Disable { id, respond_to } => {
                    let outcome = self.store.disable(&id).await;
                    let _ = respond_to.send(outcome);
                }

                SubscriberCommand::List { respond_to } => {
                    let _ = respond_to.send(self.store.subscribers().clone());
                }

                SubscriberCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        debug!("subscriber actor stopped");
    }
}

/// Handle for talking to the [`SubscriberActor`].
#[derive(Clone)]
pub struct SubscriberHandle {
    sender: mpsc::Sender<SubscriberCommand>,
}

impl SubscriberHandle {
    /// Spawns the actor around an already loaded store.
    pub fn spawn(store: SubscriberStore) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = SubscriberActor::new(store, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn enable(&self, id: &str) -> Result<EnableOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SubscriberCommand::Enable {
                id: id.to_string(),
                respond_to: tx,
            })
            .await?;

        Ok(rx.await?)
    }

    pub async fn disable(&self, id: &str) -> Result<DisableOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SubscriberCommand::Disable {
                id: id.to_string(),
                respond_to: tx,
            })
            .await?;

        Ok(rx.await?)
    }

    /// Snapshot of the current subscriber set.
    pub async fn list(&self) -> Result<BTreeSet<String>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SubscriberCommand::List { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    pub async fn shutdown(&self) {
        if self.sender.send(SubscriberCommand::Shutdown).await.is_err() {
            warn!("subscriber actor already stopped");
        }
    }
}
