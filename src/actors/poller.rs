//! PollActor - drives periodic poll cycles
//!
//! One cycle probes every registry entry concurrently, waits for all
//! probes to finish (no snapshot mix between cycles), diffs the result
//! against the previous cycle and broadcasts the notifications. The
//! stored snapshot/player-set pair is owned exclusively by this actor and
//! is only replaced after diffing completes.
//!
//! The ticker uses [`MissedTickBehavior::Skip`]: the actor loop is busy
//! while a cycle runs, so a tick that fires mid-cycle is skipped entirely
//! instead of queueing a backlog. The first tick fires immediately, which
//! establishes the baseline right at startup; that first cycle emits no
//! notifications because every server is a cold start.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, instrument, trace, warn};

use crate::Notification;
use crate::config::ServerConfig;
use crate::diff::{PlayerSets, SnapshotSet, diff};
use crate::probe::Prober;

use super::messages::{PollCommand, StatusReport};

pub struct PollActor {
    /// Immutable probe targets.
    registry: Vec<ServerConfig>,

    prober: Arc<dyn Prober>,

    poll_interval: Duration,

    command_rx: mpsc::Receiver<PollCommand>,

    /// Broadcast sender for diff-engine notifications.
    event_tx: broadcast::Sender<Notification>,

    /// Latest completed snapshot per server.
    snapshots: SnapshotSet,

    /// Player sets carried across cycles.
    players: PlayerSets,
}

impl PollActor {
    pub fn new(
        registry: Vec<ServerConfig>,
        prober: Arc<dyn Prober>,
        poll_interval: Duration,
        command_rx: mpsc::Receiver<PollCommand>,
        event_tx: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            registry,
            prober,
            poll_interval,
            command_rx,
            event_tx,
            snapshots: SnapshotSet::new(),
            players: PlayerSets::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!(
            "starting poll actor for {} server(s) with interval {:?}",
            self.registry.len(),
            self.poll_interval
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        PollCommand::StatusNow { respond_to } => {
                            debug!("received StatusNow command");
                            let reports = self.probe_all().await;
                            let _ = respond_to.send(reports);
                        }

                        PollCommand::Shutdown => {
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

        debug!("poll actor stopped");
    }

    /// Probes all registry entries concurrently and waits for every
    /// result. Reports come back in registry order.
    async fn probe_all(&self) -> Vec<StatusReport> {
        let probes = self.registry.iter().map(|server| {
            let prober = Arc::clone(&self.prober);
            async move {
                StatusReport {
                    server: server.clone(),
                    snapshot: prober.probe(server).await,
                }
            }
        });

        join_all(probes).await
    }

    /// Runs one full poll cycle: probe barrier, diff, broadcast, swap.
    async fn run_cycle(&mut self) {
        trace!("starting poll cycle");

        let new = self
            .probe_all()
            .await
            .into_iter()
            .map(|report| (report.server.name, report.snapshot))
            .collect::<SnapshotSet>();

        let outcome = diff(&self.snapshots, &self.players, &new);
        debug!("{} new notification(s)", outcome.notifications.len());

        for notification in outcome.notifications {
            trace!("broadcasting: {}", notification.message);
            if self.event_tx.send(notification).is_err() {
                trace!("no dispatcher subscribed, dropping notification");
            }
        }

        // Replace the previous cycle's state only now that diffing is done.
        self.snapshots = new;
        self.players = outcome.players;
    }
}

/// Handle for controlling a [`PollActor`].
#[derive(Clone)]
pub struct PollHandle {
    sender: mpsc::Sender<PollCommand>,
}

impl PollHandle {
    /// Spawns a poll actor driving cycles at `poll_interval`.
    pub fn spawn(
        registry: Vec<ServerConfig>,
        prober: Arc<dyn Prober>,
        poll_interval: Duration,
        event_tx: broadcast::Sender<Notification>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = PollActor::new(registry, prober, poll_interval, cmd_rx, event_tx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Probes all targets immediately, without touching the cycle state.
    pub async fn status_now(&self) -> Result<Vec<StatusReport>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollCommand::StatusNow { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    /// Shuts the poller down.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(PollCommand::Shutdown).await;
    }
}
