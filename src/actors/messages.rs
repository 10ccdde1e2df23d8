//! Message types for actor communication
//!
//! Commands are request/response messages sent to a specific actor via
//! mpsc, with oneshot channels carrying the reply. Notifications flow
//! through a broadcast channel from the poller to the dispatcher.

use std::collections::BTreeSet;

use tokio::sync::oneshot;

use crate::Snapshot;
use crate::config::ServerConfig;
use crate::rate_limit::Decision;
use crate::subscribers::{DisableOutcome, EnableOutcome};

/// One target's probe result paired with its configuration, as returned
/// by an on-demand status request.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub server: ServerConfig,
    pub snapshot: Snapshot,
}

/// Commands understood by the poll actor.
#[derive(Debug)]
pub enum PollCommand {
    /// Probe every registry entry right now and return the raw results.
    ///
    /// This serves the `status` command: it bypasses the cycle machinery
    /// entirely, so it neither diffs nor updates the stored snapshots.
    StatusNow {
        respond_to: oneshot::Sender<Vec<StatusReport>>,
    },

    /// Gracefully shut down the poller.
    Shutdown,
}

/// Commands understood by the subscriber actor, which is the single
/// writer of the persisted store.
#[derive(Debug)]
pub enum SubscriberCommand {
    Enable {
        id: String,
        respond_to: oneshot::Sender<EnableOutcome>,
    },

    Disable {
        id: String,
        respond_to: oneshot::Sender<DisableOutcome>,
    },

    /// Snapshot of the current subscriber set.
    List {
        respond_to: oneshot::Sender<BTreeSet<String>>,
    },

    Shutdown,
}

/// Commands understood by the rate-limit actor.
#[derive(Debug)]
pub enum RateLimitCommand {
    /// Record one request and decide whether to serve it.
    Record {
        id: String,
        respond_to: oneshot::Sender<Decision>,
    },

    Shutdown,
}

/// Commands understood by the dispatch actor. Notifications themselves
/// arrive over the broadcast channel, not here.
#[derive(Debug)]
pub enum DispatchCommand {
    Shutdown,
}
