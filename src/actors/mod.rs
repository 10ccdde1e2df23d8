//! Actor-based notification pipeline
//!
//! Each component runs as an independent async task communicating via
//! Tokio channels; cloneable handles wrap the command senders.
//!
//! ## Architecture Overview
//!
//! ```text
//!   ┌────────────┐  probe (concurrent,   ┌──────────────┐
//!   │ PollActor  │──barrier per cycle──▶ │ diff engine  │
//!   └─────┬──────┘                       └──────┬───────┘
//!         │ skip-if-busy ticker                 │ notifications
//!         │                                     ▼
//!         │                        ┌─────────────────────┐
//!         │                        │ Broadcast Channel   │
//!         │                        └──────────┬──────────┘
//!         │                                   │ subscribe
//!         │                          ┌────────▼────────┐
//!         │                          │  DispatchActor  │──▶ Gateway
//!         │                          └────────┬────────┘
//!         │                                   │ List
//!   ┌─────▼──────────┐              ┌─────────▼─────────┐
//!   │ RateLimitActor │              │  SubscriberActor  │──▶ data file
//!   └────────────────┘              └───────────────────┘
//! ```
//!
//! ## Ownership
//!
//! Shared mutable state is confined to its owning actor: the poller owns
//! the snapshot/player-set pair, the subscriber actor owns the persisted
//! store (single-writer), and the rate-limit actor owns the per-subscriber
//! counters together with the window timer that resets them. The command
//! handler only ever talks to handles.

pub mod dispatcher;
pub mod messages;
pub mod poller;
pub mod rate_limit;
pub mod subscriber;
