//! Persisted set of opted-in notification recipients
//!
//! The store is a plain `BTreeSet` of subscriber ids backed by a JSON
//! file (`{ "users": [...] }`) that is rewritten wholesale on every
//! mutation, before the mutating command is acknowledged. If a later
//! write fails the in-memory set stays authoritative and the failure is
//! only logged; failing to establish the file at startup is fatal.
//!
//! Writes must go through a single owner (the subscriber actor) so that
//! concurrent enable/disable commands cannot lose an update.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSubscribers {
    users: BTreeSet<String>,
}

/// Result of an `enable` call. Both variants mean the id is subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Enabled,
    AlreadyEnabled,
}

/// Result of a `disable` call. Both variants mean the id is unsubscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled,
    AlreadyDisabled,
}

#[derive(Debug)]
pub struct SubscriberStore {
    path: PathBuf,
    subscribers: BTreeSet<String>,
}

impl SubscriberStore {
    /// Loads the persisted set from `path`, or initializes an empty store
    /// and persists it immediately so the file exists after the first run.
    ///
    /// Any failure here is fatal to the caller: without a readable and
    /// writable backing file the store cannot guarantee durability.
    pub async fn load_or_init(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let subscribers = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let persisted: PersistedSubscribers = serde_json::from_str(&content)
                    .with_context(|| format!("malformed subscriber file {}", path.display()))?;
                debug!(
                    "loaded {} subscriber(s) from {}",
                    persisted.users.len(),
                    path.display()
                );
                persisted.users
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no subscriber file at {}, initializing", path.display());
                BTreeSet::new()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("cannot read subscriber file {}", path.display()));
            }
        };

        let store = Self { path, subscribers };
        store.persist().await?;
        Ok(store)
    }

    /// Adds `id` to the set. Idempotent; the set is persisted before the
    /// outcome is returned.
    pub async fn enable(&mut self, id: &str) -> EnableOutcome {
        if !self.subscribers.insert(id.to_string()) {
            return EnableOutcome::AlreadyEnabled;
        }

        if let Err(e) = self.persist().await {
            warn!("failed to persist subscribers, in-memory state stays authoritative: {e:#}");
        }
        EnableOutcome::Enabled
    }

    /// Removes `id` from the set. Idempotent, symmetric to [`enable`](Self::enable).
    pub async fn disable(&mut self, id: &str) -> DisableOutcome {
        if !self.subscribers.remove(id) {
            return DisableOutcome::AlreadyDisabled;
        }

        if let Err(e) = self.persist().await {
            warn!("failed to persist subscribers, in-memory state stays authoritative: {e:#}");
        }
        DisableOutcome::Disabled
    }

    pub fn subscribers(&self) -> &BTreeSet<String> {
        &self.subscribers
    }

    async fn persist(&self) -> anyhow::Result<()> {
        let persisted = PersistedSubscribers {
            users: self.subscribers.clone(),
        };
        let content = serde_json::to_string(&persisted)?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("cannot write subscriber file {}", self.path.display()))
    }
}
