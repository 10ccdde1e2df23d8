//! Status prober
//!
//! The prober is the boundary to the actual server-query protocol. The
//! contract is deliberately infallible: given a target it returns a
//! [`Snapshot`] within a bounded timeout, and every transport error,
//! timeout or malformed response collapses to an offline snapshot. The
//! diff engine and the poller rely on never seeing a raw probe error.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, trace, warn};

use crate::config::ServerConfig;
use crate::{ServerDetail, Snapshot};

/// Default per-probe timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Prober: Send + Sync {
    /// Probes a single target. Never fails - an unreachable or
    /// unparseable server is reported as offline.
    async fn probe(&self, server: &ServerConfig) -> Snapshot;
}

/// Wire format of the status endpoint.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    name: Option<String>,
    map: Option<String>,
    max_players: Option<u32>,
    #[serde(default)]
    players: Vec<String>,
}

impl From<StatusResponse> for ServerDetail {
    fn from(response: StatusResponse) -> Self {
        Self {
            name: response.name,
            map: response.map,
            max_players: response.max_players,
            players: response.players.into_iter().collect(),
        }
    }
}

/// Prober querying `http://host:port/status` for a JSON status document.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for HttpProber {
    #[instrument(skip(self), fields(server = %server.name))]
    async fn probe(&self, server: &ServerConfig) -> Snapshot {
        let url = format!("http://{}:{}/status", server.host, server.port);
        trace!("{url}: probing");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{url}: error during request: {e}");
                return Snapshot::offline();
            }
        };

        if !response.status().is_success() {
            warn!("{url}: unexpected status code {}", response.status());
            return Snapshot::offline();
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("{url}: error during decode: {e}");
                return Snapshot::offline();
            }
        };

        match serde_json::from_str::<StatusResponse>(&body) {
            Ok(status) => {
                trace!("{url}: online, {} player(s)", status.players.len());
                Snapshot::online(status.into())
            }
            Err(e) => {
                warn!("{url}: error while trying to parse the status: {e}");
                Snapshot::offline()
            }
        }
    }
}
