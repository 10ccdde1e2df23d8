use std::collections::HashSet;
use std::path::PathBuf;

use tracing::trace;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Probe targets. Loaded once; read-only for the process lifetime.
    pub servers: Vec<ServerConfig>,

    /// Poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Rate limiting for the on-demand status command.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Path of the persisted subscriber file.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServerConfig {
    /// Unique display name, also the diff key across cycles.
    pub name: String,
    pub host: String,
    #[serde(default = "default_query_port")]
    pub port: u16,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Requests allowed per reset window before a ban is applied.
    #[serde(default = "default_max_messages")]
    pub max_messages_per_window: u32,

    /// Number of reset windows a ban lasts.
    #[serde(default = "default_ban_windows")]
    pub ban_windows: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_messages_per_window: default_max_messages(),
            ban_windows: default_ban_windows(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_query_port() -> u16 {
    27015
}

fn default_max_messages() -> u32 {
    3
}

fn default_ban_windows() -> u32 {
    5
}

fn default_data_file() -> PathBuf {
    PathBuf::from("./data.json")
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))?;
    validate(&config)?;
    trace!("loaded config: {config:?}");
    Ok(config)
}

/// Rejects configurations the rest of the system cannot handle.
///
/// Server names double as the key for matching snapshots across cycles,
/// so duplicates would silently merge the state of two servers.
fn validate(config: &Config) -> anyhow::Result<()> {
    if config.servers.is_empty() {
        anyhow::bail!("No servers configured!");
    }

    if config.poll_interval_ms == 0 {
        anyhow::bail!("poll_interval_ms must be greater than zero!");
    }

    let mut seen = HashSet::new();
    for server in &config.servers {
        if !seen.insert(server.name.as_str()) {
            anyhow::bail!("Duplicate server name '{}' in configuration!", server.name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> anyhow::Result<Config> {
        let config: Config = serde_json::from_str(json)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse(r#"{ "servers": [{ "name": "A", "host": "10.0.0.1" }] }"#).unwrap();

        assert_eq!(config.poll_interval_ms, 60_000);
        assert_eq!(config.servers[0].port, 27015);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.data_file, PathBuf::from("./data.json"));
    }

    #[test]
    fn duplicate_server_names_are_rejected() {
        let result = parse(
            r#"{ "servers": [
                { "name": "A", "host": "10.0.0.1" },
                { "name": "A", "host": "10.0.0.2" }
            ] }"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn empty_server_list_is_rejected() {
        assert!(parse(r#"{ "servers": [] }"#).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = parse(
            r#"{ "servers": [{ "name": "A", "host": "10.0.0.1" }], "poll_interval_ms": 0 }"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn rate_limit_section_is_parsed() {
        let config = parse(
            r#"{
                "servers": [{ "name": "A", "host": "10.0.0.1", "port": 7777 }],
                "poll_interval_ms": 5000,
                "rate_limit": { "enabled": true, "max_messages_per_window": 3, "ban_windows": 10 }
            }"#,
        )
        .unwrap();

        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.max_messages_per_window, 3);
        assert_eq!(config.rate_limit.ban_windows, 10);
        assert_eq!(config.servers[0].port, 7777);
    }
}
