use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_PORT: u16 = 7450;
const DEFAULT_DATA_DIR: &str = ".foreman";
const DEFAULT_BALANCE_INTERVAL_SECS: u64 = 30;
const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: String,
    pub port: u16,
    pub balance_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
    pub webhook_url: Option<String>,
    pub worker_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            port: DEFAULT_PORT,
            balance_interval_secs: DEFAULT_BALANCE_INTERVAL_SECS,
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
            webhook_url: None,
            worker_command: None,
        }
    }
}

impl Config {
    /// Defaults, then `foreman.toml` if present, then environment
    /// overrides on top.
    pub fn load() -> Self {
        let mut config = Self::from_file(Path::new("foreman.toml")).unwrap_or_default();
        config.apply_env();
        config
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("ignoring unreadable config {}: {err}", path.display());
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("FOREMAN_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Some(port) = env_parsed("FOREMAN_PORT") {
            self.port = port;
        }
        if let Some(secs) = env_parsed("FOREMAN_BALANCE_INTERVAL_SECS") {
            self.balance_interval_secs = secs;
        }
        if let Some(secs) = env_parsed("FOREMAN_HEARTBEAT_TIMEOUT_SECS") {
            self.heartbeat_timeout_secs = secs;
        }
        if let Ok(url) = std::env::var("FOREMAN_WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        if let Ok(command) = std::env::var("FOREMAN_WORKER_COMMAND") {
            self.worker_command = Some(command);
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.data_dir, DEFAULT_DATA_DIR);
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreman.toml");
        std::fs::write(&path, "port = 9000\nwebhook_url = \"http://hooks.local\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.webhook_url.as_deref(), Some("http://hooks.local"));
        // Unspecified fields keep their defaults.
        assert_eq!(config.balance_interval_secs, DEFAULT_BALANCE_INTERVAL_SECS);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_file(&dir.path().join("nope.toml")).is_none());
    }
}
