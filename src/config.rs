use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BUNDLE_FILE: &str = "formbricks.umd.cjs";
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REPLAY_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration for the SDK loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Upper bound between script injection and the load/error signal.
    pub load_timeout: Duration,
    /// How long replay waits on each queued call before moving to the next.
    pub replay_call_timeout: Duration,
    /// File name of the SDK bundle served under `<appUrl>/js/`.
    pub bundle_file: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            replay_call_timeout: DEFAULT_REPLAY_CALL_TIMEOUT,
            bundle_file: DEFAULT_BUNDLE_FILE.to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let load_timeout = match std::env::var("FORMBRICKS_LOAD_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .context("failed to parse FORMBRICKS_LOAD_TIMEOUT_MS")?,
            Err(_) => DEFAULT_LOAD_TIMEOUT,
        };

        let replay_call_timeout = match std::env::var("FORMBRICKS_REPLAY_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .context("failed to parse FORMBRICKS_REPLAY_TIMEOUT_MS")?,
            Err(_) => DEFAULT_REPLAY_CALL_TIMEOUT,
        };

        let bundle_file = std::env::var("FORMBRICKS_BUNDLE")
            .ok()
            .map(|v| v.trim().trim_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BUNDLE_FILE.to_string());

        Ok(Self {
            load_timeout,
            replay_call_timeout,
            bundle_file,
        })
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_replay_call_timeout(mut self, timeout: Duration) -> Self {
        self.replay_call_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hosted_bundle() {
        let cfg = LoaderConfig::default();
        assert_eq!(cfg.load_timeout, Duration::from_secs(10));
        assert_eq!(cfg.replay_call_timeout, Duration::from_secs(5));
        assert_eq!(cfg.bundle_file, "formbricks.umd.cjs");
    }

    #[test]
    fn builder_overrides_timeout() {
        let cfg = LoaderConfig::default()
            .with_load_timeout(Duration::from_millis(250))
            .with_replay_call_timeout(Duration::from_millis(50));
        assert_eq!(cfg.load_timeout, Duration::from_millis(250));
        assert_eq!(cfg.replay_call_timeout, Duration::from_millis(50));
    }
}
