//! Agent configuration
//!
//! Handles:
//! - Kernel URL and request timeout
//! - Poll cadence
//! - Cross-platform storage (`$FLEET_AGENT_CONFIG` or the OS config dir)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub kernel_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kernel_url: "http://127.0.0.1:3001".to_string(),
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
        }
    }
}

impl AgentConfig {
    /// Missing file means defaults; the result is always validated.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FLEET_AGENT_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push("fleet-agent");
        path.push("config.toml");
        Ok(path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(self.request_timeout_ms > 0, "request_timeout_ms must be positive");
        ensure!(
            self.kernel_url.starts_with("http://") || self.kernel_url.starts_with("https://"),
            "kernel_url must be an http(s) URL, got {}",
            self.kernel_url
        );
        Ok(())
    }
}
