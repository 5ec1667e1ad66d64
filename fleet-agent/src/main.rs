//! Fleet Agent - polling client for the fleet kernel
//!
//! Polls `GET /api/datacenters` on a fixed interval and reports:
//! - Connection status transitions (online / offline / reconnecting)
//! - Which data centers changed since the previous poll
//! - A fleet summary (servers, containers, active errors and warnings)
//!
//! Ctrl-C stops the loop.

mod client;
mod config;
mod poller;
mod tracker;

use anyhow::{Context, Result};
use chrono::Utc;
use client::KernelClient;
use config::AgentConfig;
use poller::{ConnectionStatus, PollState};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main agent state
struct Agent {
    config: AgentConfig,
    client: KernelClient,
    state: PollState,
}

impl Agent {
    fn new(config: AgentConfig) -> Result<Self> {
        let client = KernelClient::new(&config.kernel_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        info!(kernel = %config.kernel_url, poll_ms = config.poll_interval_ms, "agent initialized");
        Ok(Self { config, client, state: PollState::default() })
    }

    /// Start agent main loop
    async fn run(&mut self) -> Result<()> {
        let mut poll_timer = interval(self.config.poll_interval());
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = poll_timer.tick() => self.poll_once().await,
                _ = &mut shutdown => {
                    info!("ctrl-c received, stopping poll loop");
                    if let Some(data_centers) = self.state.tracker().current() {
                        info!(
                            data_centers = data_centers.len(),
                            last_update = ?self.state.last_update(),
                            "last snapshot"
                        );
                    }
                    return Ok(());
                }
            }
        }
    }

    async fn poll_once(&mut self) {
        if !self.state.begin_cycle() {
            debug!("previous poll still in flight, skipping");
            return;
        }
        let before = self.state.status();
        let result = self.client.fetch_data_centers().await;
        let observation = self.state.finish_cycle(result, Utc::now());
        let after = self.state.status();

        if after == ConnectionStatus::Offline {
            warn!(error = self.state.last_error().unwrap_or_default(), "kernel unreachable");
        } else if before == ConnectionStatus::Offline {
            info!(status = %after, "connected to kernel");
        }

        let Some(obs) = observation else {
            return;
        };
        if obs.is_unchanged() {
            debug!("no change since last poll");
        } else {
            info!(
                changed = ?obs.changed,
                changed_servers = obs.changed_servers,
                servers = obs.summary.servers,
                containers = obs.summary.containers,
                errors = obs.summary.active_errors,
                warnings = obs.summary.active_warnings,
                "fleet updated"
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet_agent=info")),
        )
        .init();

    info!("Fleet Agent starting...");

    let path = AgentConfig::config_file_path()?;
    let config = AgentConfig::load_from(&path).await.context("Failed to load agent config")?;
    if !path.exists() {
        info!(path = %path.display(), "first run, writing default config");
        if let Err(e) = config.save_to(&path).await {
            warn!(error = %e, "could not write default config");
        }
    }

    let mut agent = Agent::new(config).context("Failed to create agent")?;
    agent.run().await.context("Agent execution failed")?;
    Ok(())
}
