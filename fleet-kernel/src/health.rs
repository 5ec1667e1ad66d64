/**
 * HEALTH KERNEL - État de santé du processus et du store
 *
 * RÔLE : Expose uptime, mémoire résidente, génération de la flotte, volumes
 * suivis et tâches différées en attente pour GET /system/health.
 */

use fleet_sim::FleetStore;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub memory_usage_mb: f32,
    pub generation: u64,
    pub servers_tracked: u32,
    pub containers_tracked: u32,
    pub pending_tasks: u32,
    pub last_update: Option<String>,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn get_health(&self, store: &FleetStore) -> KernelHealth {
        let (servers, containers) = store
            .read(|fleet| (fleet.servers().count(), fleet.containers().count()))
            .unwrap_or((0, 0));

        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            memory_usage_mb: get_memory_usage_mb(),
            generation: store.generation(),
            servers_tracked: servers as u32,
            containers_tracked: containers as u32,
            pending_tasks: store.pending_tasks() as u32,
            last_update: store.last_update().and_then(|t| t.format(&Rfc3339).ok()),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return (kb as f32) / 1024.0;
            }
        }
    }

    // Fallback approximatif
    12.0
}
