//! Tunables of the simulation: drift magnitudes, metric domains, probabilities,
//! status thresholds and store timings.
//!
//! Every field has a default so a config file only needs to name what it
//! overrides. Tests zero probabilities and magnitudes to pin a branch.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Domain and per-tick drift of one scalar metric.
///
/// A tick moves the value by at most `max_delta / 2` in either direction
/// and then clamps it to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub max_delta: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSpec {
    pub const fn new(max_delta: f64, min: f64, max: f64) -> Self {
        Self { max_delta, min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftParams {
    pub server_cpu: MetricSpec,
    pub server_memory: MetricSpec,
    pub disk: MetricSpec,
    pub network: MetricSpec,
    pub temperature: MetricSpec,
    pub container_cpu: MetricSpec,
    pub container_memory: MetricSpec,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            server_cpu: MetricSpec::new(8.0, 0.0, 100.0),
            server_memory: MetricSpec::new(6.0, 0.0, 100.0),
            disk: MetricSpec::new(2.0, 0.0, 100.0),
            network: MetricSpec::new(10.0, 0.0, 100.0),
            temperature: MetricSpec::new(4.0, 15.0, 95.0),
            container_cpu: MetricSpec::new(6.0, 0.0, 100.0),
            container_memory: MetricSpec::new(4.0, 0.0, 100.0),
        }
    }
}

impl DriftParams {
    /// Same domains, no movement.
    pub fn frozen() -> Self {
        let mut drift = Self::default();
        for spec in [
            &mut drift.server_cpu,
            &mut drift.server_memory,
            &mut drift.disk,
            &mut drift.network,
            &mut drift.temperature,
            &mut drift.container_cpu,
            &mut drift.container_memory,
        ] {
            spec.max_delta = 0.0;
        }
        drift
    }
}

/// Probabilities of every random decision, all in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Chances {
    /// Share of freshly synthesized containers that start `running`.
    pub new_container_running: f64,
    /// Error injected when a server is synthesized.
    pub new_server_fault: f64,
    /// Error injected on each evolution, independent of the metrics.
    pub server_fault: f64,
    pub container_status_flip: f64,
    pub container_append: f64,
    pub container_remove: f64,
    /// Chance that a stopped container comes back as `error` after a restart.
    pub restart_container_error: f64,
}

impl Default for Chances {
    fn default() -> Self {
        Self {
            new_container_running: 0.9,
            new_server_fault: 0.03,
            server_fault: 0.002,
            container_status_flip: 0.002,
            container_append: 0.02,
            container_remove: 0.01,
            restart_container_error: 0.02,
        }
    }
}

impl Chances {
    /// No faults, no flips, no churn, every new container running.
    pub fn never() -> Self {
        Self {
            new_container_running: 1.0,
            new_server_fault: 0.0,
            server_fault: 0.0,
            container_status_flip: 0.0,
            container_append: 0.0,
            container_remove: 0.0,
            restart_container_error: 0.0,
        }
    }
}

/// Server status thresholds. Comparisons are strict (`>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub hard_cpu: f64,
    pub hard_memory: f64,
    pub hard_temperature: f64,
    pub soft_cpu: f64,
    pub soft_memory: f64,
    pub soft_temperature: f64,
    /// Only used when a server is synthesized.
    pub new_server_warning_cpu: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hard_cpu: 90.0,
            hard_memory: 90.0,
            hard_temperature: 80.0,
            soft_cpu: 75.0,
            soft_memory: 75.0,
            soft_temperature: 70.0,
            new_server_warning_cpu: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerBounds {
    pub initial_min: usize,
    pub initial_max: usize,
    pub floor: usize,
    pub cap: usize,
}

impl Default for ContainerBounds {
    fn default() -> Self {
        Self { initial_min: 2, initial_max: 5, floor: 2, cap: 6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Idle time after which the fleet is regenerated instead of evolved.
    pub stale_threshold_ms: u64,
    /// Reads closer together than this return the cached snapshot. 0 evolves on every read.
    pub min_evolve_interval_ms: u64,
    pub restart_delay_ms: u64,
    pub drift: DriftParams,
    pub chances: Chances,
    pub thresholds: Thresholds,
    pub containers: ContainerBounds,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            stale_threshold_ms: 300_000,
            min_evolve_interval_ms: 0,
            restart_delay_ms: 2_000,
            drift: DriftParams::default(),
            chances: Chances::default(),
            thresholds: Thresholds::default(),
            containers: ContainerBounds::default(),
        }
    }
}

impl SimParams {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn stale_threshold(&self) -> time::Duration {
        time::Duration::milliseconds(self.stale_threshold_ms as i64)
    }

    pub fn min_evolve_interval(&self) -> time::Duration {
        time::Duration::milliseconds(self.min_evolve_interval_ms as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let params = SimParams::default();
        assert_eq!(params.stale_threshold_ms, 300_000);
        assert_eq!(params.restart_delay(), Duration::from_millis(2_000));
        assert_eq!(params.drift.server_cpu.max_delta, 8.0);
        assert_eq!(params.drift.temperature.max_delta, 4.0);
        assert_eq!(params.containers.cap, 6);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let params: SimParams =
            serde_json::from_str(r#"{"restart_delay_ms": 50, "chances": {"server_fault": 0.5}}"#).unwrap();
        assert_eq!(params.restart_delay_ms, 50);
        assert_eq!(params.chances.server_fault, 0.5);
        assert_eq!(params.chances.container_append, 0.02);
        assert_eq!(params.stale_threshold_ms, 300_000);
    }

    #[test]
    fn test_frozen_drift_keeps_domains() {
        let frozen = DriftParams::frozen();
        assert_eq!(frozen.temperature.max_delta, 0.0);
        assert_eq!(frozen.temperature.min, 15.0);
        assert!(frozen.server_cpu.contains(100.0));
    }
}
