/*!
Test harness for the fleet store

Wraps a store built on a manual clock and a seeded random source so tests
can step time explicitly, plus assertions returning `anyhow::Result` so a
failing check reports which entity broke it.
*/

use crate::fixtures::{fixed_clock, seeded_rng};
use anyhow::{bail, Result};
use fleet_sim::clock::ManualClock;
use fleet_sim::models::{Fleet, RACKS_PER_DATA_CENTER, SERVERS_PER_RACK};
use fleet_sim::params::SimParams;
use fleet_sim::store::FleetStore;
use std::sync::Arc;

/// Idempotent; output goes through the test writer so it stays per-test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Store plus the clock that drives it.
pub struct TestHarness {
    pub store: FleetStore,
    pub clock: ManualClock,
}

impl TestHarness {
    pub fn new(params: SimParams, seed: u64) -> Self {
        init_test_logging();
        let clock = fixed_clock();
        let store = FleetStore::new(params, Arc::new(clock.clone()), seeded_rng(seed));
        Self { store, clock }
    }

    /// Moves the clock forward and reads the next fleet.
    pub fn tick(&self, millis: i64) -> Fleet {
        self.clock.advance(time::Duration::milliseconds(millis));
        self.store.get_current()
    }
}

/// 3 data centers of 5 racks of 8 servers, container counts within `[floor, cap]`.
pub fn assert_fleet_shape(fleet: &Fleet, params: &SimParams) -> Result<()> {
    if fleet.data_centers.len() != 3 {
        bail!("expected 3 data centers, got {}", fleet.data_centers.len());
    }
    for dc in &fleet.data_centers {
        if dc.racks.len() != RACKS_PER_DATA_CENTER {
            bail!("{}: expected {} racks, got {}", dc.id, RACKS_PER_DATA_CENTER, dc.racks.len());
        }
        for rack in &dc.racks {
            if rack.servers.len() != SERVERS_PER_RACK {
                bail!("{}: expected {} servers, got {}", rack.id, SERVERS_PER_RACK, rack.servers.len());
            }
        }
    }
    let bounds = &params.containers;
    for server in fleet.servers() {
        let n = server.containers.len();
        if n < bounds.floor || n > bounds.cap {
            bail!("{}: {} containers outside [{}, {}]", server.id, n, bounds.floor, bounds.cap);
        }
    }
    Ok(())
}

/// Every server and container metric inside its configured range.
pub fn assert_metrics_in_bounds(fleet: &Fleet, params: &SimParams) -> Result<()> {
    let d = &params.drift;
    for server in fleet.servers() {
        let checks = [
            ("cpu", server.cpu, &d.server_cpu),
            ("memory", server.memory, &d.server_memory),
            ("disk", server.disk, &d.disk),
            ("network", server.network, &d.network),
            ("temperature", server.temperature, &d.temperature),
        ];
        for (metric, value, spec) in checks {
            if !spec.contains(value) {
                bail!("{} {} = {} outside [{}, {}]", server.id, metric, value, spec.min, spec.max);
            }
        }
        for c in &server.containers {
            if !d.container_cpu.contains(c.cpu) || !d.container_memory.contains(c.memory) {
                bail!("{} cpu {} memory {} out of range", c.id, c.cpu, c.memory);
            }
        }
    }
    Ok(())
}

/// Same data center, rack and server ids at the same positions.
pub fn same_ids(a: &Fleet, b: &Fleet) -> bool {
    let ids = |f: &Fleet| {
        f.data_centers
            .iter()
            .flat_map(|dc| std::iter::once(dc.id.clone()).chain(dc.racks.iter().map(|r| r.id.clone())))
            .chain(f.servers().map(|s| s.id.clone()))
            .collect::<Vec<_>>()
    };
    ids(a) == ids(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{calm_params, sample_fleet};

    #[test]
    fn test_sample_fleet_passes_assertions() {
        let params = SimParams::default();
        let fleet = sample_fleet(9, &params);
        assert_fleet_shape(&fleet, &params).unwrap();
        assert_metrics_in_bounds(&fleet, &params).unwrap();
        assert!(same_ids(&fleet, &fleet));
    }

    #[test]
    fn test_shape_assertion_reports_offender() {
        let params = calm_params();
        let mut fleet = sample_fleet(9, &params);
        fleet.data_centers[0].racks[0].servers.pop();
        let err = assert_fleet_shape(&fleet, &params).unwrap_err();
        assert!(err.to_string().contains("dc-tokyo-rack-0"));
    }

    #[test]
    fn test_harness_tick_advances_clock() {
        let harness = TestHarness::new(calm_params(), 1);
        let first = harness.store.get_current();
        let second = harness.tick(1_000);
        assert_eq!(second.last_update_time - first.last_update_time, time::Duration::seconds(1));
    }
}
