//! Change detection between consecutive polls.
//!
//! Keeps the last snapshot that differed and reports which data centers moved,
//! so a consumer only redraws what changed.

use fleet_sim::stats::{summarize, FleetSummary};
use fleet_sim::differ::shallow_server_eq;
use fleet_sim::{changed_data_centers, DataCenter, Server};

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Ids of data centers whose subtree changed since the previous snapshot.
    pub changed: Vec<String>,
    /// Servers whose tile (status, headline metrics, container count) changed.
    pub changed_servers: usize,
    pub summary: FleetSummary,
}

impl Observation {
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ChangeTracker {
    previous: Option<Vec<DataCenter>>,
}

impl ChangeTracker {
    pub fn observe(&mut self, next: Vec<DataCenter>) -> Observation {
        let (changed, changed_servers) = match &self.previous {
            Some(prev) => (changed_data_centers(prev, &next), count_changed_servers(prev, &next)),
            None => (next.iter().map(|dc| dc.id.clone()).collect(), servers(&next).count()),
        };
        let summary = summarize(&next);
        // Unchanged polls keep the old snapshot.
        if !changed.is_empty() || self.previous.is_none() {
            self.previous = Some(next);
        }
        Observation { changed, changed_servers, summary }
    }

    pub fn current(&self) -> Option<&[DataCenter]> {
        self.previous.as_deref()
    }
}

fn servers(data_centers: &[DataCenter]) -> impl Iterator<Item = &Server> {
    data_centers.iter().flat_map(|dc| dc.racks.iter()).flat_map(|rack| rack.servers.iter())
}

fn count_changed_servers(prev: &[DataCenter], next: &[DataCenter]) -> usize {
    if servers(prev).count() != servers(next).count() {
        return servers(next).count();
    }
    servers(prev).zip(servers(next)).filter(|(a, b)| !shallow_server_eq(a, b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_devkit::{calm_params, sample_fleet};

    #[test]
    fn test_first_observation_reports_everything() {
        let mut tracker = ChangeTracker::default();
        let fleet = sample_fleet(1, &calm_params());
        let obs = tracker.observe(fleet.data_centers);
        assert_eq!(obs.changed, vec!["dc-tokyo", "dc-oregon", "dc-ireland"]);
        assert_eq!(obs.summary.servers, 120);
        assert_eq!(obs.changed_servers, 120);
        assert!(tracker.current().is_some());
    }

    #[test]
    fn test_only_changed_data_center_reported() {
        let mut tracker = ChangeTracker::default();
        let fleet = sample_fleet(2, &calm_params());
        tracker.observe(fleet.data_centers.clone());

        let same = tracker.observe(fleet.data_centers.clone());
        assert!(same.is_unchanged());
        assert_eq!(same.changed_servers, 0);

        let mut next = fleet.data_centers.clone();
        next[2].racks[1].servers[0].containers[0].cpu += 0.5;
        let obs = tracker.observe(next);
        assert_eq!(obs.changed, vec!["dc-ireland"]);
        // A container metric is below server-tile granularity.
        assert_eq!(obs.changed_servers, 0);
        assert_eq!(tracker.current().unwrap()[2].racks[1].servers[0].containers[0].cpu, fleet.data_centers[2].racks[1].servers[0].containers[0].cpu + 0.5);
    }
}
