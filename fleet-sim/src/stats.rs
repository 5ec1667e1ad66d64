//! Aggregates shown by dashboards: totals, status breakdowns, resource spread.

use crate::models::{Container, ContainerStatus, DataCenter, Fleet, Rack, Server, ServerStatus};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub data_centers: usize,
    pub racks: usize,
    pub servers: usize,
    pub containers: usize,
    /// Servers in `error` status or reporting any error line.
    pub active_errors: usize,
    pub active_warnings: usize,
}

impl FleetSummary {
    fn add_server(&mut self, server: &Server) {
        self.servers += 1;
        self.containers += server.containers.len();
        if server.has_errors() {
            self.active_errors += 1;
        } else if server.status == ServerStatus::Warning {
            self.active_warnings += 1;
        }
    }
}

pub fn summarize(data_centers: &[DataCenter]) -> FleetSummary {
    let mut summary = FleetSummary { data_centers: data_centers.len(), ..Default::default() };
    for rack in data_centers.iter().flat_map(|dc| dc.racks.iter()) {
        summary.racks += 1;
        rack.servers.iter().for_each(|s| summary.add_server(s));
    }
    summary
}

pub fn summarize_rack(rack: &Rack) -> FleetSummary {
    let mut summary = FleetSummary { racks: 1, ..Default::default() };
    rack.servers.iter().for_each(|s| summary.add_server(s));
    summary
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerBreakdown {
    pub running: usize,
    pub warning: usize,
    pub error: usize,
    pub maintenance: usize,
    pub total: usize,
}

pub fn server_breakdown<'a>(servers: impl IntoIterator<Item = &'a Server>) -> ServerBreakdown {
    let mut b = ServerBreakdown::default();
    for server in servers {
        b.total += 1;
        match server.status {
            ServerStatus::Running => b.running += 1,
            ServerStatus::Warning => b.warning += 1,
            ServerStatus::Error => b.error += 1,
            ServerStatus::Maintenance => b.maintenance += 1,
        }
    }
    b
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerBreakdown {
    pub running: usize,
    pub stopped: usize,
    pub paused: usize,
    pub error: usize,
    pub total: usize,
}

pub fn container_breakdown<'a>(containers: impl IntoIterator<Item = &'a Container>) -> ContainerBreakdown {
    let mut b = ContainerBreakdown::default();
    for container in containers {
        b.total += 1;
        match container.status {
            ContainerStatus::Running => b.running += 1,
            ContainerStatus::Stopped => b.stopped += 1,
            ContainerStatus::Paused => b.paused += 1,
            ContainerStatus::Error => b.error += 1,
        }
    }
    b
}

/// Anything with a CPU and a memory reading.
pub trait Loaded {
    fn cpu(&self) -> f64;
    fn memory(&self) -> f64;
}

impl Loaded for Server {
    fn cpu(&self) -> f64 {
        self.cpu
    }
    fn memory(&self) -> f64 {
        self.memory
    }
}

impl Loaded for Container {
    fn cpu(&self) -> f64 {
        self.cpu
    }
    fn memory(&self) -> f64 {
        self.memory
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub avg_cpu: f64,
    pub avg_memory: f64,
    pub max_cpu: f64,
    pub max_memory: f64,
    pub min_cpu: f64,
    pub min_memory: f64,
}

/// Averages are rounded to one decimal; an empty input yields all zeros.
pub fn resource_metrics<'a, T: Loaded + 'a>(entities: impl IntoIterator<Item = &'a T>) -> ResourceMetrics {
    let mut n = 0usize;
    let (mut sum_cpu, mut sum_memory) = (0.0, 0.0);
    let mut m = ResourceMetrics {
        max_cpu: f64::MIN,
        max_memory: f64::MIN,
        min_cpu: f64::MAX,
        min_memory: f64::MAX,
        ..Default::default()
    };
    for e in entities {
        n += 1;
        sum_cpu += e.cpu();
        sum_memory += e.memory();
        m.max_cpu = m.max_cpu.max(e.cpu());
        m.max_memory = m.max_memory.max(e.memory());
        m.min_cpu = m.min_cpu.min(e.cpu());
        m.min_memory = m.min_memory.min(e.memory());
    }
    if n == 0 {
        return ResourceMetrics::default();
    }
    m.avg_cpu = round1(sum_cpu / n as f64);
    m.avg_memory = round1(sum_memory / n as f64);
    m
}

/// Everything a dashboard header shows, computed in one pass per concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetOverview {
    pub totals: FleetSummary,
    pub servers: ServerBreakdown,
    pub containers: ContainerBreakdown,
    pub server_resources: ResourceMetrics,
    pub container_resources: ResourceMetrics,
}

pub fn overview(fleet: &Fleet) -> FleetOverview {
    FleetOverview {
        totals: summarize(&fleet.data_centers),
        servers: server_breakdown(fleet.servers()),
        containers: container_breakdown(fleet.containers()),
        server_resources: resource_metrics(fleet.servers()),
        container_resources: resource_metrics(fleet.containers()),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
