//! Produces the next snapshot of a container or server: synthesized from
//! nothing, or evolved from the previous snapshot with the same id.

use crate::drift::{chance, drift_metric, maybe_flip};
use crate::models::{Container, ContainerStatus, Server, ServerStatus};
use crate::params::{SimParams, Thresholds};
use rand::seq::SliceRandom;
use rand::Rng;
use time::OffsetDateTime;

pub const IMAGES: [&str; 6] =
    ["nginx:latest", "redis:alpine", "postgres:13", "node:18", "python:3.9", "mongodb:latest"];
pub const PORT_MAPPINGS: [&str; 5] = ["8080:80", "3000:3000", "5432:5432", "6379:6379", "27017:27017"];
/// Reported by every server in `error` status.
pub const CANNED_ERRORS: [&str; 2] = ["Error: Connection timeout", "Warning: High CPU usage"];

const CREATED_WITHIN_MS: i64 = 7 * 24 * 60 * 60 * 1000;

pub fn container_id(server_id: &str, index: usize) -> String {
    format!("{server_id}-container-{index}")
}

pub fn server_id(rack_id: &str, position: usize) -> String {
    format!("{rack_id}-server-{position}")
}

/// Status of an evolved server. `fault` is the independent random fault.
pub fn derive_status(cpu: f64, memory: f64, temperature: f64, fault: bool, t: &Thresholds) -> ServerStatus {
    if fault || cpu > t.hard_cpu || memory > t.hard_memory || temperature > t.hard_temperature {
        ServerStatus::Error
    } else if cpu > t.soft_cpu || memory > t.soft_memory || temperature > t.soft_temperature {
        ServerStatus::Warning
    } else {
        ServerStatus::Running
    }
}

pub fn errors_for(status: ServerStatus) -> Vec<String> {
    if status == ServerStatus::Error {
        CANNED_ERRORS.iter().map(|e| e.to_string()).collect()
    } else {
        Vec::new()
    }
}

/// One evolution pass: a borrowed random source, the parameters and the
/// instant used for synthesized timestamps.
pub struct Evolver<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
    params: &'a SimParams,
    now: OffsetDateTime,
}

impl<'a, R: Rng + ?Sized> Evolver<'a, R> {
    pub fn new(rng: &'a mut R, params: &'a SimParams, now: OffsetDateTime) -> Self {
        Self { rng, params, now }
    }

    pub fn container(&mut self, server_id: &str, index: usize, previous: Option<&Container>) -> Container {
        match previous {
            Some(prev) => self.evolve_container(prev),
            None => self.synthesize_container(container_id(server_id, index), format!("container-{index}"), None),
        }
    }

    pub fn server(&mut self, server_id: &str, position: usize, previous: Option<&Server>) -> Server {
        match previous {
            Some(prev) => self.evolve_server(prev),
            None => self.synthesize_server(server_id, position),
        }
    }

    /// Fresh container. `image` overrides the random pick.
    pub fn synthesize_container(&mut self, id: String, name: String, image: Option<String>) -> Container {
        let image = image.unwrap_or_else(|| pick(self.rng, &IMAGES).to_string());
        let status = if chance(self.rng, self.params.chances.new_container_running) {
            ContainerStatus::Running
        } else {
            *ContainerStatus::NOT_RUNNING.choose(self.rng).unwrap_or(&ContainerStatus::Stopped)
        };
        let age = time::Duration::milliseconds(self.rng.gen_range(0..CREATED_WITHIN_MS));

        Container {
            id,
            name,
            image,
            status,
            cpu: self.rng.gen_range(0.0..50.0),
            memory: self.rng.gen_range(0.0..30.0),
            ports: vec![pick(self.rng, &PORT_MAPPINGS).to_string()],
            created_at: self.now - age,
        }
    }

    fn evolve_container(&mut self, prev: &Container) -> Container {
        let drift = &self.params.drift;
        Container {
            cpu: drift_metric(self.rng, prev.cpu, &drift.container_cpu),
            memory: drift_metric(self.rng, prev.memory, &drift.container_memory),
            status: maybe_flip(
                self.rng,
                prev.status,
                self.params.chances.container_status_flip,
                &ContainerStatus::ALL,
            ),
            ..prev.clone()
        }
    }

    fn synthesize_server(&mut self, server_id: &str, position: usize) -> Server {
        let bounds = &self.params.containers;
        let (lo, hi) = (bounds.initial_min.min(bounds.initial_max), bounds.initial_max.max(bounds.initial_min));
        let count = self.rng.gen_range(lo..=hi);
        let containers = (0..count).map(|i| self.container(server_id, i, None)).collect();

        let cpu = self.rng.gen_range(0.0..100.0);
        let memory = self.rng.gen_range(0.0..100.0);
        let disk = self.rng.gen_range(0.0..100.0);
        let network = self.rng.gen_range(0.0..100.0);
        let temperature = 20.0 + self.rng.gen_range(0.0..60.0);

        let status = if chance(self.rng, self.params.chances.new_server_fault) {
            ServerStatus::Error
        } else if cpu > self.params.thresholds.new_server_warning_cpu {
            ServerStatus::Warning
        } else {
            ServerStatus::Running
        };

        Server {
            id: server_id.to_string(),
            name: format!("Server-{position}"),
            position,
            cpu,
            memory,
            disk,
            network,
            temperature,
            status,
            errors: errors_for(status),
            containers,
        }
    }

    fn evolve_server(&mut self, prev: &Server) -> Server {
        let params = self.params;
        let drift = &params.drift;
        let cpu = drift_metric(self.rng, prev.cpu, &drift.server_cpu);
        let memory = drift_metric(self.rng, prev.memory, &drift.server_memory);
        let disk = drift_metric(self.rng, prev.disk, &drift.disk);
        let network = drift_metric(self.rng, prev.network, &drift.network);
        let temperature = drift_metric(self.rng, prev.temperature, &drift.temperature);

        let mut containers: Vec<Container> = prev
            .containers
            .iter()
            .enumerate()
            .map(|(i, c)| self.container(&prev.id, i, Some(c)))
            .collect();

        // Growth appends at the end and shrinkage drops the last entry.
        let bounds = &params.containers;
        if containers.len() < bounds.cap && chance(self.rng, params.chances.container_append) {
            let index = next_free_index(&prev.id, &containers);
            let fresh = self.container(&prev.id, index, None);
            containers.push(fresh);
        } else if containers.len() > bounds.floor && chance(self.rng, params.chances.container_remove) {
            containers.pop();
        }

        let fault = chance(self.rng, params.chances.server_fault);
        // Maintenance is held by an operator action; only an error breaks it.
        let status = match derive_status(cpu, memory, temperature, fault, &params.thresholds) {
            ServerStatus::Error => ServerStatus::Error,
            _ if prev.status == ServerStatus::Maintenance => ServerStatus::Maintenance,
            derived => derived,
        };

        Server {
            id: prev.id.clone(),
            name: prev.name.clone(),
            position: prev.position,
            cpu,
            memory,
            disk,
            network,
            temperature,
            status,
            errors: errors_for(status),
            containers,
        }
    }
}

/// Lowest index at or after `containers.len()` whose id is not taken.
pub fn next_free_index(server_id: &str, containers: &[Container]) -> usize {
    let mut index = containers.len();
    while containers.iter().any(|c| c.id == container_id(server_id, index)) {
        index += 1;
    }
    index
}

fn pick<'s, R: Rng + ?Sized>(rng: &mut R, items: &'s [&'s str]) -> &'s str {
    items.choose(rng).copied().unwrap_or_default()
}
