//! Field-by-field comparison of snapshots, composed bottom-up.
//!
//! Consumers use it to skip recomputation when a subtree did not change.
//! All predicates are pure and take both sides by shared reference.

use crate::models::{Container, DataCenter, Fleet, Rack, Server};

/// Structural equality over every field and, recursively, every child at the
/// same index.
pub trait StateEq {
    fn state_eq(&self, other: &Self) -> bool;
}

// NaN == NaN so that every snapshot equals itself.
fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn same_children<T: StateEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.state_eq(y))
}

impl StateEq for Container {
    fn state_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.image == other.image
            && self.status == other.status
            && same_f64(self.cpu, other.cpu)
            && same_f64(self.memory, other.memory)
            && self.created_at == other.created_at
            && self.ports == other.ports
    }
}

impl StateEq for Server {
    fn state_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.position == other.position
            && self.status == other.status
            && same_f64(self.cpu, other.cpu)
            && same_f64(self.memory, other.memory)
            && same_f64(self.disk, other.disk)
            && same_f64(self.network, other.network)
            && same_f64(self.temperature, other.temperature)
            && self.errors == other.errors
            && same_children(&self.containers, &other.containers)
    }
}

impl StateEq for Rack {
    fn state_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.position == other.position
            && same_children(&self.servers, &other.servers)
    }
}

impl StateEq for DataCenter {
    fn state_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.location == other.location
            && same_children(&self.racks, &other.racks)
    }
}

impl StateEq for [DataCenter] {
    fn state_eq(&self, other: &Self) -> bool {
        same_children(self, other)
    }
}

/// The timestamp is bookkeeping, not state: two fleets with identical trees are equal.
impl StateEq for Fleet {
    fn state_eq(&self, other: &Self) -> bool {
        self.data_centers[..].state_eq(&other.data_centers[..])
    }
}

/// Cheap comparison of what a container tile shows.
pub fn shallow_container_eq(a: &Container, b: &Container) -> bool {
    a.id == b.id
        && a.name == b.name
        && a.status == b.status
        && same_f64(a.cpu, b.cpu)
        && same_f64(a.memory, b.memory)
}

/// Cheap comparison of what a server tile shows; children only by count.
pub fn shallow_server_eq(a: &Server, b: &Server) -> bool {
    a.id == b.id
        && a.name == b.name
        && a.status == b.status
        && same_f64(a.cpu, b.cpu)
        && same_f64(a.memory, b.memory)
        && same_f64(a.disk, b.disk)
        && same_f64(a.temperature, b.temperature)
        && a.containers.len() == b.containers.len()
}

/// Ids of the data centers in `next` whose subtree differs from `prev`.
///
/// When the lists do not line up (count or id order), every data center in
/// `next` is reported.
pub fn changed_data_centers(prev: &[DataCenter], next: &[DataCenter]) -> Vec<String> {
    let aligned = prev.len() == next.len() && prev.iter().zip(next).all(|(a, b)| a.id == b.id);
    next.iter()
        .enumerate()
        .filter(|(i, dc)| !aligned || !prev[*i].state_eq(dc))
        .map(|(_, dc)| dc.id.clone())
        .collect()
}
