//! Walks the fixed 3 × 5 × 8 tree and produces a brand-new fleet per tick.
//!
//! Data centers are matched by id, racks and servers by position. Nothing is
//! shared with the previous fleet except through value copies.

use crate::evolver::{server_id, Evolver};
use crate::models::{DataCenter, Fleet, Rack, Server, RACKS_PER_DATA_CENTER, SERVERS_PER_RACK};
use rand::Rng;

/// Fixed site catalogue: (id, name, location).
pub const DATA_CENTERS: [(&str, &str, &str); 3] = [
    ("dc-tokyo", "Tokyo DC", "Tokyo, Japan"),
    ("dc-oregon", "Oregon DC", "Oregon, USA"),
    ("dc-ireland", "Ireland DC", "Dublin, Ireland"),
];

pub fn rack_id(data_center_id: &str, position: usize) -> String {
    format!("{data_center_id}-rack-{position}")
}

/// Fresh fleet when `previous` is `None`, otherwise one evolution step of it.
pub fn evolve_fleet<R: Rng + ?Sized>(evolver: &mut Evolver<'_, R>, previous: Option<&Fleet>, now: time::OffsetDateTime) -> Fleet {
    let data_centers = DATA_CENTERS
        .iter()
        .map(|&(id, name, location)| {
            let prev_dc = previous.and_then(|fleet| fleet.data_centers.iter().find(|dc| dc.id == id));
            evolve_data_center(evolver, id, name, location, prev_dc)
        })
        .collect();

    Fleet { data_centers, last_update_time: now }
}

fn evolve_data_center<R: Rng + ?Sized>(
    evolver: &mut Evolver<'_, R>,
    id: &str,
    name: &str,
    location: &str,
    previous: Option<&DataCenter>,
) -> DataCenter {
    let racks = (0..RACKS_PER_DATA_CENTER)
        .map(|position| {
            let prev_rack = previous.and_then(|dc| dc.racks.iter().find(|r| r.position == position));
            evolve_rack(evolver, &rack_id(id, position), position, prev_rack)
        })
        .collect();

    DataCenter { id: id.to_string(), name: name.to_string(), location: location.to_string(), racks }
}

fn evolve_rack<R: Rng + ?Sized>(
    evolver: &mut Evolver<'_, R>,
    id: &str,
    position: usize,
    previous: Option<&Rack>,
) -> Rack {
    let servers: Vec<Server> = (0..SERVERS_PER_RACK)
        .map(|pos| {
            let prev_server = previous.and_then(|rack| rack.servers.iter().find(|s| s.position == pos));
            evolver.server(&server_id(id, pos), pos, prev_server)
        })
        .collect();

    Rack { id: id.to_string(), name: format!("Rack-{position}"), position, servers }
}
