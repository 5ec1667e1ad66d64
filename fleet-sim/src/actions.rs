//! Out-of-band lifecycle commands applied to one entity of a fleet.
//!
//! Every command locates its target before touching anything, so an `Err`
//! leaves the fleet exactly as it was.

use crate::drift::chance;
use crate::error::{FleetError, Result};
use crate::evolver::{container_id, next_free_index, Evolver};
use crate::models::{Container, ContainerStatus, Fleet, Server, ServerStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerAction {
    Start,
    Stop,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Start,
    Stop,
    Pause,
    Remove,
}

impl FromStr for ServerAction {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(ServerAction::Start),
            "stop" => Ok(ServerAction::Stop),
            "restart" => Ok(ServerAction::Restart),
            other => Err(FleetError::Validation(format!("unknown server action '{other}'"))),
        }
    }
}

impl FromStr for ContainerAction {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(ContainerAction::Start),
            "stop" => Ok(ContainerAction::Stop),
            "pause" => Ok(ContainerAction::Pause),
            "remove" => Ok(ContainerAction::Remove),
            other => Err(FleetError::Validation(format!("unknown container action '{other}'"))),
        }
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerAction::Start => "start",
            ServerAction::Stop => "stop",
            ServerAction::Restart => "restart",
        })
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Pause => "pause",
            ContainerAction::Remove => "remove",
        })
    }
}

/// What the caller still owes after a server action returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// The server is in maintenance; `complete_restart` must run after the restart delay.
    RestartPending,
}

fn server_mut<'f>(fleet: &'f mut Fleet, server_id: &str) -> Option<&'f mut Server> {
    fleet
        .data_centers
        .iter_mut()
        .flat_map(|dc| dc.racks.iter_mut())
        .flat_map(|rack| rack.servers.iter_mut())
        .find(|s| s.id == server_id)
}

/// Parent server and index of a container.
fn container_slot<'f>(fleet: &'f mut Fleet, container_id: &str) -> Option<(&'f mut Server, usize)> {
    fleet
        .data_centers
        .iter_mut()
        .flat_map(|dc| dc.racks.iter_mut())
        .flat_map(|rack| rack.servers.iter_mut())
        .find_map(|server| {
            let index = server.containers.iter().position(|c| c.id == container_id)?;
            Some((server, index))
        })
}

pub fn execute_server_action(fleet: &mut Fleet, server_id: &str, action: ServerAction) -> Result<ActionOutcome> {
    let server = server_mut(fleet, server_id).ok_or_else(|| FleetError::server_not_found(server_id))?;

    match action {
        ServerAction::Start => {
            server.status = ServerStatus::Running;
            server.errors.clear();
            Ok(ActionOutcome::Done)
        }
        ServerAction::Stop => {
            server.status = ServerStatus::Maintenance;
            for container in server.containers.iter_mut().filter(|c| c.status == ContainerStatus::Running) {
                container.status = ContainerStatus::Stopped;
            }
            Ok(ActionOutcome::Done)
        }
        ServerAction::Restart => {
            server.status = ServerStatus::Maintenance;
            server.errors.clear();
            Ok(ActionOutcome::RestartPending)
        }
    }
}

/// Second half of a restart: back to running, stopped containers come back
/// as running or, with probability `error_chance`, as error.
///
/// Returns `Ok(false)` when the server left maintenance in the meantime and
/// nothing was changed.
pub fn complete_restart<R: Rng + ?Sized>(
    fleet: &mut Fleet,
    server_id: &str,
    rng: &mut R,
    error_chance: f64,
) -> Result<bool> {
    let server = server_mut(fleet, server_id).ok_or_else(|| FleetError::server_not_found(server_id))?;
    if server.status != ServerStatus::Maintenance {
        return Ok(false);
    }

    server.status = ServerStatus::Running;
    for container in server.containers.iter_mut().filter(|c| c.status == ContainerStatus::Stopped) {
        container.status =
            if chance(rng, error_chance) { ContainerStatus::Error } else { ContainerStatus::Running };
    }
    Ok(true)
}

/// Applies a container action and returns the affected container as it is
/// afterwards (or as it was, for `Remove`).
pub fn execute_container_action(fleet: &mut Fleet, container_id: &str, action: ContainerAction) -> Result<Container> {
    let (server, index) =
        container_slot(fleet, container_id).ok_or_else(|| FleetError::container_not_found(container_id))?;

    let status = match action {
        ContainerAction::Remove => return Ok(server.containers.remove(index)),
        ContainerAction::Start => ContainerStatus::Running,
        ContainerAction::Stop => ContainerStatus::Stopped,
        ContainerAction::Pause => ContainerStatus::Paused,
    };
    let container = &mut server.containers[index];
    container.status = status;
    Ok(container.clone())
}

/// Appends a freshly synthesized container to a server.
///
/// The container count is not capped here; evolution caps only its own growth.
pub fn create_container<R: Rng + ?Sized>(
    fleet: &mut Fleet,
    evolver: &mut Evolver<'_, R>,
    server_id: &str,
    image: Option<String>,
    name: Option<String>,
) -> Result<Container> {
    let server = server_mut(fleet, server_id).ok_or_else(|| FleetError::server_not_found(server_id))?;

    let index = next_free_index(&server.id, &server.containers);
    let name = name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| format!("container-{index}"));
    let image = image.filter(|i| !i.trim().is_empty());
    let container = evolver.synthesize_container(container_id(&server.id, index), name, image);
    server.containers.push(container.clone());
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::StateEq;
    use crate::hierarchy::evolve_fleet;
    use crate::params::SimParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use time::macros::datetime;

    const SERVER: &str = "dc-oregon-rack-2-server-5";

    fn fleet() -> Fleet {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let params = SimParams::default();
        let now = datetime!(2024-04-04 4:04 UTC);
        evolve_fleet(&mut Evolver::new(&mut rng, &params, now), None, now)
    }

    #[test]
    fn test_action_names_parse() {
        assert_eq!("restart".parse::<ServerAction>().unwrap(), ServerAction::Restart);
        assert_eq!("pause".parse::<ContainerAction>().unwrap(), ContainerAction::Pause);
        assert!(matches!("reboot".parse::<ServerAction>(), Err(FleetError::Validation(_))));
        assert_eq!(ContainerAction::Remove.to_string(), "remove");
    }

    #[test]
    fn test_unknown_server_leaves_fleet_untouched() {
        let mut fleet = fleet();
        let before = fleet.clone();
        let err = execute_server_action(&mut fleet, "nonexistent", ServerAction::Start).unwrap_err();
        assert!(matches!(err, FleetError::NotFound { .. }));
        assert!(fleet.state_eq(&before));

        assert!(execute_container_action(&mut fleet, "nonexistent", ContainerAction::Remove).is_err());
        assert!(fleet.state_eq(&before));
    }

    #[test]
    fn test_start_clears_errors() {
        let mut fleet = fleet();
        {
            let server = server_mut(&mut fleet, SERVER).unwrap();
            server.status = ServerStatus::Error;
            server.errors = vec!["Error: Connection timeout".into()];
        }
        assert_eq!(execute_server_action(&mut fleet, SERVER, ServerAction::Start).unwrap(), ActionOutcome::Done);
        let server = fleet.server(SERVER).unwrap();
        assert_eq!(server.status, ServerStatus::Running);
        assert!(server.errors.is_empty());
    }

    #[test]
    fn test_stop_stops_only_running_containers() {
        let mut fleet = fleet();
        let paused_before: Vec<String> = fleet
            .server(SERVER)
            .unwrap()
            .containers
            .iter()
            .filter(|c| c.status == ContainerStatus::Paused)
            .map(|c| c.id.clone())
            .collect();

        execute_server_action(&mut fleet, SERVER, ServerAction::Stop).unwrap();
        let server = fleet.server(SERVER).unwrap();
        assert_eq!(server.status, ServerStatus::Maintenance);
        assert!(server.containers.iter().all(|c| c.status != ContainerStatus::Running));
        for id in paused_before {
            assert_eq!(server.container(&id).unwrap().status, ContainerStatus::Paused);
        }
    }

    #[test]
    fn test_restart_two_phases() {
        let mut fleet = fleet();
        execute_server_action(&mut fleet, SERVER, ServerAction::Stop).unwrap();
        let outcome = execute_server_action(&mut fleet, SERVER, ServerAction::Restart).unwrap();
        assert_eq!(outcome, ActionOutcome::RestartPending);
        assert_eq!(fleet.server(SERVER).unwrap().status, ServerStatus::Maintenance);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(complete_restart(&mut fleet, SERVER, &mut rng, 0.0).unwrap());
        let server = fleet.server(SERVER).unwrap();
        assert_eq!(server.status, ServerStatus::Running);
        assert!(server.containers.iter().all(|c| c.status != ContainerStatus::Stopped));

        // Already running: a late completion is a no-op.
        assert!(!complete_restart(&mut fleet, SERVER, &mut rng, 0.0).unwrap());
    }

    #[test]
    fn test_restart_error_branch() {
        let mut fleet = fleet();
        for container in server_mut(&mut fleet, SERVER).unwrap().containers.iter_mut() {
            container.status = ContainerStatus::Running;
        }
        execute_server_action(&mut fleet, SERVER, ServerAction::Stop).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        complete_restart(&mut fleet, SERVER, &mut rng, 1.0).unwrap();
        let server = fleet.server(SERVER).unwrap();
        assert!(server.containers.iter().all(|c| c.status != ContainerStatus::Stopped));
        assert!(server.containers.iter().all(|c| c.status == ContainerStatus::Error));
    }

    #[test]
    fn test_container_actions() {
        let mut fleet = fleet();
        let target = fleet.server(SERVER).unwrap().containers[0].id.clone();
        let count = fleet.server(SERVER).unwrap().containers.len();

        let paused = execute_container_action(&mut fleet, &target, ContainerAction::Pause).unwrap();
        assert_eq!(paused.status, ContainerStatus::Paused);
        assert_eq!(fleet.container(&target).unwrap().status, ContainerStatus::Paused);

        let removed = execute_container_action(&mut fleet, &target, ContainerAction::Remove).unwrap();
        assert_eq!(removed.id, target);
        assert!(fleet.container(&target).is_none());
        assert_eq!(fleet.server(SERVER).unwrap().containers.len(), count - 1);
    }

    #[test]
    fn test_create_container_with_overrides() {
        let mut fleet = fleet();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let params = SimParams::default();
        let now = datetime!(2024-04-05 0:00 UTC);
        let mut evolver = Evolver::new(&mut rng, &params, now);

        let created =
            create_container(&mut fleet, &mut evolver, SERVER, Some("busybox:1".into()), Some("canary".into())).unwrap();
        assert_eq!(created.image, "busybox:1");
        assert_eq!(created.name, "canary");
        assert!(created.id.starts_with(SERVER));
        assert_eq!(fleet.server(SERVER).unwrap().containers.last().unwrap().id, created.id);

        let defaulted = create_container(&mut fleet, &mut evolver, SERVER, None, Some("  ".into())).unwrap();
        assert!(defaulted.name.starts_with("container-"));
        assert_ne!(defaulted.id, created.id);

        let before = fleet.clone();
        assert!(create_container(&mut fleet, &mut evolver, "nope", None, None).is_err());
        assert!(fleet.state_eq(&before));
    }
}
