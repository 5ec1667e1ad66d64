//! The single owner of the current fleet.
//!
//! Reads evolve the fleet (or regenerate it once it went stale), commands
//! mutate it in place. Both go through one `parking_lot::Mutex`, which is the
//! only place the fleet is ever changed. Deferred restart completions re-enter
//! that same critical section and look the server up by id in whatever fleet
//! is current when they fire.

use crate::actions::{self, ActionOutcome, ContainerAction, ServerAction};
use crate::clock::{Clock, SystemClock};
use crate::error::{FleetError, Result};
use crate::evolver::Evolver;
use crate::hierarchy::evolve_fleet;
use crate::models::{Container, Fleet};
use crate::params::SimParams;
use crate::scheduler::DeferredTasks;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Weak};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Cheap cloneable handle; all clones share one fleet.
#[derive(Clone)]
pub struct FleetStore {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<StoreState>,
    tasks: Mutex<DeferredTasks>,
    clock: Arc<dyn Clock>,
    params: SimParams,
}

struct StoreState {
    fleet: Option<Fleet>,
    last_update: Option<OffsetDateTime>,
    /// Bumped on every fresh generation; deferred work from an older one is void.
    generation: u64,
    rng: ChaCha8Rng,
}

impl FleetStore {
    pub fn new(params: SimParams, clock: Arc<dyn Clock>, rng: ChaCha8Rng) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState { fleet: None, last_update: None, generation: 0, rng }),
                tasks: Mutex::new(DeferredTasks::default()),
                clock,
                params,
            }),
        }
    }

    /// System clock, random source seeded from `seed` or from the OS.
    pub fn with_seed(params: SimParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::new(params, Arc::new(SystemClock), rng)
    }

    pub fn params(&self) -> &SimParams {
        &self.shared.params
    }

    /// Current fleet after one evolution step, or a fresh one on first access
    /// and after the stale threshold.
    pub fn get_current(&self) -> Fleet {
        let now = self.shared.clock.now();
        let params = &self.shared.params;
        let mut state = self.shared.state.lock();
        let st = &mut *state;

        let idle = st.last_update.map(|last| now - last);
        let next = match (st.fleet.take(), idle) {
            (Some(_), Some(idle)) if idle > params.stale_threshold() => {
                info!(idle_ms = idle.whole_milliseconds() as i64, "fleet went stale, regenerating");
                self.shared.fresh_fleet(st, now)
            }
            (Some(fleet), Some(idle)) if idle < params.min_evolve_interval() => {
                debug!("fleet fresh enough, serving cached snapshot");
                let snapshot = fleet.clone();
                st.fleet = Some(fleet);
                return snapshot;
            }
            (Some(fleet), _) => {
                let mut evolver = Evolver::new(&mut st.rng, params, now);
                let next = evolve_fleet(&mut evolver, Some(&fleet), now);
                debug!(generation = st.generation, "fleet evolved");
                next
            }
            (None, _) => {
                info!("first access, generating fleet");
                self.shared.fresh_fleet(st, now)
            }
        };

        st.fleet = Some(next.clone());
        st.last_update = Some(now);
        next
    }

    /// Current fleet without evolving it.
    pub fn snapshot(&self) -> Option<Fleet> {
        self.shared.state.lock().fleet.clone()
    }

    /// Runs `f` on the current fleet without cloning or evolving it.
    pub fn read<T>(&self, f: impl FnOnce(&Fleet) -> T) -> Option<T> {
        self.shared.state.lock().fleet.as_ref().map(f)
    }

    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.shared.state.lock().last_update
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.lock().pending()
    }

    /// Throws the fleet away; the next read generates a new one.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        state.fleet = None;
        state.last_update = None;
        state.generation += 1;
        drop(state);
        let cancelled = self.shared.tasks.lock().cancel_all();
        info!(cancelled, "fleet store reset");
    }

    /// Cancels pending deferred work. The fleet itself stays readable.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.shared.tasks.lock().cancel_all();
        info!(cancelled, "fleet store shut down");
        cancelled
    }

    pub fn server_action(&self, server_id: &str, action: ServerAction) -> Result<ActionOutcome> {
        let (outcome, generation) = {
            let mut state = self.shared.state.lock();
            let now = self.shared.clock.now();
            let st = &mut *state;
            let fleet = self.shared.materialize(st, now);
            let outcome = actions::execute_server_action(fleet, server_id, action)?;
            (outcome, st.generation)
        };
        info!(server_id, %action, "server action applied");

        if outcome == ActionOutcome::RestartPending {
            self.schedule_restart(server_id.to_string(), generation);
        }
        Ok(outcome)
    }

    pub fn container_action(&self, container_id: &str, action: ContainerAction) -> Result<Container> {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now();
        let fleet = self.shared.materialize(&mut state, now);
        let container = actions::execute_container_action(fleet, container_id, action)?;
        info!(container_id, %action, "container action applied");
        Ok(container)
    }

    pub fn create_container(&self, server_id: &str, image: Option<String>, name: Option<String>) -> Result<Container> {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now();
        self.shared.materialize(&mut state, now);
        let StoreState { fleet, rng, .. } = &mut *state;
        let fleet = fleet
            .as_mut()
            .ok_or_else(|| FleetError::Internal("fleet missing after generation".into()))?;
        let mut evolver = Evolver::new(rng, &self.shared.params, now);
        let container = actions::create_container(fleet, &mut evolver, server_id, image, name)?;
        info!(server_id, container_id = %container.id, image = %container.image, "container created");
        Ok(container)
    }

    fn schedule_restart(&self, server_id: String, generation: u64) {
        let delay = self.shared.params.restart_delay();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.finish_restart(&server_id, generation);
                    }
                });
                self.shared.tasks.lock().track(task);
            }
            Err(_) => {
                warn!(%server_id, "no async runtime, completing restart immediately");
                self.shared.finish_restart(&server_id, generation);
            }
        }
    }
}

impl Shared {
    fn fresh_fleet(&self, state: &mut StoreState, now: OffsetDateTime) -> Fleet {
        let mut evolver = Evolver::new(&mut state.rng, &self.params, now);
        let fleet = evolve_fleet(&mut evolver, None, now);
        state.generation += 1;
        let cancelled = self.tasks.lock().cancel_all();
        if cancelled > 0 {
            warn!(cancelled, "pending restarts cancelled by regeneration");
        }
        fleet
    }

    /// Commands on a store that was never read act on a freshly generated fleet.
    fn materialize<'s>(&self, state: &'s mut StoreState, now: OffsetDateTime) -> &'s mut Fleet {
        let fleet = match state.fleet.take() {
            Some(fleet) => fleet,
            None => {
                info!("command before first read, generating fleet");
                state.last_update = Some(now);
                self.fresh_fleet(state, now)
            }
        };
        state.fleet.insert(fleet)
    }

    fn finish_restart(&self, server_id: &str, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            info!(server_id, "restart completion dropped, fleet was regenerated");
            return;
        }
        let st = &mut *state;
        let Some(fleet) = st.fleet.as_mut() else {
            return;
        };
        match actions::complete_restart(fleet, server_id, &mut st.rng, self.params.chances.restart_container_error) {
            Ok(true) => info!(server_id, "restart completed"),
            Ok(false) => debug!(server_id, "restart completion skipped, server left maintenance"),
            Err(e) => warn!(server_id, error = %e, "restart completion failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::differ::StateEq;
    use crate::models::{ContainerStatus, ServerStatus};
    use crate::params::{Chances, DriftParams};
    use std::time::Duration;
    use time::macros::datetime;

    const SERVER: &str = "dc-ireland-rack-1-server-2";

    fn store_with(params: SimParams) -> (FleetStore, ManualClock) {
        let clock = ManualClock::new(datetime!(2024-07-01 9:00 UTC));
        let store = FleetStore::new(params, Arc::new(clock.clone()), ChaCha8Rng::seed_from_u64(77));
        (store, clock)
    }

    fn calm() -> SimParams {
        SimParams { drift: DriftParams::frozen(), chances: Chances::never(), ..SimParams::default() }
    }

    #[test]
    fn test_first_read_generates_then_evolves() {
        let (store, clock) = store_with(SimParams::default());
        assert!(store.snapshot().is_none());

        let first = store.get_current();
        assert_eq!(first.servers().count(), 120);
        assert_eq!(store.generation(), 1);

        clock.advance(time::Duration::seconds(1));
        let second = store.get_current();
        assert_eq!(store.generation(), 1);
        assert!(!first.state_eq(&second));
        let ids = |f: &Fleet| f.servers().map(|s| s.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(second.last_update_time, clock.now());
    }

    #[test]
    fn test_stale_store_regenerates() {
        let (store, clock) = store_with(SimParams::default());
        store.get_current();
        clock.advance(time::Duration::milliseconds(300_000));
        store.get_current();
        assert_eq!(store.generation(), 1, "exactly at the threshold still evolves");

        clock.advance(time::Duration::milliseconds(300_001));
        store.get_current();
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_freshness_window_serves_cache() {
        let params = SimParams { min_evolve_interval_ms: 1_000, ..SimParams::default() };
        let (store, clock) = store_with(params);
        let first = store.get_current();
        clock.advance(time::Duration::milliseconds(500));
        assert!(store.get_current().state_eq(&first));
        clock.advance(time::Duration::milliseconds(600));
        assert!(!store.get_current().state_eq(&first));
    }

    #[test]
    fn test_commands_on_unread_store_materialize_fleet() {
        let (store, _clock) = store_with(calm());
        store.server_action(SERVER, ServerAction::Stop).unwrap();
        assert_eq!(store.generation(), 1);
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.server(SERVER).unwrap().status, ServerStatus::Maintenance);
    }

    #[test]
    fn test_failed_command_leaves_store_untouched() {
        let (store, _clock) = store_with(SimParams::default());
        let before = store.get_current();
        assert!(store.server_action("nonexistent", ServerAction::Start).is_err());
        assert!(store.container_action("nonexistent", ContainerAction::Stop).is_err());
        assert!(store.create_container("nonexistent", None, None).is_err());
        assert!(store.snapshot().unwrap().state_eq(&before));
    }

    #[test]
    fn test_restart_without_runtime_completes_inline() {
        let (store, _clock) = store_with(calm());
        store.get_current();
        assert_eq!(store.server_action(SERVER, ServerAction::Restart).unwrap(), ActionOutcome::RestartPending);
        let server = store.snapshot().unwrap().server(SERVER).cloned().unwrap();
        assert_eq!(server.status, ServerStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_lands_after_delay_across_evolution() {
        let (store, clock) = store_with(calm());
        let limits = store.params().thresholds.clone();
        let target = store
            .get_current()
            .servers()
            .find(|s| s.cpu <= limits.hard_cpu && s.memory <= limits.hard_memory)
            .map(|s| s.id.clone())
            .unwrap();
        store.server_action(&target, ServerAction::Stop).unwrap();
        store.server_action(&target, ServerAction::Restart).unwrap();
        assert_eq!(store.pending_tasks(), 1);

        // An evolution tick in between replaces the fleet; the restart still finds the server by id.
        clock.advance(time::Duration::seconds(1));
        let mid = store.get_current();
        assert_eq!(mid.server(&target).unwrap().status, ServerStatus::Maintenance);

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        let server = store.snapshot().unwrap().server(&target).cloned().unwrap();
        assert_eq!(server.status, ServerStatus::Running);
        assert!(server.containers.iter().all(|c| c.status != ContainerStatus::Stopped));
        assert_eq!(store.pending_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_restart() {
        let (store, _clock) = store_with(calm());
        store.get_current();
        store.server_action(SERVER, ServerAction::Restart).unwrap();
        store.reset();
        assert_eq!(store.pending_tasks(), 0);

        let fresh = store.get_current();
        store.server_action(SERVER, ServerAction::Stop).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        // The cancelled restart never brings the new fleet's server back.
        let server = store.snapshot().unwrap().server(SERVER).cloned().unwrap();
        assert_eq!(server.status, ServerStatus::Maintenance);
        assert_eq!(fresh.servers().count(), 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_regeneration_voids_restart() {
        let (store, clock) = store_with(calm());
        store.get_current();
        store.server_action(SERVER, ServerAction::Restart).unwrap();
        clock.advance(time::Duration::minutes(6));
        store.get_current();
        assert_eq!(store.generation(), 2);
        assert_eq!(store.pending_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_tasks() {
        let (store, _clock) = store_with(calm());
        store.server_action(SERVER, ServerAction::Restart).unwrap();
        assert_eq!(store.shutdown(), 1);
        tokio::time::sleep(Duration::from_secs(3)).await;
        let server = store.snapshot().unwrap().server(SERVER).cloned().unwrap();
        assert_eq!(server.status, ServerStatus::Maintenance);
    }

    #[test]
    fn test_create_container_goes_through_store() {
        let (store, _clock) = store_with(SimParams::default());
        let created = store.create_container(SERVER, Some("nginx:latest".into()), None).unwrap();
        assert_eq!(store.read(|f| f.container(&created.id).is_some()), Some(true));
    }
}
