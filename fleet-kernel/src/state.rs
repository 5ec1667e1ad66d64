use crate::health::HealthTracker;
use fleet_sim::FleetStore;

/// État unique partagé par toutes les routes Axum.
#[derive(Clone)]
pub struct AppState {
    pub store: FleetStore,
    pub health: HealthTracker,
}

impl AppState {
    pub fn new(store: FleetStore) -> Self {
        Self { store, health: HealthTracker::new() }
    }
}
