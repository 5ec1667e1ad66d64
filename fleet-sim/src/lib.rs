//! Simulation core for a monitored data-center fleet.
//!
//! A fleet is three data centers of five racks of eight servers, each server
//! running a handful of containers. Every read through [`FleetStore::get_current`]
//! advances the fleet by one bounded random-walk step; commands (start, stop,
//! restart, remove, create) mutate the current fleet in place and are visible
//! to the next read.
//!
//! ```no_run
//! use fleet_sim::{FleetStore, SimParams};
//!
//! let store = FleetStore::with_seed(SimParams::default(), Some(7));
//! let fleet = store.get_current();
//! assert_eq!(fleet.servers().count(), 120);
//! ```

pub mod actions;
pub mod clock;
pub mod differ;
pub mod drift;
pub mod error;
pub mod evolver;
pub mod hierarchy;
pub mod models;
pub mod params;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use actions::{ActionOutcome, ContainerAction, ServerAction};
pub use clock::{Clock, ManualClock, SystemClock};
pub use differ::{changed_data_centers, StateEq};
pub use error::{EntityKind, FleetError, Result};
pub use models::{Container, ContainerStatus, DataCenter, Fleet, Rack, Server, ServerStatus};
pub use params::SimParams;
pub use stats::{overview, summarize, FleetOverview, FleetSummary};
pub use store::FleetStore;
