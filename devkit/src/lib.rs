/*!
# Fleet DevKit - fixtures and assertions for fleet tests

Shared by every crate's test suite:
- Seeded random sources and a manual clock
- Calm parameters (no drift, no random events) for deterministic scenarios
- A harness wrapping a `FleetStore` driven by that clock
- Shape and bounds assertions over whole fleets
*/

pub mod fixtures;
pub mod test_utils;

pub use fixtures::{calm_params, fixed_clock, sample_fleet, seeded_rng, EPOCH};
pub use test_utils::{assert_fleet_shape, assert_metrics_in_bounds, init_test_logging, same_ids, TestHarness};
