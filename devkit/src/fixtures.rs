/*!
Deterministic building blocks: random sources, clocks, parameters, fleets.
*/

use fleet_sim::clock::ManualClock;
use fleet_sim::evolver::Evolver;
use fleet_sim::hierarchy::evolve_fleet;
use fleet_sim::models::Fleet;
use fleet_sim::params::{Chances, DriftParams, SimParams};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use time::macros::datetime;
use time::OffsetDateTime;

/// Instant every fixture clock starts at.
pub const EPOCH: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

pub fn fixed_clock() -> ManualClock {
    ManualClock::new(EPOCH)
}

/// No drift and no random events: new containers start running, nothing faults.
pub fn calm_params() -> SimParams {
    SimParams { drift: DriftParams::frozen(), chances: Chances::never(), ..SimParams::default() }
}

/// A freshly generated fleet at [`EPOCH`].
pub fn sample_fleet(seed: u64, params: &SimParams) -> Fleet {
    let mut rng = seeded_rng(seed);
    evolve_fleet(&mut Evolver::new(&mut rng, params, EPOCH), None, EPOCH)
}
