pub mod run;

pub use run::{RunOutcome, RunPhase, SimulationRun};

use std::sync::atomic::AtomicBool;

use crate::config::SimConfig;
use crate::error::Result;
use crate::geometry::Lattice;
use crate::statistics::TemperatureResultRow;

/// Run the full Monte Carlo schedule (thermalization + sampling) for one
/// (L, T) pair.
///
/// Identical `(lattice.l, temperature, seed, config)` always produce an
/// identical accumulator. A failed run is never retried with another seed.
pub fn run_simulation(
    lattice: &Lattice,
    temperature: f64,
    seed: u64,
    config: &SimConfig,
    interrupted: &AtomicBool,
) -> Result<RunOutcome> {
    SimulationRun::new(lattice, temperature, seed, config)?.run(interrupted)
}

impl RunOutcome {
    /// Derive the per-spin result row for this run.
    pub fn to_row(&self, lattice: &Lattice, config: &SimConfig) -> TemperatureResultRow {
        let mut row = TemperatureResultRow::from_accumulator(
            self.temperature,
            &self.accumulator,
            lattice.n_spins,
            config.boltzmann,
            config.magnetization,
        );
        row.tau_abs_m = self.tau_abs_m;
        row
    }
}
