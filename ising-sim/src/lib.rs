//! Metropolis Monte Carlo for the 2-D Ising model on periodic square
//! lattices: single-spin-flip sweeps with incremental energy bookkeeping,
//! thermalization and sampling schedules, and parallel temperature sweeps
//! that produce one ordered table of thermodynamic estimates per lattice
//! size.

pub mod config;
pub mod error;
pub mod geometry;
pub mod mcmc;
pub mod output;
pub mod parallel;
pub mod simulation;
pub mod spins;
pub mod statistics;

pub use config::{FailurePolicy, MagnetizationConvention, SimConfig, SiteOrder, SweepConfig};
pub use error::{Result, SimError};
pub use geometry::Lattice;
pub use output::{read_table, table_path, JsonTableWriter, ResultWriter};
pub use parallel::{run_all_sizes, worker_count, FailedRun, SizeReport, SweepOutcome, TemperatureSweep};
pub use simulation::{run_simulation, RunOutcome, RunPhase, SimulationRun};
pub use spins::SpinLattice;
pub use statistics::{ObservableAccumulator, ResultTable, TemperatureResultRow};
