pub mod sweep;

pub use sweep::{acceptance_probability, delta_energy, MetropolisStepper, SweepTally};
