pub mod energy;
pub mod state;

pub use energy::{bond_sum, total_energy, total_magnetization};
pub use state::SpinLattice;
