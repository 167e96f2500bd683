use crate::geometry::lattice::N_DIRECTIONS;
use crate::geometry::Lattice;
use crate::spins::SpinLattice;

/// Sum of `s_a * s_b` over every bond, each bond counted once.
///
/// Only the forward (down and right) bond of each site is visited, giving
/// `2 * n_spins` bonds. On a 2×2 lattice the forward and backward neighbor
/// along an axis coincide, so each neighboring pair is joined by two bonds
/// and an aligned 2×2 lattice has bond sum 8.
pub fn bond_sum(lattice: &Lattice, spins: &SpinLattice) -> i64 {
    let s = spins.as_slice();
    let mut total = 0i64;
    for i in 0..lattice.n_spins {
        let si = s[i] as i64;
        for d in 0..N_DIRECTIONS {
            total += si * s[lattice.neighbor(i, d, true)] as i64;
        }
    }
    total
}

/// Total energy `−J · Σ_bonds s_a s_b` of a configuration.
pub fn total_energy(lattice: &Lattice, spins: &SpinLattice, coupling: f64) -> f64 {
    -coupling * bond_sum(lattice, spins) as f64
}

/// Total magnetization `Σ s`.
pub fn total_magnetization(spins: &SpinLattice) -> i64 {
    spins.as_slice().iter().map(|&s| s as i64).sum()
}
