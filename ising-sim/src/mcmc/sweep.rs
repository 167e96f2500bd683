use crate::config::SiteOrder;
use crate::geometry::Lattice;
use crate::spins::SpinLattice;
use rand::Rng;
use rand_xoshiro::Xoshiro256StarStar;

/// Energy change `2·J·s·h` of flipping the spin at `site`.
#[inline]
pub fn delta_energy(lattice: &Lattice, spins: &SpinLattice, site: usize, coupling: f64) -> f64 {
    let s = spins.get(site) as i32;
    2.0 * coupling * (s * spins.local_field(lattice, site)) as f64
}

/// Metropolis acceptance probability `min(1, exp(−ΔE / (k_B·T)))`.
#[inline]
pub fn acceptance_probability(delta_e: f64, temperature: f64, boltzmann: f64) -> f64 {
    if delta_e <= 0.0 {
        1.0
    } else {
        (-delta_e / (boltzmann * temperature)).exp()
    }
}

/// Running counts of one or more sweeps.
///
/// `bond_delta` and `mag_delta` are the exact integer changes of the bond
/// sum and the magnetization caused by accepted flips.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepTally {
    pub attempted: u64,
    pub accepted: u64,
    pub bond_delta: i64,
    pub mag_delta: i64,
}

impl SweepTally {
    pub fn acceptance_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.attempted as f64
    }
}

/// Single-spin-flip Metropolis updater at a fixed temperature.
///
/// On the square lattice `s·h ∈ {−4, −2, 0, 2, 4}`, so acceptance
/// probabilities are tabulated once per run and indexed by `s·h + 4`.
#[derive(Debug, Clone)]
pub struct MetropolisStepper {
    pub temperature: f64,
    pub coupling: f64,
    pub order: SiteOrder,
    accept: [f64; 9],
}

impl MetropolisStepper {
    pub fn new(temperature: f64, coupling: f64, boltzmann: f64, order: SiteOrder) -> Self {
        let mut accept = [1.0f64; 9];
        for (k, p) in accept.iter_mut().enumerate() {
            let s_h = k as i32 - 4;
            *p = acceptance_probability(2.0 * coupling * s_h as f64, temperature, boltzmann);
        }
        Self {
            temperature,
            coupling,
            order,
            accept,
        }
    }

    /// Tabulated acceptance probability for a flip with `s·h = s_h`.
    #[inline]
    pub fn probability(&self, s_h: i32) -> f64 {
        self.accept[(s_h + 4) as usize]
    }

    /// True when every tabulated probability is a finite number in `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        self.accept
            .iter()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
    }

    /// Attempt one flip at `site`. Draws a uniform number only for moves
    /// that raise the energy.
    #[inline]
    pub fn attempt(
        &self,
        lattice: &Lattice,
        spins: &mut SpinLattice,
        site: usize,
        rng: &mut Xoshiro256StarStar,
        tally: &mut SweepTally,
    ) {
        let s = spins.get(site) as i32;
        let s_h = s * spins.local_field(lattice, site);
        tally.attempted += 1;
        if s_h <= 0 || rng.gen::<f64>() < self.probability(s_h) {
            spins.flip(site);
            tally.accepted += 1;
            tally.bond_delta -= 2 * s_h as i64;
            tally.mag_delta -= 2 * s as i64;
        }
    }

    /// One sweep: `n_spins` attempted flips in this stepper's site order.
    #[cfg_attr(feature = "profile", inline(never))]
    pub fn sweep(
        &self,
        lattice: &Lattice,
        spins: &mut SpinLattice,
        rng: &mut Xoshiro256StarStar,
        tally: &mut SweepTally,
    ) {
        let n_spins = lattice.n_spins;
        match self.order {
            SiteOrder::Raster => {
                for site in 0..n_spins {
                    self.attempt(lattice, spins, site, rng, tally);
                }
            }
            SiteOrder::Random => {
                for _ in 0..n_spins {
                    let site = rng.gen_range(0..n_spins);
                    self.attempt(lattice, spins, site, rng, tally);
                }
            }
        }
    }
}
