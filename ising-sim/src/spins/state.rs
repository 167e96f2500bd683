use crate::error::{Result, SimError};
use crate::geometry::Lattice;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// ±1 spin configuration on a [`Lattice`], stored flat in row-major order.
///
/// Owned by exactly one run and mutated in place by sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinLattice {
    /// Side length of the lattice these spins live on.
    pub l: usize,
    spins: Vec<i8>,
}

impl SpinLattice {
    /// Draw independent uniformly random ±1 spins from `rng`.
    pub fn random(lattice: &Lattice, rng: &mut Xoshiro256StarStar) -> Self {
        let spins = (0..lattice.n_spins)
            .map(|_| if rng.gen::<f32>() < 0.5 { -1 } else { 1 })
            .collect();
        Self {
            l: lattice.l,
            spins,
        }
    }

    /// Random configuration from a fresh generator seeded with `seed`.
    pub fn initialize(lattice: &Lattice, seed: u64) -> Self {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        Self::random(lattice, &mut rng)
    }

    /// Every spin set to `spin` (must be +1 or −1).
    pub fn aligned(lattice: &Lattice, spin: i8) -> Self {
        debug_assert!(spin == 1 || spin == -1);
        Self {
            l: lattice.l,
            spins: vec![spin; lattice.n_spins],
        }
    }

    /// Wrap an explicit configuration, checking its length and values.
    pub fn from_spins(lattice: &Lattice, spins: Vec<i8>) -> Result<Self> {
        if spins.len() != lattice.n_spins {
            return Err(SimError::Config(format!(
                "expected {} spins for L = {}, got {}",
                lattice.n_spins,
                lattice.l,
                spins.len()
            )));
        }
        if let Some(bad) = spins.iter().find(|&&s| s != 1 && s != -1) {
            return Err(SimError::Config(format!("spin value {bad} is not ±1")));
        }
        Ok(Self {
            l: lattice.l,
            spins,
        })
    }

    #[inline]
    pub fn get(&self, site: usize) -> i8 {
        self.spins[site]
    }

    /// Toggle the spin at `site` in place.
    #[inline]
    pub fn flip(&mut self, site: usize) {
        self.spins[site] = -self.spins[site];
    }

    /// Sum of the four neighboring spins of `site`.
    #[inline]
    pub fn local_field(&self, lattice: &Lattice, site: usize) -> i32 {
        let mut h = 0i32;
        for d in 0..crate::geometry::lattice::N_DIRECTIONS {
            h += self.spins[lattice.neighbor(site, d, true)] as i32;
            h += self.spins[lattice.neighbor(site, d, false)] as i32;
        }
        h
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.spins
    }

    pub fn len(&self) -> usize {
        self.spins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_seeded() {
        let lat = Lattice::new(8).unwrap();
        let a = SpinLattice::initialize(&lat, 7);
        let b = SpinLattice::initialize(&lat, 7);
        let c = SpinLattice::initialize(&lat, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_slice().iter().all(|&s| s == 1 || s == -1));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_flip_toggles() {
        let lat = Lattice::new(3).unwrap();
        let mut s = SpinLattice::aligned(&lat, 1);
        s.flip(4);
        assert_eq!(s.get(4), -1);
        s.flip(4);
        assert_eq!(s.get(4), 1);
    }

    #[test]
    fn test_local_field() {
        let lat = Lattice::new(3).unwrap();
        let mut s = SpinLattice::aligned(&lat, 1);
        assert_eq!(s.local_field(&lat, 4), 4);
        // Site 4 = (1,1); flip its right neighbor (1,2)=5
        s.flip(5);
        assert_eq!(s.local_field(&lat, 4), 2);
    }

    #[test]
    fn test_local_field_2x2_counts_coincident_neighbor_twice() {
        let lat = Lattice::new(2).unwrap();
        let mut s = SpinLattice::aligned(&lat, 1);
        s.flip(1);
        // Site 0: vertical neighbor 2 (twice, +1), horizontal neighbor 1 (twice, −1)
        assert_eq!(s.local_field(&lat, 0), 0);
    }

    #[test]
    fn test_from_spins_validates() {
        let lat = Lattice::new(2).unwrap();
        assert!(SpinLattice::from_spins(&lat, vec![1, -1, 1, -1]).is_ok());
        assert!(SpinLattice::from_spins(&lat, vec![1, -1, 1]).is_err());
        assert!(SpinLattice::from_spins(&lat, vec![1, 0, 1, -1]).is_err());
    }
}
