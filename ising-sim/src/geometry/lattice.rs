use crate::error::{Result, SimError};

/// Number of forward bond directions per site (right and down).
pub const N_DIRECTIONS: usize = 2;

/// Periodic L×L square lattice with precomputed neighbor table.
///
/// Sites are indexed in row-major order, `site = i * l + j` for row `i` and
/// column `j`. Direction 0 steps along rows (down), direction 1 along columns
/// (right). The table is read-only once built, so one `Lattice` is shared by
/// every run at the same size.
#[derive(Debug, Clone)]
pub struct Lattice {
    /// Side length.
    pub l: usize,
    /// Total number of sites (`l * l`).
    pub n_spins: usize,
    /// Layout: `neighbors[(i * N_DIRECTIONS + d) * 2 + dir]` where `dir = 0`
    /// is forward and `dir = 1` is backward.
    neighbors: Vec<u32>,
}

impl Lattice {
    /// Build an `l`×`l` periodic lattice. Rejects `l < 2`.
    pub fn new(l: usize) -> Result<Self> {
        if l < 2 {
            return Err(SimError::Config(format!(
                "lattice size L must be >= 2, got {l}"
            )));
        }
        if l.checked_mul(l).map_or(true, |n| n > u32::MAX as usize) {
            return Err(SimError::Config(format!("lattice size L = {l} is too large")));
        }

        let n_spins = l * l;
        let mut neighbors = vec![0u32; n_spins * N_DIRECTIONS * 2];

        for site in 0..n_spins {
            let (i, j) = (site / l, site % l);
            let steps = [((i + 1) % l, j), (i, (j + 1) % l)];
            let back = [((i + l - 1) % l, j), (i, (j + l - 1) % l)];
            for d in 0..N_DIRECTIONS {
                let (fi, fj) = steps[d];
                let (bi, bj) = back[d];
                neighbors[(site * N_DIRECTIONS + d) * 2] = (fi * l + fj) as u32;
                neighbors[(site * N_DIRECTIONS + d) * 2 + 1] = (bi * l + bj) as u32;
            }
        }

        Ok(Self {
            l,
            n_spins,
            neighbors,
        })
    }

    /// Flat index of the site at row `i`, column `j`. Coordinates wrap.
    #[inline]
    pub fn site(&self, i: usize, j: usize) -> usize {
        (i % self.l) * self.l + (j % self.l)
    }

    /// Row and column of a flat site index.
    #[inline]
    pub fn coords(&self, site: usize) -> (usize, usize) {
        (site / self.l, site % self.l)
    }

    /// Return the neighbor of `site` in direction `dim`.
    /// `forward = true` means +1, `forward = false` means −1.
    #[inline]
    pub fn neighbor(&self, site: usize, dim: usize, forward: bool) -> usize {
        self.neighbors[(site * N_DIRECTIONS + dim) * 2 + (!forward as usize)] as usize
    }

    /// The four periodic neighbors of `site`: down, up, right, left.
    ///
    /// For `l == 2` the forward and backward neighbor along an axis are the
    /// same site, so it appears twice.
    #[inline]
    pub fn neighbors(&self, site: usize) -> [usize; 4] {
        [
            self.neighbor(site, 0, true),
            self.neighbor(site, 0, false),
            self.neighbor(site, 1, true),
            self.neighbor(site, 1, false),
        ]
    }
}
