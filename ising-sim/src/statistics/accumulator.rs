/// Total energy and magnetization of one measured sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservableSample {
    pub energy: f64,
    pub magnetization: f64,
}

/// Running sums of one (L, T) run's measured sweeps.
///
/// `count` always equals the number of samples pushed. Averages are read
/// only after the run finishes; nothing here is normalized per spin.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ObservableAccumulator {
    pub count: usize,
    pub sum_e: f64,
    pub sum_e2: f64,
    pub sum_m: f64,
    pub sum_m2: f64,
    pub sum_abs_m: f64,
    pub sum_m4: f64,
}

impl ObservableAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: ObservableSample) {
        let e = sample.energy;
        let m = sample.magnetization;
        let m2 = m * m;
        self.count += 1;
        self.sum_e += e;
        self.sum_e2 += e * e;
        self.sum_m += m;
        self.sum_m2 += m2;
        self.sum_abs_m += m.abs();
        self.sum_m4 += m2 * m2;
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        sum / self.count as f64
    }

    /// ⟨E⟩
    pub fn mean_e(&self) -> f64 {
        self.mean(self.sum_e)
    }

    /// ⟨E²⟩
    pub fn mean_e2(&self) -> f64 {
        self.mean(self.sum_e2)
    }

    /// ⟨M⟩
    pub fn mean_m(&self) -> f64 {
        self.mean(self.sum_m)
    }

    /// ⟨M²⟩
    pub fn mean_m2(&self) -> f64 {
        self.mean(self.sum_m2)
    }

    /// ⟨|M|⟩
    pub fn mean_abs_m(&self) -> f64 {
        self.mean(self.sum_abs_m)
    }

    /// ⟨M⁴⟩
    pub fn mean_m4(&self) -> f64 {
        self.mean(self.sum_m4)
    }

    pub fn is_finite(&self) -> bool {
        [
            self.sum_e,
            self.sum_e2,
            self.sum_m,
            self.sum_m2,
            self.sum_abs_m,
            self.sum_m4,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_sums() {
        let mut acc = ObservableAccumulator::new();
        assert_eq!(acc.mean_e(), 0.0);
        for (e, m) in [(-8.0, 4.0), (0.0, -2.0), (-4.0, 0.0)] {
            acc.push(ObservableSample {
                energy: e,
                magnetization: m,
            });
        }
        assert_eq!(acc.count, 3);
        assert_eq!(acc.mean_e(), -4.0);
        assert_eq!(acc.mean_e2(), 80.0 / 3.0);
        assert!((acc.mean_m() - 2.0 / 3.0).abs() < 1e-15);
        assert_eq!(acc.mean_abs_m(), 2.0);
        assert_eq!(acc.mean_m2(), 20.0 / 3.0);
        assert_eq!(acc.mean_m4(), 272.0 / 3.0);
        assert!(acc.is_finite());
    }
}
