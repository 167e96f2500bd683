use crate::config::MagnetizationConvention;
use crate::error::{Result, SimError};
use crate::statistics::ObservableAccumulator;

/// Thermodynamic estimates at one temperature, per spin.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureResultRow {
    /// T.
    pub temperature: f64,
    /// ⟨E⟩ / N.
    pub energy: f64,
    /// ⟨M⟩ / N or ⟨|M|⟩ / N, depending on the magnetization convention.
    pub magnetization: f64,
    /// ⟨|M|⟩ / N regardless of convention.
    pub abs_magnetization: f64,
    /// C = (⟨E²⟩ − ⟨E⟩²) / (k_B T² N).
    pub heat_capacity: f64,
    /// Chi = (⟨M²⟩ − ⟨M⟩²) / (k_B T N), with M per the convention.
    pub susceptibility: f64,
    /// Binder cumulant U4 = 1 − ⟨M⁴⟩ / (3⟨M²⟩²).
    pub binder: f64,
    /// Integrated autocorrelation time of |M| in measured sweeps, if measured.
    pub tau_abs_m: Option<f64>,
}

impl TemperatureResultRow {
    /// Apply the fluctuation–dissipation relations to a finished accumulator.
    pub fn from_accumulator(
        temperature: f64,
        acc: &ObservableAccumulator,
        n_spins: usize,
        boltzmann: f64,
        convention: MagnetizationConvention,
    ) -> Self {
        let n = n_spins as f64;
        let mean_e = acc.mean_e();
        let mean_abs_m = acc.mean_abs_m();
        let mean_m = match convention {
            MagnetizationConvention::Absolute => mean_abs_m,
            MagnetizationConvention::Signed => acc.mean_m(),
        };
        let mean_m2 = acc.mean_m2();

        let var_e = (acc.mean_e2() - mean_e * mean_e).max(0.0);
        let var_m = (mean_m2 - mean_m * mean_m).max(0.0);
        let binder = if mean_m2 > 0.0 {
            1.0 - acc.mean_m4() / (3.0 * mean_m2 * mean_m2)
        } else {
            0.0
        };

        Self {
            temperature,
            energy: mean_e / n,
            magnetization: mean_m / n,
            abs_magnetization: mean_abs_m / n,
            heat_capacity: var_e / (boltzmann * temperature * temperature * n),
            susceptibility: var_m / (boltzmann * temperature * n),
            binder,
            tau_abs_m: None,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.temperature,
            self.energy,
            self.magnetization,
            self.abs_magnetization,
            self.heat_capacity,
            self.susceptibility,
            self.binder,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.tau_abs_m.map_or(true, f64::is_finite)
    }
}

/// Rows for one lattice size, in strictly ascending temperature order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub l: usize,
    rows: Vec<TemperatureResultRow>,
}

impl ResultTable {
    /// Build a table, rejecting rows that are not in ascending T order.
    pub fn new(l: usize, rows: Vec<TemperatureResultRow>) -> Result<Self> {
        if let Some(w) = rows
            .windows(2)
            .find(|w| w[0].temperature >= w[1].temperature)
        {
            return Err(SimError::Config(format!(
                "table for L = {l} is not in ascending T order ({} then {})",
                w[0].temperature, w[1].temperature
            )));
        }
        Ok(Self { l, rows })
    }

    pub fn rows(&self) -> &[TemperatureResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, f: impl Fn(&TemperatureResultRow) -> f64) -> Vec<f64> {
        self.rows.iter().map(f).collect()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.column(|r| r.temperature)
    }

    pub fn has_autocorrelation(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.tau_abs_m.is_some())
    }
}
