use std::path::{Path, PathBuf};

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::{Result, SimError};

/// Order in which a sweep visits the `L²` sites. Fixed for a run's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SiteOrder {
    /// `L²` uniformly random site draws per sweep.
    Random,
    /// Every site once, row by row.
    Raster,
}

impl TryFrom<&str> for SiteOrder {
    type Error = String;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "random" => Ok(Self::Random),
            "raster" => Ok(Self::Raster),
            _ => Err(format!(
                "unknown site_order '{s}', expected 'random' or 'raster'"
            )),
        }
    }
}

impl TryFrom<String> for SiteOrder {
    type Error = String;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

/// Which magnetization enters the reported `M` column and the susceptibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum MagnetizationConvention {
    /// `⟨|M|⟩`, and `Chi = (⟨M²⟩ − ⟨|M|⟩²) / (k_B T N)`.
    Absolute,
    /// `⟨M⟩`, and `Chi = (⟨M²⟩ − ⟨M⟩²) / (k_B T N)`.
    Signed,
}

impl TryFrom<&str> for MagnetizationConvention {
    type Error = String;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "absolute" | "abs" => Ok(Self::Absolute),
            "signed" => Ok(Self::Signed),
            _ => Err(format!(
                "unknown magnetization convention '{s}', expected 'absolute' or 'signed'"
            )),
        }
    }
}

impl TryFrom<String> for MagnetizationConvention {
    type Error = String;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

/// What a temperature sweep does when one of its runs fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FailurePolicy {
    /// Finish the other runs; the table holds the successful rows and the
    /// failed temperatures are reported alongside it.
    CollectPartial,
    /// Cancel in-flight runs and fail the whole sweep for this L.
    AbortAll,
}

impl TryFrom<&str> for FailurePolicy {
    type Error = String;
    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "collect-partial" | "collect_partial" => Ok(Self::CollectPartial),
            "abort-all" | "abort_all" => Ok(Self::AbortAll),
            _ => Err(format!(
                "unknown failure_policy '{s}', expected 'collect-partial' or 'abort-all'"
            )),
        }
    }
}

impl TryFrom<String> for FailurePolicy {
    type Error = String;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

fn validate_sim_config(cfg: &SimConfig) -> std::result::Result<(), ValidationError> {
    if cfg.n_samples < 1 {
        return Err(ValidationError::new("n_samples must be >= 1"));
    }
    if cfg.sample_stride < 1 {
        return Err(ValidationError::new("sample_stride must be >= 1"));
    }
    if cfg.sample_stride > cfg.n_samples {
        return Err(ValidationError::new("sample_stride must be <= n_samples"));
    }
    if !(cfg.coupling.is_finite() && cfg.coupling > 0.0) {
        return Err(ValidationError::new("coupling J must be finite and > 0"));
    }
    if !(cfg.boltzmann.is_finite() && cfg.boltzmann > 0.0) {
        return Err(ValidationError::new("boltzmann k_B must be finite and > 0"));
    }
    if cfg.autocorrelation_max_lag == Some(0) {
        return Err(ValidationError::new(
            "autocorrelation_max_lag must be >= 1 when set",
        ));
    }
    Ok(())
}

/// Schedule and physical constants of one simulation run.
///
/// A run performs `n_eq` discarded sweeps, then `n_samples` sweeps of which
/// every `sample_stride`-th is measured.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_sim_config"))]
pub struct SimConfig {
    pub n_eq: usize,
    pub n_samples: usize,
    pub sample_stride: usize,
    /// Ferromagnetic coupling J.
    pub coupling: f64,
    /// Boltzmann constant k_B.
    pub boltzmann: f64,
    pub site_order: SiteOrder,
    pub magnetization: MagnetizationConvention,
    /// Measure the integrated autocorrelation time of |M| up to this lag.
    pub autocorrelation_max_lag: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n_eq: 1_000,
            n_samples: 10_000,
            sample_stride: 1,
            coupling: 1.0,
            boltzmann: 1.0,
            site_order: SiteOrder::Random,
            magnetization: MagnetizationConvention::Absolute,
            autocorrelation_max_lag: None,
        }
    }
}

impl SimConfig {
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| SimError::Config(format!("{e}")))
    }

    /// Number of measured sweeps, `⌊n_samples / sample_stride⌋`.
    pub fn n_measurements(&self) -> usize {
        self.n_samples / self.sample_stride.max(1)
    }
}

fn validate_sweep_config(cfg: &SweepConfig) -> std::result::Result<(), ValidationError> {
    if cfg.sizes.is_empty() {
        return Err(ValidationError::new("sizes must not be empty"));
    }
    if cfg.sizes.iter().any(|&l| l < 2) {
        return Err(ValidationError::new("every lattice size L must be >= 2"));
    }
    if cfg.t_count < 1 {
        return Err(ValidationError::new("t_count must be >= 1"));
    }
    if !(cfg.t_min.is_finite() && cfg.t_min > 0.0) {
        return Err(ValidationError::new("t_min must be finite and > 0"));
    }
    if !(cfg.t_max.is_finite() && cfg.t_max >= cfg.t_min) {
        return Err(ValidationError::new("t_max must be finite and >= t_min"));
    }
    if cfg.t_count > 1 && !(cfg.t_max > cfg.t_min) {
        return Err(ValidationError::new("t_max must exceed t_min when t_count > 1"));
    }
    // spans below the float resolution collapse neighboring points
    if cfg.temperatures().windows(2).any(|w| w[0] >= w[1]) {
        return Err(ValidationError::new(
            "temperature grid is not strictly ascending",
        ));
    }
    if cfg.max_workers == Some(0) {
        return Err(ValidationError::new("max_workers must be >= 1 when set"));
    }
    Ok(())
}

/// Full program configuration: lattice sizes, temperature grid, parallelism
/// and output, plus the per-run [`SimConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_sweep_config"))]
pub struct SweepConfig {
    pub sizes: Vec<usize>,
    pub t_min: f64,
    pub t_max: f64,
    pub t_count: usize,
    pub base_seed: u64,
    pub max_workers: Option<usize>,
    pub out_dir: PathBuf,
    pub failure_policy: FailurePolicy,
    #[validate(nested)]
    pub sim: SimConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sizes: vec![10, 16, 24, 36],
            t_min: 0.015,
            t_max: 4.5,
            t_count: 300,
            base_seed: 42,
            max_workers: None,
            out_dir: PathBuf::from("data"),
            failure_policy: FailurePolicy::CollectPartial,
            sim: SimConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| SimError::Config(format!("{e}")))
    }

    /// Parse a JSON configuration; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SimError::Config(format!("{e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Inclusive, evenly spaced temperature grid from `t_min` to `t_max`.
    pub fn temperatures(&self) -> Vec<f64> {
        if self.t_count <= 1 {
            return vec![self.t_min; self.t_count];
        }
        let step = (self.t_max - self.t_min) / (self.t_count - 1) as f64;
        (0..self.t_count)
            .map(|i| {
                if i + 1 == self.t_count {
                    self.t_max
                } else {
                    self.t_min + step * i as f64
                }
            })
            .collect()
    }

    /// Seed of the first run for the lattice at position `size_idx` in
    /// `sizes`. Runs at that size are seeded `base + temp_idx`, so no two
    /// runs across the whole program share a stream.
    pub fn size_seed(&self, size_idx: usize) -> u64 {
        self.base_seed
            .wrapping_add((size_idx as u64).wrapping_mul(self.t_count as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = SweepConfig::default();
        cfg.check().unwrap();
        assert_eq!(cfg.sizes, vec![10, 16, 24, 36]);
        let temps = cfg.temperatures();
        assert_eq!(temps.len(), 300);
        assert_eq!(temps[0], 0.015);
        assert_eq!(temps[299], 4.5);
        assert!(temps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rejects_bad_sweep_config() {
        let bad = [
            SweepConfig {
                sizes: vec![10, 1],
                ..Default::default()
            },
            SweepConfig {
                sizes: vec![],
                ..Default::default()
            },
            SweepConfig {
                t_count: 0,
                ..Default::default()
            },
            SweepConfig {
                t_min: 0.0,
                ..Default::default()
            },
            SweepConfig {
                t_min: -1.0,
                ..Default::default()
            },
            SweepConfig {
                t_min: 3.0,
                t_max: 2.0,
                ..Default::default()
            },
            SweepConfig {
                max_workers: Some(0),
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(matches!(cfg.check(), Err(SimError::Config(_))), "{cfg:?}");
        }
    }

    #[test]
    fn test_rejects_bad_sim_config() {
        let bad = [
            SimConfig {
                n_samples: 0,
                ..Default::default()
            },
            SimConfig {
                sample_stride: 0,
                ..Default::default()
            },
            SimConfig {
                n_samples: 5,
                sample_stride: 6,
                ..Default::default()
            },
            SimConfig {
                coupling: f64::NAN,
                ..Default::default()
            },
            SimConfig {
                boltzmann: 0.0,
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.check().is_err(), "{cfg:?}");
        }

        // nested validation reaches the embedded SimConfig
        let cfg = SweepConfig {
            sim: SimConfig {
                sample_stride: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(cfg.check().is_err());
    }

    #[test]
    fn test_rejects_degenerate_grid() {
        let flat = SweepConfig {
            t_min: 2.0,
            t_max: 2.0,
            t_count: 3,
            ..Default::default()
        };
        assert!(matches!(flat.check(), Err(SimError::Config(_))));

        let narrow = SweepConfig {
            t_min: 1.0,
            t_max: 1.0 + f64::EPSILON,
            t_count: 10,
            ..Default::default()
        };
        assert!(matches!(narrow.check(), Err(SimError::Config(_))));

        // a single point may sit on t_min == t_max
        let single = SweepConfig {
            t_min: 2.0,
            t_max: 2.0,
            t_count: 1,
            ..Default::default()
        };
        single.check().unwrap();
    }

    #[test]
    fn test_single_point_grid() {
        let cfg = SweepConfig {
            t_min: 2.0,
            t_max: 3.0,
            t_count: 1,
            ..Default::default()
        };
        assert_eq!(cfg.temperatures(), vec![2.0]);
    }

    #[test]
    fn test_json_overrides_subset() {
        let cfg = SweepConfig::from_json_str(
            r#"{"sizes": [8], "t_count": 5, "failure_policy": "abort-all",
                "sim": {"n_eq": 10, "site_order": "raster"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.sizes, vec![8]);
        assert_eq!(cfg.t_count, 5);
        assert_eq!(cfg.t_max, 4.5);
        assert_eq!(cfg.failure_policy, FailurePolicy::AbortAll);
        assert_eq!(cfg.sim.n_eq, 10);
        assert_eq!(cfg.sim.n_samples, 10_000);
        assert_eq!(cfg.sim.site_order, SiteOrder::Raster);

        assert!(SweepConfig::from_json_str(r#"{"sim": {"site_order": "spiral"}}"#).is_err());
    }

    #[test]
    fn test_size_seeds_do_not_overlap() {
        let cfg = SweepConfig {
            t_count: 7,
            base_seed: 100,
            ..Default::default()
        };
        assert_eq!(cfg.size_seed(0), 100);
        assert_eq!(cfg.size_seed(1), 107);
        assert_eq!(cfg.size_seed(3), 121);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(SiteOrder::try_from("raster"), Ok(SiteOrder::Raster));
        assert_eq!(
            MagnetizationConvention::try_from("signed"),
            Ok(MagnetizationConvention::Signed)
        );
        assert_eq!(
            FailurePolicy::try_from("collect_partial"),
            Ok(FailurePolicy::CollectPartial)
        );
        assert!(FailurePolicy::try_from("retry").is_err());
    }
}
