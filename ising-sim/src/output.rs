//! Persisting result tables.
//!
//! Each lattice size gets one file `ising_2d_L_{L}.json` holding a JSON
//! object of equal-length, T-ascending float64 columns:
//!
//! ```text
//! {"L": 10, "T": [...], "E": [...], "M": [...], "C": [...], "Chi": [...],
//!  "absM": [...], "U4": [...], "tauM": [...]}
//! ```
//!
//! Every observable column is already intensive: `E`, `M`, `absM`, `C` and
//! `Chi` are divided by the number of spins `N = L²`, and `U4` is
//! dimensionless. Readers must not normalize by `L` or `N` again.
//!
//! `tauM` is present only when every row carries an autocorrelation time
//! (in units of the measurement interval). Floats are written in shortest
//! round-trip form, so reading a table back yields bit-identical values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::statistics::{ResultTable, TemperatureResultRow};

/// Sink for finished per-L tables.
pub trait ResultWriter {
    /// Persist `table`, returning where it went.
    fn write_table(&self, table: &ResultTable) -> Result<PathBuf>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    #[serde(rename = "L")]
    l: usize,
    #[serde(rename = "T")]
    temperature: Vec<f64>,
    #[serde(rename = "E")]
    energy: Vec<f64>,
    #[serde(rename = "M")]
    magnetization: Vec<f64>,
    #[serde(rename = "C")]
    heat_capacity: Vec<f64>,
    #[serde(rename = "Chi")]
    susceptibility: Vec<f64>,
    #[serde(rename = "absM")]
    abs_magnetization: Vec<f64>,
    #[serde(rename = "U4")]
    binder: Vec<f64>,
    #[serde(rename = "tauM", default, skip_serializing_if = "Option::is_none")]
    tau_abs_m: Option<Vec<f64>>,
}

impl From<&ResultTable> for TableFile {
    fn from(table: &ResultTable) -> Self {
        Self {
            l: table.l,
            temperature: table.column(|r| r.temperature),
            energy: table.column(|r| r.energy),
            magnetization: table.column(|r| r.magnetization),
            heat_capacity: table.column(|r| r.heat_capacity),
            susceptibility: table.column(|r| r.susceptibility),
            abs_magnetization: table.column(|r| r.abs_magnetization),
            binder: table.column(|r| r.binder),
            tau_abs_m: table
                .rows()
                .iter()
                .map(|r| r.tau_abs_m)
                .collect::<Option<Vec<_>>>()
                .filter(|taus| !taus.is_empty()),
        }
    }
}

impl TableFile {
    fn into_table(self) -> std::result::Result<ResultTable, String> {
        let n = self.temperature.len();
        let columns = [
            ("E", self.energy.len()),
            ("M", self.magnetization.len()),
            ("C", self.heat_capacity.len()),
            ("Chi", self.susceptibility.len()),
            ("absM", self.abs_magnetization.len()),
            ("U4", self.binder.len()),
            ("tauM", self.tau_abs_m.as_ref().map_or(n, |v| v.len())),
        ];
        if let Some((name, len)) = columns.iter().find(|(_, len)| *len != n) {
            return Err(format!("column {name} has {len} values, T has {n}"));
        }

        let rows = (0..n)
            .map(|i| TemperatureResultRow {
                temperature: self.temperature[i],
                energy: self.energy[i],
                magnetization: self.magnetization[i],
                abs_magnetization: self.abs_magnetization[i],
                heat_capacity: self.heat_capacity[i],
                susceptibility: self.susceptibility[i],
                binder: self.binder[i],
                tau_abs_m: self.tau_abs_m.as_ref().map(|v| v[i]),
            })
            .collect();
        ResultTable::new(self.l, rows).map_err(|e| e.to_string())
    }
}

/// Path of the table for lattice size `l` inside `out_dir`.
pub fn table_path(out_dir: &Path, l: usize) -> PathBuf {
    out_dir.join(format!("ising_2d_L_{l}.json"))
}

/// Writes one JSON table per lattice size into a directory, creating it
/// if needed.
#[derive(Debug, Clone)]
pub struct JsonTableWriter {
    pub out_dir: PathBuf,
}

impl JsonTableWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

impl ResultWriter for JsonTableWriter {
    fn write_table(&self, table: &ResultTable) -> Result<PathBuf> {
        let path = table_path(&self.out_dir, table.l);
        let io_err = |source| SimError::Io {
            l: table.l,
            path: path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(&TableFile::from(table)).map_err(|source| {
            SimError::Format {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::create_dir_all(&self.out_dir).map_err(io_err)?;
        std::fs::write(&path, json).map_err(io_err)?;

        tracing::info!(l = table.l, rows = table.len(), path = %path.display(), "wrote table");
        Ok(path)
    }
}

/// Read a table written by [`JsonTableWriter`], checking that every column
/// has the same length and that T ascends.
pub fn read_table(path: &Path) -> Result<ResultTable> {
    let json = std::fs::read_to_string(path).map_err(|source| SimError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: TableFile = serde_json::from_str(&json).map_err(|source| SimError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    file.into_table().map_err(|msg| SimError::Format {
        path: path.to_path_buf(),
        source: <serde_json::Error as serde::de::Error>::custom(msg),
    })
}
