//! Error types for ising-sim.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid configuration, rejected before any run starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A single (L, T) run failed.
    #[error("run failed at L = {l}, T = {temperature}: {reason}")]
    Run {
        l: usize,
        temperature: f64,
        reason: String,
    },

    /// A run stopped because cancellation was requested.
    #[error("run cancelled at L = {l}, T = {temperature}")]
    Cancelled { l: usize, temperature: f64 },

    /// A result table could not be written.
    #[error("cannot write table for L = {l} to {}: {source}", .path.display())]
    Io {
        l: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted table could not be read.
    #[error("cannot read table {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A result table could not be (de)serialized.
    #[error("malformed table {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SimError {
    pub(crate) fn run(l: usize, temperature: f64, reason: impl Into<String>) -> Self {
        Self::Run {
            l,
            temperature,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
