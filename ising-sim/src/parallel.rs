use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::{FailurePolicy, SimConfig, SweepConfig};
use crate::error::{Result, SimError};
use crate::geometry::Lattice;
use crate::output::ResultWriter;
use crate::simulation::{RunOutcome, SimulationRun};
use crate::statistics::{ResultTable, TemperatureResultRow};

/// Worker count for a sweep: available parallelism capped by `max_workers`.
pub fn worker_count(max_workers: Option<usize>) -> usize {
    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    max_workers.map_or(available, |cap| available.min(cap)).max(1)
}

/// A run that did not produce a row.
#[derive(Debug)]
pub struct FailedRun {
    pub temperature: f64,
    pub error: SimError,
}

/// Result of one temperature sweep at fixed L.
#[derive(Debug)]
pub struct SweepOutcome {
    /// Rows of every successful run, ascending in T.
    pub table: ResultTable,
    /// Failed temperatures, ascending in T. Empty unless the policy is
    /// [`FailurePolicy::CollectPartial`].
    pub failures: Vec<FailedRun>,
    /// Acceptance rate of each successful run, aligned with the table rows.
    pub acceptance_rates: Vec<f64>,
}

impl SweepOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_temperatures(&self) -> Vec<f64> {
        self.failures.iter().map(|f| f.temperature).collect()
    }
}

/// One SimulationRun per temperature at a fixed lattice size, executed on a
/// bounded worker pool.
///
/// Run `i` is seeded with `base_seed + i`, so the table depends only on the
/// inputs and never on the worker count or on completion order.
pub struct TemperatureSweep<'a> {
    pub lattice: &'a Lattice,
    /// Strictly ascending, all positive.
    pub temperatures: &'a [f64],
    pub base_seed: u64,
    pub config: &'a SimConfig,
    pub max_workers: Option<usize>,
    pub policy: FailurePolicy,
}

impl TemperatureSweep<'_> {
    /// Reject an empty, unordered or non-positive grid before anything runs.
    pub fn check(&self) -> Result<()> {
        let l = self.lattice.l;
        if self.temperatures.is_empty() {
            return Err(SimError::Config(format!(
                "temperature grid for L = {l} is empty"
            )));
        }
        if let Some(&t) = self
            .temperatures
            .iter()
            .find(|t| !(t.is_finite() && **t > 0.0))
        {
            return Err(SimError::Config(format!(
                "temperature must be finite and > 0, got T = {t} (L = {l})"
            )));
        }
        if self.temperatures.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimError::Config(format!(
                "temperature grid for L = {l} must be strictly ascending"
            )));
        }
        self.config.check()
    }

    /// Execute every run and reassemble the rows in temperature order.
    ///
    /// `interrupted` requests cooperative cancellation from outside;
    /// `on_run_done` is called once per finished run (useful for progress
    /// bars). Under [`FailurePolicy::AbortAll`] the first failure cancels
    /// the runs still in flight and is returned as the error.
    pub fn run(
        &self,
        interrupted: &AtomicBool,
        on_run_done: &(dyn Fn() + Sync),
    ) -> Result<SweepOutcome> {
        self.check()?;

        let l = self.lattice.l;
        let n_workers = worker_count(self.max_workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .thread_name(move |i| format!("ising-L{l}-{i}"))
            .build()
            .map_err(|e| SimError::Config(format!("cannot build worker pool: {e}")))?;

        tracing::info!(
            l,
            n_temps = self.temperatures.len(),
            n_workers,
            "starting temperature sweep"
        );

        let abort = AtomicBool::new(false);
        let stop = || interrupted.load(Ordering::Relaxed) || abort.load(Ordering::Relaxed);

        let results: Vec<Result<(TemperatureResultRow, f64)>> = pool.install(|| {
            self.temperatures
                .par_iter()
                .enumerate()
                .map(|(idx, &temperature)| {
                    let seed = self.base_seed.wrapping_add(idx as u64);
                    let res = self.run_one(temperature, seed, &stop);
                    match &res {
                        Ok((row, acceptance)) => tracing::debug!(
                            l,
                            temperature,
                            acceptance,
                            tau_abs_m = ?row.tau_abs_m,
                            "run finished"
                        ),
                        Err(SimError::Cancelled { .. }) => {}
                        Err(e) => {
                            tracing::warn!(l, temperature, error = %e, "run failed");
                            if self.policy == FailurePolicy::AbortAll {
                                abort.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                    on_run_done();
                    res
                })
                .collect()
        });

        let mut rows = Vec::with_capacity(results.len());
        let mut acceptance_rates = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (&temperature, res) in self.temperatures.iter().zip(results) {
            match res {
                Ok((row, acceptance)) => {
                    rows.push(row);
                    acceptance_rates.push(acceptance);
                }
                Err(error) => failures.push(FailedRun { temperature, error }),
            }
        }

        if self.policy == FailurePolicy::AbortAll && !failures.is_empty() {
            let first = failures
                .iter()
                .position(|f| !matches!(f.error, SimError::Cancelled { .. }))
                .unwrap_or(0);
            return Err(failures.swap_remove(first).error);
        }

        tracing::info!(
            l,
            n_rows = rows.len(),
            n_failed = failures.len(),
            "temperature sweep finished"
        );

        Ok(SweepOutcome {
            table: ResultTable::new(l, rows)?,
            failures,
            acceptance_rates,
        })
    }

    /// One isolated run. Panics inside the run become a [`SimError::Run`].
    fn run_one(
        &self,
        temperature: f64,
        seed: u64,
        stop: &(dyn Fn() -> bool + Sync),
    ) -> Result<(TemperatureResultRow, f64)> {
        let l = self.lattice.l;
        if stop() {
            return Err(SimError::Cancelled { l, temperature });
        }
        let outcome: Result<RunOutcome> = panic::catch_unwind(AssertUnwindSafe(|| {
            SimulationRun::new(self.lattice, temperature, seed, self.config)?.run_until(stop)
        }))
        .unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            Err(SimError::run(l, temperature, reason))
        });

        let outcome = outcome?;
        let row = outcome.to_row(self.lattice, self.config);
        if !row.is_finite() {
            return Err(SimError::run(l, temperature, "non-finite derived observables"));
        }
        Ok((row, outcome.acceptance_rate))
    }
}

/// What happened to one lattice size in [`run_all_sizes`].
#[derive(Debug)]
pub struct SizeReport {
    pub l: usize,
    pub path: PathBuf,
    pub rows: usize,
    pub failures: Vec<FailedRun>,
}

/// Sweep every configured lattice size in turn and persist each table.
///
/// The whole configuration, temperature grid included, is validated before
/// the first run. A table that cannot be written, or a sweep aborted under
/// [`FailurePolicy::AbortAll`], stops the program with that error. An
/// interrupted sweep returns [`SimError::Cancelled`] without writing, so
/// tables persisted by earlier invocations are never replaced by partial
/// ones.
pub fn run_all_sizes(
    config: &SweepConfig,
    writer: &dyn ResultWriter,
    interrupted: &AtomicBool,
    on_run_done: &(dyn Fn() + Sync),
) -> Result<Vec<SizeReport>> {
    config.check()?;
    let temperatures = config.temperatures();

    let mut reports = Vec::with_capacity(config.sizes.len());
    for (size_idx, &l) in config.sizes.iter().enumerate() {
        let lattice = Lattice::new(l)?;
        let sweep = TemperatureSweep {
            lattice: &lattice,
            temperatures: &temperatures,
            base_seed: config.size_seed(size_idx),
            config: &config.sim,
            max_workers: config.max_workers,
            policy: config.failure_policy,
        };
        let mut outcome = sweep.run(interrupted, on_run_done)?;
        if let Some(pos) = outcome
            .failures
            .iter()
            .position(|f| matches!(f.error, SimError::Cancelled { .. }))
        {
            tracing::warn!(l, rows = outcome.table.len(), "sweep interrupted, table not written");
            return Err(outcome.failures.swap_remove(pos).error);
        }
        let path = writer.write_table(&outcome.table).map_err(|e| {
            tracing::error!(l, error = %e, "cannot persist table");
            e
        })?;
        reports.push(SizeReport {
            l,
            path,
            rows: outcome.table.len(),
            failures: outcome.failures,
        });
    }
    Ok(reports)
}
