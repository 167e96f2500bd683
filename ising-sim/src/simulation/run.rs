use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::geometry::Lattice;
use crate::mcmc::{MetropolisStepper, SweepTally};
use crate::spins::{self, SpinLattice};
use crate::statistics::{sokal_tau, AutocorrAccum, ObservableAccumulator, ObservableSample};

/// Where a run is in its schedule. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Discarded equilibration sweeps.
    Thermalizing,
    /// Sweeps of which every `sample_stride`-th is measured.
    Sampling,
    Done,
}

/// Everything a finished run hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub temperature: f64,
    pub accumulator: ObservableAccumulator,
    /// Accepted / attempted flips over the sampling phase.
    pub acceptance_rate: f64,
    pub tau_abs_m: Option<f64>,
}

/// Mutable state of one (L, T) Metropolis chain.
///
/// Owns its spins, RNG and accumulator; the only borrowed state is the
/// read-only lattice geometry and schedule. The energy and magnetization
/// are tracked incrementally from accepted flips and never recomputed
/// inside the sweep loop.
pub struct SimulationRun<'a> {
    lattice: &'a Lattice,
    config: &'a SimConfig,
    stepper: MetropolisStepper,
    spins: SpinLattice,
    rng: Xoshiro256StarStar,
    phase: RunPhase,
    /// Sweeps completed in the current phase.
    sweeps_in_phase: usize,
    bonds: i64,
    mag: i64,
    accumulator: ObservableAccumulator,
    autocorr: Option<AutocorrAccum>,
    sampling_tally: SweepTally,
}

impl<'a> SimulationRun<'a> {
    /// Seed a fresh chain: the spins are drawn from the same stream that
    /// then drives the sweeps, so `(lattice, temperature, seed, config)`
    /// fully determines the result.
    pub fn new(
        lattice: &'a Lattice,
        temperature: f64,
        seed: u64,
        config: &'a SimConfig,
    ) -> Result<Self> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(SimError::Config(format!(
                "temperature must be finite and > 0, got T = {temperature} (L = {})",
                lattice.l
            )));
        }
        config.check()?;

        let stepper = MetropolisStepper::new(
            temperature,
            config.coupling,
            config.boltzmann,
            config.site_order,
        );
        if !stepper.is_well_formed() {
            return Err(SimError::run(
                lattice.l,
                temperature,
                "Boltzmann factors are not finite probabilities",
            ));
        }

        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let spins = SpinLattice::random(lattice, &mut rng);
        let bonds = spins::bond_sum(lattice, &spins);
        let mag = spins::total_magnetization(&spins);

        let phase = if config.n_eq == 0 {
            RunPhase::Sampling
        } else {
            RunPhase::Thermalizing
        };

        Ok(Self {
            lattice,
            config,
            stepper,
            spins,
            rng,
            phase,
            sweeps_in_phase: 0,
            bonds,
            mag,
            accumulator: ObservableAccumulator::new(),
            autocorr: config.autocorrelation_max_lag.map(AutocorrAccum::new),
            sampling_tally: SweepTally::default(),
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn temperature(&self) -> f64 {
        self.stepper.temperature
    }

    pub fn spins(&self) -> &SpinLattice {
        &self.spins
    }

    /// Incrementally tracked total energy.
    pub fn energy(&self) -> f64 {
        -self.config.coupling * self.bonds as f64
    }

    /// Incrementally tracked total magnetization.
    pub fn magnetization(&self) -> i64 {
        self.mag
    }

    /// Perform one sweep and advance the schedule. No-op once `Done`.
    pub fn step(&mut self) -> RunPhase {
        match self.phase {
            RunPhase::Thermalizing => {
                let mut tally = SweepTally::default();
                self.sweep(&mut tally);
                self.sweeps_in_phase += 1;
                if self.sweeps_in_phase == self.config.n_eq {
                    self.phase = RunPhase::Sampling;
                    self.sweeps_in_phase = 0;
                }
            }
            RunPhase::Sampling => {
                let mut tally = std::mem::take(&mut self.sampling_tally);
                self.sweep(&mut tally);
                self.sampling_tally = tally;
                self.sweeps_in_phase += 1;
                if self.sweeps_in_phase % self.config.sample_stride == 0 {
                    self.measure();
                }
                if self.sweeps_in_phase == self.config.n_samples {
                    self.phase = RunPhase::Done;
                }
            }
            RunPhase::Done => {}
        }
        self.phase
    }

    fn sweep(&mut self, tally: &mut SweepTally) {
        let before = *tally;
        self.stepper
            .sweep(self.lattice, &mut self.spins, &mut self.rng, tally);
        self.bonds += tally.bond_delta - before.bond_delta;
        self.mag += tally.mag_delta - before.mag_delta;
    }

    fn measure(&mut self) {
        let sample = ObservableSample {
            energy: self.energy(),
            magnetization: self.mag as f64,
        };
        self.accumulator.push(sample);
        if let Some(ref mut acc) = self.autocorr {
            acc.push(sample.magnetization.abs());
        }
    }

    /// Drive the chain to `Done`, checking `interrupted` before every sweep.
    pub fn run(self, interrupted: &AtomicBool) -> Result<RunOutcome> {
        self.run_until(&|| interrupted.load(Ordering::Relaxed))
    }

    /// Like [`run`](Self::run), stopping as soon as `stop()` returns true.
    /// The partial accumulator of a stopped run is dropped, never returned.
    pub fn run_until(mut self, stop: &dyn Fn() -> bool) -> Result<RunOutcome> {
        while self.phase != RunPhase::Done {
            if stop() {
                return Err(SimError::Cancelled {
                    l: self.lattice.l,
                    temperature: self.temperature(),
                });
            }
            self.step();
        }
        self.finish()
    }

    /// Validate the finished chain and release its accumulator.
    pub fn finish(self) -> Result<RunOutcome> {
        let l = self.lattice.l;
        let temperature = self.temperature();
        if self.phase != RunPhase::Done {
            return Err(SimError::run(l, temperature, "run finished before sampling completed"));
        }

        let bonds = spins::bond_sum(self.lattice, &self.spins);
        let mag = spins::total_magnetization(&self.spins);
        if bonds != self.bonds || mag != self.mag {
            return Err(SimError::run(
                l,
                temperature,
                format!(
                    "incremental bookkeeping drifted: bond sum {} vs {bonds}, magnetization {} vs {mag}",
                    self.bonds, self.mag
                ),
            ));
        }

        let expected = self.config.n_measurements();
        if self.accumulator.count != expected {
            return Err(SimError::run(
                l,
                temperature,
                format!(
                    "expected {expected} samples, accumulated {}",
                    self.accumulator.count
                ),
            ));
        }
        if !self.accumulator.is_finite() {
            return Err(SimError::run(l, temperature, "non-finite observable sums"));
        }

        let tau_abs_m = self.autocorr.as_ref().map(|acc| sokal_tau(&acc.finish()));

        Ok(RunOutcome {
            temperature,
            accumulator: self.accumulator,
            acceptance_rate: self.sampling_tally.acceptance_rate(),
            tau_abs_m,
        })
    }
}
