use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ising_sim::{
    run_all_sizes, FailurePolicy, JsonTableWriter, MagnetizationConvention, SiteOrder,
    SweepConfig,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Temperature sweeps of the 2-D Ising model with Metropolis Monte Carlo.
///
/// Writes one `ising_2d_L_{L}.json` table per lattice size into the output
/// directory.
#[derive(Parser, Debug)]
#[command(name = "ising", version, about)]
struct Cli {
    /// JSON configuration file; options given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lattice sizes L, comma separated (default 10,16,24,36)
    #[arg(short = 'L', long, value_delimiter = ',')]
    sizes: Option<Vec<usize>>,

    /// Lowest temperature of the grid
    #[arg(long)]
    t_min: Option<f64>,

    /// Highest temperature of the grid
    #[arg(long)]
    t_max: Option<f64>,

    /// Number of temperature points
    #[arg(long)]
    t_count: Option<usize>,

    /// Equilibration sweeps per run
    #[arg(long)]
    n_eq: Option<usize>,

    /// Sampling sweeps per run
    #[arg(long)]
    n_samples: Option<usize>,

    /// Measure every k-th sampling sweep
    #[arg(short = 'k', long)]
    stride: Option<usize>,

    /// Upper bound on concurrent runs
    #[arg(long)]
    max_workers: Option<usize>,

    /// Directory for the result tables
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Base seed; run i at the j-th size uses seed + j * t_count + i
    #[arg(long)]
    seed: Option<u64>,

    /// 'collect-partial' or 'abort-all'
    #[arg(long, value_parser = parse_policy)]
    failure_policy: Option<FailurePolicy>,

    /// 'random' or 'raster'
    #[arg(long, value_parser = parse_site_order)]
    site_order: Option<SiteOrder>,

    /// 'absolute' or 'signed'
    #[arg(long, value_parser = parse_convention)]
    magnetization: Option<MagnetizationConvention>,

    /// Measure the autocorrelation time of |M| up to this lag
    #[arg(long)]
    autocorrelation_max_lag: Option<usize>,
}

fn parse_policy(s: &str) -> Result<FailurePolicy, String> {
    FailurePolicy::try_from(s)
}

fn parse_site_order(s: &str) -> Result<SiteOrder, String> {
    SiteOrder::try_from(s)
}

fn parse_convention(s: &str) -> Result<MagnetizationConvention, String> {
    MagnetizationConvention::try_from(s)
}

impl Cli {
    fn into_config(self) -> ising_sim::Result<SweepConfig> {
        let mut cfg = match &self.config {
            Some(path) => SweepConfig::load(path)?,
            None => SweepConfig::default(),
        };
        if let Some(v) = self.sizes {
            cfg.sizes = v;
        }
        if let Some(v) = self.t_min {
            cfg.t_min = v;
        }
        if let Some(v) = self.t_max {
            cfg.t_max = v;
        }
        if let Some(v) = self.t_count {
            cfg.t_count = v;
        }
        if let Some(v) = self.n_eq {
            cfg.sim.n_eq = v;
        }
        if let Some(v) = self.n_samples {
            cfg.sim.n_samples = v;
        }
        if let Some(v) = self.stride {
            cfg.sim.sample_stride = v;
        }
        if self.max_workers.is_some() {
            cfg.max_workers = self.max_workers;
        }
        if let Some(v) = self.out_dir {
            cfg.out_dir = v;
        }
        if let Some(v) = self.seed {
            cfg.base_seed = v;
        }
        if let Some(v) = self.failure_policy {
            cfg.failure_policy = v;
        }
        if let Some(v) = self.site_order {
            cfg.sim.site_order = v;
        }
        if let Some(v) = self.magnetization {
            cfg.sim.magnetization = v;
        }
        if self.autocorrelation_max_lag.is_some() {
            cfg.sim.autocorrelation_max_lag = self.autocorrelation_max_lag;
        }
        cfg.check()?;
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Cli::parse().into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };

    let n_runs = config.sizes.len() * config.t_count;
    let pb = ProgressBar::new(n_runs as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> "),
    );
    pb.set_message("runs");

    let writer = JsonTableWriter::new(&config.out_dir);
    // no signal hook: runs always go to completion
    let result = run_all_sizes(&config, &writer, &AtomicBool::new(false), &|| pb.inc(1));
    pb.finish();

    match result {
        Ok(reports) => {
            let mut complete = true;
            for report in &reports {
                tracing::info!(
                    l = report.l,
                    rows = report.rows,
                    path = %report.path.display(),
                    "table written"
                );
                if !report.failures.is_empty() {
                    complete = false;
                    let temps: Vec<f64> = report.failures.iter().map(|f| f.temperature).collect();
                    tracing::warn!(l = report.l, failed_temperatures = ?temps, "incomplete table");
                    for failure in &report.failures {
                        tracing::warn!("{}", failure.error);
                    }
                }
            }
            if complete {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
