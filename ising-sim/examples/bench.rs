use std::sync::atomic::AtomicBool;
use std::time::Instant;

use ising_sim::config::*;
use ising_sim::{Lattice, TemperatureSweep};

const L: usize = 128;
const N_TEMPS: usize = 16;
const N_EQ: usize = 50;
const N_SAMPLES: usize = 50;

fn main() {
    let lattice = Lattice::new(L).unwrap();

    let temps: Vec<f64> = (0..N_TEMPS)
        .map(|i| 0.5 + 3.5 * i as f64 / (N_TEMPS - 1) as f64)
        .collect();

    let config = SimConfig {
        n_eq: N_EQ,
        n_samples: N_SAMPLES,
        sample_stride: 1,
        site_order: SiteOrder::Random,
        ..Default::default()
    };

    println!(
        "Lattice: {}x{}  |  Temps: {}  |  Sweeps: {} + {}  |  Workers: {}",
        L,
        L,
        N_TEMPS,
        N_EQ,
        N_SAMPLES,
        ising_sim::worker_count(None)
    );
    println!("{}", "-".repeat(70));

    let interrupted = AtomicBool::new(false);
    let sweep = TemperatureSweep {
        lattice: &lattice,
        temperatures: &temps,
        base_seed: 42,
        config: &config,
        max_workers: None,
        policy: FailurePolicy::AbortAll,
    };

    let t0 = Instant::now();
    sweep.run(&interrupted, &|| {}).unwrap();
    let elapsed = t0.elapsed().as_secs_f64();

    let n_flips = (N_TEMPS * (N_EQ + N_SAMPLES) * L * L) as f64;
    println!(
        "Total: {:.3} s  |  {:.1} ns/flip attempt (all workers)",
        elapsed,
        elapsed / n_flips * 1e9
    );
}
