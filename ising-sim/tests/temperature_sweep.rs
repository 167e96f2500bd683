use std::sync::atomic::AtomicBool;

use ising_sim::{
    read_table, run_all_sizes, run_simulation, FailurePolicy, JsonTableWriter, Lattice,
    SimConfig, SimError, SweepConfig, TemperatureSweep,
};

fn sweep_with_workers(
    lattice: &Lattice,
    temps: &[f64],
    config: &SimConfig,
    workers: usize,
) -> ising_sim::ResultTable {
    TemperatureSweep {
        lattice,
        temperatures: temps,
        base_seed: 1234,
        config,
        max_workers: Some(workers),
        policy: FailurePolicy::AbortAll,
    }
    .run(&AtomicBool::new(false), &|| {})
    .unwrap()
    .table
}

#[test]
fn end_to_end_five_point_table() {
    let lattice = Lattice::new(10).unwrap();
    let temps = [0.5, 1.375, 2.25, 3.125, 4.0];
    let config = SimConfig {
        n_eq: 100,
        n_samples: 100,
        ..Default::default()
    };
    let table = sweep_with_workers(&lattice, &temps, &config, 4);

    assert_eq!(table.l, 10);
    assert_eq!(table.len(), 5);
    assert_eq!(table.temperatures(), temps.to_vec());
    for row in table.rows() {
        for v in [
            row.energy,
            row.magnetization,
            row.heat_capacity,
            row.susceptibility,
        ] {
            assert!(v.is_finite(), "{row:?}");
        }
        assert!(row.energy >= -2.0 && row.energy <= 2.0);
        assert!(row.heat_capacity >= 0.0 && row.susceptibility >= 0.0);
    }
}

#[test]
fn results_do_not_depend_on_worker_count() {
    let lattice = Lattice::new(6).unwrap();
    let temps: Vec<f64> = (1..=8).map(|i| 0.5 * i as f64).collect();
    let config = SimConfig {
        n_eq: 30,
        n_samples: 60,
        sample_stride: 3,
        ..Default::default()
    };
    let serial = sweep_with_workers(&lattice, &temps, &config, 1);
    let parallel = sweep_with_workers(&lattice, &temps, &config, 4);
    let again = sweep_with_workers(&lattice, &temps, &config, 3);
    assert_eq!(serial, parallel);
    assert_eq!(serial, again);
}

#[test]
fn sweep_rows_match_serial_runs() {
    let lattice = Lattice::new(5).unwrap();
    let temps = [1.0, 2.0, 3.0];
    let config = SimConfig {
        n_eq: 10,
        n_samples: 20,
        ..Default::default()
    };
    let table = sweep_with_workers(&lattice, &temps, &config, 2);
    let never = AtomicBool::new(false);
    for (i, (&t, row)) in temps.iter().zip(table.rows()).enumerate() {
        let serial = run_simulation(&lattice, t, 1234 + i as u64, &config, &never).unwrap();
        assert_eq!(&serial.to_row(&lattice, &config), row);
    }
}

#[test]
fn mean_abs_magnetization_vanishes_at_high_temperature() {
    let lattice = Lattice::new(20).unwrap();
    let config = SimConfig {
        n_eq: 50,
        n_samples: 1000,
        ..Default::default()
    };
    let table = sweep_with_workers(&lattice, &[1e4, 1e6], &config, 2);
    for row in table.rows() {
        // ⟨|m|⟩ ≈ sqrt(2 / (π N)) ≈ 0.04 for N = 400
        assert!(row.abs_magnetization < 0.08, "{row:?}");
    }
}

#[test]
fn ordered_phase_has_larger_magnetization_than_disordered() {
    let lattice = Lattice::new(8).unwrap();
    let config = SimConfig {
        n_eq: 3000,
        n_samples: 500,
        ..Default::default()
    };
    let table = sweep_with_workers(&lattice, &[1.5, 4.0], &config, 2);
    let rows = table.rows();
    assert!(rows[0].abs_magnetization > 0.8, "{:?}", rows[0]);
    assert!(rows[1].abs_magnetization < 0.4, "{:?}", rows[1]);
    assert!(rows[0].energy < rows[1].energy);
}

#[test]
fn driver_writes_one_table_per_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = SweepConfig {
        sizes: vec![4, 6],
        t_min: 1.0,
        t_max: 3.0,
        t_count: 3,
        max_workers: Some(2),
        out_dir: dir.path().to_path_buf(),
        sim: SimConfig {
            n_eq: 10,
            n_samples: 20,
            ..Default::default()
        },
        ..Default::default()
    };
    let writer = JsonTableWriter::new(&config.out_dir);
    let reports = run_all_sizes(&config, &writer, &AtomicBool::new(false), &|| {}).unwrap();

    assert_eq!(reports.len(), 2);
    for (report, l) in reports.iter().zip([4, 6]) {
        assert_eq!(report.l, l);
        assert_eq!(report.rows, 3);
        assert!(report.failures.is_empty());
        let table = read_table(&report.path).unwrap();
        assert_eq!(table.l, l);
        assert_eq!(table.temperatures(), vec![1.0, 2.0, 3.0]);
    }
}

#[test]
fn driver_rejects_bad_configuration_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = SweepConfig {
        sizes: vec![8, 1],
        out_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let writer = JsonTableWriter::new(&config.out_dir);
    let err = run_all_sizes(&config, &writer, &AtomicBool::new(false), &|| {}).unwrap_err();
    assert!(matches!(err, SimError::Config(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn driver_rejects_flat_temperature_grid_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = SweepConfig {
        sizes: vec![4],
        t_min: 2.0,
        t_max: 2.0,
        t_count: 3,
        out_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    assert!(matches!(config.check(), Err(SimError::Config(_))));
    let writer = JsonTableWriter::new(&config.out_dir);
    let err = run_all_sizes(&config, &writer, &AtomicBool::new(false), &|| {}).unwrap_err();
    assert!(matches!(err, SimError::Config(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn interrupted_driver_keeps_existing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let config = SweepConfig {
        sizes: vec![4, 6],
        t_min: 1.0,
        t_max: 3.0,
        t_count: 3,
        max_workers: Some(2),
        out_dir: dir.path().to_path_buf(),
        sim: SimConfig {
            n_eq: 10,
            n_samples: 20,
            ..Default::default()
        },
        ..Default::default()
    };
    let writer = JsonTableWriter::new(&config.out_dir);
    let reports = run_all_sizes(&config, &writer, &AtomicBool::new(false), &|| {}).unwrap();
    let before: Vec<String> = reports
        .iter()
        .map(|r| std::fs::read_to_string(&r.path).unwrap())
        .collect();

    let err = run_all_sizes(&config, &writer, &AtomicBool::new(true), &|| {}).unwrap_err();
    assert!(matches!(err, SimError::Cancelled { l: 4, .. }), "{err}");
    for (report, old) in reports.iter().zip(&before) {
        assert_eq!(&std::fs::read_to_string(&report.path).unwrap(), old);
    }

    let fresh = tempfile::tempdir().unwrap();
    let writer = JsonTableWriter::new(fresh.path());
    let err = run_all_sizes(&config, &writer, &AtomicBool::new(true), &|| {}).unwrap_err();
    assert!(matches!(err, SimError::Cancelled { .. }));
    assert!(!ising_sim::table_path(fresh.path(), 4).exists());
    assert!(!ising_sim::table_path(fresh.path(), 6).exists());
}
