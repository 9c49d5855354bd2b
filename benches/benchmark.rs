use criterion::measurement::WallTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkGroup, Criterion, Throughput};
use num_complex::Complex64;
use qasmsim::config::RunConfig;
use qasmsim::runtime::gate::controlled_not_matrix;
use qasmsim::runtime::Gate;
use qasmsim::run_source;
use qasmsim::vectorization::{apply_on_targets, mat_apply, mat_mul};
use std::f64::consts::PI;

// custom criterion configuration for all benchmarks
fn custom_criterion_config() -> Criterion<WallTime> {
    Criterion::default()
        .sample_size(50) // raise for publishable numbers
        .measurement_time(std::time::Duration::from_secs(5))
        .warm_up_time(std::time::Duration::from_secs(2))
        .with_plots()
}

// initial quantum state vector (|0...0>)
fn initial_state(num_qubits: usize) -> Vec<Complex64> {
    let size = 1 << num_qubits;
    let mut amps = vec![Complex64::new(0.0, 0.0); size];
    amps[0] = Complex64::new(1.0, 0.0);
    amps
}

// dense pseudo-random matrix, deterministic so runs are comparable
fn dense_matrix(dim: usize) -> Vec<Complex64> {
    (0..dim * dim)
        .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
        .collect()
}

fn qubit_counts() -> Vec<usize> {
    // fewer qubits for debug builds
    #[cfg(debug_assertions)]
    let counts = vec![4, 8];
    #[cfg(not(debug_assertions))]
    let counts = vec![4, 8, 12, 16, 20];
    counts
}

// full-space matrix kernels, only for sizes where 2^n x 2^n fits comfortably
fn dense_kernel_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_kernels");
    for num_qubits in [2usize, 4, 6, 8] {
        let dim = 1 << num_qubits;
        let matrix = dense_matrix(dim);
        let input = initial_state(num_qubits);
        group.throughput(Throughput::Elements((dim * dim) as u64));

        group.bench_function(format!("mat_apply_{}_qubits", num_qubits), |b| {
            b.iter(|| mat_apply(black_box(&matrix), dim, black_box(&input)));
        });
        group.bench_function(format!("mat_mul_{}_qubits", num_qubits), |b| {
            b.iter(|| mat_mul(black_box(&matrix), black_box(&matrix), dim));
        });
    }
    group.finish();
}

fn benchmark_targeted_gates(group: &mut BenchmarkGroup<WallTime>, num_qubits: usize) {
    let amps = initial_state(num_qubits);

    let rotation = Gate::rotation(PI / 3.0, PI / 4.0, PI / 2.0)
        .resolve()
        .unwrap();
    group.bench_function(format!("rotation_{}_qubits", num_qubits), |b| {
        b.iter(|| apply_on_targets(black_box(&amps), rotation.as_slice(), &[num_qubits - 1]));
    });

    if num_qubits >= 2 {
        let cx = controlled_not_matrix();
        group.bench_function(format!("cx_{}_qubits", num_qubits), |b| {
            b.iter(|| apply_on_targets(black_box(&amps), cx.as_slice(), &[0, num_qubits - 1]));
        });
    }

    if num_qubits >= 3 {
        let dense = dense_matrix(8);
        group.bench_function(format!("three_qubit_{}_qubits", num_qubits), |b| {
            b.iter(|| apply_on_targets(black_box(&amps), &dense, &[0, 1, num_qubits - 1]));
        });
    }
}

// gate application on a large statevector without building the lift
fn targeted_gate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("targeted_gates");
    for num_qubits in qubit_counts() {
        group.throughput(Throughput::Elements((1u64) << num_qubits));
        benchmark_targeted_gates(&mut group, num_qubits);
    }
    group.finish();
}

// register declaration tensors a fresh register onto the global state
fn state_growth_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_growth");
    for num_qubits in qubit_counts() {
        let source = format!(
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg a[{}];\nqreg b[{}];\nh a;\ncx a, b;",
            num_qubits / 2,
            num_qubits - num_qubits / 2
        );
        let config = RunConfig::default().with_seed(1);
        group.throughput(Throughput::Elements((1u64) << num_qubits));
        group.bench_function(format!("entangle_program_{}_qubits", num_qubits), |b| {
            b.iter(|| run_source(black_box(&source), "bench.qasm", &config).unwrap());
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = custom_criterion_config();
    targets = dense_kernel_benchmarks, targeted_gate_benchmarks, state_growth_benchmarks
}
criterion_main!(benches);
