use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nrgen_compile::{lower, FdConfig, LowerConfig, VectorConfig};
use nrgen_expr::{trace, ExprGraph, ExprId, Symbol};
use nrgen_tensor::{declare, declare_derivative};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// trK = gammaUU^{ij} KDD_{ij}
fn build_trace() -> (ExprGraph, Vec<(String, ExprId)>) {
    let (g, e) = trace(|| {
        let gamma_uu = declare("gammaUU", 2, 3, "sym01").unwrap();
        let k_dd = declare("KDD", 2, 3, "sym01").unwrap();
        let mut sum = ExprId::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                sum += gamma_uu[&[i, j][..]] * k_dd[&[i, j][..]];
            }
        }
        sum
    });
    (g, vec![("trK".to_string(), e)])
}

/// Christoffel symbols of the first kind from a symmetric metric, with its
/// first derivatives resolved by finite differences.
fn build_christoffel() -> (ExprGraph, Vec<(String, ExprId)>) {
    trace(|| {
        let d = declare_derivative("hDD", 2, 1, 3, "sym01").unwrap();
        let half = ExprId::rational(1, 2);
        let mut batch = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                for k in j..3 {
                    let e = half * (d[&[i, j, k][..]] + d[&[i, k, j][..]] - d[&[j, k, i][..]]);
                    batch.push((format!("GammaDDD{i}{j}{k}"), e));
                }
            }
        }
        batch
    })
}

/// Second derivatives of a scalar field in every direction pair.
fn build_hessian() -> (ExprGraph, Vec<(String, ExprId)>) {
    trace(|| {
        let mut batch = Vec::new();
        for i in 0..3 {
            for j in i..3 {
                let e = ExprId::sym(Symbol::derivative("uu", &[], &[i, j]));
                batch.push((format!("HessDD{i}{j}"), e));
            }
        }
        batch
    })
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_cse(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering/cse");
    let (g, batch) = build_trace();

    group.bench_function("trace_scalar", |b| {
        let cfg = LowerConfig::default();
        b.iter(|| lower(black_box(&g), black_box(&batch), &cfg).unwrap())
    });

    group.bench_function("trace_simplified", |b| {
        let cfg = LowerConfig::default().with_simplify(true);
        b.iter(|| lower(black_box(&g), black_box(&batch), &cfg).unwrap())
    });

    group.finish();
}

fn bench_finite_differences(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering/finite_differences");

    let (g, batch) = build_christoffel();
    for order in [2, 4, 8] {
        group.bench_function(format!("christoffel_order_{order}"), |b| {
            let cfg = LowerConfig::default().with_fd(FdConfig::new(order, ["hDD"]));
            b.iter(|| lower(black_box(&g), black_box(&batch), &cfg).unwrap())
        });
    }

    let (g, batch) = build_hessian();
    group.bench_function("hessian_order_4", |b| {
        let cfg = LowerConfig::default().with_fd(FdConfig::new(4, ["uu"]));
        b.iter(|| lower(black_box(&g), black_box(&batch), &cfg).unwrap())
    });

    group.finish();
}

fn bench_emission(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering/emission");
    let (g, batch) = build_christoffel();

    let scalar = LowerConfig::default().with_fd(FdConfig::new(4, ["hDD"]));
    let program = lower(&g, &batch, &scalar).unwrap();
    group.bench_function("christoffel_scalar_c", |b| b.iter(|| black_box(&program).to_c(&scalar)));

    let simd = scalar.clone().with_vector(VectorConfig { fma: true, ..VectorConfig::default() });
    let program = lower(&g, &batch, &simd).unwrap();
    group.bench_function("christoffel_simd_c", |b| b.iter(|| black_box(&program).to_c(&simd)));

    group.finish();
}

criterion_group!(benches, bench_cse, bench_finite_differences, bench_emission);
criterion_main!(benches);
