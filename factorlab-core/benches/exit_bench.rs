//! Criterion benchmarks for the engine hot paths.
//!
//! Benchmarks:
//! 1. Barrier exit scan (per-column forward scans, rayon across columns)
//! 2. Fixed holding-period exit (pure index arithmetic baseline)
//! 3. Full backtest aggregation (exposure fill + commission + daily sums)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use factorlab_core::backtest::{backtest_factor, COMMISSION};
use factorlab_core::exit::{exit_w_fix_hp, exit_w_loss_barrier};
use factorlab_core::panel::{Panel, SignalPanel};
use factorlab_core::testutil::{dt_index, lcg_walk};

fn price_panel(rows: usize, cols: usize) -> Panel {
    Panel::new(
        dt_index(rows),
        (0..cols).map(|s| format!("sym{s}")).collect(),
        (0..cols)
            .map(|s| lcg_walk(rows, 1000 + s as u64, 100.0))
            .collect(),
    )
    .unwrap()
}

fn entry_panel(rows: usize, cols: usize, step: usize) -> SignalPanel {
    let columns = (0..cols)
        .map(|s| {
            let mut cells: Vec<Option<f64>> = vec![None; rows];
            let mut dir = if s % 2 == 0 { 1.0 } else { -1.0 };
            for t in (s % step..rows).step_by(step) {
                cells[t] = Some(dir);
                dir = -dir;
            }
            cells
        })
        .collect();
    SignalPanel::new(
        dt_index(rows),
        (0..cols).map(|s| format!("sym{s}")).collect(),
        columns,
    )
    .unwrap()
}

fn bench_barrier_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("barrier_scan");
    for &cols in &[10usize, 50] {
        let close = price_panel(5000, cols);
        let sig = entry_panel(5000, cols, 13);
        group.bench_with_input(BenchmarkId::from_parameter(cols), &cols, |b, _| {
            b.iter(|| {
                let out = exit_w_loss_barrier(
                    black_box(&sig),
                    black_box(&close),
                    Some(0.04),
                    Some(0.03),
                    Some(40),
                )
                .unwrap();
                black_box(out)
            })
        });
    }
    group.finish();
}

fn bench_fixed_hp(c: &mut Criterion) {
    let sig = entry_panel(5000, 50, 13);
    c.bench_function("fixed_hp_exit", |b| {
        b.iter(|| black_box(exit_w_fix_hp(black_box(&sig), 20).unwrap()))
    });
}

fn bench_backtest(c: &mut Criterion) {
    let close = price_panel(5000, 50);
    let sig = entry_panel(5000, 50, 13);
    let ret = close.diff(); // shape stand-in with realistic NaN pattern
    let weight = Panel::filled(close.index().to_vec(), close.symbols().to_vec(), 0.02).unwrap();
    c.bench_function("backtest_factor", |b| {
        b.iter(|| {
            black_box(
                backtest_factor(black_box(&sig), &weight, black_box(&ret), COMMISSION).unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_barrier_scan, bench_fixed_hp, bench_backtest);
criterion_main!(benches);
