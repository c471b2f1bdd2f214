//! Benchmarks for the outlier search and the full decomposition.

use anofox_wsa::core::{yearly_position, WeeklySeries};
use anofox_wsa::decomposition::WeeklyAdjustment;
use anofox_wsa::detection::{search_outliers, select_order, OutlierSearchConfig};
use anofox_wsa::regression::HarmonicOrder;
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_weekly(n: usize) -> (Vec<NaiveDate>, Vec<f64>) {
    let start = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..n).map(|i| start + Duration::days(7 * i as i64)).collect();
    let values = dates
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            let noise = ((i as f64 * 12.9898).sin() * 43758.5453).fract();
            let spike = if i % 97 == 13 { 12.0 } else { 0.0 };
            5.0 * (2.0 * std::f64::consts::PI * yearly_position(d)).sin() + noise + spike
        })
        .collect();
    (dates, values)
}

fn bench_outlier_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("outlier_search");

    for years in [2usize, 5, 10].iter() {
        let (dates, y) = generate_weekly(52 * years);
        let config = OutlierSearchConfig::default().with_order(HarmonicOrder::new(6, 0));

        group.bench_with_input(BenchmarkId::new("forward_backward", years), years, |b, _| {
            b.iter(|| search_outliers(black_box(&y), &dates, None, &config))
        });
    }

    group.finish();
}

fn bench_order_selection(c: &mut Criterion) {
    let (dates, y) = generate_weekly(52 * 5);
    c.bench_function("order_selection_5y", |b| {
        b.iter(|| select_order(black_box(&y), &dates, None, &[]))
    });
}

fn bench_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("decomposition");
    group.sample_size(10);

    for years in [3usize, 6].iter() {
        let (dates, values) = generate_weekly(52 * years);
        let values: Vec<f64> = values.iter().map(|v| v + 100.0).collect();
        let series = WeeklySeries::new(dates, values).unwrap();
        let engine = WeeklyAdjustment::new();

        group.bench_with_input(BenchmarkId::new("two_pass", years), years, |b, _| {
            b.iter(|| engine.decompose(black_box(&series)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_outlier_search,
    bench_order_selection,
    bench_decomposition
);
criterion_main!(benches);
