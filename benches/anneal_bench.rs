//! Criterion benchmarks for the annealing loop.
//!
//! Uses synthetic items (sphere coordinates, mutex-grouped slots) to measure
//! engine overhead independent of any domain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, RngCore};
use u_optsearch::item::{ItemFlags, NoValidValue, ObjectiveItem, OptimizationItem};
use u_optsearch::sa::{NoOpMonitor, SaConfig, SimulatedAnnealing};
use u_optsearch::solution::Solution;

// ===========================================================================
// Sphere coordinate: minimize x^2
// ===========================================================================

struct Coordinate {
    x: f64,
    previous: f64,
}

impl ObjectiveItem for Coordinate {
    fn cost(&self) -> Result<f64, NoValidValue> {
        Ok(self.x * self.x)
    }
}

impl OptimizationItem for Coordinate {
    fn randomize_value(&mut self, rng: &mut dyn RngCore) -> Result<(), NoValidValue> {
        self.previous = self.x;
        self.x += rng.random_range(-0.5..0.5);
        Ok(())
    }

    fn undo_value(&mut self) -> Result<(), NoValidValue> {
        self.x = self.previous;
        Ok(())
    }
}

fn sphere(dim: usize, seed: u64) -> Solution {
    let mut solution = Solution::with_seed(seed);
    for _ in 0..dim {
        solution
            .add_item(Coordinate { x: 0.0, previous: 0.0 }, ItemFlags::default())
            .unwrap();
    }
    solution
}

fn grouped_sphere(dim: usize, group_size: usize, seed: u64) -> Solution {
    let mut solution = Solution::with_seed(seed);
    for i in 0..dim {
        let flags = ItemFlags::default().with_mutex_group(format!("g{}", i / group_size));
        solution.add_item(Coordinate { x: 0.0, previous: 0.0 }, flags).unwrap();
    }
    solution.activate_mutexes();
    solution
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_sa_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_sphere");
    group.sample_size(10);

    for &dim in &[10, 50, 100] {
        let config = SaConfig::default()
            .with_initial_temperature(10.0)
            .with_max_phases(30);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &config, |b, config| {
            b.iter(|| {
                let mut solution = sphere(dim, 42);
                let mut sa = SimulatedAnnealing::new(config.clone());
                let report = sa.optimize_with(black_box(&mut solution), &mut NoOpMonitor);
                black_box(report)
            })
        });
    }
    group.finish();
}

fn bench_sa_mutex_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_mutex_groups");
    group.sample_size(10);

    for &group_size in &[2, 5, 10] {
        let config = SaConfig::default()
            .with_initial_temperature(10.0)
            .with_max_phases(30);
        group.bench_with_input(
            BenchmarkId::from_parameter(group_size),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut solution = grouped_sphere(50, group_size, 42);
                    let mut sa = SimulatedAnnealing::new(config.clone());
                    let report = sa.optimize_with(black_box(&mut solution), &mut NoOpMonitor);
                    black_box(report)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_sa_sphere, bench_sa_mutex_groups);
criterion_main!(benches);
