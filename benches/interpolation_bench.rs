// Benchmark for the position interpolation math
// Run with: cargo bench

use std::time::Duration;

use boardlink_curtain::cover::{MotionPlan, MotionState, interpolate, travel_duration};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_interpolate(c: &mut Criterion) {
    c.bench_function("interpolate 10k samples", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..10_000 {
                sum += interpolate(black_box(100.0), black_box(0.0), i as f64 * 0.003, 30.0);
            }
            assert!(sum > 0.0);
        });
    });
}

fn bench_plan_sampling(c: &mut Criterion) {
    let duration = travel_duration(63.0, Duration::from_secs(30));
    let plan = MotionPlan::new(12.0, 75.0, duration, MotionState::Closing, Duration::from_millis(500));
    c.bench_function("sample plan at 500ms cadence", |b| {
        b.iter(|| {
            let mut elapsed = Duration::ZERO;
            while elapsed < plan.duration {
                black_box(plan.position_at(elapsed));
                elapsed += plan.tick;
            }
        });
    });
}

criterion_group!(benches, bench_interpolate, bench_plan_sampling);
criterion_main!(benches);
