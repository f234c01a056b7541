//! # Progression Benchmarks
//!
//! Performance benchmarks for the leveling curve, the stat sheet and the
//! completion path through the facade.
//!
//! Run with: `cargo bench -p habitquest-core`

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use habitquest_core::{
    CompletionId, CompletionLog, FixedClock, Frequency, Habit, HabitId, LevelingEngine,
    MemoryStore, NewHabit, Progression, StatCategory, StatsAggregator,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .expect("ts")
}

/// One habit per category, each completed once a day for `days` days.
fn history(days: usize) -> (Vec<Habit>, Vec<CompletionLog>) {
    let habits: Vec<Habit> = StatCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, category)| {
            Habit::from_new(
                HabitId(i as u64 + 1),
                NewHabit {
                    name: format!("habit-{i}"),
                    category: *category,
                    xp_value: 25,
                    frequency: Frequency::Daily,
                },
                epoch(),
            )
            .expect("habit")
        })
        .collect();

    let mut logs = Vec::with_capacity(days * habits.len());
    for day in 0..days {
        for habit in &habits {
            logs.push(CompletionLog {
                id: CompletionId(logs.len() as u64 + 1),
                habit_id: habit.id,
                completed_at: epoch() + Duration::days(day as i64),
            });
        }
    }
    (habits, logs)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_threshold(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold");
    let engine = LevelingEngine::new();

    for level in [10u32, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(level), level, |b, &level| {
            b.iter(|| black_box(engine.threshold(black_box(level))));
        });
    }

    group.finish();
}

fn bench_stat_points(c: &mut Criterion) {
    let mut group = c.benchmark_group("stat_points");
    let stats = StatsAggregator::utc();

    for days in [30usize, 365, 1000].iter() {
        let (habits, logs) = history(*days);
        group.bench_with_input(BenchmarkId::from_parameter(days), days, |b, _| {
            b.iter(|| black_box(stats.stat_points(&habits, &logs, &[], &[])));
        });
    }

    group.finish();
}

fn bench_streaks(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let stats = StatsAggregator::utc();

    for days in [30usize, 365, 1000].iter() {
        let (habits, logs) = history(*days);
        let today = (epoch() + Duration::days(*days as i64)).date_naive();
        group.bench_with_input(BenchmarkId::from_parameter(days), days, |b, _| {
            b.iter(|| black_box(stats.snapshot(&habits, &logs, today)));
        });
    }

    group.finish();
}

fn bench_complete_habit(c: &mut Criterion) {
    c.bench_function("complete_habit", |b| {
        b.iter(|| {
            let clock = FixedClock::new(epoch());
            let mut progression =
                Progression::open(MemoryStore::new(), StdRng::seed_from_u64(1), clock.clone())
                    .expect("open");
            let habit = progression
                .add_habit(NewHabit {
                    name: "Run".to_string(),
                    category: StatCategory::Body,
                    xp_value: 40,
                    frequency: Frequency::Daily,
                })
                .expect("habit");
            for _ in 0..30 {
                let _ = progression.complete_habit(habit.id);
                clock.advance_days(1);
            }
            black_box(progression)
        });
    });
}

criterion_group!(
    benches,
    bench_threshold,
    bench_stat_points,
    bench_streaks,
    bench_complete_habit
);
criterion_main!(benches);
