use chrono::{Duration, TimeZone, Utc};
use club_poker::points::{PointsAllocation, PointsSystem, PointsTable};
use club_poker::settlement::{PayoutStructure, RakePolicy, SettlementSummary, plan_settlement, rank};
use club_poker::tournament::{NewTournament, Registration, Tournament};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;
use std::hint::black_box;

/// Helper to create a rebuy tournament that tracks points
fn setup_tournament() -> Tournament {
    let mut config = NewTournament::new(1, "Bench Deepstack", Decimal::from(50));
    config.rebuy_amount = Some(Decimal::from(50));
    config.addon_amount = Some(Decimal::from(25));
    config.buy_in_rake = RakePolicy::percentage(Decimal::from(10));
    config.addon_rake = RakePolicy::fixed(Decimal::from(5));
    config.payout_structure = "top9".to_string();
    config.track_points = true;
    config.points_system_id = Some(1);
    Tournament::new(1, &config).unwrap()
}

/// Helper to create N registrations with half of the field eliminated
fn setup_registrations(n: usize) -> Vec<Registration> {
    let start = Utc.with_ymd_and_hms(2026, 1, 9, 19, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let id = i as i64 + 1;
            let mut reg = Registration::new(id, 1, 1000 + id);
            reg.rebuys = (i % 3) as u32;
            reg.addons = (i % 2) as u32;
            reg.knockouts = (i % 4) as u32;
            if i % 2 == 1 {
                reg.is_eliminated = true;
                reg.elimination_time = Some(start + Duration::minutes(i as i64));
                reg.elimination_seq = Some(id);
            }
            reg
        })
        .collect()
}

fn setup_points_table() -> PointsTable {
    let system = PointsSystem {
        id: 1,
        season_id: 2026,
        name: "Bench League".to_string(),
        participation_points: 10,
        knockout_points: 5,
    };
    let allocations = (1..=9)
        .map(|position| PointsAllocation {
            id: i64::from(position),
            points_system_id: 1,
            position,
            position_end: None,
            points: 200 - 20 * position as i32,
        })
        .collect();
    PointsTable::new(system, allocations).unwrap()
}

/// Benchmark payout distribution for every named structure
fn bench_payout_distribution(c: &mut Criterion) {
    let pool = Decimal::new(1_234_567, 2);
    c.bench_function("payout_distribute_top9", |b| {
        b.iter(|| PayoutStructure::Top9.distribute(black_box(pool)));
    });
}

/// Benchmark ranking at different field sizes
fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");

    for n_players in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                let regs = setup_registrations(n);
                b.iter(|| rank(black_box(&regs)));
            },
        );
    }

    group.finish();
}

/// Benchmark the money summary shown in previews
fn bench_summary(c: &mut Criterion) {
    let tournament = setup_tournament();
    let regs = setup_registrations(200);

    c.bench_function("settlement_summary_200_players", |b| {
        b.iter(|| SettlementSummary::compute(black_box(&tournament), black_box(&regs)));
    });
}

/// Benchmark a full settlement plan: ranking, prizes and points
fn bench_plan_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_settlement");
    let tournament = setup_tournament();
    let table = setup_points_table();

    for n_players in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                let regs = setup_registrations(n);
                b.iter(|| plan_settlement(&tournament, black_box(&regs), Some(&table)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    settlement_math,
    bench_payout_distribution,
    bench_ranking,
    bench_summary,
);

criterion_group!(settlement_plans, bench_plan_settlement);

criterion_main!(settlement_math, settlement_plans);
