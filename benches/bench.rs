// Criterion benchmarks for Fairmeet

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fairmeet::core::{aggregate_legs, dedup_nearby, proximity_shortlist, rank_candidates, DEFAULT_CITY_CENTER};
use fairmeet::models::{Candidate, Coordinate, Hub, ResolvedParticipant, ScoredCandidate, ScoringParams, TravelLeg};

fn create_hub(id: usize) -> Hub {
    // spread over roughly 20km x 20km around central London
    let lat = 51.42 + ((id * 37) % 180) as f64 * 0.001;
    let lng = -0.26 + ((id * 53) % 280) as f64 * 0.001;
    Hub {
        id: format!("hub-{}", id),
        name: format!("Hub {}", id),
        lat,
        lng,
        zone: "1".to_string(),
        lines: vec![],
    }
}

fn create_members(count: usize) -> Vec<ResolvedParticipant> {
    (0..count)
        .map(|i| {
            let home = Coordinate::new(51.45 + i as f64 * 0.01, -0.20 + i as f64 * 0.015);
            ResolvedParticipant {
                id: format!("m{}", i),
                name: format!("Member {}", i),
                start_location: home,
                start_label: "Home".to_string(),
                end_location: home,
                end_label: "Home".to_string(),
            }
        })
        .collect()
}

fn create_legs(seed: usize, count: usize) -> Vec<TravelLeg> {
    (0..count)
        .map(|i| TravelLeg {
            outbound_minutes: 15 + ((seed * 7 + i * 13) % 60) as u32,
            return_minutes: 15 + ((seed * 11 + i * 5) % 60) as u32,
            complete: (seed + i) % 17 != 0,
        })
        .collect()
}

fn scored_pool(size: usize, members: &[ResolvedParticipant]) -> Vec<ScoredCandidate> {
    let params = ScoringParams::default();
    let mut scored: Vec<ScoredCandidate> = (0..size)
        .filter_map(|i| {
            let hub = create_hub(i);
            aggregate_legs(hub.to_candidate(), members, &create_legs(i, members.len()), &params)
        })
        .collect();
    rank_candidates(&mut scored);
    scored
}

fn bench_aggregate_and_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_and_rank");
    let params = ScoringParams::default();

    for group_size in [3usize, 10, 25] {
        let members = create_members(group_size);
        let candidates: Vec<(Candidate, Vec<TravelLeg>)> = (0..15)
            .map(|i| (create_hub(i).to_candidate(), create_legs(i, group_size)))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(group_size), &group_size, |b, _| {
            b.iter(|| {
                let mut scored: Vec<ScoredCandidate> = candidates
                    .iter()
                    .filter_map(|(candidate, legs)| {
                        aggregate_legs(black_box(candidate.clone()), &members, legs, &params)
                    })
                    .collect();
                rank_candidates(&mut scored);
                scored
            });
        });
    }

    group.finish();
}

fn bench_dedup(c: &mut Criterion) {
    let members = create_members(5);
    let pool = scored_pool(50, &members);

    c.bench_function("dedup_nearby_50", |b| {
        b.iter(|| dedup_nearby(black_box(&pool), black_box(0.00001), 3));
    });
}

fn bench_proximity_shortlist(c: &mut Criterion) {
    let mut group = c.benchmark_group("proximity_shortlist");

    for size in [30usize, 300, 3000] {
        let hubs: Vec<Hub> = (0..size).map(create_hub).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &hubs, |b, hubs| {
            b.iter(|| proximity_shortlist(black_box(hubs), black_box(DEFAULT_CITY_CENTER), 15));
        });
    }

    group.finish();
}

fn bench_travel_legs_map(c: &mut Criterion) {
    let members = create_members(25);
    c.bench_function("scored_pool_25x15", |b| {
        b.iter(|| {
            let pool = scored_pool(black_box(15), &members);
            pool.iter().map(|s| s.travel_legs.len()).sum::<usize>()
        });
    });
}

criterion_group!(
    benches,
    bench_aggregate_and_rank,
    bench_dedup,
    bench_proximity_shortlist,
    bench_travel_legs_map
);
criterion_main!(benches);
