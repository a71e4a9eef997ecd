use criterion::{black_box, criterion_group, criterion_main, Criterion};
use idle_core::{GameState, UPGRADES};
use idle_econ::derive;
use idle_runtime::reducers::apply_purchase_max;

fn late_game() -> GameState {
    let mut s = GameState::initial(0);
    for (i, u) in UPGRADES.iter().enumerate() {
        s.upgrades.insert(u.id.to_string(), 40 + i as u32);
    }
    s.prestige.level = 12;
    s.prestige.upgrades.insert("empoweredLegacy".into(), 10);
    s.prestige.upgrades.insert("frugalShopper".into(), 20);
    s.prestige.upgrades.insert("infinityEngine".into(), 3);
    s
}

fn bench_economy(c: &mut Criterion) {
    let state = late_game();
    c.bench_function("derive_late_game", |b| {
        b.iter(|| derive(black_box(&state)))
    });

    let rich = GameState {
        currency: 1e15,
        ..GameState::initial(0)
    };
    c.bench_function("purchase_max_capped", |b| {
        b.iter(|| apply_purchase_max(black_box(&rich), "homeRowNovice", 5_000, 0))
    });
}

criterion_group!(benches, bench_economy);
criterion_main!(benches);
