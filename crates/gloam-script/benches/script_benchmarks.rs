//! Script call overhead.
//!
//! Measures a bare `update` call, a host-call heavy `update`, and the native
//! equivalent of the heavy one for comparison.
//!
//! Run with: `cargo bench --bench script_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gloam_ecs::component::Vec2;
use gloam_ecs::entity::EntityId;
use gloam_script::{ScriptConfig, ScriptInput, ScriptRuntime};

fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}

fn input() -> ScriptInput {
    ScriptInput {
        entity: EntityId::new(1, 0),
        position: Vec2::new(3.0, 4.0),
        velocity: Vec2::new(0.5, 0.25),
        dt: 1.0 / 60.0,
        sim_time: 1.0,
        tick: 60,
    }
}

fn bench_idle_update(c: &mut Criterion) {
    let mut runtime = ScriptRuntime::new(ScriptConfig::default()).expect("engine");
    runtime
        .load("idle", &fixture_bytes("idle.wat"))
        .expect("idle.wat should load");

    c.bench_function("script_idle_update", |b| {
        b.iter(|| {
            let call = runtime.call_update("idle", input()).expect("no trap");
            black_box(call.fuel_consumed);
        });
    });
}

fn bench_chatty_update(c: &mut Criterion) {
    let mut runtime = ScriptRuntime::new(ScriptConfig::default()).expect("engine");
    runtime
        .load("chatty", &fixture_bytes("chatty.wat"))
        .expect("chatty.wat should load");

    c.bench_function("script_23_host_calls", |b| {
        b.iter(|| {
            let call = runtime.call_update("chatty", input()).expect("no trap");
            black_box(call.effects.len());
        });
    });
}

fn bench_native_equivalent(c: &mut Criterion) {
    c.bench_function("native_equivalent_23_calls", |b| {
        b.iter(|| {
            let snapshot = black_box(input());
            let mut acc = 0.0f32;
            for _ in 0..10 {
                acc += snapshot.position.x + snapshot.velocity.y;
            }
            black_box(Vec2::new(acc, snapshot.position.y + snapshot.velocity.x));
        });
    });
}

criterion_group!(
    benches,
    bench_idle_update,
    bench_chatty_update,
    bench_native_equivalent
);
criterion_main!(benches);
