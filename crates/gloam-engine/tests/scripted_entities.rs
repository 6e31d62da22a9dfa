//! Entities driven by real WebAssembly scripts through the tick loop.

use gloam_engine::prelude::*;

const WALK_RIGHT: &str = r#"
(module
  (import "gloam" "dt" (func $dt (result f32)))
  (import "gloam" "set_velocity" (func $set_velocity (param i64 f32 f32)))
  (func (export "update") (param $entity i64)
    (call $set_velocity (local.get $entity) (f32.const 64) (f32.const 0))))
"#;

const EXPIRE_AT_TICK_3: &str = r#"
(module
  (import "gloam" "tick_number" (func $tick_number (result i64)))
  (import "gloam" "despawn" (func $despawn (param i64 i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "burned_out")
  (func (export "update") (param $entity i64)
    (if (i64.eq (call $tick_number) (i64.const 3))
      (then (call $despawn (local.get $entity) (i32.const 0) (i32.const 10))))))
"#;

const CRASH: &str = r#"(module (func (export "update") (param i64) unreachable))"#;

const SPIN: &str = r#"(module (func (export "update") (param i64) (loop $l (br $l))))"#;

fn runtime() -> ScriptRuntime {
    let config = ScriptConfig {
        fuel_per_call: 50_000,
        ..ScriptConfig::default()
    };
    let mut runtime = ScriptRuntime::new(config).unwrap();
    runtime.load("walk_right", WALK_RIGHT.as_bytes()).unwrap();
    runtime.load("expire", EXPIRE_AT_TICK_3.as_bytes()).unwrap();
    runtime.load("crash", CRASH.as_bytes()).unwrap();
    runtime.load("spin", SPIN.as_bytes()).unwrap();
    runtime
}

fn sim() -> TickLoop {
    let mut tiles = TileGrid::new(16, 4, 1, TileCatalog::dungeon());
    let floor: Vec<TileWrite> = (0..4)
        .flat_map(|y| (0..16).map(move |x| TileWrite::new(x, y, TileId::DUNGEON_BRICK_FLOOR)))
        .collect();
    tiles.add_tiles(0, &floor);
    TickLoop::new(World::new(), tiles, TickConfig { fixed_dt: 0.25 })
        .with_default_systems()
        .with_scripts(Box::new(runtime()))
}

fn scripted(module: &str, x: f32) -> ComponentSet {
    ComponentSet::new()
        .with(Physics::at(x, 40.0))
        .with(Script::new(module))
}

#[test]
fn script_velocity_moves_entity() {
    let mut sim = sim();
    let id = sim.world_mut().spawn(scripted("walk_right", 32.0));
    sim.run_ticks(4);
    assert_eq!(sim.world().get::<Physics>(id).unwrap().pos.x, 96.0);
}

#[test]
fn script_despawn_goes_through_command_buffer() {
    let mut sim = sim();
    let mut lamp = scripted("expire", 64.0);
    lamp.light = Some(Light::with_radius(2));
    let id = sim.world_mut().spawn(lamp);

    sim.run_ticks(3);
    assert!(sim.world().is_alive(id));
    assert_eq!(sim.tiles().light_count(), 1);

    let applied = sim.tick();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].reason, "burned_out");
    assert!(matches!(applied[0].outcome, Outcome::Despawned(gone, _) if gone == id));
    assert_eq!(sim.tiles().light_count(), 0);
}

#[test]
fn trapping_and_spinning_scripts_do_not_halt_the_tick() {
    let mut sim = sim();
    let crash = sim.world_mut().spawn(scripted("crash", 32.0));
    let spin = sim.world_mut().spawn(scripted("spin", 64.0));
    let walker = sim.world_mut().spawn(scripted("walk_right", 96.0));
    let unknown = sim.world_mut().spawn(scripted("not_loaded", 128.0));

    sim.run_ticks(2);

    assert_eq!(sim.tick_count(), 2);
    for id in [crash, spin, unknown] {
        assert!(sim.world().is_alive(id));
        assert_eq!(sim.world().get::<Physics>(id).unwrap().velocity, Vec2::ZERO);
    }
    assert_eq!(sim.world().get::<Physics>(walker).unwrap().pos.x, 128.0);
}

#[test]
fn scripted_runs_are_deterministic() {
    let run = || {
        let mut sim = sim();
        sim.world_mut().spawn(scripted("walk_right", 32.0));
        sim.world_mut().spawn(scripted("expire", 64.0));
        sim.run_ticks(8);
        sim.state_hash().unwrap()
    };
    assert_eq!(run(), run());
}
