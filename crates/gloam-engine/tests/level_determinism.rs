//! Whole-level runs from the reference generator.

use gloam_engine::prelude::*;

const PLAYER_JSON: &str = include_str!("../assets/templates/Player.json");
const LANTERN_JSON: &str = include_str!("../assets/templates/Lantern.json");
const WANDER_WAT: &str = include_str!("../assets/scripts/wander.wat");

fn templates() -> TemplateLibrary {
    let mut lib = TemplateLibrary::new();
    lib.insert_json("Player.json", PLAYER_JSON).unwrap();
    lib.insert_json("Lantern.json", LANTERN_JSON).unwrap();
    lib
}

fn small_config(seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.world = WorldConfig {
        seed,
        width: 40,
        height: 40,
        walk_steps: 800,
        carve_around_player: true,
    };
    config
}

fn level(seed: u64) -> Level {
    let config = small_config(seed);
    let mut runtime = ScriptRuntime::new(config.script.clone()).unwrap();
    runtime.load("wander", WANDER_WAT.as_bytes()).unwrap();
    let mut generator = RandomWalkGenerator::new(&config.world);
    Level::new(&config, &mut generator, &templates(), Some(Box::new(runtime))).unwrap()
}

fn run(seed: u64, ticks: u32) -> String {
    let mut level = level(seed);
    for _ in 0..ticks {
        level.update();
    }
    level.sim().state_hash().unwrap()
}

#[test]
fn same_seed_same_hash() {
    assert_eq!(run(2355, 240), run(2355, 240));
}

#[test]
fn different_seed_different_hash() {
    assert_ne!(run(2355, 10), run(99, 10));
}

#[test]
fn player_starts_on_floor_and_wanders() {
    let mut level = level(2355);
    let start = level.sim().world().get::<Physics>(level.player()).unwrap().pos;
    let cell = cell_of(start);
    assert!(level.sim().tiles().is_passable(0, cell.x, cell.y));

    for _ in 0..30 {
        level.update();
    }
    let now = level.sim().world().get::<Physics>(level.player()).unwrap().pos;
    assert!(now.x > start.x, "wander heads right for the first 120 ticks");
    assert_eq!(now.y, start.y);
}

#[test]
fn carving_keeps_the_player_on_floor() {
    let mut level = level(7);
    for _ in 0..200 {
        level.update();
        let pos = level.sim().world().get::<Physics>(level.player()).unwrap().pos;
        let feet = cell_of(Vec2::new(pos.x, pos.y + TILE_SIZE / 2.0));
        assert!(level.sim().tiles().is_passable(0, feet.x, feet.y));
    }
}

#[test]
fn lantern_is_lit_and_drawn() {
    let mut level = level(2355);
    level.update();
    let lantern = level.lantern();
    let light = *level.sim().tiles().light_of(lantern).unwrap();
    assert_eq!(
        level.sim().tiles().light_at(0, light.cell.x, light.cell.y),
        Some(1.0)
    );
    let order = draw_order(level.sim().world());
    assert_eq!(order.len(), 2);
    assert!(order.contains(&lantern));
}
