//! Fixed-timestep tick loop.
//!
//! The [`TickLoop`] drives the simulation forward. Each tick:
//!
//! 1. Every registered system runs against every entity, entity-outer and
//!    system-inner, in registry order. Systems get a [`SimContext`] and may
//!    mutate components, query or mutate the tile grid and queue commands.
//! 2. The life pass counts down lifetimes and queues expired entities.
//! 3. The command buffer is applied (FIFO). Lights owned by despawned
//!    entities are unregistered from the grid.
//! 4. Invalidated light layers are recomputed.
//! 5. The tick counter advances.
//!
//! Nothing inside a tick returns an error. Systems skip entities that lack
//! their components and the script system logs failures.
//!
//! # Example
//!
//! ```
//! use gloam_engine::tick::{TickConfig, TickLoop};
//! use gloam_engine::tile::{TileCatalog, TileGrid};
//! use gloam_ecs::prelude::*;
//!
//! let tiles = TileGrid::new(8, 8, 1, TileCatalog::dungeon());
//! let mut sim = TickLoop::new(World::new(), tiles, TickConfig::default())
//!     .with_default_systems();
//!
//! sim.world_mut().spawn(ComponentSet::new().with(Life::new(0.05)));
//! sim.run_ticks(10);
//!
//! assert_eq!(sim.tick_count(), 10);
//! assert_eq!(sim.world().entity_count(), 0);
//! ```

use std::time::{Duration, Instant};

use gloam_ecs::command::{Applied, CommandBuffer, Outcome};
use gloam_ecs::component::ComponentSet;
use gloam_ecs::entity::EntityId;
use gloam_ecs::world::World;
use serde::{Deserialize, Serialize};

use crate::collision::{GridCollision, TileCollision};
use crate::script::ScriptHost;
use crate::systems;
use crate::tile::TileGrid;
use crate::EngineError;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// 60 Hz.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system summed over all entities (execution order).
    pub system_times: Vec<(String, Duration)>,
    pub life_time: Duration,
    pub command_apply_time: Duration,
    pub lighting_time: Duration,
    /// Number of light layers rebuilt this tick.
    pub layers_relit: usize,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// SimContext
// ---------------------------------------------------------------------------

/// Clock values for the tick in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimClock {
    /// Index of the tick in progress (0 for the first tick).
    pub tick: u64,
    /// `tick * fixed_dt`, never accumulated.
    pub sim_time: f64,
    pub dt: f32,
}

/// Everything a system may touch. Passed explicitly; there are no globals.
pub struct SimContext {
    pub world: World,
    pub tiles: TileGrid,
    pub commands: CommandBuffer,
    pub collision: Box<dyn TileCollision>,
    pub scripts: Option<Box<dyn ScriptHost>>,
    pub clock: SimClock,
}

// ---------------------------------------------------------------------------
// SystemFn
// ---------------------------------------------------------------------------

/// A per-entity update operator.
///
/// Called once per entity per tick. Structural changes go through
/// `ctx.commands`; a system must return without effect when `entity` lacks
/// the components it needs.
pub type SystemFn = fn(&mut SimContext, f32, EntityId);

#[derive(Debug)]
struct RegisteredSystem {
    name: String,
    func: SystemFn,
    /// Names of systems that must execute before this one.
    after: Vec<String>,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The deterministic fixed-timestep tick loop.
///
/// Same initial world and grid, same systems in the same order and same
/// script modules give the same state after every tick: systems run in
/// declaration order over entities in registry order, commands apply FIFO
/// and simulation time is `tick_count * fixed_dt`.
pub struct TickLoop {
    ctx: SimContext,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    fixed_dt: f64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a tick loop with no systems, [`GridCollision`] on the
    /// collision layer and no script host.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(world: World, tiles: TileGrid, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            ctx: SimContext {
                world,
                tiles,
                commands: CommandBuffer::new(),
                collision: Box::new(GridCollision::default()),
                scripts: None,
                clock: SimClock::default(),
            },
            systems: Vec::new(),
            tick_counter: 0,
            fixed_dt: config.fixed_dt,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Register the default pipeline: lighting, script, move, stats,
    /// animator.
    pub fn with_default_systems(mut self) -> Self {
        for (name, func) in systems::default_pipeline() {
            self.add_system(name, func);
        }
        self
    }

    pub fn with_collision(mut self, collision: Box<dyn TileCollision>) -> Self {
        self.ctx.collision = collision;
        self
    }

    pub fn with_scripts(mut self, scripts: Box<dyn ScriptHost>) -> Self {
        self.ctx.scripts = Some(scripts);
        self
    }

    pub fn set_scripts(&mut self, scripts: Option<Box<dyn ScriptHost>>) {
        self.ctx.scripts = scripts;
    }

    /// Register a system to run after every system registered so far.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        self.add_system_after(name, &[], func);
    }

    /// Register a system with explicit execution dependencies.
    ///
    /// # Panics
    ///
    /// - If any system in `after` is not already registered.
    /// - If a system with this name already exists.
    /// - If adding this system would create a dependency cycle.
    pub fn add_system_after(&mut self, name: &str, after: &[&str], func: SystemFn) {
        for dep in after {
            assert!(
                self.systems.iter().any(|s| s.name == *dep),
                "system '{name}' declares dependency on '{dep}', but '{dep}' is not registered"
            );
        }
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );

        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
            after: after.iter().map(|s| s.to_string()).collect(),
        });

        self.validate_system_order();
    }

    /// Depth-first search with a recursion stack; a back edge is a cycle.
    fn validate_system_order(&self) {
        let mut visited = vec![false; self.systems.len()];
        let mut in_stack = vec![false; self.systems.len()];

        fn dfs(
            systems: &[RegisteredSystem],
            idx: usize,
            visited: &mut [bool],
            in_stack: &mut [bool],
        ) -> bool {
            if in_stack[idx] {
                return false;
            }
            if visited[idx] {
                return true;
            }
            visited[idx] = true;
            in_stack[idx] = true;
            for dep_name in &systems[idx].after {
                if let Some(dep_idx) = systems.iter().position(|s| s.name == *dep_name) {
                    if !dfs(systems, dep_idx, visited, in_stack) {
                        return false;
                    }
                }
            }
            in_stack[idx] = false;
            true
        }

        for i in 0..self.systems.len() {
            assert!(
                dfs(&self.systems, i, &mut visited, &mut in_stack),
                "cycle detected in system dependencies"
            );
        }
    }

    /// Execute one simulation tick and return what the command buffer did.
    pub fn tick(&mut self) -> Vec<Applied> {
        let tick_start = Instant::now();
        let dt = self.fixed_dt as f32;
        self.ctx.clock = SimClock {
            tick: self.tick_counter,
            sim_time: self.sim_time(),
            dt,
        };

        // Phase 1: systems, entity-outer.
        let entities = self.ctx.world.entities().to_vec();
        let mut spent = vec![Duration::ZERO; self.systems.len()];
        for &entity in &entities {
            for (slot, system) in self.systems.iter().enumerate() {
                let sys_start = Instant::now();
                (system.func)(&mut self.ctx, dt, entity);
                spent[slot] += sys_start.elapsed();
            }
        }

        // Phase 2: lifetimes.
        let life_start = Instant::now();
        for &entity in &entities {
            systems::life::run(&mut self.ctx, dt, entity);
        }
        let life_time = life_start.elapsed();

        // Phase 3: structural changes.
        let apply_start = Instant::now();
        let applied = self.ctx.commands.apply(&mut self.ctx.world);
        for record in &applied {
            if let Outcome::Despawned(id, components) = &record.outcome {
                self.release(*id, components);
            }
        }
        let command_apply_time = apply_start.elapsed();

        // Phase 4: lighting.
        let light_start = Instant::now();
        let layers_relit = self.ctx.tiles.light();
        let lighting_time = light_start.elapsed();

        self.tick_counter += 1;

        self.last_diagnostics = TickDiagnostics {
            system_times: self
                .systems
                .iter()
                .zip(spent)
                .map(|(s, d)| (s.name.clone(), d))
                .collect(),
            life_time,
            command_apply_time,
            lighting_time,
            layers_relit,
            total_time: tick_start.elapsed(),
        };
        tracing::trace!(
            tick = self.tick_counter,
            entities = entities.len(),
            commands = applied.len(),
            layers_relit,
            "tick complete"
        );

        applied
    }

    /// Run `count` ticks. Returns the total number of commands applied.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let mut total_commands = 0u64;
        for _ in 0..count {
            total_commands += self.tick().len() as u64;
        }
        total_commands
    }

    /// Remove an entity right away, outside the tick, releasing its light.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`](gloam_ecs::EcsError::StaleEntity) if `id`
    /// is not alive.
    pub fn destroy(&mut self, id: EntityId) -> Result<ComponentSet, EngineError> {
        let components = self.ctx.world.despawn(id)?;
        self.release(id, &components);
        Ok(components)
    }

    fn release(&mut self, id: EntityId, components: &ComponentSet) {
        if components.light.is_some() {
            self.ctx.tiles.unregister_light(id);
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// `tick_count * fixed_dt`, computed rather than accumulated.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn world(&self) -> &World {
        &self.ctx.world
    }

    /// Direct world access for setup and tests. During a tick, structural
    /// changes go through the command buffer.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.ctx.world
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.ctx.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.ctx.tiles
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileCatalog, TileId, TileWrite};
    use gloam_ecs::prelude::*;
    use gloam_script::{ScriptEffect, ScriptError, ScriptInput};
    use std::cell::RefCell;

    fn open_grid(w: u32, h: u32) -> TileGrid {
        let mut tiles = TileGrid::new(w, h, 1, TileCatalog::dungeon());
        let writes: Vec<TileWrite> = (0..h as i32)
            .flat_map(|y| (0..w as i32).map(move |x| TileWrite::new(x, y, TileId::DUNGEON_BRICK_FLOOR)))
            .collect();
        tiles.add_tiles(0, &writes);
        tiles
    }

    fn sim_with(dt: f64) -> TickLoop {
        TickLoop::new(World::new(), open_grid(8, 8), TickConfig { fixed_dt: dt })
            .with_default_systems()
    }

    // -- 1. Basic construction and defaults ---------------------------------

    #[test]
    fn new_tick_loop_starts_at_zero() {
        let sim = TickLoop::new(World::new(), open_grid(2, 2), TickConfig::default());
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.sim_time(), 0.0);
        assert_eq!(sim.system_count(), 0);
    }

    #[test]
    fn default_config_is_60hz() {
        let config = TickConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn zero_dt_panics() {
        let _ = TickLoop::new(World::new(), open_grid(1, 1), TickConfig { fixed_dt: 0.0 });
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn nan_dt_panics() {
        let _ = TickLoop::new(World::new(), open_grid(1, 1), TickConfig { fixed_dt: f64::NAN });
    }

    // -- 2. System registration ---------------------------------------------

    #[test]
    fn default_pipeline_order() {
        let sim = sim_with(1.0);
        assert_eq!(
            sim.system_names(),
            vec!["lighting", "script", "move", "stats", "animator"]
        );
    }

    #[test]
    #[should_panic(expected = "duplicate system name")]
    fn duplicate_system_name_panics() {
        let mut sim = sim_with(1.0);
        sim.add_system("move", |_, _, _| {});
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn unknown_dependency_panics() {
        let mut sim = TickLoop::new(World::new(), open_grid(1, 1), TickConfig::default());
        sim.add_system_after("late", &["early"], |_, _, _| {});
    }

    #[test]
    fn add_system_after_appends() {
        let mut sim = sim_with(1.0);
        sim.add_system_after("audit", &["move", "stats"], |_, _, _| {});
        assert_eq!(sim.system_names().last(), Some(&"audit"));
    }

    // -- 3. Execution order -------------------------------------------------

    thread_local! {
        static TRACE: RefCell<Vec<(EntityId, char)>> = const { RefCell::new(Vec::new()) };
    }

    fn record_a(_: &mut SimContext, _: f32, e: EntityId) {
        TRACE.with(|t| t.borrow_mut().push((e, 'a')));
    }

    fn record_b(_: &mut SimContext, _: f32, e: EntityId) {
        TRACE.with(|t| t.borrow_mut().push((e, 'b')));
    }

    #[test]
    fn entity_outer_system_inner() {
        TRACE.with(|t| t.borrow_mut().clear());
        let mut world = World::new();
        let e1 = world.spawn(ComponentSet::new());
        let e2 = world.spawn(ComponentSet::new());

        let mut sim = TickLoop::new(world, open_grid(1, 1), TickConfig::default());
        sim.add_system("a", record_a);
        sim.add_system("b", record_b);
        sim.tick();

        let trace = TRACE.with(|t| t.borrow().clone());
        assert_eq!(trace, vec![(e1, 'a'), (e1, 'b'), (e2, 'a'), (e2, 'b')]);
    }

    #[test]
    fn sim_time_computed_not_accumulated() {
        let mut sim = TickLoop::new(World::new(), open_grid(1, 1), TickConfig { fixed_dt: 0.1 });
        sim.run_ticks(1000);
        assert_eq!(sim.sim_time(), 1000.0 * 0.1);
        assert_eq!(sim.tick_count(), 1000);
    }

    #[test]
    fn diagnostics_cover_every_system() {
        let mut sim = sim_with(1.0);
        sim.world_mut().spawn(ComponentSet::new().with(Physics::at(40.0, 40.0)));
        sim.tick();
        let diag = sim.last_diagnostics();
        assert_eq!(diag.system_times.len(), 5);
        assert_eq!(diag.system_times[0].0, "lighting");
        assert!(diag.total_time >= diag.command_apply_time);
    }

    // -- 4. Skips and lifetimes ---------------------------------------------

    #[test]
    fn entity_without_components_is_skipped() {
        let mut sim = sim_with(1.0);
        let bare = sim.world_mut().spawn(ComponentSet::new());
        let applied = sim.tick();
        assert!(applied.is_empty());
        assert!(sim.world().is_alive(bare));
    }

    #[test]
    fn life_shorter_than_one_tick_is_removed_that_tick() {
        let mut sim = sim_with(1.5);
        let id = sim.world_mut().spawn(ComponentSet::new().with(Life::new(1.0)));
        let applied = sim.tick();
        assert!(!sim.world().is_alive(id));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].reason, "lifetime_expired");
    }

    #[test]
    fn life_of_five_seconds_lasts_five_ticks() {
        let mut sim = sim_with(1.0);
        let id = sim.world_mut().spawn(ComponentSet::new().with(Life::new(5.0)));
        sim.run_ticks(4);
        assert!(sim.world().is_alive(id));
        sim.tick();
        assert!(!sim.world().is_alive(id));
    }

    #[test]
    fn despawned_light_is_unregistered() {
        let mut sim = sim_with(1.0);
        let torch = sim.world_mut().spawn(
            ComponentSet::new()
                .with(Physics::at(64.0, 64.0))
                .with(Light::with_radius(3))
                .with(Life::new(2.0)),
        );
        sim.tick();
        assert!(sim.tiles().light_of(torch).is_some());
        assert_eq!(sim.tiles().light_at(0, 2, 2), Some(1.0));

        sim.tick();
        assert!(!sim.world().is_alive(torch));
        assert_eq!(sim.tiles().light_count(), 0);
        assert_eq!(sim.tiles().light_at(0, 2, 2), Some(0.0));
    }

    #[test]
    fn destroy_releases_light_and_stales_handle() {
        let mut sim = sim_with(1.0);
        let lamp = sim.world_mut().spawn(
            ComponentSet::new()
                .with(Physics::at(10.0, 10.0))
                .with(Light::with_radius(2)),
        );
        sim.tick();
        assert_eq!(sim.tiles().light_count(), 1);

        let removed = sim.destroy(lamp).unwrap();
        assert!(removed.light.is_some());
        assert_eq!(sim.tiles().light_count(), 0);
        assert!(sim.destroy(lamp).is_err());
    }

    // -- 5. Scripts ---------------------------------------------------------

    struct Pusher;

    impl ScriptHost for Pusher {
        fn call_update(
            &mut self,
            module: &str,
            input: ScriptInput,
        ) -> Result<Vec<ScriptEffect>, ScriptError> {
            match module {
                "push" => Ok(vec![ScriptEffect::SetVelocity {
                    entity: input.entity,
                    velocity: Vec2::new(60.0, 0.0),
                }]),
                "broken" => Err(ScriptError::Trap("unreachable".into())),
                name => Err(ScriptError::UnknownModule {
                    name: name.to_owned(),
                }),
            }
        }
    }

    #[test]
    fn script_velocity_is_applied_by_move() {
        let mut sim = sim_with(0.5).with_scripts(Box::new(Pusher));
        let id = sim.world_mut().spawn(
            ComponentSet::new()
                .with(Physics::at(32.0, 32.0))
                .with(Script::new("push")),
        );
        sim.tick();
        let physics = sim.world().get::<Physics>(id).unwrap();
        assert_eq!(physics.pos.x, 62.0);
        assert_eq!(physics.velocity, Vec2::ZERO);
    }

    #[test]
    fn failing_script_does_not_halt_tick() {
        let mut sim = sim_with(1.0).with_scripts(Box::new(Pusher));
        let broken = sim.world_mut().spawn(
            ComponentSet::new()
                .with(Script::new("broken"))
                .with(Life::new(1.0)),
        );
        let missing = sim.world_mut().spawn(ComponentSet::new().with(Script::new("nope")));
        sim.tick();
        assert!(!sim.world().is_alive(broken), "life pass still ran");
        assert!(sim.world().is_alive(missing));
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn script_entity_without_host_is_skipped() {
        let mut sim = sim_with(1.0);
        sim.world_mut().spawn(ComponentSet::new().with(Script::new("push")));
        sim.tick();
        assert_eq!(sim.tick_count(), 1);
    }
}
