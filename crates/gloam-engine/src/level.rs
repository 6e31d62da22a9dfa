//! A playable level: generated tiles, the player, a lantern and the camera.

use gloam_ecs::component::{Cell, Physics, Vec2};
use gloam_ecs::command::Applied;
use gloam_ecs::entity::EntityId;
use gloam_ecs::template::EntityFactory;
use gloam_ecs::world::World;

use crate::collision::{cell_of, COLLISION_LAYER, TILE_SIZE};
use crate::config::SimConfig;
use crate::pathfinding::{self, Connectivity, Location, Path};
use crate::script::ScriptHost;
use crate::tick::TickLoop;
use crate::tile::{TileCatalog, TileGrid, TileId, TileWrite};
use crate::worldgen::{marker_to_tile, WorldGenerator};
use crate::EngineError;

pub const PLAYER_TEMPLATE: &str = "Player.json";
pub const LANTERN_TEMPLATE: &str = "Lantern.json";
/// The lantern is placed this far right of and below the player spawn.
pub const LANTERN_OFFSET: f32 = 170.0;
/// Share of the mouse's distance from the view centre the camera leans by.
pub const MOUSE_LEAN: f32 = 0.1;

/// Camera rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub center: Vec2,
    pub size: Vec2,
}

impl Default for View {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            size: Vec2::new(1280.0, 720.0),
        }
    }
}

pub struct Level {
    sim: TickLoop,
    view: View,
    /// Mouse position in window pixels.
    mouse: Vec2,
    player: EntityId,
    lantern: EntityId,
    carve_around_player: bool,
    debug_path: Vec<Location>,
}

impl Level {
    /// Generate the map, fill layer 0 from its markers and spawn the player
    /// and the lantern.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Ecs`] if the factory lacks either template.
    /// - [`EngineError::Config`] if a template has no physics component.
    pub fn new(
        config: &SimConfig,
        generator: &mut dyn WorldGenerator,
        factory: &dyn EntityFactory,
        scripts: Option<Box<dyn ScriptHost>>,
    ) -> Result<Self, EngineError> {
        let map = generator.generate();

        let mut tiles = TileGrid::new(map.width, map.height, 1, TileCatalog::dungeon())
            .with_light_config(config.lighting);
        let writes: Vec<TileWrite> = (0..map.height as i32)
            .flat_map(|y| (0..map.width as i32).map(move |x| (x, y)))
            .filter_map(|(x, y)| {
                map.marker(x, y)
                    .map(|m| TileWrite::new(x, y, marker_to_tile(m)))
            })
            .collect();
        tiles.add_tiles(COLLISION_LAYER, &writes);

        let mut world = World::new();
        let spawn = Vec2::new(map.spawn.x as f32 * TILE_SIZE, map.spawn.y as f32 * TILE_SIZE);
        let player = spawn_at(&mut world, factory, PLAYER_TEMPLATE, spawn)?;
        let lantern = spawn_at(
            &mut world,
            factory,
            LANTERN_TEMPLATE,
            Vec2::new(spawn.x + LANTERN_OFFSET, spawn.y + LANTERN_OFFSET),
        )?;
        tracing::info!(%player, %lantern, spawn_x = map.spawn.x, spawn_y = map.spawn.y, "level ready");

        let mut sim = TickLoop::new(world, tiles, config.tick.clone()).with_default_systems();
        sim.set_scripts(scripts);

        Ok(Self {
            sim,
            view: View::default(),
            mouse: Vec2::ZERO,
            player,
            lantern,
            carve_around_player: config.world.carve_around_player,
            debug_path: Vec::new(),
        })
    }

    /// Advance one tick, then follow the player with the camera and, when
    /// enabled, carve floor around them.
    pub fn update(&mut self) -> Vec<Applied> {
        let applied = self.sim.tick();

        let Some(pos) = self.player_pos() else {
            return applied;
        };
        self.view.center = Vec2::new(
            pos.x + (self.mouse.x - self.view.size.x / 2.0) * MOUSE_LEAN,
            pos.y + (self.mouse.y - self.view.size.y / 2.0) * MOUSE_LEAN,
        );

        if self.carve_around_player {
            self.carve_around(pos);
        }
        applied
    }

    /// Turn the 3x3 block around the player's feet into floor.
    fn carve_around(&mut self, pos: Vec2) {
        let feet = cell_of(Vec2::new(pos.x, pos.y + TILE_SIZE / 2.0));
        let tiles = self.sim.tiles_mut();
        let writes: Vec<TileWrite> = (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (feet.x + dx, feet.y + dy)))
            .filter(|&(x, y)| {
                tiles
                    .get_tile(COLLISION_LAYER, x, y)
                    .is_some_and(|node| node.id != TileId::DUNGEON_BRICK_FLOOR)
            })
            .map(|(x, y)| TileWrite::new(x, y, TileId::DUNGEON_BRICK_FLOOR))
            .collect();
        if !writes.is_empty() {
            let changed = tiles.add_tiles(COLLISION_LAYER, &writes);
            tracing::debug!(changed, x = feet.x, y = feet.y, "carved around player");
        }
    }

    pub fn window_resize(&mut self, width: f32, height: f32) {
        self.view.size = Vec2::new(width, height);
    }

    pub fn set_mouse(&mut self, mouse: Vec2) {
        self.mouse = mouse;
    }

    /// Path from the player's cell to `goal`, kept for debug display.
    pub fn find_path_to(&mut self, goal: Cell, connectivity: Connectivity) -> Option<Path> {
        let start = cell_of(self.player_pos()?);
        let path = pathfinding::find_path(self.sim.tiles(), start, goal, connectivity);
        match &path {
            Some(p) => self.debug_path.clone_from(&p.cells),
            None => {
                tracing::debug!(?start, ?goal, "no path");
                self.debug_path.clear();
            }
        }
        path
    }

    fn player_pos(&self) -> Option<Vec2> {
        self.sim.world().get::<Physics>(self.player).map(|p| p.pos)
    }

    // -- accessors ----------------------------------------------------------

    pub fn sim(&self) -> &TickLoop {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut TickLoop {
        &mut self.sim
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn lantern(&self) -> EntityId {
        self.lantern
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn debug_path(&self) -> &[Location] {
        &self.debug_path
    }
}

/// Create `template` and move it to `pos`.
fn spawn_at(
    world: &mut World,
    factory: &dyn EntityFactory,
    template: &str,
    pos: Vec2,
) -> Result<EntityId, EngineError> {
    let id = world.create(factory, template)?;
    match world.get_mut::<Physics>(id) {
        Some(physics) => {
            physics.pos = pos;
            Ok(id)
        }
        None => Err(EngineError::Config {
            source_name: template.to_owned(),
            details: "template has no physics component".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldgen::{GeneratedMap, MARKER_FLOOR, MARKER_WALL};
    use gloam_ecs::prelude::*;

    /// 10x10 floor inside a wall ring, spawn at (3, 3), extra walls on demand.
    struct FixedMap {
        walls: Vec<(i32, i32)>,
    }

    impl WorldGenerator for FixedMap {
        fn generate(&mut self) -> GeneratedMap {
            let mut markers = vec![MARKER_FLOOR; 100];
            for y in 0..10 {
                for x in 0..10 {
                    if x == 0 || y == 0 || x == 9 || y == 9 || self.walls.contains(&(x, y)) {
                        markers[(y * 10 + x) as usize] = MARKER_WALL;
                    }
                }
            }
            GeneratedMap {
                width: 10,
                height: 10,
                markers,
                spawn: Cell::new(3, 3),
            }
        }
    }

    fn templates() -> TemplateLibrary {
        let mut lib = TemplateLibrary::new();
        lib.insert_json(
            PLAYER_TEMPLATE,
            r#"{"physics": {"bounds": {"offset": {"x": 4, "y": 16}, "size": {"x": 24, "y": 14}}},
                "sprite": {"texture": "player"}}"#,
        )
        .unwrap();
        lib.insert_json(LANTERN_TEMPLATE, r#"{"physics": {}, "light": {"radius": 4}}"#)
            .unwrap();
        lib
    }

    fn level(walls: Vec<(i32, i32)>, carve: bool) -> Level {
        let mut config = SimConfig::default();
        config.world.carve_around_player = carve;
        Level::new(&config, &mut FixedMap { walls }, &templates(), None).unwrap()
    }

    #[test]
    fn player_and_lantern_placed_from_spawn() {
        let level = level(vec![], true);
        let world = level.sim().world();
        assert_eq!(world.get::<Physics>(level.player()).unwrap().pos, Vec2::new(96.0, 96.0));
        assert_eq!(world.get::<Physics>(level.lantern()).unwrap().pos, Vec2::new(266.0, 266.0));
        assert_eq!(world.template_of(level.lantern()), Some(LANTERN_TEMPLATE));
    }

    #[test]
    fn markers_become_tiles() {
        let level = level(vec![], true);
        let tiles = level.sim().tiles();
        assert!(!tiles.is_passable(0, 0, 0));
        assert!(tiles.is_passable(0, 5, 5));
        assert_eq!(tiles.get_tile(0, 9, 4).map(|n| n.id), Some(TileId::DUNGEON_BRICK_WALL));
    }

    #[test]
    fn missing_template_fails() {
        let config = SimConfig::default();
        let err = Level::new(&config, &mut FixedMap { walls: vec![] }, &TemplateLibrary::new(), None)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Ecs(EcsError::ResourceNotFound { .. })));
    }

    #[test]
    fn template_without_physics_fails() {
        let mut lib = templates();
        lib.insert_json(LANTERN_TEMPLATE, r#"{"light": {}}"#).unwrap();
        let err = Level::new(&SimConfig::default(), &mut FixedMap { walls: vec![] }, &lib, None)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Config { .. }));
    }

    #[test]
    fn lantern_lights_its_cell_after_first_update() {
        let mut level = level(vec![], false);
        level.update();
        assert_eq!(level.sim().tiles().light_at(0, 8, 8), Some(1.0));
        assert_eq!(level.sim().tiles().light_count(), 1);
    }

    #[test]
    fn camera_leans_toward_mouse() {
        let mut level = level(vec![], false);
        level.window_resize(800.0, 600.0);
        level.set_mouse(Vec2::new(500.0, 300.0));
        level.update();
        assert_eq!(level.view().center, Vec2::new(106.0, 96.0));
        assert_eq!(level.view().size, Vec2::new(800.0, 600.0));
    }

    #[test]
    fn carving_opens_walls_next_to_player() {
        let mut carved = level(vec![(4, 3)], true);
        carved.update();
        assert!(carved.sim().tiles().is_passable(0, 4, 3));

        let mut kept = level(vec![(4, 3)], false);
        kept.update();
        assert!(!kept.sim().tiles().is_passable(0, 4, 3));
    }

    #[test]
    fn path_is_kept_for_debug_display() {
        let mut level = level(vec![], false);
        let path = level.find_path_to(Cell::new(6, 3), Connectivity::Four).unwrap();
        assert_eq!(path.cells.len(), 4);
        assert_eq!(level.debug_path(), path.cells.as_slice());

        assert!(level.find_path_to(Cell::new(0, 0), Connectivity::Four).is_none());
        assert!(level.debug_path().is_empty());
    }
}
