//! World generation: a marker grid plus a spawn cell.
//!
//! Markers are `1` for floor, `0` for wall; anything else becomes void when
//! the level turns them into tiles ([`marker_to_tile`]).

use gloam_ecs::component::Cell;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::tile::TileId;

pub const MARKER_WALL: u8 = 0;
pub const MARKER_FLOOR: u8 = 1;
pub const MARKER_VOID: u8 = 2;

/// Generator output. `markers` is row-major, `width * height` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMap {
    pub width: u32,
    pub height: u32,
    pub markers: Vec<u8>,
    pub spawn: Cell,
}

impl GeneratedMap {
    pub fn marker(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        self.markers
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

pub trait WorldGenerator {
    fn generate(&mut self) -> GeneratedMap;
}

pub fn marker_to_tile(marker: u8) -> TileId {
    match marker {
        MARKER_FLOOR => TileId::DUNGEON_BRICK_FLOOR,
        MARKER_WALL => TileId::DUNGEON_BRICK_WALL,
        _ => TileId::VOID,
    }
}

/// Parameters for the level and its generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    /// Number of random-walk steps; each step carves one cell.
    pub walk_steps: u32,
    /// Carve a 3x3 floor patch around the player every tick.
    pub carve_around_player: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 2355,
            width: 96,
            height: 96,
            walk_steps: 4000,
            carve_around_player: true,
        }
    }
}

/// Drunkard's walk from the centre over a walled map with a one-cell void
/// rim. Same seed, same map.
#[derive(Debug, Clone)]
pub struct RandomWalkGenerator {
    width: u32,
    height: u32,
    steps: u32,
    rng: Pcg32,
}

impl RandomWalkGenerator {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            width: config.width.max(3),
            height: config.height.max(3),
            steps: config.walk_steps,
            rng: Pcg32::seed_from_u64(config.seed),
        }
    }
}

impl WorldGenerator for RandomWalkGenerator {
    fn generate(&mut self) -> GeneratedMap {
        let (w, h) = (self.width as i32, self.height as i32);
        let mut markers = vec![MARKER_WALL; (self.width * self.height) as usize];
        for y in 0..h {
            for x in 0..w {
                if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                    markers[(y * w + x) as usize] = MARKER_VOID;
                }
            }
        }

        let spawn = Cell::new(w / 2, h / 2);
        let (mut x, mut y) = (spawn.x, spawn.y);
        markers[(y * w + x) as usize] = MARKER_FLOOR;
        let mut carved = 1u32;
        for _ in 0..self.steps {
            match self.rng.gen_range(0..4) {
                0 => x += 1,
                1 => x -= 1,
                2 => y -= 1,
                _ => y += 1,
            }
            // Stay off the void rim and the wall ring inside it.
            x = x.clamp(2, (w - 3).max(2));
            y = y.clamp(2, (h - 3).max(2));
            let slot = &mut markers[(y * w + x) as usize];
            if *slot != MARKER_FLOOR {
                *slot = MARKER_FLOOR;
                carved += 1;
            }
        }

        tracing::debug!(
            width = self.width,
            height = self.height,
            carved,
            spawn_x = spawn.x,
            spawn_y = spawn.y,
            "world generated"
        );
        GeneratedMap {
            width: self.width,
            height: self.height,
            markers,
            spawn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> WorldConfig {
        WorldConfig {
            width: 24,
            height: 16,
            walk_steps: 300,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn same_seed_same_map() {
        let a = RandomWalkGenerator::new(&small()).generate();
        let b = RandomWalkGenerator::new(&small()).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_map() {
        let a = RandomWalkGenerator::new(&small()).generate();
        let b = RandomWalkGenerator::new(&WorldConfig { seed: 7, ..small() }).generate();
        assert_ne!(a.markers, b.markers);
    }

    #[test]
    fn spawn_is_floor_and_rim_is_void() {
        let map = RandomWalkGenerator::new(&small()).generate();
        assert_eq!(map.markers.len(), 24 * 16);
        assert_eq!(map.marker(map.spawn.x, map.spawn.y), Some(MARKER_FLOOR));
        assert!((0..24).all(|x| map.marker(x, 0) == Some(MARKER_VOID)));
        assert!((0..16).all(|y| map.marker(23, y) == Some(MARKER_VOID)));
        assert_eq!(map.marker(24, 0), None);
    }

    #[test]
    fn walls_surround_floor() {
        let map = RandomWalkGenerator::new(&small()).generate();
        for x in 0..24 {
            assert_ne!(map.marker(x, 1), Some(MARKER_FLOOR));
            assert_ne!(map.marker(x, 14), Some(MARKER_FLOOR));
        }
    }

    #[test]
    fn markers_map_to_catalog_ids() {
        assert_eq!(marker_to_tile(MARKER_FLOOR), TileId::DUNGEON_BRICK_FLOOR);
        assert_eq!(marker_to_tile(MARKER_WALL), TileId::DUNGEON_BRICK_WALL);
        assert_eq!(marker_to_tile(9), TileId::VOID);
    }
}
