//! Tile collision: per-axis blocking of an entity's box against the grid.

use gloam_ecs::component::{Bounds, Cell, Vec2};

use crate::tile::TileGrid;

/// Side length of one tile in world units.
pub const TILE_SIZE: f32 = 32.0;

/// Layer that movement and pathfinding consult.
pub const COLLISION_LAYER: usize = 0;

/// The grid cell containing a world position.
pub fn cell_of(pos: Vec2) -> Cell {
    Cell::new(
        (pos.x / TILE_SIZE).floor() as i32,
        (pos.y / TILE_SIZE).floor() as i32,
    )
}

/// World position of a cell's top-left corner.
pub fn cell_origin(cell: Cell) -> Vec2 {
    Vec2::new(cell.x as f32 * TILE_SIZE, cell.y as f32 * TILE_SIZE)
}

/// Decides whether a move would run into the tile grid.
pub trait TileCollision {
    /// Returns `(blocked_x, blocked_y)` for an entity at `pos` with collision
    /// box `bounds` trying to move by `velocity * dt`. Each axis is tested
    /// on its own.
    fn blocked(
        &self,
        tiles: &TileGrid,
        pos: Vec2,
        velocity: Vec2,
        bounds: Bounds,
        dt: f32,
    ) -> (bool, bool);
}

/// Axis-aligned box test against one layer's passability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCollision {
    pub layer: usize,
}

impl Default for GridCollision {
    fn default() -> Self {
        Self {
            layer: COLLISION_LAYER,
        }
    }
}

impl GridCollision {
    /// Whether every cell the box `[min, min + size)` overlaps is passable.
    fn box_clear(&self, tiles: &TileGrid, min: Vec2, size: Vec2) -> bool {
        let x0 = (min.x / TILE_SIZE).floor() as i32;
        let y0 = (min.y / TILE_SIZE).floor() as i32;
        let x1 = (((min.x + size.x.max(0.0)) / TILE_SIZE).ceil() as i32 - 1).max(x0);
        let y1 = (((min.y + size.y.max(0.0)) / TILE_SIZE).ceil() as i32 - 1).max(y0);
        (y0..=y1).all(|y| (x0..=x1).all(|x| tiles.is_passable(self.layer, x, y)))
    }
}

impl TileCollision for GridCollision {
    fn blocked(
        &self,
        tiles: &TileGrid,
        pos: Vec2,
        velocity: Vec2,
        bounds: Bounds,
        dt: f32,
    ) -> (bool, bool) {
        let origin = Vec2::new(pos.x + bounds.offset.x, pos.y + bounds.offset.y);
        let step = Vec2::new(velocity.x * dt, velocity.y * dt);

        let blocked_x = step.x != 0.0
            && !self.box_clear(tiles, Vec2::new(origin.x + step.x, origin.y), bounds.size);
        let blocked_y = step.y != 0.0
            && !self.box_clear(tiles, Vec2::new(origin.x, origin.y + step.y), bounds.size);
        (blocked_x, blocked_y)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
