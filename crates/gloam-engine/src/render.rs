//! Read-only views for a renderer.
//!
//! Nothing here draws; the caller owns the window and textures.

use gloam_ecs::component::{Physics, Sprite, Vec2};
use gloam_ecs::entity::EntityId;
use gloam_ecs::world::World;

use crate::collision::TILE_SIZE;
use crate::pathfinding::Location;

/// What a renderer needs to draw one sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteView {
    pub entity: EntityId,
    pub texture: String,
    pub pos: Vec2,
    pub frame: u32,
    pub flip_x: bool,
    pub depth: f32,
}

/// Entities with both physics and a sprite, ascending by
/// `pos.y + sort_offset`. Equal depths keep registry order.
pub fn draw_order(world: &World) -> Vec<EntityId> {
    let mut keyed: Vec<(EntityId, f32)> = world
        .entities()
        .iter()
        .filter(|&&id| world.has::<Sprite>(id))
        .filter_map(|&id| world.get::<Physics>(id).map(|p| (id, p.depth())))
        .collect();
    keyed.sort_by(|a, b| a.1.total_cmp(&b.1));
    keyed.into_iter().map(|(id, _)| id).collect()
}

/// Sprite snapshot in draw order.
pub fn sprites(world: &World) -> Vec<SpriteView> {
    draw_order(world)
        .into_iter()
        .filter_map(|id| {
            let physics = world.get::<Physics>(id)?;
            let sprite = world.get::<Sprite>(id)?;
            Some(SpriteView {
                entity: id,
                texture: sprite.texture.clone(),
                pos: physics.pos,
                frame: sprite.animator.frame,
                flip_x: sprite.flip_x,
                depth: physics.depth(),
            })
        })
        .collect()
}

/// Top-left corners of the 2x2 debug markers centred on each path cell.
pub fn path_markers(path: &[Location]) -> Vec<Vec2> {
    path.iter()
        .map(|cell| {
            Vec2::new(
                cell.x as f32 * TILE_SIZE + TILE_SIZE / 2.0 - 1.0,
                cell.y as f32 * TILE_SIZE + TILE_SIZE / 2.0 - 1.0,
            )
        })
        .collect()
}
