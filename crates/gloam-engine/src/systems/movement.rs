//! Move system: integrate velocity on the axes the tile grid leaves open.

use gloam_ecs::component::{Physics, Vec2};
use gloam_ecs::entity::EntityId;

use crate::tick::SimContext;

/// Velocity is an impulse for this tick only; it is zeroed whether or not
/// the entity moved.
pub fn run(ctx: &mut SimContext, dt: f32, entity: EntityId) {
    let Some(physics) = ctx.world.get::<Physics>(entity).copied() else {
        return;
    };

    let (blocked_x, blocked_y) = ctx.collision.blocked(
        &ctx.tiles,
        physics.pos,
        physics.velocity,
        physics.bounds,
        dt,
    );

    let Some(physics) = ctx.world.get_mut::<Physics>(entity) else {
        return;
    };
    if !blocked_x {
        physics.pos.x += physics.velocity.x * dt;
    }
    if !blocked_y {
        physics.pos.y += physics.velocity.y * dt;
    }
    physics.velocity = Vec2::ZERO;
}
