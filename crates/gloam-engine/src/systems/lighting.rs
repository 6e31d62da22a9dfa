//! Lighting system: keep the grid's copy of each entity light in step with
//! the entity's position.

use gloam_ecs::component::{Light, Physics};
use gloam_ecs::entity::EntityId;

use crate::collision::cell_of;
use crate::systems::LIGHT_LAYER;
use crate::tick::SimContext;

/// Registers the light on first sight (exactly once, guarded by
/// `Light::registered`) and moves it whenever the entity changes cell. Both
/// invalidate the light layer; the tick relights it after the command apply.
pub fn run(ctx: &mut SimContext, _dt: f32, entity: EntityId) {
    let Some(pos) = ctx.world.get::<Physics>(entity).map(|p| p.pos) else {
        return;
    };
    let Some(light) = ctx.world.get_mut::<Light>(entity) else {
        return;
    };

    let cell = cell_of(pos);
    if !light.registered {
        ctx.tiles
            .register_static_light(LIGHT_LAYER, entity, cell, light.radius);
        light.registered = true;
        light.cell = cell;
    } else if light.cell != cell {
        light.cell = cell;
        if !ctx.tiles.move_static_light(entity, cell) {
            // Registered flag survived a grid swap; register again.
            ctx.tiles
                .register_static_light(LIGHT_LAYER, entity, cell, light.radius);
        }
        ctx.tiles.request_rebuild(LIGHT_LAYER);
    }
}
