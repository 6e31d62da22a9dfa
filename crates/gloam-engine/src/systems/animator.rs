use gloam_ecs::component::Sprite;
use gloam_ecs::entity::EntityId;

use crate::tick::SimContext;

/// Advance the sprite's frame clock when it is animated.
pub fn run(ctx: &mut SimContext, dt: f32, entity: EntityId) {
    if let Some(sprite) = ctx.world.get_mut::<Sprite>(entity) {
        if sprite.animated {
            sprite.animator.update(dt);
        }
    }
}
