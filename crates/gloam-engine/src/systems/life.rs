//! Life pass: count down lifetimes and queue expired entities for removal.
//!
//! Runs after every pipeline system has seen every entity, so nothing later
//! in the tick observes a half-removed entity.

use gloam_ecs::component::Life;
use gloam_ecs::entity::EntityId;

use crate::tick::SimContext;

pub const DESPAWN_REASON: &str = "lifetime_expired";

pub fn run(ctx: &mut SimContext, dt: f32, entity: EntityId) {
    let Some(life) = ctx.world.get_mut::<Life>(entity) else {
        return;
    };
    if !life.done {
        life.remaining -= dt;
        if life.remaining <= 0.0 {
            life.done = true;
        }
    }
    if life.done && !ctx.commands.despawn_pending(entity) {
        ctx.commands.despawn(entity, DESPAWN_REASON);
    }
}
