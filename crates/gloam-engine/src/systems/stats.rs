//! Stats system: rebuild the current stat block and run active modifiers.

use gloam_ecs::component::Stats;
use gloam_ecs::entity::EntityId;

use crate::tick::SimContext;

/// Each tick `current` is reset from `base` (the health pool carries over),
/// then every modifier counts down and applies in order. Modifiers that
/// reported `Expired` still apply this tick and are pruned afterwards; a
/// held health grant is taken back on that tick instead.
pub fn run(ctx: &mut SimContext, dt: f32, entity: EntityId) {
    let Some(stats) = ctx.world.get_mut::<Stats>(entity) else {
        return;
    };
    let Stats {
        base,
        current,
        active_buffs,
    } = stats;

    current.reset_from(base);
    for modifier in active_buffs.iter_mut() {
        modifier.manage_duration(dt);
        modifier.apply(current, dt);
    }
    current.clamp_health();

    let before = active_buffs.len();
    active_buffs.retain(|m| !m.is_expired());
    let pruned = before - active_buffs.len();
    if pruned > 0 {
        tracing::trace!(%entity, pruned, "expired modifiers pruned");
    }
}
