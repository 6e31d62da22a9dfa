//! Script system: run an entity's bound script and apply what it asked for.

use gloam_ecs::component::{Physics, Script};
use gloam_ecs::entity::EntityId;
use gloam_script::{LogLevel, ScriptEffect, ScriptInput};

use crate::tick::SimContext;

/// Failures are logged and swallowed; a broken script never stops the tick.
pub fn run(ctx: &mut SimContext, dt: f32, entity: EntityId) {
    let Some(module) = ctx.world.get::<Script>(entity).map(|s| s.module.clone()) else {
        return;
    };
    let Some(host) = ctx.scripts.as_mut() else {
        tracing::trace!(%entity, module = %module, "no script host attached");
        return;
    };

    let mut input = ScriptInput::new(entity);
    if let Some(physics) = ctx.world.get::<Physics>(entity) {
        input.position = physics.pos;
        input.velocity = physics.velocity;
    }
    input.dt = dt;
    input.sim_time = ctx.clock.sim_time;
    input.tick = ctx.clock.tick;

    match host.call_update(&module, input) {
        Ok(effects) => {
            for effect in effects {
                apply_effect(ctx, entity, &module, effect);
            }
        }
        Err(err) => {
            tracing::error!(%entity, module = %module, error = %err, "script update failed");
        }
    }
}

fn apply_effect(ctx: &mut SimContext, caller: EntityId, module: &str, effect: ScriptEffect) {
    match effect {
        ScriptEffect::SetVelocity { entity, velocity } => {
            match ctx.world.get_mut::<Physics>(entity) {
                Some(physics) => physics.velocity = velocity,
                None => tracing::debug!(%entity, module, "set_velocity on entity without physics"),
            }
        }
        ScriptEffect::Despawn { entity, reason } => {
            if !ctx.commands.despawn_pending(entity) {
                ctx.commands.despawn(entity, reason);
            }
        }
        ScriptEffect::Log { level, message } => match level {
            LogLevel::Trace => tracing::trace!(entity = %caller, module, "{message}"),
            LogLevel::Debug => tracing::debug!(entity = %caller, module, "{message}"),
            LogLevel::Info => tracing::info!(entity = %caller, module, "{message}"),
            LogLevel::Warn => tracing::warn!(entity = %caller, module, "{message}"),
            LogLevel::Error => tracing::error!(entity = %caller, module, "{message}"),
        },
    }
}
