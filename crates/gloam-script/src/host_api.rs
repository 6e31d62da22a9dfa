//! Host API for entity scripts.
//!
//! Defines the [`HostState`] that lives inside each module's Wasmtime store
//! and [`register_host_api`], which registers every host function under the
//! `"gloam"` import namespace.
//!
//! # Design
//!
//! - **Reads are immediate:** a module reads the calling entity's position,
//!   velocity and the tick clock from the [`ScriptInput`] snapshot.
//! - **Writes are deferred:** velocity writes, despawn requests and log lines
//!   are collected as [`ScriptEffect`]s and returned to the engine once
//!   `update` returns.
//!
//! # Host Functions (registered under `"gloam"`)
//!
//! ## Read
//! - `position_x(entity: i64) -> f32`, `position_y(entity: i64) -> f32`
//! - `velocity_x(entity: i64) -> f32`, `velocity_y(entity: i64) -> f32`
//! - `dt() -> f32`
//! - `sim_time() -> f64`
//! - `tick_number() -> i64`
//!
//! ## Write
//! - `set_velocity(entity: i64, vx: f32, vy: f32)`
//! - `despawn(entity: i64, reason_ptr: i32, reason_len: i32)`
//!
//! ## Utility
//! - `log(level: i32, msg_ptr: i32, msg_len: i32)`
//!
//! Every function that takes an entity only accepts the one being updated.
//! Reads for any other entity return `0.0` and writes for it are dropped,
//! each with a warning.

use gloam_ecs::component::Vec2;
use gloam_ecs::entity::EntityId;
use wasmtime::{Caller, Linker, StoreLimits};

// ---------------------------------------------------------------------------
// Input / effects
// ---------------------------------------------------------------------------

/// Read-only snapshot handed to a script for one `update` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptInput {
    pub entity: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub dt: f32,
    pub sim_time: f64,
    pub tick: u64,
}

impl ScriptInput {
    /// Snapshot for `entity` with zeroed physics and clock.
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            dt: 0.0,
            sim_time: 0.0,
            tick: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Map the wire level (`0` = trace .. `4` = error). Anything else is
    /// treated as info.
    pub fn from_wire(level: i32) -> Self {
        match level {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// A change a script asked for. Applied by the engine after the call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEffect {
    SetVelocity { entity: EntityId, velocity: Vec2 },
    Despawn { entity: EntityId, reason: String },
    Log { level: LogLevel, message: String },
}

// ---------------------------------------------------------------------------
// HostState
// ---------------------------------------------------------------------------

/// State held inside the Wasmtime store for host function dispatch.
pub struct HostState {
    /// Snapshot for the call in progress.
    pub input: ScriptInput,

    /// Effects requested during the call in progress.
    pub effects: Vec<ScriptEffect>,

    /// Host function calls made during the call in progress.
    pub host_call_count: u32,

    pub(crate) limits: StoreLimits,
}

impl HostState {
    pub(crate) fn new(limits: StoreLimits) -> Self {
        Self {
            input: ScriptInput::new(EntityId::new(0, 0)),
            effects: Vec::new(),
            host_call_count: 0,
            limits,
        }
    }

    /// Prepare for one `update` call.
    pub fn begin_call(&mut self, input: ScriptInput) {
        self.input = input;
        self.effects.clear();
        self.host_call_count = 0;
    }

    pub fn drain_effects(&mut self) -> Vec<ScriptEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Snapshot values are only available for the entity being updated.
    fn snapshot_for(&self, raw: i64, what: &str) -> Option<ScriptInput> {
        if raw as u64 == self.input.entity.to_raw() {
            Some(self.input)
        } else {
            tracing::warn!(
                requested = raw,
                caller = %self.input.entity,
                "{what}: scripts may only touch their own entity"
            );
            None
        }
    }
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("input", &self.input)
            .field("host_call_count", &self.host_call_count)
            .field("pending_effects", &self.effects.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Host function registration
// ---------------------------------------------------------------------------

/// Register all host functions under the `"gloam"` import namespace.
///
/// # Errors
///
/// Returns an error if a function fails to register, which only happens on
/// a duplicate definition.
pub fn register_host_api(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    // -- READ functions -------------------------------------------------------

    linker.func_wrap("gloam", "position_x", host_position_x)?;
    linker.func_wrap("gloam", "position_y", host_position_y)?;
    linker.func_wrap("gloam", "velocity_x", host_velocity_x)?;
    linker.func_wrap("gloam", "velocity_y", host_velocity_y)?;
    linker.func_wrap("gloam", "dt", host_dt)?;
    linker.func_wrap("gloam", "sim_time", host_sim_time)?;
    linker.func_wrap("gloam", "tick_number", host_tick_number)?;

    // -- WRITE functions ------------------------------------------------------

    linker.func_wrap("gloam", "set_velocity", host_set_velocity)?;
    linker.func_wrap("gloam", "despawn", host_despawn)?;

    // -- UTILITY functions ----------------------------------------------------

    linker.func_wrap("gloam", "log", host_log)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Helper: read a string from WASM linear memory
// ---------------------------------------------------------------------------

/// Read a UTF-8 string from the module's exported `memory` at (ptr, len).
fn read_wasm_string(
    caller: &mut Caller<'_, HostState>,
    ptr: i32,
    len: i32,
) -> Result<String, String> {
    let memory = caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or_else(|| {
            "module must export 'memory' to pass strings to the host -- \
             add `(memory (export \"memory\") 1)`"
                .to_owned()
        })?;

    if ptr < 0 || len < 0 {
        return Err(format!("negative string range: ptr={ptr}, len={len}"));
    }
    let data = memory.data(&caller);
    let start = ptr as usize;
    let end = start + len as usize;

    if end > data.len() {
        return Err(format!(
            "string read out of bounds: ptr={ptr}, len={len}, memory_size={}",
            data.len()
        ));
    }

    String::from_utf8(data[start..end].to_vec())
        .map_err(|e| format!("string at ptr={ptr} len={len} is not valid UTF-8: {e}"))
}

// ---------------------------------------------------------------------------
// READ host functions
// ---------------------------------------------------------------------------

fn host_position_x(mut caller: Caller<'_, HostState>, entity: i64) -> f32 {
    caller.data_mut().host_call_count += 1;
    caller
        .data()
        .snapshot_for(entity, "position_x")
        .map_or(0.0, |s| s.position.x)
}

fn host_position_y(mut caller: Caller<'_, HostState>, entity: i64) -> f32 {
    caller.data_mut().host_call_count += 1;
    caller
        .data()
        .snapshot_for(entity, "position_y")
        .map_or(0.0, |s| s.position.y)
}

fn host_velocity_x(mut caller: Caller<'_, HostState>, entity: i64) -> f32 {
    caller.data_mut().host_call_count += 1;
    caller
        .data()
        .snapshot_for(entity, "velocity_x")
        .map_or(0.0, |s| s.velocity.x)
}

fn host_velocity_y(mut caller: Caller<'_, HostState>, entity: i64) -> f32 {
    caller.data_mut().host_call_count += 1;
    caller
        .data()
        .snapshot_for(entity, "velocity_y")
        .map_or(0.0, |s| s.velocity.y)
}

/// `dt() -> f32`: length of the current tick in seconds.
fn host_dt(mut caller: Caller<'_, HostState>) -> f32 {
    caller.data_mut().host_call_count += 1;
    caller.data().input.dt
}

fn host_sim_time(mut caller: Caller<'_, HostState>) -> f64 {
    caller.data_mut().host_call_count += 1;
    caller.data().input.sim_time
}

fn host_tick_number(mut caller: Caller<'_, HostState>) -> i64 {
    caller.data_mut().host_call_count += 1;
    caller.data().input.tick as i64
}

// ---------------------------------------------------------------------------
// WRITE host functions
// ---------------------------------------------------------------------------

fn host_set_velocity(mut caller: Caller<'_, HostState>, entity: i64, vx: f32, vy: f32) {
    caller.data_mut().host_call_count += 1;
    if !vx.is_finite() || !vy.is_finite() {
        tracing::warn!(vx, vy, "set_velocity: ignoring non-finite velocity");
        return;
    }
    if caller.data().snapshot_for(entity, "set_velocity").is_none() {
        return;
    }
    caller.data_mut().effects.push(ScriptEffect::SetVelocity {
        entity: EntityId::from_raw(entity as u64),
        velocity: Vec2::new(vx, vy),
    });
}

/// `despawn(entity: i64, reason_ptr: i32, reason_len: i32)`
///
/// An unreadable reason does not drop the request; it is recorded as
/// `"script"`.
fn host_despawn(mut caller: Caller<'_, HostState>, entity: i64, reason_ptr: i32, reason_len: i32) {
    caller.data_mut().host_call_count += 1;
    if caller.data().snapshot_for(entity, "despawn").is_none() {
        return;
    }

    let reason = match read_wasm_string(&mut caller, reason_ptr, reason_len) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "despawn: failed to read reason from WASM memory");
            "script".to_owned()
        }
    };

    caller.data_mut().effects.push(ScriptEffect::Despawn {
        entity: EntityId::from_raw(entity as u64),
        reason,
    });
}

// ---------------------------------------------------------------------------
// UTILITY host functions
// ---------------------------------------------------------------------------

/// `log(level: i32, msg_ptr: i32, msg_len: i32)`
///
/// Level mapping: 0 = trace, 1 = debug, 2 = info, 3 = warn, 4 = error.
fn host_log(mut caller: Caller<'_, HostState>, level: i32, msg_ptr: i32, msg_len: i32) {
    caller.data_mut().host_call_count += 1;

    let message = match read_wasm_string(&mut caller, msg_ptr, msg_len) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "log: failed to read message from WASM memory");
            return;
        }
    };

    caller.data_mut().effects.push(ScriptEffect::Log {
        level: LogLevel::from_wire(level),
        message,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_levels_map_to_log_levels() {
        assert_eq!(LogLevel::from_wire(0), LogLevel::Trace);
        assert_eq!(LogLevel::from_wire(4), LogLevel::Error);
        assert_eq!(LogLevel::from_wire(2), LogLevel::Info);
        assert_eq!(LogLevel::from_wire(99), LogLevel::Info);
    }

    #[test]
    fn begin_call_clears_previous_effects() {
        let mut state = HostState::new(StoreLimits::default());
        state.effects.push(ScriptEffect::Log {
            level: LogLevel::Info,
            message: "stale".to_owned(),
        });
        state.host_call_count = 9;

        let input = ScriptInput::new(EntityId::new(2, 0));
        state.begin_call(input);

        assert!(state.effects.is_empty());
        assert_eq!(state.host_call_count, 0);
        assert_eq!(state.input, input);
    }

    #[test]
    fn snapshot_only_covers_the_caller() {
        let mut state = HostState::new(StoreLimits::default());
        let me = EntityId::new(1, 3);
        state.begin_call(ScriptInput::new(me));
        assert!(state.snapshot_for(me.to_raw() as i64, "test").is_some());
        assert!(state.snapshot_for(EntityId::new(1, 4).to_raw() as i64, "test").is_none());
    }
}
