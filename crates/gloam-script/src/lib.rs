//! Gloam Script -- fuel-metered WebAssembly host for entity scripts.
//!
//! Entities carrying a `Script` component are bound by name to a module
//! loaded into a [`ScriptRuntime`]. Once per tick the engine calls the
//! module's `update(entity: i64)` export. Scripts run inside a Wasmtime store
//! with no WASI, a per-call fuel budget and a linear-memory cap.
//!
//! # Architecture
//!
//! - **`ScriptConfig`**: fuel budget per call and memory limit.
//! - **`ScriptModule`**: one compiled and instantiated module with a
//!   validated `update` export.
//! - **`ScriptRuntime`**: named modules sharing one Wasmtime engine.
//! - **`HostState`**: per-call input snapshot plus the effects the script
//!   requested.
//!
//! # Host API
//!
//! Modules may import functions from the `"gloam"` namespace. Reads come from
//! a snapshot taken before the call; writes are returned as
//! [`ScriptEffect`]s and applied by the engine after the call returns, so a
//! script that traps halfway leaves the world untouched.
//!
//! # Example
//!
//! ```no_run
//! use gloam_ecs::entity::EntityId;
//! use gloam_script::{ScriptConfig, ScriptInput, ScriptRuntime};
//!
//! let mut runtime = ScriptRuntime::new(ScriptConfig::default()).unwrap();
//! let wat = r#"(module (func (export "update") (param i64) nop))"#;
//! runtime.load("idle", wat.as_bytes()).unwrap();
//!
//! let call = runtime
//!     .call_update("idle", ScriptInput::new(EntityId::new(0, 0)))
//!     .unwrap();
//! assert!(call.effects.is_empty());
//! ```

#![deny(unsafe_code)]

pub mod host_api;
mod module;
mod runtime;

pub use host_api::{HostState, LogLevel, ScriptEffect, ScriptInput};
pub use module::{ScriptCall, ScriptConfig, ScriptModule};
pub use runtime::ScriptRuntime;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading or running a script module.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The bytes are neither valid WASM nor valid WAT.
    #[error("script compilation failed: {0}")]
    CompileError(String),

    /// The module does not export a required function.
    #[error("missing required export '{name}' -- script modules must export `update(i64)`")]
    MissingExport { name: String },

    /// The call exhausted its fuel budget.
    #[error("script ran out of fuel (budget: {budget} units)")]
    OutOfFuel { budget: u64 },

    /// A WASM trap (unreachable, division by zero, out-of-bounds access).
    #[error("script trap: {0}")]
    Trap(String),

    /// No module is loaded under this name.
    #[error("no script module named '{name}'")]
    UnknownModule { name: String },

    /// Any other Wasmtime failure (instantiation, bad signature, fuel API).
    #[error("script runtime error: {0}")]
    Runtime(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
