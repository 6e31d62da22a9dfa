//! Script module loading, validation, and execution.
//!
//! [`ScriptModule`] wraps a Wasmtime instance of one entity script. It
//! enforces fuel metering and the memory cap, and validates the `update`
//! export before the module can be called.

use serde::{Deserialize, Serialize};
use wasmtime::{Engine, Linker, Module, Store, StoreLimitsBuilder, TypedFunc};

use crate::host_api::{register_host_api, HostState, ScriptEffect, ScriptInput};
use crate::ScriptError;

/// Name of the export every script module must provide.
pub const UPDATE_EXPORT: &str = "update";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sandbox limits for script modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Fuel units granted per `update` call. Running out traps with
    /// [`ScriptError::OutOfFuel`]. Default: 1,000,000.
    pub fuel_per_call: u64,

    /// Maximum linear memory a module may grow to, in bytes.
    /// Default: 16 MiB.
    pub memory_limit_bytes: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            fuel_per_call: 1_000_000,
            memory_limit_bytes: 16 * 1024 * 1024, // 16 MiB
        }
    }
}

/// Result of one successful `update` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCall {
    pub effects: Vec<ScriptEffect>,
    pub fuel_consumed: u64,
}

// ---------------------------------------------------------------------------
// ScriptModule
// ---------------------------------------------------------------------------

/// A loaded and validated script module.
///
/// # Sandbox Guarantees
///
/// - No WASI (no filesystem, network, or wall-clock time)
/// - Only the `"gloam"` host functions are importable
/// - Fuel metering bounds every call
/// - Memory is capped at [`ScriptConfig::memory_limit_bytes`]
pub struct ScriptModule {
    name: String,
    store: Store<HostState>,
    update: TypedFunc<i64, ()>,
    config: ScriptConfig,
}

impl ScriptModule {
    /// Compile and instantiate a module from WASM or WAT bytes.
    ///
    /// `engine` must have fuel consumption enabled.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::CompileError`] if the bytes are not valid WASM/WAT.
    /// - [`ScriptError::MissingExport`] if `update` is not exported.
    /// - [`ScriptError::Runtime`] if instantiation fails (unknown imports,
    ///   memory over the cap) or `update` has the wrong signature.
    pub fn from_bytes(
        engine: &Engine,
        config: &ScriptConfig,
        name: &str,
        bytes: &[u8],
    ) -> Result<Self, ScriptError> {
        let module =
            Module::new(engine, bytes).map_err(|e| ScriptError::CompileError(format!("{e}")))?;

        // Check before instantiation so a missing export gets a clean error
        // instead of a generic lookup failure.
        if !module.exports().any(|export| export.name() == UPDATE_EXPORT) {
            return Err(ScriptError::MissingExport {
                name: UPDATE_EXPORT.to_owned(),
            });
        }

        let limits = StoreLimitsBuilder::new()
            .memory_size(config.memory_limit_bytes)
            .build();
        let mut store = Store::new(engine, HostState::new(limits));
        store.limiter(|state| &mut state.limits);
        store
            .set_fuel(config.fuel_per_call)
            .map_err(|e| ScriptError::Runtime(format!("failed to set fuel: {e}")))?;

        let mut linker = Linker::new(engine);
        register_host_api(&mut linker)
            .map_err(|e| ScriptError::Runtime(format!("failed to register host API: {e}")))?;

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| ScriptError::Runtime(format!("{e}")))?;

        let update = instance
            .get_typed_func::<i64, ()>(&mut store, UPDATE_EXPORT)
            .map_err(|e| {
                ScriptError::Runtime(format!("`update` must have signature (i64) -> (): {e}"))
            })?;

        tracing::debug!(
            module = name,
            fuel_per_call = config.fuel_per_call,
            memory_limit = config.memory_limit_bytes,
            "script module loaded"
        );

        Ok(Self {
            name: name.to_owned(),
            store,
            update,
            config: config.clone(),
        })
    }

    /// Run `update(entity)` against `input`.
    ///
    /// Fuel is reset to [`ScriptConfig::fuel_per_call`] first. On failure
    /// every effect recorded during the call is dropped.
    ///
    /// # Errors
    ///
    /// - [`ScriptError::OutOfFuel`] if the call exhausts its budget.
    /// - [`ScriptError::Trap`] on any other WASM trap.
    /// - [`ScriptError::Runtime`] if the fuel API fails.
    pub fn call_update(&mut self, input: ScriptInput) -> Result<ScriptCall, ScriptError> {
        self.reset_fuel()?;
        self.store.data_mut().begin_call(input);

        let arg = input.entity.to_raw() as i64;
        if let Err(e) = self.update.call(&mut self.store, arg) {
            self.store.data_mut().effects.clear();
            return Err(self.classify_trap(e));
        }

        let remaining = self
            .store
            .get_fuel()
            .map_err(|e| ScriptError::Runtime(format!("failed to read fuel: {e}")))?;
        let fuel_consumed = self.config.fuel_per_call.saturating_sub(remaining);
        let effects = self.store.data_mut().drain_effects();

        tracing::trace!(
            module = %self.name,
            entity = %input.entity,
            fuel_consumed,
            effects = effects.len(),
            "update() completed"
        );

        Ok(ScriptCall {
            effects,
            fuel_consumed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    pub fn host_state(&self) -> &HostState {
        self.store.data()
    }

    pub fn fuel_remaining(&self) -> u64 {
        self.store.get_fuel().unwrap_or(0)
    }

    // -- Internal helpers ---------------------------------------------------

    fn reset_fuel(&mut self) -> Result<(), ScriptError> {
        self.store
            .set_fuel(self.config.fuel_per_call)
            .map_err(|e| ScriptError::Runtime(format!("failed to set fuel: {e}")))
    }

    /// Map a Wasmtime call error onto a [`ScriptError`] variant.
    fn classify_trap(&self, error: anyhow::Error) -> ScriptError {
        for cause in error.chain() {
            if let Some(trap) = cause.downcast_ref::<wasmtime::Trap>() {
                if *trap == wasmtime::Trap::OutOfFuel {
                    return ScriptError::OutOfFuel {
                        budget: self.config.fuel_per_call,
                    };
                }
                return ScriptError::Trap(format!("{error}"));
            }
        }

        ScriptError::Runtime(format!("{error}"))
    }
}

impl std::fmt::Debug for ScriptModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptModule")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("fuel_remaining", &self.fuel_remaining())
            .finish_non_exhaustive()
    }
}
