//! Named script modules sharing one Wasmtime engine.

use std::collections::BTreeMap;
use std::path::Path;

use wasmtime::Engine;

use crate::host_api::ScriptInput;
use crate::module::{ScriptCall, ScriptConfig, ScriptModule};
use crate::ScriptError;

/// Every loaded script module, addressed by the name a `Script` component
/// carries.
pub struct ScriptRuntime {
    engine: Engine,
    config: ScriptConfig,
    modules: BTreeMap<String, ScriptModule>,
}

impl ScriptRuntime {
    /// Create an empty runtime with fuel metering enabled.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Runtime`] if Wasmtime rejects the engine configuration.
    pub fn new(config: ScriptConfig) -> Result<Self, ScriptError> {
        let mut engine_config = wasmtime::Config::new();
        engine_config.consume_fuel(true);
        let engine = Engine::new(&engine_config)
            .map_err(|e| ScriptError::Runtime(format!("failed to create Wasmtime engine: {e}")))?;
        Ok(Self {
            engine,
            config,
            modules: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Compile `bytes` and register the module as `name`, replacing any
    /// module already loaded under that name.
    ///
    /// # Errors
    ///
    /// See [`ScriptModule::from_bytes`]. A failed load leaves any previous
    /// module of the same name in place.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<(), ScriptError> {
        let module = ScriptModule::from_bytes(&self.engine, &self.config, name, bytes)?;
        if self.modules.insert(name.to_owned(), module).is_some() {
            tracing::debug!(module = name, "script module replaced");
        }
        Ok(())
    }

    /// Load every `*.wat` and `*.wasm` file in `dir`, named by file stem.
    /// Returns how many modules were loaded.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Runtime`] if the directory or a file cannot be read,
    /// otherwise the first load failure.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, ScriptError> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| ScriptError::Runtime(format!("failed to read {}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext == "wat" || ext == "wasm")
            })
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(name) = path.file_stem().and_then(|n| n.to_str()) else {
                continue;
            };
            let bytes = std::fs::read(&path).map_err(|e| {
                ScriptError::Runtime(format!("failed to read {}: {e}", path.display()))
            })?;
            self.load(name, &bytes)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn module(&self, name: &str) -> Option<&ScriptModule> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Call `update` on the named module.
    ///
    /// # Errors
    ///
    /// [`ScriptError::UnknownModule`] if nothing is loaded under `name`,
    /// otherwise see [`ScriptModule::call_update`].
    pub fn call_update(
        &mut self,
        name: &str,
        input: ScriptInput,
    ) -> Result<ScriptCall, ScriptError> {
        let module = self
            .modules
            .get_mut(name)
            .ok_or_else(|| ScriptError::UnknownModule {
                name: name.to_owned(),
            })?;
        module.call_update(input)
    }
}

impl std::fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("config", &self.config)
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
