//! The seam between the Script system and whatever runs entity scripts.

use gloam_script::{ScriptEffect, ScriptError, ScriptInput, ScriptRuntime};

/// Runs the `update` entry point of a named script for one entity.
///
/// Implementations must not touch the world; everything a script wants to
/// change comes back as [`ScriptEffect`]s.
pub trait ScriptHost {
    fn call_update(
        &mut self,
        module: &str,
        input: ScriptInput,
    ) -> Result<Vec<ScriptEffect>, ScriptError>;
}

impl ScriptHost for ScriptRuntime {
    fn call_update(
        &mut self,
        module: &str,
        input: ScriptInput,
    ) -> Result<Vec<ScriptEffect>, ScriptError> {
        ScriptRuntime::call_update(self, module, input).map(|call| call.effects)
    }
}
