//! Aggregated simulation configuration.
//!
//! Every section has a `Default` and missing keys fall back to it, so an
//! empty JSON object is a valid configuration:
//!
//! ```
//! use gloam_engine::config::SimConfig;
//!
//! let config = SimConfig::from_json(r#"{ "world": { "seed": 7 } }"#).unwrap();
//! assert_eq!(config.world.seed, 7);
//! assert_eq!(config.world.width, 96);
//! ```

use std::path::Path;

use gloam_script::ScriptConfig;
use serde::{Deserialize, Serialize};

use crate::lighting::LightConfig;
use crate::tick::TickConfig;
use crate::worldgen::WorldConfig;
use crate::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick: TickConfig,
    pub lighting: LightConfig,
    pub script: ScriptConfig,
    pub world: WorldConfig,
}

impl SimConfig {
    /// # Errors
    ///
    /// [`EngineError::Config`] on malformed JSON, unknown enum values or a
    /// non-positive tick length.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: SimConfig = serde_json::from_str(json).map_err(|e| EngineError::Config {
            source_name: "sim config".to_owned(),
            details: e.to_string(),
        })?;
        config.validate("sim config")?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        let config: SimConfig = serde_json::from_str(&text).map_err(|e| EngineError::Config {
            source_name: path.display().to_string(),
            details: e.to_string(),
        })?;
        config.validate(&path.display().to_string())?;
        tracing::debug!(path = %path.display(), "sim config loaded");
        Ok(config)
    }

    fn validate(&self, source_name: &str) -> Result<(), EngineError> {
        let dt = self.tick.fixed_dt;
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(EngineError::Config {
                source_name: source_name.to_owned(),
                details: format!("tick.fixed_dt must be positive and finite, got {dt}"),
            });
        }
        Ok(())
    }
}
