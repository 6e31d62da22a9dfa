//! Gloam Engine -- tile world, lighting, pathfinding and the tick loop.
//!
//! This crate builds on [`gloam_ecs`] and [`gloam_script`] to provide the
//! simulation core: a layered [`TileGrid`](tile::TileGrid) with derived
//! light, a fixed-timestep [`TickLoop`](tick::TickLoop) that runs the
//! per-entity system pipeline, an A* [pathfinder](pathfinding) over the
//! grid's passability and a [`Level`](level::Level) that ties generation,
//! the player and the camera together.
//!
//! # Quick Start
//!
//! ```
//! use gloam_engine::prelude::*;
//!
//! let mut tiles = TileGrid::new(16, 16, 1, TileCatalog::dungeon());
//! let floor: Vec<TileWrite> = (0..16)
//!     .flat_map(|y| (0..16).map(move |x| TileWrite::new(x, y, TileId::DUNGEON_BRICK_FLOOR)))
//!     .collect();
//! tiles.add_tiles(0, &floor);
//!
//! let mut sim = TickLoop::new(World::new(), tiles, TickConfig::default()).with_default_systems();
//! let torch = sim.world_mut().spawn(
//!     ComponentSet::new()
//!         .with(Physics::at(100.0, 100.0))
//!         .with(Light::with_radius(5)),
//! );
//!
//! sim.run_ticks(60);
//! assert_eq!(sim.tick_count(), 60);
//! assert_eq!(sim.tiles().light_at(0, 3, 3), Some(1.0));
//! assert!(sim.tiles().light_of(torch).is_some());
//! ```

#![deny(unsafe_code)]

pub mod collision;
pub mod config;
pub mod level;
pub mod lighting;
pub mod pathfinding;
pub mod render;
pub mod script;
pub mod snapshot;
pub mod systems;
pub mod tick;
pub mod tile;
pub mod worldgen;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use gloam_ecs;

/// Re-export the script host crate for convenience.
pub use gloam_script;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced outside the tick: setup, configuration and capture.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ecs(#[from] gloam_ecs::EcsError),

    #[error(transparent)]
    Script(#[from] gloam_script::ScriptError),

    /// A configuration source (config file, tile catalog, template) is
    /// malformed or inconsistent.
    #[error("invalid configuration in {source_name}: {details}")]
    Config { source_name: String, details: String },

    #[error("failed to read '{path}': {details}")]
    Io { path: String, details: String },

    /// State could not be serialized for hashing.
    #[error("snapshot failed: {0}")]
    Snapshot(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use gloam_ecs::prelude::*;

    pub use crate::collision::{cell_of, GridCollision, TileCollision, TILE_SIZE};
    pub use crate::config::SimConfig;
    pub use crate::level::{Level, View};
    pub use crate::lighting::{Blend, Falloff, LightConfig};
    pub use crate::pathfinding::{find_path, Connectivity, Passability, Path};
    pub use crate::render::{draw_order, sprites, SpriteView};
    pub use crate::script::ScriptHost;
    pub use crate::snapshot::EngineSnapshot;
    pub use crate::tick::{SimContext, SystemFn, TickConfig, TickDiagnostics, TickLoop};
    pub use crate::tile::{TileCatalog, TileFlags, TileGrid, TileId, TileWrite};
    pub use crate::worldgen::{RandomWalkGenerator, WorldConfig, WorldGenerator};
    pub use crate::EngineError;

    pub use gloam_script::{ScriptConfig, ScriptEffect, ScriptError, ScriptInput, ScriptRuntime};
}
