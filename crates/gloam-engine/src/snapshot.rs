//! Simulation state capture with BLAKE3 hashing.
//!
//! An [`EngineSnapshot`] is a serializable copy of everything that decides
//! the next tick: every entity with its components, every tile node of every
//! layer, the registered lights, the tick counter and the fixed step. Two
//! runs that agree on the hash agree on the state.
//!
//! ```
//! use gloam_engine::prelude::*;
//!
//! let tiles = TileGrid::new(4, 4, 1, TileCatalog::dungeon());
//! let mut sim = TickLoop::new(World::new(), tiles, TickConfig::default());
//! sim.run_ticks(3);
//!
//! let snapshot = sim.capture_snapshot().unwrap();
//! assert_eq!(snapshot.tick_counter, 3);
//! assert_eq!(snapshot.hash.len(), 64);
//! ```
//!
//! Not captured: registered systems, the collision predicate, the script
//! host and diagnostics.

use gloam_ecs::component::{Cell, ComponentSet};
use gloam_ecs::entity::EntityId;
use serde::{Deserialize, Serialize};

use crate::tick::TickLoop;
use crate::tile::{TileFlags, TileGrid, TileId};
use crate::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub template: Option<String>,
    pub components: ComponentSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: TileId,
    pub flags: TileFlags,
    pub light: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSnapshot {
    pub owner: EntityId,
    pub layer: usize,
    pub cell: Cell,
    pub radius: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: u32,
    pub height: u32,
    /// Row-major nodes, one vector per layer.
    pub layers: Vec<Vec<NodeSnapshot>>,
    pub lights: Vec<LightSnapshot>,
}

impl GridSnapshot {
    pub fn capture(tiles: &TileGrid) -> Self {
        let (w, h) = (tiles.width() as i32, tiles.height() as i32);
        let layers = (0..tiles.layer_count())
            .map(|layer| {
                (0..h)
                    .flat_map(|y| (0..w).map(move |x| (x, y)))
                    .filter_map(|(x, y)| tiles.get_tile(layer, x, y))
                    .map(|node| NodeSnapshot {
                        id: node.id,
                        flags: node.flags,
                        light: node.light,
                    })
                    .collect()
            })
            .collect();
        let lights = tiles
            .lights()
            .map(|(owner, light)| LightSnapshot {
                owner,
                layer: light.layer,
                cell: light.cell,
                radius: light.radius,
            })
            .collect();
        Self {
            width: tiles.width(),
            height: tiles.height(),
            layers,
            lights,
        }
    }
}

/// Full simulation state plus its content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub entities: Vec<EntitySnapshot>,
    pub grid: GridSnapshot,
    pub tick_counter: u64,
    pub fixed_dt: f64,
    /// BLAKE3 hex digest of everything above.
    pub hash: String,
}

impl EngineSnapshot {
    /// Recompute the hash from the captured fields.
    ///
    /// # Errors
    ///
    /// [`EngineError::Snapshot`] if the state cannot be serialized.
    pub fn compute_hash(&self) -> Result<String, EngineError> {
        compute_hash(&self.entities, &self.grid, self.tick_counter, self.fixed_dt)
    }

    /// Whether `hash` still matches the captured fields.
    pub fn verify(&self) -> bool {
        self.compute_hash().is_ok_and(|h| h == self.hash)
    }
}

fn compute_hash(
    entities: &[EntitySnapshot],
    grid: &GridSnapshot,
    tick_counter: u64,
    fixed_dt: f64,
) -> Result<String, EngineError> {
    #[derive(Serialize)]
    struct HashableState<'a> {
        entities: &'a [EntitySnapshot],
        grid: &'a GridSnapshot,
        tick_counter: u64,
        fixed_dt: f64,
    }

    let json_bytes = serde_json::to_vec(&HashableState {
        entities,
        grid,
        tick_counter,
        fixed_dt,
    })
    .map_err(|e| EngineError::Snapshot(e.to_string()))?;

    Ok(blake3::hash(&json_bytes).to_hex().to_string())
}

// ---------------------------------------------------------------------------
// TickLoop snapshot methods
// ---------------------------------------------------------------------------

impl TickLoop {
    /// Capture the current simulation state.
    ///
    /// # Errors
    ///
    /// [`EngineError::Snapshot`] if the state cannot be serialized.
    pub fn capture_snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        let world = self.world();
        let entities: Vec<EntitySnapshot> = world
            .entities()
            .iter()
            .filter_map(|&id| {
                Some(EntitySnapshot {
                    id,
                    template: world.template_of(id).map(str::to_owned),
                    components: world.components(id)?.clone(),
                })
            })
            .collect();
        let grid = GridSnapshot::capture(self.tiles());
        let hash = compute_hash(&entities, &grid, self.tick_count(), self.fixed_dt())?;
        tracing::debug!(tick = self.tick_count(), hash = %hash, "snapshot captured");
        Ok(EngineSnapshot {
            entities,
            grid,
            tick_counter: self.tick_count(),
            fixed_dt: self.fixed_dt(),
            hash,
        })
    }

    /// BLAKE3 hex digest of the current state.
    ///
    /// # Errors
    ///
    /// [`EngineError::Snapshot`] if the state cannot be serialized.
    pub fn state_hash(&self) -> Result<String, EngineError> {
        self.capture_snapshot().map(|s| s.hash)
    }
}
