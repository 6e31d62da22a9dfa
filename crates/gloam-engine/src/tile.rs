//! Layered tile grid, tile catalog, and the static light registry.
//!
//! The grid is a fixed `width x height` array per layer. Every cell holds a
//! [`TileNode`]; cells outside the grid are *absent* and treated as open
//! (passable) boundary. Writes go through [`TileGrid::add_tiles`] in batches,
//! and any change that can affect illumination invalidates the layer until
//! the next [`TileGrid::light`] pass.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use gloam_ecs::component::Cell;
use gloam_ecs::entity::EntityId;
use serde::{Deserialize, Serialize};

use crate::lighting::{self, LightConfig, LightSource};
use crate::EngineError;

// ---------------------------------------------------------------------------
// TileId / TileFlags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u16);

impl TileId {
    pub const VOID: TileId = TileId(0);
    pub const DUNGEON_BRICK_FLOOR: TileId = TileId(1);
    pub const DUNGEON_BRICK_WALL: TileId = TileId(2);
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// Bit set of tile properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileFlags(u8);

impl TileFlags {
    pub const EMPTY: TileFlags = TileFlags(0);
    /// Entities may move through the cell.
    pub const PASSABLE: TileFlags = TileFlags(1 << 0);
    /// Light reaches the cell but does not spread past it.
    pub const OPAQUE: TileFlags = TileFlags(1 << 1);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: TileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TileFlags {
    type Output = TileFlags;

    fn bitor(self, rhs: TileFlags) -> TileFlags {
        TileFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for TileFlags {
    fn bitor_assign(&mut self, rhs: TileFlags) {
        self.0 |= rhs.0;
    }
}

// ---------------------------------------------------------------------------
// TileCatalog
// ---------------------------------------------------------------------------

/// Static properties shared by every tile with the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData {
    pub name: String,
    pub flags: TileFlags,
}

/// One catalog entry as written in JSON.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogEntry {
    id: TileId,
    name: String,
    #[serde(default)]
    passable: bool,
    #[serde(default)]
    opaque: bool,
}

/// Maps tile ids to their [`TileData`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileCatalog {
    tiles: BTreeMap<TileId, TileData>,
}

impl TileCatalog {
    /// An empty catalog: every id is unknown, so nothing is passable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Void, dungeon brick floor and dungeon brick wall.
    pub fn dungeon() -> Self {
        let mut catalog = Self::new();
        catalog.insert(TileId::VOID, "void", TileFlags::EMPTY);
        catalog.insert(
            TileId::DUNGEON_BRICK_FLOOR,
            "dungeon_brick_floor",
            TileFlags::PASSABLE,
        );
        catalog.insert(
            TileId::DUNGEON_BRICK_WALL,
            "dungeon_brick_wall",
            TileFlags::OPAQUE,
        );
        catalog
    }

    pub fn insert(&mut self, id: TileId, name: impl Into<String>, flags: TileFlags) {
        self.tiles.insert(
            id,
            TileData {
                name: name.into(),
                flags,
            },
        );
    }

    /// Parse a catalog from a JSON array of
    /// `{"id": 1, "name": "...", "passable": true, "opaque": false}`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] if the JSON is malformed or an id repeats.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(json).map_err(|e| EngineError::Config {
                source_name: "tile catalog".to_owned(),
                details: e.to_string(),
            })?;
        let mut catalog = Self::new();
        for entry in entries {
            if catalog.tiles.contains_key(&entry.id) {
                return Err(EngineError::Config {
                    source_name: "tile catalog".to_owned(),
                    details: format!("duplicate tile id {}", entry.id.0),
                });
            }
            let mut flags = TileFlags::EMPTY;
            if entry.passable {
                flags |= TileFlags::PASSABLE;
            }
            if entry.opaque {
                flags |= TileFlags::OPAQUE;
            }
            catalog.insert(entry.id, entry.name, flags);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: TileId) -> Option<&TileData> {
        self.tiles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TileNode / TileWrite
// ---------------------------------------------------------------------------

/// One cell of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileNode {
    pub id: TileId,
    /// Per-instance flags, combined with the catalog flags of `id`.
    pub flags: TileFlags,
    /// Derived illumination in `[0, 1]`. Stale while the layer is invalidated.
    pub light: f32,
}

impl TileNode {
    fn new(id: TileId) -> Self {
        Self {
            id,
            flags: TileFlags::EMPTY,
            light: 0.0,
        }
    }
}

/// A single entry of a batched write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileWrite {
    pub x: i32,
    pub y: i32,
    pub id: TileId,
    pub flags: TileFlags,
}

impl TileWrite {
    pub fn new(x: i32, y: i32, id: TileId) -> Self {
        Self {
            x,
            y,
            id,
            flags: TileFlags::EMPTY,
        }
    }
}

/// A light source held by the grid on behalf of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticLight {
    pub layer: usize,
    pub cell: Cell,
    pub radius: u32,
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// All layers of the world's tiles plus the lights shining on them.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    layers: Vec<Vec<TileNode>>,
    catalog: TileCatalog,
    /// Keyed by owner so re-registration is idempotent and removal is O(log n).
    lights: BTreeMap<EntityId, StaticLight>,
    dirty: Vec<bool>,
    light_config: LightConfig,
}

impl TileGrid {
    /// A grid of `layer_count` layers, every cell [`TileId::VOID`].
    ///
    /// Every layer starts invalidated so the first [`light`](Self::light)
    /// pass fills in ambient light.
    pub fn new(width: u32, height: u32, layer_count: usize, catalog: TileCatalog) -> Self {
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            layers: vec![vec![TileNode::new(TileId::VOID); cells]; layer_count],
            catalog,
            lights: BTreeMap::new(),
            dirty: vec![true; layer_count],
            light_config: LightConfig::default(),
        }
    }

    pub fn with_light_config(mut self, config: LightConfig) -> Self {
        self.set_light_config(config);
        self
    }

    pub fn set_light_config(&mut self, config: LightConfig) {
        self.light_config = config;
        self.dirty.iter_mut().for_each(|d| *d = true);
    }

    pub fn light_config(&self) -> &LightConfig {
        &self.light_config
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    // -- queries ------------------------------------------------------------

    pub fn get_tile(&self, layer: usize, x: i32, y: i32) -> Option<&TileNode> {
        let idx = self.index(x, y)?;
        self.layers.get(layer).map(|cells| &cells[idx])
    }

    /// Direct mutable access. Does not invalidate lighting; call
    /// [`request_rebuild`](Self::request_rebuild) after changing `id` or
    /// `flags` this way.
    pub fn get_tile_mut(&mut self, layer: usize, x: i32, y: i32) -> Option<&mut TileNode> {
        let idx = self.index(x, y)?;
        self.layers.get_mut(layer).map(|cells| &mut cells[idx])
    }

    /// Catalog flags of the stored id combined with the node's own flags.
    /// `None` for absent cells; ids unknown to the catalog contribute nothing.
    pub fn flags_at(&self, layer: usize, x: i32, y: i32) -> Option<TileFlags> {
        let node = self.get_tile(layer, x, y)?;
        let catalog = self
            .catalog
            .get(node.id)
            .map_or(TileFlags::EMPTY, |data| data.flags);
        Some(catalog | node.flags)
    }

    /// Absent cells are passable (open boundary). Present cells need the
    /// `PASSABLE` flag.
    pub fn is_passable(&self, layer: usize, x: i32, y: i32) -> bool {
        self.flags_at(layer, x, y)
            .map_or(true, |flags| flags.contains(TileFlags::PASSABLE))
    }

    pub fn is_opaque(&self, layer: usize, x: i32, y: i32) -> bool {
        self.flags_at(layer, x, y)
            .is_some_and(|flags| flags.contains(TileFlags::OPAQUE))
    }

    pub fn light_at(&self, layer: usize, x: i32, y: i32) -> Option<f32> {
        self.get_tile(layer, x, y).map(|node| node.light)
    }

    // -- mutation -----------------------------------------------------------

    /// Apply a batch of writes to `layer`.
    ///
    /// When a batch writes the same cell more than once, only the last write
    /// is applied. Writes outside the grid are skipped. The layer is
    /// invalidated iff some cell's id or flags actually changed. Returns the
    /// number of cells that changed.
    pub fn add_tiles(&mut self, layer: usize, writes: &[TileWrite]) -> usize {
        if layer >= self.layers.len() {
            tracing::warn!(layer, writes = writes.len(), "add_tiles: no such layer");
            return 0;
        }

        let mut last: BTreeMap<usize, TileWrite> = BTreeMap::new();
        let mut skipped = 0usize;
        for write in writes {
            match self.index(write.x, write.y) {
                Some(idx) => {
                    last.insert(idx, *write);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(layer, skipped, "add_tiles: out-of-bounds writes skipped");
        }

        let cells = &mut self.layers[layer];
        let mut changed = 0usize;
        for (idx, write) in last {
            let node = &mut cells[idx];
            if node.id != write.id || node.flags != write.flags {
                node.id = write.id;
                node.flags = write.flags;
                changed += 1;
            }
        }

        if changed > 0 {
            self.dirty[layer] = true;
        }
        tracing::trace!(layer, changed, "tiles written");
        changed
    }

    // -- lights -------------------------------------------------------------

    /// Register `owner`'s light. A second registration for the same owner is
    /// ignored. Returns whether a light was added.
    pub fn register_static_light(
        &mut self,
        layer: usize,
        owner: EntityId,
        cell: Cell,
        radius: u32,
    ) -> bool {
        if layer >= self.layers.len() {
            tracing::warn!(layer, %owner, "register_static_light: no such layer");
            return false;
        }
        if self.lights.contains_key(&owner) {
            return false;
        }
        self.lights.insert(
            owner,
            StaticLight {
                layer,
                cell,
                radius,
            },
        );
        self.dirty[layer] = true;
        tracing::debug!(%owner, layer, x = cell.x, y = cell.y, radius, "light registered");
        true
    }

    /// Move `owner`'s light. Returns whether it moved.
    pub fn move_static_light(&mut self, owner: EntityId, cell: Cell) -> bool {
        let Some(light) = self.lights.get_mut(&owner) else {
            return false;
        };
        if light.cell == cell {
            return false;
        }
        light.cell = cell;
        self.dirty[light.layer] = true;
        true
    }

    /// Drop `owner`'s light. Returns whether one was registered.
    pub fn unregister_light(&mut self, owner: EntityId) -> bool {
        match self.lights.remove(&owner) {
            Some(light) => {
                self.dirty[light.layer] = true;
                tracing::debug!(%owner, "light unregistered");
                true
            }
            None => false,
        }
    }

    pub fn light_of(&self, owner: EntityId) -> Option<&StaticLight> {
        self.lights.get(&owner)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn lights(&self) -> impl Iterator<Item = (EntityId, &StaticLight)> {
        self.lights.iter().map(|(owner, light)| (*owner, light))
    }

    // -- invalidation -------------------------------------------------------

    pub fn request_rebuild(&mut self, layer: usize) {
        if let Some(flag) = self.dirty.get_mut(layer) {
            *flag = true;
        }
    }

    pub fn needs_rebuild(&self, layer: usize) -> bool {
        self.dirty.get(layer).copied().unwrap_or(false)
    }

    /// Recompute the light field of every invalidated layer. Returns the
    /// number of layers rebuilt; `0` when nothing was invalidated.
    pub fn light(&mut self) -> usize {
        let mut rebuilt = 0;
        for layer in 0..self.layers.len() {
            if !self.dirty[layer] {
                continue;
            }
            let sources: Vec<LightSource> = self
                .lights
                .values()
                .filter(|l| l.layer == layer)
                .map(|l| LightSource {
                    cell: l.cell,
                    radius: l.radius,
                })
                .collect();
            let field = lighting::compute_field(
                self.width,
                self.height,
                |x, y| self.is_opaque(layer, x, y),
                &sources,
                &self.light_config,
            );
            for (node, value) in self.layers[layer].iter_mut().zip(field) {
                node.light = value;
            }
            self.dirty[layer] = false;
            rebuilt += 1;
            tracing::trace!(layer, sources = sources.len(), "layer relit");
        }
        rebuilt
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
