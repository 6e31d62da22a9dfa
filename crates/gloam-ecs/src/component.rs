//! Component kinds and the per-entity component set.
//!
//! The set of component kinds is closed: every entity carries a
//! [`ComponentSet`] with one optional slot per [`ComponentKind`]. Typed access
//! goes through the [`Component`] trait, whose `KIND` constant is the
//! compile-time tag for the slot.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2D vector in world units (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned collision box, relative to the owning entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub offset: Vec2,
    pub size: Vec2,
}

impl Bounds {
    pub const fn new(offset: Vec2, size: Vec2) -> Self {
        Self { offset, size }
    }
}

// ---------------------------------------------------------------------------
// ComponentKind / Component
// ---------------------------------------------------------------------------

/// The closed set of component kinds an entity may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Physics,
    Sprite,
    Stats,
    Light,
    Life,
    Script,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Physics => "physics",
            ComponentKind::Sprite => "sprite",
            ComponentKind::Stats => "stats",
            ComponentKind::Light => "light",
            ComponentKind::Life => "life",
            ComponentKind::Script => "script",
        };
        f.write_str(name)
    }
}

/// A component type with a dedicated slot in [`ComponentSet`].
pub trait Component: Sized + 'static {
    /// Tag of the slot this type lives in.
    const KIND: ComponentKind;

    fn slot(set: &ComponentSet) -> &Option<Self>;

    fn slot_mut(set: &mut ComponentSet) -> &mut Option<Self>;
}

macro_rules! component_slot {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Component for $ty {
            const KIND: ComponentKind = ComponentKind::$kind;

            #[inline]
            fn slot(set: &ComponentSet) -> &Option<Self> {
                &set.$field
            }

            #[inline]
            fn slot_mut(set: &mut ComponentSet) -> &mut Option<Self> {
                &mut set.$field
            }
        }
    };
}

component_slot!(Physics, Physics, physics);
component_slot!(Sprite, Sprite, sprite);
component_slot!(Stats, Stats, stats);
component_slot!(Light, Light, light);
component_slot!(Life, Life, life);
component_slot!(Script, Script, script);

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// Every component an entity owns, at most one per kind.
///
/// This is also the on-disk template shape: a JSON object whose keys are
/// the kind names (`"physics"`, `"light"`, ...). Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physics: Option<Physics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite: Option<Sprite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<Light>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life: Option<Life>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Replaces any existing value of the same kind.
    pub fn with<C: Component>(mut self, value: C) -> Self {
        *C::slot_mut(&mut self) = Some(value);
        self
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        C::slot(self).as_ref()
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        C::slot_mut(self).as_mut()
    }

    pub fn has<C: Component>(&self) -> bool {
        C::slot(self).is_some()
    }

    /// Kinds present in this set, in declaration order.
    pub fn kinds(&self) -> Vec<ComponentKind> {
        let mut kinds = Vec::new();
        if self.physics.is_some() {
            kinds.push(ComponentKind::Physics);
        }
        if self.sprite.is_some() {
            kinds.push(ComponentKind::Sprite);
        }
        if self.stats.is_some() {
            kinds.push(ComponentKind::Stats);
        }
        if self.light.is_some() {
            kinds.push(ComponentKind::Light);
        }
        if self.life.is_some() {
            kinds.push(ComponentKind::Life);
        }
        if self.script.is_some() {
            kinds.push(ComponentKind::Script);
        }
        kinds
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// Position, per-tick velocity impulse, collision box and draw-order offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    pub pos: Vec2,
    /// Consumed by the move system every tick.
    pub velocity: Vec2,
    pub bounds: Bounds,
    /// Added to `pos.y` to form the render depth key.
    pub sort_offset: f32,
}

impl Physics {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            ..Self::default()
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Render depth key, ascending = drawn first.
    pub fn depth(&self) -> f32 {
        self.pos.y + self.sort_offset
    }
}

// ---------------------------------------------------------------------------
// Sprite
// ---------------------------------------------------------------------------

/// Frame clock for a sprite sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Animator {
    pub frame_count: u32,
    /// Seconds per frame.
    pub frame_duration: f32,
    pub elapsed: f32,
    pub frame: u32,
}

impl Animator {
    pub fn new(frame_count: u32, frame_duration: f32) -> Self {
        Self {
            frame_count,
            frame_duration,
            ..Self::default()
        }
    }

    /// Advance the clock by `dt` seconds, wrapping the frame index.
    pub fn update(&mut self, dt: f32) {
        if self.frame_count == 0 || self.frame_duration <= 0.0 {
            return;
        }
        self.elapsed += dt;
        while self.elapsed >= self.frame_duration {
            self.elapsed -= self.frame_duration;
            self.frame = (self.frame + 1) % self.frame_count;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sprite {
    /// Texture key, resolved by the renderer.
    pub texture: String,
    pub animated: bool,
    pub flip_x: bool,
    pub animator: Animator,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Health,
    MaxHealth,
    Attack,
    Defense,
    Resistance,
    Speed,
}

/// Where a hit came from. `True` damage ignores defenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    Physical,
    Magic,
    True,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Damage {
    pub source: DamageSource,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlock {
    pub health: f32,
    pub max_health: f32,
    pub attack: f32,
    pub defense: f32,
    pub resistance: f32,
    pub speed: f32,
}

impl StatBlock {
    pub fn get(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::Health => self.health,
            StatKind::MaxHealth => self.max_health,
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::Resistance => self.resistance,
            StatKind::Speed => self.speed,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut f32 {
        match kind {
            StatKind::Health => &mut self.health,
            StatKind::MaxHealth => &mut self.max_health,
            StatKind::Attack => &mut self.attack,
            StatKind::Defense => &mut self.defense,
            StatKind::Resistance => &mut self.resistance,
            StatKind::Speed => &mut self.speed,
        }
    }

    /// Copy every stat from `base` except the health pool.
    pub fn reset_from(&mut self, base: &StatBlock) {
        let health = self.health;
        *self = *base;
        self.health = health;
    }

    /// Clamp the health pool to `[0, max_health]`.
    pub fn clamp_health(&mut self) {
        self.health = self.health.clamp(0.0, self.max_health.max(0.0));
    }

    /// Apply a hit to the health pool. Returns the damage actually dealt.
    pub fn apply_damage(&mut self, damage: Damage) -> f32 {
        let raw = damage.amount.max(0) as f32;
        let dealt = match damage.source {
            DamageSource::Physical => (raw - self.defense).max(0.0),
            DamageSource::Magic => (raw - self.resistance).max(0.0),
            DamageSource::True => raw,
        };
        let dealt = dealt.min(self.health.max(0.0));
        self.health -= dealt;
        dealt
    }
}

/// Lifecycle of a timed modifier, reported by the modifier itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierState {
    #[default]
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierEffect {
    /// `stat += amount` on the current block. On `Health` the amount is
    /// granted once and taken back when the modifier expires.
    Flat { stat: StatKind, amount: f32 },
    /// `stat *= factor` on the current block. On `Health` the resulting
    /// change is granted once and taken back when the modifier expires.
    Scale { stat: StatKind, factor: f32 },
    /// `stat += per_second * dt`, persistent (regeneration, poison).
    OverTime { stat: StatKind, per_second: f32 },
}

/// A time-limited buff or debuff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub effect: ModifierEffect,
    /// Seconds left; `None` never expires.
    pub remaining: Option<f32>,
    #[serde(default)]
    pub state: ModifierState,
    /// Health currently granted by a `Flat`/`Scale` health modifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held: Option<f32>,
}

impl Modifier {
    pub fn timed(effect: ModifierEffect, seconds: f32) -> Self {
        Self {
            effect,
            remaining: Some(seconds),
            state: ModifierState::Active,
            held: None,
        }
    }

    pub fn permanent(effect: ModifierEffect) -> Self {
        Self {
            effect,
            remaining: None,
            state: ModifierState::Active,
            held: None,
        }
    }

    /// Count down the remaining duration and report the resulting state.
    pub fn manage_duration(&mut self, dt: f32) -> ModifierState {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.state = ModifierState::Expired;
            }
        }
        self.state
    }

    pub fn is_expired(&self) -> bool {
        self.state == ModifierState::Expired
    }

    /// Apply this modifier's effect for one tick of length `dt`.
    ///
    /// The health pool is not rebuilt from base, so `Flat`/`Scale` on
    /// `Health` hold their change instead of reapplying it: granted on the
    /// first active tick (clamped to the pool), removed on the tick the
    /// modifier expires.
    pub fn apply(&mut self, stats: &mut StatBlock, dt: f32) {
        match self.effect {
            ModifierEffect::Flat {
                stat: StatKind::Health,
                amount,
            } => self.hold_health(stats, amount),
            ModifierEffect::Scale {
                stat: StatKind::Health,
                factor,
            } => {
                let delta = stats.health * (factor - 1.0);
                self.hold_health(stats, delta);
            }
            ModifierEffect::Flat { stat, amount } => *stats.get_mut(stat) += amount,
            ModifierEffect::Scale { stat, factor } => *stats.get_mut(stat) *= factor,
            ModifierEffect::OverTime { stat, per_second } => {
                *stats.get_mut(stat) += per_second * dt
            }
        }
    }

    fn hold_health(&mut self, stats: &mut StatBlock, delta: f32) {
        if self.is_expired() {
            if let Some(granted) = self.held.take() {
                stats.health -= granted;
            }
        } else if self.held.is_none() {
            let before = stats.health;
            stats.health = (before + delta).clamp(0.0, stats.max_health.max(0.0));
            self.held = Some(stats.health - before);
        }
    }
}

/// Numeric stat block plus the modifiers currently acting on it.
///
/// `base` holds the unmodified values. `current` is rebuilt from `base`
/// every tick, except for the health pool which persists in `current`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "StatsRepr", into = "StatsRepr")]
pub struct Stats {
    pub base: StatBlock,
    pub current: StatBlock,
    pub active_buffs: Vec<Modifier>,
}

/// Serialized form of [`Stats`]; a template may omit `current`, in which
/// case it starts as a copy of `base`.
#[derive(Serialize, Deserialize)]
struct StatsRepr {
    base: StatBlock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<StatBlock>,
    #[serde(default)]
    active_buffs: Vec<Modifier>,
}

impl From<StatsRepr> for Stats {
    fn from(repr: StatsRepr) -> Self {
        Self {
            base: repr.base,
            current: repr.current.unwrap_or(repr.base),
            active_buffs: repr.active_buffs,
        }
    }
}

impl From<Stats> for StatsRepr {
    fn from(stats: Stats) -> Self {
        Self {
            base: stats.base,
            current: Some(stats.current),
            active_buffs: stats.active_buffs,
        }
    }
}

impl Stats {
    pub fn new(base: StatBlock) -> Self {
        Self {
            base,
            current: base,
            active_buffs: Vec::new(),
        }
    }

    pub fn add_buff(&mut self, modifier: Modifier) {
        self.active_buffs.push(modifier);
    }

    pub fn take_damage(&mut self, damage: Damage) -> f32 {
        self.current.apply_damage(damage)
    }
}

// ---------------------------------------------------------------------------
// Light / Life / Script
// ---------------------------------------------------------------------------

fn default_light_radius() -> u32 {
    6
}

/// A point light that follows the entity's physics position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    #[serde(default)]
    pub cell: Cell,
    #[serde(default = "default_light_radius")]
    pub radius: u32,
    /// Set once the light has been handed to the tile grid. Runtime state:
    /// never read from a template, and the grid's copy is what snapshots
    /// record.
    #[serde(skip)]
    pub registered: bool,
}

impl Light {
    pub fn with_radius(radius: u32) -> Self {
        Self {
            cell: Cell::default(),
            radius,
            registered: false,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::with_radius(default_light_radius())
    }
}

/// Remaining lifetime in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Life {
    pub remaining: f32,
    #[serde(default)]
    pub done: bool,
}

impl Life {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds,
            done: false,
        }
    }
}

/// Binds an entity to a loaded script module by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script {
    pub module: String,
}

impl Script {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
