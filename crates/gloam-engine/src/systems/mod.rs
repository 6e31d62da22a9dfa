//! Per-entity update systems.
//!
//! Every system is a plain [`SystemFn`](crate::tick::SystemFn): it gets the
//! [`SimContext`](crate::tick::SimContext), the tick length and one entity,
//! and silently does nothing when the entity lacks the components it needs.
//! The tick loop calls each system once per entity, entity-outer.

pub mod animator;
pub mod life;
pub mod lighting;
pub mod movement;
pub mod script;
pub mod stats;

use crate::tick::SystemFn;

pub const LIGHTING: &str = "lighting";
pub const SCRIPT: &str = "script";
pub const MOVE: &str = "move";
pub const STATS: &str = "stats";
pub const ANIMATOR: &str = "animator";

/// Layer that entity lights are registered on.
pub const LIGHT_LAYER: usize = 0;

/// The default pipeline, in execution order.
pub fn default_pipeline() -> [(&'static str, SystemFn); 5] {
    [
        (LIGHTING, lighting::run),
        (SCRIPT, script::run),
        (MOVE, movement::run),
        (STATS, stats::run),
        (ANIMATOR, animator::run),
    ]
}
