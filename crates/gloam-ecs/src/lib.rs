//! Gloam ECS -- entity registry and component store for the Gloam simulation.
//!
//! Entities are generational handles into a slot table. Each entity owns a
//! [`ComponentSet`](component::ComponentSet) with at most one component per
//! [`ComponentKind`](component::ComponentKind); the set of kinds is closed and
//! fixed at creation, while component *values* change every tick.
//!
//! Structural changes made during a tick go through a
//! [`CommandBuffer`](command::CommandBuffer) so that the entity list systems
//! are iterating over stays stable until the tick ends.
//!
//! # Quick Start
//!
//! ```
//! use gloam_ecs::prelude::*;
//!
//! let mut templates = TemplateLibrary::new();
//! templates
//!     .insert_json("Lantern.json", r#"{"physics": {}, "light": {"radius": 4}}"#)
//!     .unwrap();
//!
//! let mut world = World::new();
//! let lantern = world.create(&templates, "Lantern.json").unwrap();
//!
//! assert_eq!(world.get::<Light>(lantern).map(|l| l.radius), Some(4));
//! assert!(world.get::<Life>(lantern).is_none());
//! assert!(world.create(&templates, "Missing.json").is_err());
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod component;
pub mod entity;
pub mod template;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// No template with this name is known to the factory.
    #[error("entity template '{template}' not found")]
    ResourceNotFound { template: String },

    /// A template was found but does not describe a valid component set.
    #[error("failed to parse entity template '{template}': {details}")]
    TemplateParse { template: String, details: String },

    /// Reading template files failed.
    #[error("failed to read '{path}': {details}")]
    Io { path: String, details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{Applied, Command, CommandBuffer, CommandKind, Outcome};
    pub use crate::component::{
        Animator, Bounds, Cell, Component, ComponentKind, ComponentSet, Damage, DamageSource,
        Life, Light, Modifier, ModifierEffect, ModifierState, Physics, Script, Sprite,
        StatBlock, StatKind, Stats, Vec2,
    };
    pub use crate::entity::EntityId;
    pub use crate::template::{EntityFactory, TemplateLibrary};
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
