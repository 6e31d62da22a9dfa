//! Deferred structural changes to the [`World`].
//!
//! Systems run against a stable entity list. Anything that changes that list
//! (spawning, despawning) is queued in a [`CommandBuffer`] and applied in FIFO
//! order once every system has finished the tick.
//!
//! ```
//! use gloam_ecs::prelude::*;
//!
//! let mut world = World::new();
//! let doomed = world.spawn(ComponentSet::new().with(Life::new(0.0)));
//!
//! let mut cmds = CommandBuffer::new();
//! cmds.despawn(doomed, "lifetime_expired");
//! let applied = cmds.apply(&mut world);
//!
//! assert_eq!(applied.len(), 1);
//! assert!(!world.is_alive(doomed));
//! ```

use tracing::{debug, warn};

use crate::component::ComponentSet;
use crate::entity::EntityId;
use crate::world::World;

/// What a queued command will do.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Spawn { components: ComponentSet },
    Despawn { target: EntityId },
}

/// A queued change plus the reason it was issued, kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub reason: String,
}

/// Result of applying one [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Spawned(EntityId),
    /// The entity was removed; its components are handed back so the caller
    /// can release anything registered on their behalf.
    Despawned(EntityId, ComponentSet),
    /// The target was already gone (stale handle or despawned earlier in
    /// the same batch).
    Skipped(EntityId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub reason: String,
    pub outcome: Outcome,
}

/// FIFO queue of deferred structural changes.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, components: ComponentSet, reason: impl Into<String>) {
        self.commands.push(Command {
            kind: CommandKind::Spawn { components },
            reason: reason.into(),
        });
    }

    pub fn despawn(&mut self, target: EntityId, reason: impl Into<String>) {
        self.commands.push(Command {
            kind: CommandKind::Despawn { target },
            reason: reason.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether a despawn for `target` is already queued.
    pub fn despawn_pending(&self, target: EntityId) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c.kind, CommandKind::Despawn { target: t } if t == target))
    }

    /// Apply every queued command in insertion order, leaving the buffer
    /// empty.
    pub fn apply(&mut self, world: &mut World) -> Vec<Applied> {
        let mut applied = Vec::with_capacity(self.commands.len());
        for command in self.commands.drain(..) {
            let outcome = match command.kind {
                CommandKind::Spawn { components } => {
                    let id = world.spawn(components);
                    debug!(entity = %id, reason = %command.reason, "spawned");
                    Outcome::Spawned(id)
                }
                CommandKind::Despawn { target } => match world.despawn(target) {
                    Ok(components) => {
                        debug!(entity = %target, reason = %command.reason, "despawned");
                        Outcome::Despawned(target, components)
                    }
                    Err(e) => {
                        warn!(error = %e, reason = %command.reason, "despawn skipped");
                        Outcome::Skipped(target)
                    }
                },
            };
            applied.push(Applied {
                reason: command.reason,
                outcome,
            });
        }
        applied
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Physics;

    #[test]
    fn commands_apply_in_fifo_order() {
        let mut world = World::new();
        let mut cmds = CommandBuffer::new();
        cmds.spawn(ComponentSet::new().with(Physics::at(1.0, 0.0)), "first");
        cmds.spawn(ComponentSet::new().with(Physics::at(2.0, 0.0)), "second");
        let applied = cmds.apply(&mut world);

        let xs: Vec<f32> = world
            .entities()
            .iter()
            .map(|&e| world.get::<Physics>(e).unwrap().pos.x)
            .collect();
        assert_eq!(xs, vec![1.0, 2.0]);
        assert_eq!(applied[0].reason, "first");
        assert!(cmds.is_empty());
    }

    #[test]
    fn double_despawn_in_one_batch_is_skipped_not_fatal() {
        let mut world = World::new();
        let e = world.spawn(ComponentSet::new());
        let mut cmds = CommandBuffer::new();
        cmds.despawn(e, "a");
        cmds.despawn(e, "b");
        assert!(cmds.despawn_pending(e));

        let applied = cmds.apply(&mut world);
        assert!(matches!(applied[0].outcome, Outcome::Despawned(id, _) if id == e));
        assert_eq!(applied[1].outcome, Outcome::Skipped(e));
    }
}
