//! Property tests for the entity registry and command buffer.
//!
//! Random sequences of spawns, direct despawns and queued despawns are run
//! against a [`World`] while a shadow list tracks which handles should be
//! alive. After every step the registry must agree with the shadow list.

use gloam_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum WorldOp {
    Spawn(f32),
    SpawnWithLife(f32),
    Despawn(usize),
    QueueDespawn(usize),
    Apply,
}

fn finite_f32() -> impl Strategy<Value = f32> {
    (-100_000i32..100_000i32).prop_map(|v| v as f32 * 0.01)
}

fn world_op_strategy() -> impl Strategy<Value = WorldOp> {
    prop_oneof![
        finite_f32().prop_map(WorldOp::Spawn),
        (0i32..500).prop_map(|v| WorldOp::SpawnWithLife(v as f32 * 0.01)),
        (0..64usize).prop_map(WorldOp::Despawn),
        (0..64usize).prop_map(WorldOp::QueueDespawn),
        Just(WorldOp::Apply),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn registry_matches_shadow_list(ops in prop::collection::vec(world_op_strategy(), 1..60)) {
        let mut world = World::new();
        let mut cmds = CommandBuffer::new();
        let mut alive: Vec<EntityId> = Vec::new();
        let mut dead: Vec<EntityId> = Vec::new();

        for op in ops {
            match op {
                WorldOp::Spawn(x) => {
                    alive.push(world.spawn(ComponentSet::new().with(Physics::at(x, 0.0))));
                }
                WorldOp::SpawnWithLife(t) => {
                    alive.push(world.spawn(ComponentSet::new().with(Life::new(t))));
                }
                WorldOp::Despawn(i) => {
                    if !alive.is_empty() {
                        let e = alive.remove(i % alive.len());
                        prop_assert!(world.despawn(e).is_ok());
                        dead.push(e);
                    }
                }
                WorldOp::QueueDespawn(i) => {
                    if !alive.is_empty() {
                        cmds.despawn(alive[i % alive.len()], "proptest");
                    }
                }
                WorldOp::Apply => {
                    for applied in cmds.apply(&mut world) {
                        if let Outcome::Despawned(e, _) = applied.outcome {
                            alive.retain(|a| *a != e);
                            dead.push(e);
                        }
                    }
                }
            }

            // Registry order is the shadow list order: both only append and remove.
            prop_assert_eq!(world.entities(), alive.as_slice());
            for &e in &dead {
                prop_assert!(!world.is_alive(e));
                prop_assert!(world.components(e).is_none());
            }
        }
    }

    #[test]
    fn stale_handles_never_alias_new_entities(n in 1usize..40) {
        let mut world = World::new();
        let old: Vec<EntityId> = (0..n).map(|_| world.spawn(ComponentSet::new())).collect();
        for &e in &old {
            world.despawn(e).unwrap();
        }
        let new: Vec<EntityId> = (0..n)
            .map(|i| world.spawn(ComponentSet::new().with(Physics::at(i as f32, 0.0))))
            .collect();

        for (o, fresh) in old.iter().zip(&new) {
            prop_assert_ne!(o, fresh);
            prop_assert!(world.get::<Physics>(*o).is_none());
        }
        prop_assert_eq!(world.entity_count(), n);
    }
}
