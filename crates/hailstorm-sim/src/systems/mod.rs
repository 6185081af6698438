//! The systems that run over subscribed pools each tick.
//!
//! Systems are the only code that touches pool data. Each one partitions its
//! subscribed pools into named groups by structural predicate and walks
//! those groups during its own update. Execution order is configured on the
//! `SystemManager`, never inferred.

pub mod cleanup;
pub mod creation;
pub mod destruction;
pub mod draw;
pub mod movement;
pub mod player;
pub mod spawner;

use crate::space::ObjectManager;

/// Register the engine's core systems in their default update order:
/// activation first, then simulation, then spawn staging, then cleanup
/// marking, then compaction. Draw and player systems take injected
/// collaborators and are registered separately.
pub fn install_core_systems(objects: &mut ObjectManager) {
    let systems = objects.systems_mut();
    systems.register("Creation", Box::new(creation::CreationSystem::new()));
    systems.register("Movement", Box::new(movement::MovementSystem::new()));
    systems.register("Spawner", Box::new(spawner::SpawnerSystem::new()));
    systems.register("Cleanup", Box::new(cleanup::CleanupSystem::new()));
    systems.register("Destruction", Box::new(destruction::DestructionSystem::new()));
    systems.set_update_order(&["Creation", "Movement", "Spawner", "Cleanup", "Destruction"]);
}
