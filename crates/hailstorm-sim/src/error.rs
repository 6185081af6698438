//! Error types for pool and spawn-pipeline operations.
//!
//! Configuration lookups (pools, archetypes, allocator names) return
//! `Option` and are checked by callers. The errors here cover the fail-fast
//! class: code asking a pool for a component it does not carry, or a spawn
//! batch referencing a rule or archetype that was never registered. Each
//! variant names the offending pool/component/rule so failures are
//! diagnosable from the message alone.

use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("pool `{pool}` has no component array `{component}`")]
    MissingComponentArray { pool: String, component: String },

    #[error("pool `{pool}` has no shared component `{component}`")]
    MissingSharedComponent { pool: String, component: String },

    #[error("component array `{component}` in pool `{pool}` is not the requested type")]
    ComponentTypeMismatch { pool: String, component: String },

    #[error("shared component `{component}` in pool `{pool}` is not the requested type")]
    SharedTypeMismatch { pool: String, component: String },

    #[error("archetype value for `{component}` does not match the array type in pool `{pool}`")]
    ArchetypeValueMismatch { pool: String, component: String },

    #[error("no component array `{0}` is registered")]
    UnregisteredComponentArray(String),

    #[error("no shared component `{0}` is registered")]
    UnregisteredSharedComponent(String),

    #[error("a pool named `{0}` already exists")]
    DuplicatePool(String),

    #[error("no pool named `{0}`")]
    UnknownPool(String),

    #[error("no pool archetype named `{0}` is registered")]
    UnknownPoolArchetype(String),

    #[error("no spawn rule named `{rule}` (referenced by pool `{pool}`)")]
    UnknownSpawnRule { pool: String, rule: String },

    #[error("pool `{pool}` has no spawn archetype `{archetype}`")]
    UnknownSpawnArchetype { pool: String, archetype: String },

    #[error("spawn rule `{rule}` requires component `{component}`, which pool `{pool}` lacks")]
    RuleMissingComponent {
        rule: String,
        pool: String,
        component: String,
    },
}
