//! System subscription and ordering.
//!
//! Systems never hold references to pools across ticks; they subscribe pool
//! *names* into named groups chosen by structural predicates (`PoolType`),
//! and look pools up through the manager during their own update. The
//! `SystemManager` executes systems strictly in the externally configured
//! order: a system may appear more than once, and a registered system that
//! is absent from the order never runs.

use std::collections::HashMap;

use hailstorm_core::types::SimTime;
use rand_chacha::ChaCha8Rng;

use crate::error::SimResult;
use crate::pool::Pool;
use crate::pool_manager::PoolManager;
use crate::spawn::SpawnRuleSet;

/// Structural predicate deciding whether a system cares about a pool: every
/// required component array, shared component, and tag must be present.
#[derive(Debug, Clone, Default)]
pub struct PoolType {
    required_arrays: Vec<String>,
    required_shared: Vec<String>,
    required_tags: Vec<String>,
}

impl PoolType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_array(mut self, component: &str) -> Self {
        self.required_arrays.push(component.to_string());
        self
    }

    pub fn with_shared(mut self, component: &str) -> Self {
        self.required_shared.push(component.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.required_tags.push(tag.to_string());
        self
    }

    pub fn matches(&self, pool: &Pool) -> bool {
        self.required_arrays
            .iter()
            .all(|name| pool.has_component_array(name))
            && self.required_shared.iter().all(|name| pool.has_shared(name))
            && self.required_tags.iter().all(|tag| pool.has_tag(tag))
    }
}

/// A system's named pool groups. A single system often needs different data
/// per pool shape (pools with handles vs. all pools), so subscription places
/// a pool into every group whose predicate it matches.
#[derive(Default)]
pub struct PoolGroups {
    types: Vec<(String, PoolType)>,
    groups: HashMap<String, Vec<String>>,
}

impl PoolGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&mut self, key: &str, pool_type: PoolType) {
        self.types.push((key.to_string(), pool_type));
        self.groups.entry(key.to_string()).or_default();
    }

    /// Place a pool into every group it matches structurally.
    pub fn subscribe(&mut self, pool: &Pool) {
        for (key, pool_type) in &self.types {
            if pool_type.matches(pool) {
                let group = self.groups.entry(key.clone()).or_default();
                if !group.iter().any(|name| name == pool.name()) {
                    group.push(pool.name().to_string());
                }
            }
        }
    }

    /// Remove a pool from every group it was placed in.
    pub fn unsubscribe(&mut self, pool_name: &str) {
        for group in self.groups.values_mut() {
            group.retain(|name| name != pool_name);
        }
    }

    /// Pool names in one group, in subscription order.
    pub fn group(&self, key: &str) -> &[String] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Everything a system may touch during one tick.
pub struct TickContext<'a> {
    pub pools: &'a mut PoolManager,
    pub rules: &'a mut SpawnRuleSet,
    pub rng: &'a mut ChaCha8Rng,
    pub time: SimTime,
}

pub trait System: Send {
    fn pool_groups(&mut self) -> &mut PoolGroups;

    fn subscribe(&mut self, pool: &Pool) {
        self.pool_groups().subscribe(pool);
    }

    fn unsubscribe(&mut self, pool_name: &str) {
        self.pool_groups().unsubscribe(pool_name);
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()>;
}

/// Apply `f` to every pool in one group. Pools deleted since subscription
/// are skipped.
pub fn update_pool_group<F>(
    groups: &PoolGroups,
    key: &str,
    pools: &mut PoolManager,
    mut f: F,
) -> SimResult<()>
where
    F: FnMut(&mut Pool) -> SimResult<()>,
{
    for name in groups.group(key) {
        if let Some(pool) = pools.get_pool_mut(name) {
            f(pool)?;
        }
    }
    Ok(())
}

/// Apply `f` to every ordered pair across two groups (collision-style N x M
/// checks). A pool paired with itself is skipped.
pub fn update_interaction<F>(
    groups: &PoolGroups,
    first_key: &str,
    second_key: &str,
    pools: &mut PoolManager,
    mut f: F,
) -> SimResult<()>
where
    F: FnMut(&mut Pool, &mut Pool) -> SimResult<()>,
{
    let first_group: Vec<String> = groups.group(first_key).to_vec();
    let second_group: Vec<String> = groups.group(second_key).to_vec();
    for first in &first_group {
        for second in &second_group {
            if let Some(result) = pools.with_pool_pair_mut(first, second, &mut f) {
                result?;
            }
        }
    }
    Ok(())
}

#[derive(Default)]
pub struct SystemManager {
    systems: HashMap<String, Box<dyn System>>,
    update_order: Vec<String>,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, system: Box<dyn System>) {
        if self.systems.contains_key(name) {
            log::warn!("system `{name}` registered twice; keeping first registration");
            return;
        }
        self.systems.insert(name.to_string(), system);
    }

    /// Configure the execution order. Entries naming unregistered systems
    /// are skipped at update time; registered systems left out never run.
    pub fn set_update_order(&mut self, order: &[&str]) {
        self.update_order = order.iter().map(|name| name.to_string()).collect();
    }

    pub fn update_order(&self) -> &[String] {
        &self.update_order
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn System>> {
        self.systems.get_mut(name)
    }

    /// Offer a newly created pool to every registered system.
    pub fn subscribe_pool(&mut self, pool: &Pool) {
        for system in self.systems.values_mut() {
            system.subscribe(pool);
        }
    }

    pub fn unsubscribe_pool(&mut self, pool_name: &str) {
        for system in self.systems.values_mut() {
            system.unsubscribe(pool_name);
        }
    }

    /// Run one tick: every entry of the configured order, in order.
    pub fn update(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        let order = self.update_order.clone();
        for name in &order {
            if let Some(system) = self.systems.get_mut(name) {
                system.update(ctx)?;
            }
        }
        Ok(())
    }
}
