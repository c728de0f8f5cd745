//! # Decking Dependency Resolver
//!
//! File: cli/src/core/resolver.rs
//!
//! ## Overview
//!
//! Produces an execution order for a set of named items whose dependencies
//! are declared by name. Every item is emitted after all of the items it
//! depends on. The same routine orders images for `build` and containers for
//! every cluster operation (reversed for teardown), and it is also what the entity
//! model uses to construct containers after the containers they link to.
//!
//! ## Algorithm
//!
//! Iterative fixed point: each pass scans the pending items (in input order)
//! and moves every item whose dependencies have all been processed into the
//! current *wave*. The wave is then marked processed and the next pass
//! begins. Items within a wave keep their relative input order, so the result
//! is stable for a given input.
//!
//! A pass that moves nothing while items are still pending means the
//! remaining items sit on a cycle or depend on a name that is not in the
//! input. The resolver fails with `DeckingError::CircularOrMissingDependency`
//! listing the stuck items.
//!
use crate::core::error::{DeckingError, Result};
use anyhow::anyhow;
use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, trace};

/// Groups `items` into dependency waves.
///
/// `name` returns the key an item is known by and `dependencies` the keys it
/// depends on. The first wave holds the items without dependencies, each later
/// wave only items whose dependencies appeared in earlier waves.
///
/// # Errors
///
/// `DeckingError::CircularOrMissingDependency` when a pass makes no progress.
pub fn resolve_waves<T, K, N, D, I>(items: Vec<T>, name: N, dependencies: D) -> Result<Vec<Vec<T>>>
where
    K: Eq + Hash + ToString,
    N: Fn(&T) -> K,
    D: Fn(&T) -> I,
    I: IntoIterator<Item = K>,
{
    let mut pending = items;
    let mut processed: HashSet<K> = HashSet::new();
    let mut waves = Vec::new();

    while !pending.is_empty() {
        let (ready, blocked): (Vec<T>, Vec<T>) = pending
            .into_iter()
            .partition(|item| dependencies(item).into_iter().all(|dep| processed.contains(&dep)));

        if ready.is_empty() {
            let stuck: Vec<String> = blocked.iter().map(|item| name(item).to_string()).collect();
            debug!("Resolver stuck on {:?}", stuck);
            return Err(anyhow!(DeckingError::CircularOrMissingDependency { stuck }));
        }

        trace!(
            "Resolver wave {}: {:?}",
            waves.len(),
            ready.iter().map(|item| name(item).to_string()).collect::<Vec<_>>()
        );
        processed.extend(ready.iter().map(&name));
        waves.push(ready);
        pending = blocked;
    }

    Ok(waves)
}

/// Flattens [`resolve_waves`] into a single execution order.
pub fn resolve<T, K, N, D, I>(items: Vec<T>, name: N, dependencies: D) -> Result<Vec<T>>
where
    K: Eq + Hash + ToString,
    N: Fn(&T) -> K,
    D: Fn(&T) -> I,
    I: IntoIterator<Item = K>,
{
    Ok(resolve_waves(items, name, dependencies)?.into_iter().flatten().collect())
}

/// The teardown order: [`resolve`] reversed, so dependents come before their
/// dependencies.
pub fn resolve_reversed<T, K, N, D, I>(items: Vec<T>, name: N, dependencies: D) -> Result<Vec<T>>
where
    K: Eq + Hash + ToString,
    N: Fn(&T) -> K,
    D: Fn(&T) -> I,
    I: IntoIterator<Item = K>,
{
    let mut order = resolve(items, name, dependencies)?;
    order.reverse();
    Ok(order)
}
