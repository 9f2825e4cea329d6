/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// A `HashMap` that remembers insertion order.
///
/// Producers, consumers, and participants are closed in the order they were
/// registered, which keeps teardown events deterministic.
#[derive(Debug)]
pub(crate) struct InsertionOrderedMap<K, V> {
    map: HashMap<K, V>,
    keys: Vec<K>,
}

impl<K, V> Default for InsertionOrderedMap<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            keys: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> InsertionOrderedMap<K, V> {
    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(k)
    }

    pub fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_mut(k)
    }

    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(k)
    }

    /// Insert or replace.  A replaced value keeps its original position.
    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        self.map.insert(k.clone(), v).or_else(|| {
            self.keys.push(k);
            None
        })
    }

    pub fn remove<Q>(&mut self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.map.remove(k)?;
        self.keys.retain(|key| <K as Borrow<Q>>::borrow(key) != k);
        Some(value)
    }

    pub fn ordered_keys(&self) -> &[K] {
        &self.keys
    }

    /// Remove every entry, returning them in insertion order.
    pub fn drain_ordered(&mut self) -> Vec<(K, V)> {
        let keys = std::mem::take(&mut self.keys);
        let mut drained = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.map.remove(&key) {
                drained.push((key, value));
            }
        }
        drained
    }

    /// Remove and return, in insertion order, every entry matching `predicate`.
    pub fn extract_if<F>(&mut self, predicate: F) -> Vec<(K, V)>
    where
        F: Fn(&V) -> bool,
    {
        let matching: Vec<K> = self
            .keys
            .iter()
            .filter(|key| self.map.get(*key).is_some_and(&predicate))
            .cloned()
            .collect();

        matching
            .into_iter()
            .filter_map(|key| self.remove(&key).map(|value| (key, value)))
            .collect()
    }
}
