//! Derived views over a `ChainedMap`: borrowed iterators, the entry-set view,
//! and the owned key-set snapshot.

use crate::chained_map::{Bucket, ChainedMap, Entry};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::iter::FusedIterator;
use hashbrown::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::collections::vec_deque;

/// Order-independent digest of a set of keys. Uses a fixed-key hasher so
/// equal key sets digest equally regardless of the maps' own hashers.
pub(crate) fn key_set_hash<'a, K, I>(keys: I) -> u64
where
    K: Hash + 'a,
    I: IntoIterator<Item = &'a K>,
{
    keys.into_iter().fold(0u64, |acc, k| {
        let mut h = DefaultHasher::new();
        k.hash(&mut h);
        acc.wrapping_add(h.finish())
    })
}

/// Iterator over `(&K, &V)` in bucket order, then chain order.
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Bucket<K, V>>,
    chain: Option<vec_deque::Iter<'a, Entry<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(buckets: &'a [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter(),
            chain: None,
            remaining: len,
        }
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            chain: self.chain.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            // Empty buckets yield a `None` chain and are skipped.
            self.chain = self.buckets.next()?.as_ref().map(|c| c.iter());
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)`; keys stay immutable.
pub struct IterMut<'a, K, V> {
    buckets: core::slice::IterMut<'a, Bucket<K, V>>,
    chain: Option<vec_deque::IterMut<'a, Entry<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(buckets: &'a mut [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter_mut(),
            chain: None,
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(Entry { key, value }) = self.chain.as_mut().and_then(Iterator::next)
            {
                self.remaining -= 1;
                return Some((&*key, value));
            }
            self.chain = self.buckets.next()?.as_mut().map(|c| c.iter_mut());
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Iterator over `&K` in the same order as [`Iter`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Set-like view of a map's entries. Holds no entries of its own; every
/// query reads the map's current state.
pub struct EntrySet<'a, K, V, S> {
    map: &'a ChainedMap<K, V, S>,
}

impl<'a, K, V, S> EntrySet<'a, K, V, S> {
    pub(crate) fn new(map: &'a ChainedMap<K, V, S>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Starts a fresh scan; each call restarts from the first bucket.
    pub fn iter(&self) -> Iter<'a, K, V> {
        self.map.iter()
    }
}

impl<'a, K, V, S> EntrySet<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// True if `key` is present and currently maps to a value equal to `value`.
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.map.get(key).is_some_and(|v| v == value)
    }
}

impl<'a, K, V, S> IntoIterator for EntrySet<'a, K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &EntrySet<'a, K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> fmt::Debug for EntrySet<'_, K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Owned snapshot of a map's keys. Later changes to the map are not
/// reflected here.
#[derive(Clone)]
pub struct KeySet<K> {
    keys: HashSet<K>,
}

impl<K> KeySet<K>
where
    K: Eq + Hash,
{
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.keys.contains(q)
    }

    pub fn iter(&self) -> hashbrown::hash_set::Iter<'_, K> {
        self.keys.iter()
    }
}

impl<K> FromIterator<K> for KeySet<K>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<K> IntoIterator for KeySet<K> {
    type Item = K;
    type IntoIter = hashbrown::hash_set::IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a, K> IntoIterator for &'a KeySet<K> {
    type Item = &'a K;
    type IntoIter = hashbrown::hash_set::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl<K> PartialEq for KeySet<K>
where
    K: Eq + Hash,
{
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl<K> Eq for KeySet<K> where K: Eq + Hash {}

// Matches `ChainedMap`'s `Hash`, so a map and its key set digest alike.
impl<K> Hash for KeySet<K>
where
    K: Eq + Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(key_set_hash(&self.keys));
    }
}

impl<K> fmt::Debug for KeySet<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.iter()).finish()
    }
}
