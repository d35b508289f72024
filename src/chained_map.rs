//! ChainedMap: bucket table with separate chaining and load-triggered growth.

use crate::config::MapConfig;
use crate::error::MapError;
use crate::views::{key_set_hash, EntrySet, Iter, IterMut, KeySet, Keys};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::mem;
use hashbrown::hash_map::DefaultHashBuilder;
use log::{debug, trace};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

/// Entries sharing one bucket, most recently inserted first.
pub(crate) type Chain<K, V> = VecDeque<Entry<K, V>>;

/// `None` marks an empty bucket and holds no allocation.
pub(crate) type Bucket<K, V> = Option<Chain<K, V>>;

fn empty_table<K, V>(buckets: usize) -> Vec<Bucket<K, V>> {
    (0..buckets).map(|_| None).collect()
}

/// Maps a hash onto `[0, buckets)`. The hash is read as a signed value, so a
/// negative remainder is shifted up by one table length.
fn index_for(hash: u64, buckets: usize) -> usize {
    let len = buckets as i64;
    let mut idx = (hash as i64) % len;
    if idx < 0 {
        idx += len;
    }
    idx as usize
}

fn grown(buckets: usize) -> usize {
    buckets.saturating_mul(2).saturating_add(1)
}

/// A hash map that resolves collisions by chaining entries inside a fixed
/// array of buckets, and rebuilds that array at `2n + 1` buckets whenever the
/// load factor passes the configured threshold.
///
/// Equality and hashing look at keys only: two maps holding the same keys are
/// equal whatever their values.
///
/// Not thread-safe. Callers sharing a map across threads must wrap it in
/// their own lock.
#[derive(Clone)]
pub struct ChainedMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    buckets: Vec<Bucket<K, V>>,
    len: usize,
    config: MapConfig,
}

impl<K, V> ChainedMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_config(config: MapConfig) -> Result<Self, MapError> {
        Self::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V, S> Default for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> ChainedMap<K, V, S> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current table length.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Visits entries in bucket order, then chain order within a bucket.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.buckets, self.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.buckets, self.len)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Borrowed view over all `(key, value)` pairs; its size is always the
    /// map's current length.
    pub fn entry_set(&self) -> EntrySet<'_, K, V, S> {
        EntrySet::new(self)
    }

    /// Collecting values is not offered; always fails with
    /// [`MapError::Unsupported`].
    pub fn values(&self) -> Result<Vec<&V>, MapError> {
        Err(MapError::Unsupported {
            operation: "values",
        })
    }

    /// Drops every entry and starts over with a fresh table of the configured
    /// initial length. The map stays usable afterwards.
    pub fn clear(&mut self) {
        trace!(
            "clearing ChainedMap: dropping {} entries across {} buckets",
            self.len,
            self.buckets.len()
        );
        self.buckets = empty_table(self.config.get_initial_capacity());
        self.len = 0;
    }
}

impl<K, V, S> ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        let config = MapConfig::default();
        Self {
            hasher,
            buckets: empty_table(config.get_initial_capacity()),
            len: 0,
            config,
        }
    }

    pub fn with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self, MapError> {
        config.validate()?;
        trace!(
            "creating ChainedMap with {} buckets, load threshold {}",
            config.get_initial_capacity(),
            config.get_load_threshold()
        );
        Ok(Self {
            hasher,
            buckets: empty_table(config.get_initial_capacity()),
            len: 0,
            config,
        })
    }

    fn bucket_index<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        index_for(self.hasher.hash_one(q), self.buckets.len())
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.bucket_index(q);
        self.buckets[idx]
            .as_ref()?
            .iter()
            .find(|e| e.key.borrow() == q)
            .map(|e| (&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.bucket_index(q);
        self.buckets[idx]
            .as_mut()?
            .iter_mut()
            .find(|e| e.key.borrow() == q)
            .map(|e| &mut e.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).is_some()
    }

    /// Full scan comparing values with `==`.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    /// Inserts or replaces. Returns the previous value when `key` was already
    /// present; a new key may trigger a rehash before this returns.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let idx = self.bucket_index(&key);
        if let Some(prev) = self.insert_at(idx, key, value) {
            return Some(prev);
        }
        if self.over_threshold(self.buckets.len()) {
            self.rehash();
        }
        None
    }

    // Shared by `put` and `rehash`; never checks the load threshold itself.
    fn insert_at(&mut self, idx: usize, key: K, value: V) -> Option<V> {
        let chain = self.buckets[idx].get_or_insert_with(VecDeque::new);
        if let Some(e) = chain.iter_mut().find(|e| e.key == key) {
            return Some(mem::replace(&mut e.value, value));
        }
        chain.push_front(Entry { key, value });
        self.len += 1;
        None
    }

    fn over_threshold(&self, buckets: usize) -> bool {
        self.len as f64 > self.config.get_load_threshold() * buckets as f64
    }

    fn rehash(&mut self) {
        let old_buckets = self.buckets.len();
        let mut new_buckets = grown(old_buckets);
        // One step always suffices at the default threshold. Stops once the
        // length saturates.
        while self.over_threshold(new_buckets) {
            let next = grown(new_buckets);
            if next == new_buckets {
                break;
            }
            new_buckets = next;
        }

        let old = mem::replace(&mut self.buckets, empty_table(new_buckets));
        let moved = self.len;
        self.len = 0;
        for chain in old.into_iter().flatten() {
            for Entry { key, value } in chain {
                let idx = self.bucket_index(&key);
                self.insert_at(idx, key, value);
            }
        }
        debug_assert_eq!(self.len, moved, "rehash must not lose or merge entries");
        debug!(
            "rehashed ChainedMap from {} to {} buckets ({} entries)",
            old_buckets, new_buckets, self.len
        );
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Removes the first matching entry of the target chain and returns it
    /// owned. An emptied chain is released back to the empty marker.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.bucket_index(q);
        let chain = self.buckets[idx].as_mut()?;
        let pos = chain.iter().position(|e| e.key.borrow() == q)?;
        let entry = chain.remove(pos)?;
        if chain.is_empty() {
            self.buckets[idx] = None;
        }
        self.len -= 1;
        Some((entry.key, entry.value))
    }

    /// Keeps only the entries for which `keep` returns true, visiting them in
    /// iteration order. Emptied chains go back to the empty marker.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut removed = 0;
        for bucket in self.buckets.iter_mut() {
            if let Some(chain) = bucket {
                let before = chain.len();
                chain.retain_mut(|e| keep(&e.key, &mut e.value));
                removed += before - chain.len();
                if chain.is_empty() {
                    *bucket = None;
                }
            }
        }
        self.len -= removed;
    }

    /// Independent snapshot of the current keys.
    pub fn key_set(&self) -> KeySet<K>
    where
        K: Clone,
    {
        self.keys().cloned().collect()
    }

    /// Bulk merging is not offered; always fails with
    /// [`MapError::Unsupported`] and leaves the map untouched.
    pub fn put_all<I>(&mut self, _entries: I) -> Result<(), MapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Err(MapError::Unsupported {
            operation: "put_all",
        })
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Key-set equality: values and hashers play no part.
impl<K, V, W, S, T> PartialEq<ChainedMap<K, W, T>> for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
    T: BuildHasher,
{
    fn eq(&self, other: &ChainedMap<K, W, T>) -> bool {
        self.len() == other.len() && self.keys().all(|k| other.contains_key(k))
    }
}

impl<K, V, S> Eq for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for ChainedMap<K, V, S>
where
    K: Eq + Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(key_set_hash(self.keys()));
    }
}

impl<K, V, S> fmt::Debug for ChainedMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::BTreeSet;

    #[derive(Clone, Default)]
    pub(crate) struct ConstBuildHasher;
    pub(crate) struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // every key lands in bucket 0
    }

    // Hashes an integer key to itself so tests can choose buckets.
    #[derive(Clone, Default)]
    struct IdentityBuildHasher;
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityBuildHasher {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> Self::Hasher {
            IdentityHasher(0)
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for b in bytes {
                self.0 = (self.0 << 8) | u64::from(*b);
            }
        }
        fn write_i64(&mut self, i: i64) {
            self.0 = i as u64;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    fn full_scan_len<K, V, S>(m: &ChainedMap<K, V, S>) -> usize {
        m.buckets.iter().flatten().map(|c| c.len()).sum()
    }

    /// Invariant: an index is always in range, and a negative hash is shifted
    /// up by exactly one table length.
    #[test]
    fn index_normalizes_negative_hashes() {
        assert_eq!(index_for(5, 101), 5);
        assert_eq!(index_for(-5i64 as u64, 101), 96);
        assert_eq!(index_for(-101i64 as u64, 101), 0);
        assert_eq!(index_for(u64::MAX, 7), 6);

        let m: ChainedMap<i64, (), IdentityBuildHasher> =
            ChainedMap::with_hasher(IdentityBuildHasher);
        assert_eq!(m.bucket_index(&-5i64), 96);
        assert_eq!(m.bucket_index(&205i64), 3);
        for k in -500i64..500 {
            assert!(m.bucket_index(&k) < m.bucket_count());
        }
    }

    /// Invariant: empty buckets stay unallocated until a key lands there, and
    /// return to the empty marker once their last entry is removed.
    #[test]
    fn buckets_materialize_and_release() {
        let mut m: ChainedMap<i64, &str, IdentityBuildHasher> =
            ChainedMap::with_hasher(IdentityBuildHasher);
        assert!(m.buckets.iter().all(Option::is_none));

        m.put(3, "three");
        m.put(104, "collides with three");
        assert_eq!(m.buckets[3].as_ref().map(|c| c.len()), Some(2));

        assert_eq!(m.remove(&3), Some("three"));
        assert!(m.buckets[3].is_some());
        assert_eq!(m.remove(&104), Some("collides with three"));
        assert!(m.buckets[3].is_none());
        assert!(m.is_empty());
    }

    /// Invariant: a new key is prepended, so chain order is most recent first.
    #[test]
    fn chain_prepends_new_keys() {
        let mut m: ChainedMap<&str, i32, ConstBuildHasher> =
            ChainedMap::with_hasher(ConstBuildHasher);
        m.put("a", 1);
        m.put("b", 2);
        m.put("c", 3);
        let order: Vec<_> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(order, vec!["c", "b", "a"]);

        // Replacing a value keeps the entry where it is.
        assert_eq!(m.put("b", 20), Some(2));
        let order: Vec<_> = m.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(order, vec![("c", 3), ("b", 20), ("a", 1)]);
    }

    /// Invariant: lookups resolve the right entry when every key collides.
    #[test]
    fn collisions_resolved_by_equality() {
        let mut m: ChainedMap<String, i32, ConstBuildHasher> =
            ChainedMap::with_hasher(ConstBuildHasher);
        for i in 0..50 {
            assert_eq!(m.put(format!("k{i}"), i), None);
        }
        for i in 0..50 {
            assert_eq!(m.get(format!("k{i}").as_str()), Some(&i));
        }
        assert_eq!(m.remove("k25"), Some(25));
        assert_eq!(m.remove("k25"), None);
        assert_eq!(m.len(), 49);
        assert_eq!(full_scan_len(&m), 49);
    }

    /// Invariant: the table grows to `2n + 1` on the insertion that pushes the
    /// count past `threshold * n`, and never before.
    #[test]
    fn rehash_at_default_threshold() {
        let mut m: ChainedMap<u32, u32> = ChainedMap::new();
        for i in 0..151 {
            m.put(i, i * 10);
        }
        assert_eq!(m.bucket_count(), 101);
        m.put(151, 1510);
        assert_eq!(m.bucket_count(), 203);
        assert_eq!(m.len(), 152);
        for i in 0..152 {
            assert_eq!(m.get(&i), Some(&(i * 10)));
        }
        assert_eq!(full_scan_len(&m), 152);
    }

    /// Invariant: after every insertion the load factor is within threshold,
    /// and the count matches a full scan of the table.
    #[test]
    fn load_bounded_after_each_put() {
        let cfg = MapConfig::new().initial_capacity(1).load_threshold(1.0);
        let mut m: ChainedMap<u32, ()> = ChainedMap::with_config(cfg).unwrap();
        let mut sizes = Vec::new();
        for i in 0..40 {
            m.put(i, ());
            assert!(m.load_factor() <= 1.0, "load {} at {}", m.load_factor(), i);
            assert_eq!(full_scan_len(&m), m.len());
            sizes.push(m.bucket_count());
        }
        assert_eq!(&sizes[..5], &[1, 3, 3, 7, 7]);
        assert_eq!(m.bucket_count(), 63);
    }

    /// Invariant: a tiny threshold grows straight to a table that satisfies it
    /// instead of rehashing repeatedly.
    #[test]
    fn low_threshold_grows_in_one_rebuild() {
        let cfg = MapConfig::new().initial_capacity(1).load_threshold(0.1);
        let mut m: ChainedMap<&str, i32> = ChainedMap::with_config(cfg).unwrap();
        m.put("only", 1);
        assert_eq!(m.bucket_count(), 15);
        assert!(m.load_factor() <= 0.1);
        assert_eq!(m.get("only"), Some(&1));
    }

    /// Invariant: growth sizing stops at the largest table length instead of
    /// spinning once doubling saturates.
    #[test]
    fn growth_saturates_at_max_length() {
        assert_eq!(grown(101), 203);
        assert_eq!(grown(usize::MAX / 2 + 1), usize::MAX);
        assert_eq!(grown(usize::MAX), usize::MAX);
    }

    /// Invariant: `retain` drops rejected entries, keeps the count equal to a
    /// full scan, and releases emptied buckets.
    #[test]
    fn retain_filters_in_place() {
        let mut m: ChainedMap<i64, i64, IdentityBuildHasher> =
            ChainedMap::with_hasher(IdentityBuildHasher);
        for k in 0..300 {
            m.put(k, k * 2);
        }
        m.retain(|k, v| {
            *v += 1;
            k % 3 == 0
        });
        assert_eq!(m.len(), 100);
        assert_eq!(full_scan_len(&m), 100);
        assert_eq!(m.get(&3), Some(&7));
        assert_eq!(m.get(&4), None);

        m.retain(|_, _| false);
        assert!(m.is_empty());
        assert!(m.buckets.iter().all(Option::is_none));
        m.put(1, 1);
        assert_eq!(m.get(&1), Some(&1));
    }

    /// Invariant: rehashing keeps the latest value of every key, including
    /// values replaced before growth.
    #[test]
    fn rehash_preserves_latest_values() {
        let cfg = MapConfig::new().initial_capacity(3).load_threshold(1.5);
        let mut m: ChainedMap<String, usize> = ChainedMap::with_config(cfg).unwrap();
        for i in 0..10 {
            m.put(format!("k{i}"), i);
        }
        m.put("k3".to_string(), 333);
        for i in 10..200 {
            m.put(format!("k{i}"), i);
        }
        assert!(m.bucket_count() > 3);
        assert_eq!(m.get("k3"), Some(&333));
        for i in (0..200).filter(|&i| i != 3) {
            assert_eq!(m.get(format!("k{i}").as_str()), Some(&i));
        }
    }

    /// Invariant: `clear` leaves a usable, empty map at the initial length.
    #[test]
    fn clear_resets_to_initial_table() {
        let cfg = MapConfig::new().initial_capacity(2);
        let mut m: ChainedMap<u32, u32> = ChainedMap::with_config(cfg).unwrap();
        for i in 0..20 {
            m.put(i, i);
        }
        assert!(m.bucket_count() > 2);
        m.clear();
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
        assert_eq!(m.bucket_count(), 2);
        assert_eq!(m.get(&1), None);
        m.put(1, 100);
        assert_eq!(m.get(&1), Some(&100));
        assert_eq!(m.len(), 1);
    }

    /// Invariant: `get_mut` updates in place and is visible to later lookups.
    #[test]
    fn get_mut_updates_in_place() {
        let mut m: ChainedMap<String, Vec<i32>> = ChainedMap::new();
        m.put("xs".to_string(), vec![1]);
        m.get_mut("xs").unwrap().push(2);
        assert_eq!(m.get("xs"), Some(&vec![1, 2]));
        assert!(m.get_mut("ys").is_none());
        assert_eq!(m.len(), 1);
    }

    /// Invariant: `contains_value` compares by value, not by identity.
    #[test]
    fn contains_value_uses_equality() {
        let mut m: ChainedMap<&str, String> = ChainedMap::new();
        m.put("a", "alpha".to_string());
        let probe = String::from("alpha");
        assert!(m.contains_value(&probe));
        assert!(!m.contains_value(&"beta".to_string()));
    }

    /// Invariant: unsupported operations fail and leave the map unchanged.
    #[test]
    fn unsupported_operations_do_not_mutate() {
        let mut m: ChainedMap<&str, i32> = ChainedMap::new();
        m.put("a", 1);
        let err = m.put_all(vec![("b", 2), ("c", 3)]).unwrap_err();
        assert_eq!(
            err,
            MapError::Unsupported {
                operation: "put_all"
            }
        );
        assert_eq!(m.len(), 1);
        assert!(!m.contains_key("b"));
        assert_eq!(
            m.values().unwrap_err(),
            MapError::Unsupported {
                operation: "values"
            }
        );
    }

    /// Invariant: equality ignores values and hashers; hashes agree for equal
    /// maps.
    #[test]
    fn equality_and_hash_follow_key_sets() {
        let mut a: ChainedMap<&str, i32> = ChainedMap::new();
        let mut b: ChainedMap<&str, String, ConstBuildHasher> =
            ChainedMap::with_hasher(ConstBuildHasher);
        for k in ["x", "y", "z"] {
            a.put(k, 1);
        }
        for k in ["z", "x", "y"] {
            b.put(k, k.to_uppercase());
        }
        assert!(a == b);

        let mut c: ChainedMap<&str, i32> = ChainedMap::new();
        for (i, k) in ["y", "z", "x"].iter().enumerate() {
            c.put(*k, i as i32 * 7);
        }
        assert_eq!(a, c);
        let hash = |m: &ChainedMap<&str, i32>| {
            let mut h = DefaultHasher::new();
            m.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&a), hash(&c));

        c.remove("x");
        assert_ne!(a, c);
        c.put("w", 0);
        assert_ne!(a, c);
    }

    /// Invariant: iteration visits every entry exactly once and reports an
    /// exact remaining length.
    #[test]
    fn iteration_visits_each_entry_once() {
        let mut m: ChainedMap<u32, u32> = ChainedMap::new();
        for i in 0..300 {
            m.put(i, i + 1);
        }
        let it = m.iter();
        assert_eq!(it.len(), 300);
        let seen: BTreeSet<u32> = it.map(|(k, _)| *k).collect();
        assert_eq!(seen, (0..300).collect());

        for (_, v) in m.iter_mut() {
            *v *= 2;
        }
        assert_eq!(m.get(&10), Some(&22));
        assert_eq!((&m).into_iter().count(), 300);
    }

    #[test]
    fn debug_renders_as_map() {
        let mut m: ChainedMap<&str, i32> = ChainedMap::new();
        m.put("k", 1);
        assert_eq!(format!("{:?}", m), r#"{"k": 1}"#);
    }
}
