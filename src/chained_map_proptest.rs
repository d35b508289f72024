#![cfg(test)]

// Property tests for ChainedMap kept inside the crate so they can reuse the
// test hashers from the unit-test module.

use crate::chained_map::tests::ConstBuildHasher;
use crate::{ChainedMap, MapConfig};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations shrink toward earlier keys and shorter op lists.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Snapshot,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Put(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Snapshot),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Small tables so rehashing happens within short op sequences.
fn small_config() -> MapConfig {
    MapConfig::new().initial_capacity(2).load_threshold(1.5)
}

// Drives `sut` through `ops` alongside a std HashMap model.
// Invariants exercised after every op:
// - `len`/`is_empty` parity with the model.
// - A full iteration yields exactly `len` entries, each once, matching the model.
// - `len / bucket_count` never exceeds the load threshold.
// - put returns the previous value (upsert); remove returns the removed value
//   once and `None` thereafter.
fn run_state_machine<S: BuildHasher>(
    mut sut: ChainedMap<String, i32, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();
    let threshold = sut.config().get_load_threshold();

    for op in ops {
        match op {
            Op::Put(i, v) => {
                let k = pool[i].clone();
                let prev = sut.put(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
            }
            Op::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k.as_str()), model.remove(k));
                prop_assert!(!sut.contains_key(k.as_str()));
                prop_assert_eq!(sut.remove(k.as_str()), None);
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k.as_str()), model.get(k));
                prop_assert_eq!(sut.contains_key(k.as_str()), model.contains_key(k));
            }
            Op::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.contains_key(&s));
            }
            Op::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k.as_str()), model.get_mut(k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut disagrees with model for {:?}", k),
                }
            }
            Op::Iterate => {
                let s_pairs: BTreeSet<_> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m_pairs: BTreeSet<_> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s_pairs, m_pairs);
            }
            Op::Snapshot => {
                let snap = sut.key_set();
                prop_assert_eq!(snap.len(), model.len());
                for k in model.keys() {
                    prop_assert!(snap.contains(k.as_str()));
                }
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), sut.config().get_initial_capacity());
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.iter().count(), sut.len());
        prop_assert_eq!(sut.entry_set().len(), sut.len());
        prop_assert!(
            sut.load_factor() <= threshold,
            "load {} over threshold {}",
            sut.load_factor(),
            threshold
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: ChainedMap<String, i32> = ChainedMap::with_config(small_config()).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }

    // Worst-case collisions: every key shares one chain, so equality alone
    // must resolve lookups, replacements, and removals.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: ChainedMap<String, i32, ConstBuildHasher> =
            ChainedMap::with_config_and_hasher(small_config(), ConstBuildHasher).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}

// Property: maps built from the same keys compare equal regardless of
// insertion order and values, and hash alike.
proptest! {
    #[test]
    fn prop_key_set_equality(
        keys in proptest::collection::hash_set("[a-z]{1,4}", 0..40),
        seed in any::<u64>()
    ) {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let forward: Vec<String> = keys.iter().cloned().collect();
        let mut shuffled = forward.clone();
        // Deterministic rotation keyed by the seed is enough to vary order.
        if !shuffled.is_empty() {
            let n = (seed as usize) % shuffled.len();
            shuffled.rotate_left(n);
            shuffled.reverse();
        }

        let mut a: ChainedMap<String, u64> = ChainedMap::with_config(small_config()).unwrap();
        let mut b: ChainedMap<String, u64> = ChainedMap::new();
        for k in forward {
            a.put(k, seed);
        }
        for (i, k) in shuffled.into_iter().enumerate() {
            b.put(k, i as u64);
        }
        prop_assert!(a == b);

        let digest = |m: &ChainedMap<String, u64>| {
            let mut h = DefaultHasher::new();
            m.hash(&mut h);
            h.finish()
        };
        prop_assert_eq!(digest(&a), digest(&b));
    }
}
