use super::*;

use crate::tree::NodeId;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Check routing, reachability and bookkeeping over every stored node.
fn validate_tree<V>(t: &QuadTree<V>) {
    // Each node carries the (pivot, quadrant) pairs of the path that led to it.
    let mut stack: Vec<(NodeId, Vec<(Point, Quadrant)>)> =
        t.root.map(|id| (id, Vec::new())).into_iter().collect();

    let mut reachable = 0usize;
    let mut tombstones = 0usize;
    while let Some((id, path)) = stack.pop() {
        let node = t.nodes.get(id);
        reachable += 1;

        for (pivot, quadrant) in &path {
            assert_eq!(
                locate(pivot, &node.key),
                *quadrant,
                "{:?} is not in the {:?} quadrant of ancestor {:?}",
                node.key,
                quadrant,
                pivot
            );
        }

        assert_eq!(t.find(&node.key), Some(id), "{:?} is shadowed on its own path", node.key);
        if node.is_tombstone() {
            tombstones += 1;
        }

        for quadrant in Quadrant::ALL {
            if let Some(child) = node.children[quadrant.index()] {
                let mut child_path = path.clone();
                child_path.push((node.key, quadrant));
                stack.push((child, child_path));
            }
        }
    }

    assert_eq!(reachable, t.node_count(), "every stored node must be reachable");
    assert_eq!(tombstones, t.tombstone_count(), "tombstone count out of sync");
    assert_eq!(reachable - tombstones, t.len());
}

/// Keys that are pairwise apart by more than epsilon never share a tree.
fn assert_distinct_keys<V>(t: &QuadTree<V>) {
    let keys: Vec<Point> = t.iter().map(|(k, _)| k).collect();
    for (i, a) in keys.iter().enumerate() {
        for b in &keys[i + 1..] {
            assert!(!a.approx_eq(b), "duplicate key {a:?}");
        }
    }
}

fn grid_key() -> impl Strategy<Value = (i32, i32)> {
    // A small grid so that inserts, removals and revivals collide often.
    (-4i32..=4, -4i32..=4)
}

fn point((x, y): (i32, i32)) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "grid_key()")] (i32, i32), u32),
    #[proptest(weight = 30)]
    Remove(#[proptest(strategy = "grid_key()")] (i32, i32)),
    #[proptest(weight = 19)]
    Get(#[proptest(strategy = "grid_key()")] (i32, i32)),
    #[proptest(weight = 1)]
    Compact,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=500)
}

/// Infinite and extreme coordinates, pairwise apart by more than epsilon.
const EDGE_KEYS: [(f64, f64); 10] = [
    (0.0, 0.0),
    (f64::INFINITY, 1.0),
    (f64::INFINITY, -1.0),
    (f64::INFINITY, f64::INFINITY),
    (f64::NEG_INFINITY, f64::NEG_INFINITY),
    (f64::MAX, f64::MIN),
    (f64::MIN, f64::MAX),
    (0.0, f64::NEG_INFINITY),
    (-1.0, 1.0),
    (-1e-16, 5.0),
];

/// Within epsilon of the last edge key, but east of the origin.
const NEAR_KEY: (f64, f64) = (1e-16, 5.0);

fn edge_point(index: usize) -> Point {
    EDGE_KEYS.get(index).copied().unwrap_or(NEAR_KEY).into()
}

#[derive(Clone, Debug)]
enum EdgeOp {
    Insert(usize, u32),
    Remove(usize),
    Compact,
}

/// Operations over the first `keys` entries of `EDGE_KEYS`, followed by
/// `NEAR_KEY`.
fn edge_ops(keys: usize) -> impl Strategy<Value = Vec<EdgeOp>> {
    let op = prop_oneof![
        5 => (0..keys, any::<u32>()).prop_map(|(k, v)| EdgeOp::Insert(k, v)),
        3 => (0..keys).prop_map(EdgeOp::Remove),
        1 => Just(EdgeOp::Compact),
    ];
    prop::collection::vec(op, 0..=200)
}

fn entries(t: &QuadTree<u32>) -> Vec<((u64, u64), u32)> {
    let mut out: Vec<((u64, u64), u32)> =
        t.iter().map(|(k, v)| ((k.x.to_bits(), k.y.to_bits()), *v)).collect();
    out.sort_unstable();
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: QuadTree<u32> = QuadTree::new();
        let mut m: BTreeMap<(i32, i32), u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.insert(point(key), value), Ok(m.insert(key, value)));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&point(key)), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&point(key)).copied(), m.get(&key).copied());
                    prop_assert_eq!(t.contains_key(&point(key)), m.contains_key(&key));
                }
                Op::Compact => {
                    prop_assert!(t.compact().is_ok());
                    prop_assert_eq!(t.tombstone_count(), 0);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        assert_distinct_keys(&t);
        let mut got: Vec<((i32, i32), u32)> =
            t.iter().map(|(k, v)| ((k.x as i32, k.y as i32), *v)).collect();
        got.sort_unstable();
        let expected: Vec<((i32, i32), u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_facade_status(ops in ops_strategy()) {
        let mut handle = map::init::<u32>();
        let mut m: BTreeMap<(i32, i32), u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let expected = match m.insert(key, value) {
                        Some(_) => Status::SuccessReplaced,
                        None => Status::Success,
                    };
                    prop_assert_eq!(map::add(handle.as_mut(), point(key), Some(value)), expected);
                }
                Op::Remove(key) => {
                    let expected = match m.remove(&key) {
                        Some(_) => Status::Success,
                        None => Status::Failure,
                    };
                    prop_assert_eq!(map::remove(handle.as_mut(), point(key)), expected);
                }
                Op::Get(key) => {
                    prop_assert_eq!(map::get(handle.as_ref(), point(key)), m.get(&key));
                    prop_assert_eq!(map::has(handle.as_ref(), point(key)), m.contains_key(&key));
                }
                Op::Compact => {}
            }

            prop_assert_eq!(map::size(handle.as_ref()), m.len());
        }
    }

    #[test]
    fn prop_compact_threshold(ops in ops_strategy(), threshold in 1usize..=4) {
        let config = Config { compaction_threshold: Some(threshold), ..Config::default() };
        let mut t: QuadTree<u32> = QuadTree::with_config(config).unwrap();
        let mut m: BTreeMap<(i32, i32), u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.insert(point(key), value), Ok(m.insert(key, value)));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&point(key)), m.remove(&key));
                    prop_assert!(t.tombstone_count() < threshold);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&point(key)).copied(), m.get(&key).copied());
                }
                Op::Compact => {}
            }
        }

        validate_tree(&t);
        prop_assert_eq!(t.len(), m.len());
    }

    #[test]
    fn prop_equivalence_edge_keys(ops in edge_ops(EDGE_KEYS.len())) {
        let mut t: QuadTree<u32> = QuadTree::new();
        let mut m: BTreeMap<usize, u32> = BTreeMap::new();

        for op in ops {
            match op {
                EdgeOp::Insert(i, value) => {
                    prop_assert_eq!(t.insert(edge_point(i), value), Ok(m.insert(i, value)));
                }
                EdgeOp::Remove(i) => {
                    prop_assert_eq!(t.remove(&edge_point(i)), m.remove(&i));
                }
                EdgeOp::Compact => {
                    prop_assert!(t.compact().is_ok());
                    prop_assert_eq!(t.tombstone_count(), 0);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        assert_distinct_keys(&t);
        for i in 0..EDGE_KEYS.len() {
            prop_assert_eq!(t.get(&edge_point(i)).copied(), m.get(&i).copied());
        }
    }

    #[test]
    fn prop_compact_keeps_entries(ops in edge_ops(EDGE_KEYS.len() + 1)) {
        let mut t: QuadTree<u32> = QuadTree::new();

        for op in ops {
            match op {
                EdgeOp::Insert(i, value) => {
                    prop_assert!(t.insert(edge_point(i), value).is_ok());
                }
                EdgeOp::Remove(i) => {
                    t.remove(&edge_point(i));
                }
                EdgeOp::Compact => {
                    let before = entries(&t);
                    let tombstones = t.tombstone_count();
                    let purged = t.compact();
                    prop_assert!(matches!(purged, Ok(n) if n == 0 || n == tombstones));
                    prop_assert_eq!(entries(&t), before);
                }
            }

            validate_tree(&t);
        }
    }
}

/// Visit every ordering of `items` in place (Heap's algorithm).
fn for_each_permutation<T>(items: &mut [T], mut f: impl FnMut(&[T])) {
    let mut swaps = vec![0usize; items.len()];
    f(items);
    let mut i = 1;
    while i < items.len() {
        if swaps[i] < i {
            let j = if i % 2 == 0 { 0 } else { swaps[i] };
            items.swap(j, i);
            f(items);
            swaps[i] += 1;
            i = 1;
        } else {
            swaps[i] = 0;
            i += 1;
        }
    }
}

fn small_set() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(2.0, 2.0),
        Point::new(-2.0, 2.0),
        Point::new(-2.0, -2.0),
        Point::new(2.0, -2.0),
        Point::new(1.0, 3.0),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let mut keys = small_set();
    let mut orders = 0;

    for_each_permutation(&mut keys, |perm| {
        orders += 1;
        let mut t: QuadTree<usize> = QuadTree::new();
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.insert(*k, i), Ok(None));
        }

        validate_tree(&t);
        assert_distinct_keys(&t);
        assert_eq!(t.len(), perm.len());
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.get(k), Some(&i));
        }
    });
    assert_eq!(orders, 720);
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base: QuadTree<usize> = QuadTree::new();
    for (i, k) in keys.iter().enumerate() {
        base.insert(*k, i).unwrap();
    }

    let mut order = keys.clone();
    for_each_permutation(&mut order, |perm| {
        let mut t = base.clone();
        let mut remaining = keys.len();

        for k in perm {
            let expected = keys.iter().position(|key| key == k);
            assert_eq!(t.remove(k), expected);
            remaining -= 1;
            assert_eq!(t.len(), remaining);
            validate_tree(&t);

            // Everything not yet removed stays reachable.
            for (i, key) in keys.iter().enumerate() {
                let removed = perm.iter().take_while(|p| *p != k).any(|p| p == key) || key == k;
                assert_eq!(t.get(key), (!removed).then_some(&i));
            }
        }

        assert_eq!(t.len(), 0);
        let tombstones = t.tombstone_count();
        assert_eq!(t.compact(), Ok(tombstones));
        assert_eq!(t.tombstone_count(), 0);
        assert_eq!(t.node_count(), 0);
        assert!(t.root.is_none());
    });
}
