use fieldgate::statistics::{StatisticsError, StatisticsNode, StatisticsTree};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[test]
fn repeated_increment_snapshot() {
    let tree = StatisticsTree::new();
    tree.increment("a.b.c", 1).unwrap();
    tree.increment("a.b.c", 1).unwrap();

    assert_eq!(tree.snapshot_value().unwrap(), json!({"a": {"b": {"c": 2}}}));
}

#[test]
fn conflicting_paths_leave_tree_untouched() {
    let tree = StatisticsTree::new();
    tree.increment("a.b", 1).unwrap();
    let before = tree.snapshot().unwrap();

    let err = tree.increment("a.b.c", 1).unwrap_err();
    assert!(err.is_path_conflict());
    assert!(matches!(err, StatisticsError::LeafUsedAsBranch { .. }));
    assert_eq!(tree.snapshot().unwrap(), before);

    // deeper conflicts do not leave half-built branches either
    let err = tree.increment("a.b.x.y.z", 1).unwrap_err();
    assert!(err.is_path_conflict());
    assert_eq!(tree.snapshot().unwrap(), before);

    // the leaf itself keeps working
    assert_eq!(tree.increment("a.b", 4).unwrap(), 5);
}

#[test]
fn siblings_are_independent() {
    let tree = StatisticsTree::new();
    tree.increment("/user.request", 1).unwrap();
    tree.increment("/user.total_size", 17).unwrap();
    tree.increment("/user.args.valid", 2).unwrap();
    tree.increment("/order.request", 1).unwrap();

    assert_eq!(
        tree.snapshot().unwrap(),
        r#"{"/order":{"request":1},"/user":{"args":{"valid":2},"request":1,"total_size":17}}"#
    );
}

#[test]
fn concurrent_increments_are_not_lost() {
    const THREADS: i64 = 8;
    const PER_THREAD: i64 = 2_000;

    let tree = Arc::new(StatisticsTree::new());
    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            let tree = tree.clone();
            scope.spawn(move || {
                for _ in 0..PER_THREAD {
                    tree.increment("hot.path.counter", 1).unwrap();
                    tree.increment("hot.other", 2).unwrap();
                }
            });
        }
        // snapshots interleave with writers and always parse
        scope.spawn(|| {
            for _ in 0..200 {
                let text = tree.snapshot().unwrap();
                serde_json::from_str::<serde_json::Value>(&text).unwrap();
            }
        });
    });

    assert_eq!(tree.counter("hot.path.counter"), Some(THREADS * PER_THREAD));
    assert_eq!(tree.counter("hot.other"), Some(2 * THREADS * PER_THREAD));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_from_tasks() {
    let tree = Arc::new(StatisticsTree::new());
    let mut handles = Vec::new();
    for _ in 0..16 {
        let tree = tree.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..500 {
                tree.increment("/x.request", 1).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(tree.counter("/x.request"), Some(16 * 500));
}

fn segment() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string)
}

// Leaves always sit at depth 3, so no generated path can conflict.
fn leaf_path() -> impl Strategy<Value = String> {
    (segment(), segment(), segment()).prop_map(|(x, y, z)| format!("{x}.{y}.{z}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn snapshot_round_trips_to_expected_sums(
        ops in prop::collection::vec((leaf_path(), -5i64..50), 1..40)
    ) {
        let tree = StatisticsTree::new();
        let mut expected: BTreeMap<String, i64> = BTreeMap::new();
        for (path, delta) in &ops {
            tree.increment(path, *delta).unwrap();
            *expected.entry(path.clone()).or_default() += delta;
        }

        let decoded: BTreeMap<String, StatisticsNode> =
            serde_json::from_str(&tree.snapshot().unwrap()).unwrap();

        let mut flattened = BTreeMap::new();
        flatten("", &decoded, &mut flattened);
        prop_assert_eq!(flattened, expected);
    }
}

fn flatten(
    prefix: &str,
    nodes: &BTreeMap<String, StatisticsNode>,
    out: &mut BTreeMap<String, i64>,
) {
    for (key, node) in nodes {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match node {
            StatisticsNode::Leaf(value) => {
                out.insert(path, *value);
            }
            StatisticsNode::Branch(children) => flatten(&path, children, out),
        }
    }
}
