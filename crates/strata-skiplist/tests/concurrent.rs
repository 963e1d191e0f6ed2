use std::sync::Arc;
use std::thread;

use strata_iter::RowIter;
use strata_skiplist::Skiplist;

const THREADS: usize = 8;
const PER_THREAD: usize = 1000;

/// 8 threads each insert 1000 unique keys concurrently; every insert must be
/// reported accepted, the final iteration order must match the full sorted
/// key set, and every key must be independently findable afterward.
#[test]
fn concurrent_inserts_from_many_threads_are_all_visible_and_ordered() {
    let list = Arc::new(Skiplist::new(1 << 20, THREADS * PER_THREAD + 1, 1 << 16));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let n = t * PER_THREAD + i;
                    let key = format!("foo{n:06}");
                    let value = format!("bar{n:06}");
                    assert!(list.insert(key.as_bytes(), value.as_bytes(), 1));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut expected: Vec<Vec<u8>> =
        (0..THREADS * PER_THREAD).map(|n| format!("foo{n:06}").into_bytes()).collect();
    expected.sort();

    let mut iter = list.iter();
    let mut found = Vec::new();
    while let Some(row) = RowIter::next(&mut iter) {
        found.push(row.key.to_vec());
    }
    assert_eq!(found, expected);

    for key in &expected {
        assert!(list.find(key).is_some(), "key {:?} should be findable", String::from_utf8_lossy(key));
    }
}
