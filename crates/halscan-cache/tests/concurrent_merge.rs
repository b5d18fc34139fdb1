//! Concurrent writers merging into the same caches
//!
//! Each thread stands in for a compiler process working on its own TU.

use halscan_cache::{ApiCache, CacheStore, StructNameCache, SuccessCache};
use halscan_core::{CachePaths, LockConfig, TuFacts};
use std::collections::BTreeSet;
use std::path::Path;
use std::thread;
use tempfile::TempDir;

const WRITERS: usize = 4;
const UNITS_PER_WRITER: usize = 15;

fn quick_lock() -> LockConfig {
    LockConfig {
        wait_timeout_secs: 1,
        max_backoff_ms: 5,
    }
}

fn store_in(dir: &Path) -> CacheStore {
    CacheStore::new(CachePaths::with_defaults(dir), quick_lock()).unwrap()
}

#[test]
fn test_parallel_merges_lose_nothing() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_path_buf();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let store = store_in(&dir);
            thread::spawn(move || {
                for unit in 0..UNITS_PER_WRITER {
                    let mut facts = TuFacts::new();
                    let name = format!("periph_{}_{}_t", writer, unit);
                    facts.struct_names.insert(name);
                    let func = format!("HAL_W{}_U{}_Init", writer, unit);
                    facts.record_success(&func, 0);
                    facts.declared.insert(func.clone());
                    facts.defined.insert(func);

                    for (kind, result) in store.merge_all(&mut facts) {
                        assert!(result.is_ok(), "{} merge failed: {:?}", kind, result);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = store_in(&dir);
    let names: BTreeSet<String> = store.peek::<StructNameCache>().unwrap().into_iter().collect();
    assert_eq!(names.len(), WRITERS * UNITS_PER_WRITER);
    assert!(names.contains("periph_3_14_t"));

    assert_eq!(store.peek::<SuccessCache>().unwrap().len(), WRITERS * UNITS_PER_WRITER);
    assert_eq!(store.peek::<ApiCache>().unwrap().len(), WRITERS * UNITS_PER_WRITER);

    // every lock was released
    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.ends_with(".yaml"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);
}

#[test]
fn test_racing_inferences_keep_one_value() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_path_buf();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let store = store_in(&dir);
            thread::spawn(move || {
                let mut facts = TuFacts::new();
                facts.record_success("HAL_Shared", writer as i64);
                store.merge::<SuccessCache>(&mut facts).unwrap();
                facts.success["HAL_Shared"]
            })
        })
        .collect();

    let seen: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let persisted = store_in(&dir).peek::<SuccessCache>().unwrap();

    assert_eq!(persisted.len(), 1);
    // whoever merged first decided the value, and everyone after adopted it
    let winner = persisted[0].value;
    assert_eq!(seen.iter().filter(|v| **v == winner).count(), WRITERS);
}
