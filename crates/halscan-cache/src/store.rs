//! Load-merge-write of the persistent caches

use crate::error::CacheError;
use crate::kinds::{ApiCache, CacheSpec, LoopCache, StructNameCache, SuccessCache};
use crate::lock::{LockFile, LockState, WaitOutcome};
use halscan_core::{CacheKind, CachePaths, LockConfig, Result, TuFacts};
use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Statistics of one successful cache merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub kind: CacheKind,
    /// Records read back from the existing file
    pub loaded: usize,
    /// Records written after the merge
    pub written: usize,
}

/// The four caches of a build
#[derive(Debug, Clone)]
pub struct CacheStore {
    paths: CachePaths,
    lock: LockConfig,
}

impl CacheStore {
    /// Create a store; all four paths must be set
    pub fn new(paths: CachePaths, lock: LockConfig) -> Result<Self> {
        paths.validate()?;
        Ok(Self { paths, lock })
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Merge every cache in turn.
    ///
    /// A failure only skips the cache it happened in.
    pub fn merge_all(&self, facts: &mut TuFacts) -> Vec<(CacheKind, std::result::Result<MergeReport, CacheError>)> {
        CacheKind::ALL
            .into_iter()
            .map(|kind| {
                let result = match kind {
                    CacheKind::SuccessValue => self.merge::<SuccessCache>(facts),
                    CacheKind::Api => self.merge::<ApiCache>(facts),
                    CacheKind::Loop => self.merge::<LoopCache>(facts),
                    CacheKind::StructName => self.merge::<StructNameCache>(facts),
                };
                if let Err(err) = &result {
                    warn!(
                        "Failed to update {} cache {:?}: {}. Data lost",
                        kind,
                        self.paths.get(kind),
                        err
                    );
                }
                (kind, result)
            })
            .collect()
    }

    /// Fold the persisted content of cache `C` into `facts` and write the
    /// result back, all while holding that cache's lock.
    pub fn merge<C: CacheSpec>(&self, facts: &mut TuFacts) -> std::result::Result<MergeReport, CacheError> {
        let path = self.paths.get(C::KIND);
        ensure_parent(path)?;

        self.with_lock(path, || -> std::result::Result<MergeReport, CacheError> {
            let loaded = load::<C>(path)?;
            let loaded_len = loaded.len();
            C::fold(facts, loaded);

            let records = C::records(facts);
            write::<C>(path, &records)?;
            debug!(
                "Merged {} cache {:?}: {} loaded, {} written",
                C::KIND,
                path,
                loaded_len,
                records.len()
            );
            Ok(MergeReport {
                kind: C::KIND,
                loaded: loaded_len,
                written: records.len(),
            })
        })
    }

    /// Read cache `C` without taking its lock.
    ///
    /// Only for best-effort peeking; a missing or malformed file reads as empty.
    pub fn peek<C: CacheSpec>(&self) -> std::result::Result<Vec<C::Record>, CacheError> {
        load::<C>(self.paths.get(C::KIND))
    }

    /// Run `f` under the exclusive lock of `path`.
    ///
    /// Never gives up: lock-creation errors clear the lock file and retry,
    /// and waiting on another owner retries after unlock, owner death or
    /// timeout alike. A stuck owner therefore stalls this process.
    fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let max_backoff = Duration::from_millis(self.lock.max_backoff_ms);
        let timeout = Duration::from_secs(self.lock.wait_timeout_secs);
        let lock = LockFile::new(path).with_max_backoff(max_backoff);
        let mut pause = Duration::from_millis(1);

        loop {
            match lock.try_acquire() {
                LockState::Owned(guard) => {
                    let result = f();
                    drop(guard);
                    return result;
                }
                LockState::Error(err) => {
                    info!("Failed to acquire lock for {:?}: {}", path, err);
                    if let Err(err) = lock.unsafe_remove() {
                        debug!("Failed to clear lock {:?}: {}", lock.lock_path(), err);
                    }
                    thread::sleep(pause);
                    pause = (pause * 2).min(max_backoff);
                }
                LockState::Shared(owner) => match lock.wait_for_unlock(&owner, timeout) {
                    WaitOutcome::Unlocked => {}
                    WaitOutcome::OwnerDied => {
                        debug!("Owner {:?} of {:?} died", owner.pid(), lock.lock_path());
                    }
                    WaitOutcome::Timeout => {
                        info!("Timeout when waiting for {:?} to unlock", path);
                    }
                },
            }
        }
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Read the records of cache `C` at `path`.
///
/// A missing or empty file is an empty cache. A malformed one is logged and
/// also treated as empty; whatever it held is lost once the merge writes.
pub fn load<C: CacheSpec>(path: &Path) -> std::result::Result<Vec<C::Record>, CacheError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_yaml::from_str::<Option<Vec<C::Record>>>(&text) {
        Ok(records) => Ok(records.unwrap_or_default()),
        Err(err) => {
            warn!("Failed to read data from {:?}: {}", path, err);
            Ok(Vec::new())
        }
    }
}

/// Replace the content of `path` with `records`.
///
/// Goes through a sibling temporary file and a rename so readers that skip
/// the lock never observe a partial write.
fn write<C: CacheSpec>(path: &Path, records: &[C::Record]) -> std::result::Result<(), CacheError> {
    let text = serde_yaml::to_string(records)?;
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp-{}", std::process::id()));

    if let Err(err) = fs::write(&tmp, text).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use halscan_core::{ApiRecord, LoopSpan, SuccessValueRecord};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_in(dir: &Path) -> CacheStore {
        CacheStore::new(CachePaths::with_defaults(dir), LockConfig::default()).unwrap()
    }

    #[test]
    fn test_store_requires_all_paths() {
        let mut paths = CachePaths::with_defaults(Path::new("out"));
        paths.loops = Default::default();
        assert!(CacheStore::new(paths, LockConfig::default()).is_err());
    }

    #[test]
    fn test_first_merge_creates_files() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp.path().join("nested").join("out"));

        let mut facts = TuFacts::new();
        facts.record_success("HAL_Init", 0);
        facts.struct_names.insert("GPIO_TypeDef".into());

        let results = store.merge_all(&mut facts);
        assert!(results.iter().all(|(_, r)| r.is_ok()));

        let succ = fs::read_to_string(&store.paths().succ_ret).unwrap();
        assert_eq!(succ, "- func: HAL_Init\n  succ_val: 0\n");
        let periph = fs::read_to_string(&store.paths().periph_struct).unwrap();
        assert_eq!(periph, "- GPIO_TypeDef\n");
        assert_eq!(fs::read_to_string(&store.paths().api).unwrap().trim(), "[]");
        assert!(!temp.path().join("nested/out/api.yaml.lock").exists());
    }

    #[test]
    fn test_reads_llvm_style_documents() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());
        fs::write(
            &store.paths().loops,
            "---\n- file:            /src/hal.c\n  begin_line:      10\n  begin_column:    3\n  end_line:        10\n  end_column:      28\n...\n",
        )
        .unwrap();
        fs::write(&store.paths().api, "--- []\n").unwrap();

        let mut facts = TuFacts::new();
        let report = store.merge::<LoopCache>(&mut facts).unwrap();
        assert_eq!(report.loaded, 1);
        assert!(facts.loops.contains(&LoopSpan::new("/src/hal.c", 10, 3, 10, 28)));

        let report = store.merge::<ApiCache>(&mut facts).unwrap();
        assert_eq!(report.loaded, 0);
    }

    #[test]
    fn test_malformed_cache_is_treated_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());
        fs::write(&store.paths().succ_ret, "{ this is: [not, a sequence").unwrap();

        let mut facts = TuFacts::new();
        facts.record_success("HAL_Delay", 0);
        let report = store.merge::<SuccessCache>(&mut facts).unwrap();

        assert_eq!(report.loaded, 0);
        assert_eq!(report.written, 1);
        assert_eq!(
            store.peek::<SuccessCache>().unwrap(),
            vec![SuccessValueRecord::new("HAL_Delay", 0)]
        );
    }

    #[test]
    fn test_api_cache_is_monotonic() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());

        let mut first = TuFacts::new();
        first.declared.insert("HAL_SPI_Init".into());
        first.defined.insert("HAL_SPI_Init".into());
        store.merge::<ApiCache>(&mut first).unwrap();

        // a later TU only sees the prototype
        let mut second = TuFacts::new();
        second.declared.insert("HAL_SPI_Init".into());
        second.declared.insert("HAL_I2C_Init".into());
        second.defined.insert("HAL_I2C_Init".into());
        store.merge::<ApiCache>(&mut second).unwrap();

        let mut third = TuFacts::new();
        store.merge::<ApiCache>(&mut third).unwrap();

        assert_eq!(
            store.peek::<ApiCache>().unwrap(),
            vec![ApiRecord::new("HAL_I2C_Init"), ApiRecord::new("HAL_SPI_Init")]
        );
    }

    #[test]
    fn test_success_cache_first_writer_wins() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());

        let mut first = TuFacts::new();
        first.record_success("HAL_Init", 0);
        store.merge::<SuccessCache>(&mut first).unwrap();

        let mut second = TuFacts::new();
        second.record_success("HAL_Init", 1);
        second.record_success("HAL_RCC_Config", 0);
        store.merge::<SuccessCache>(&mut second).unwrap();

        assert_eq!(
            store.peek::<SuccessCache>().unwrap(),
            vec![
                SuccessValueRecord::new("HAL_Init", 0),
                SuccessValueRecord::new("HAL_RCC_Config", 0),
            ]
        );
    }

    #[test]
    fn test_stale_lock_does_not_block_merge() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());
        let lock_path = temp.path().join("periph-struct.yaml.lock");
        fs::write(&lock_path, "not-a-pid\n").unwrap();

        let mut facts = TuFacts::new();
        facts.struct_names.insert("USART_TypeDef".into());
        store.merge::<StructNameCache>(&mut facts).unwrap();

        assert!(!lock_path.exists());
        assert_eq!(store.peek::<StructNameCache>().unwrap(), vec!["USART_TypeDef".to_string()]);
    }

    #[test]
    fn test_merge_outlasts_a_wait_timeout() {
        let temp = TempDir::new().unwrap();
        let lock = LockConfig {
            wait_timeout_secs: 1,
            max_backoff_ms: 5,
        };
        let store = CacheStore::new(CachePaths::with_defaults(temp.path()), lock).unwrap();

        // a live owner (this process) holding the lock past the first timeout
        let guard = match LockFile::new(&store.paths().api).try_acquire() {
            LockState::Owned(guard) => guard,
            other => panic!("expected to own the lock, got {:?}", other),
        };
        let holder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(1500));
            drop(guard);
        });

        let start = std::time::Instant::now();
        let mut facts = TuFacts::new();
        facts.declared.insert("HAL_UART_Init".into());
        facts.defined.insert("HAL_UART_Init".into());
        let report = store.merge::<ApiCache>(&mut facts).unwrap();
        holder.join().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(report.written, 1);
        assert_eq!(store.peek::<ApiCache>().unwrap(), vec![ApiRecord::new("HAL_UART_Init")]);
        assert!(!temp.path().join("api.yaml.lock").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_recovers_from_lock_error() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());
        // a self-referencing symlink: reading the owner fails with ELOOP until
        // the error branch removes the link
        let lock_path = temp.path().join("loops.yaml.lock");
        std::os::unix::fs::symlink(&lock_path, &lock_path).unwrap();
        assert!(matches!(LockFile::new(&store.paths().loops).try_acquire(), LockState::Error(_)));

        let mut facts = TuFacts::new();
        facts.loops.insert(LoopSpan::new("/src/hal_uart.c", 42, 5, 42, 31));
        let report = store.merge::<LoopCache>(&mut facts).unwrap();

        assert_eq!(report.written, 1);
        assert!(fs::symlink_metadata(&lock_path).is_err());
        assert_eq!(
            store.peek::<LoopCache>().unwrap(),
            vec![LoopSpan::new("/src/hal_uart.c", 42, 5, 42, 31)]
        );
    }

    #[test]
    fn test_unreadable_cache_skips_only_that_cache() {
        let temp = TempDir::new().unwrap();
        let store = store_in(temp.path());
        // a directory where the loop cache should be: reading fails with an IO error
        fs::create_dir_all(&store.paths().loops).unwrap();

        let mut facts = TuFacts::new();
        facts.struct_names.insert("TIM_TypeDef".into());
        let results = store.merge_all(&mut facts);

        for (kind, result) in results {
            match kind {
                CacheKind::Loop => assert!(matches!(result, Err(CacheError::IoError(_)))),
                _ => assert!(result.is_ok(), "{} failed", kind),
            }
        }
        assert_eq!(store.peek::<StructNameCache>().unwrap(), vec!["TIM_TypeDef".to_string()]);
    }
}
