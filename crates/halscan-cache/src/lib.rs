//! halscan Cache
//!
//! The four persistent caches that accumulate facts across every translation
//! unit of a build. Each cache is merged independently under its own
//! cross-process lock: load, fold in the current TU, write back.

mod error;
pub mod kinds;
pub mod lock;
mod store;

pub use error::CacheError;
pub use kinds::{ApiCache, CacheSpec, LoopCache, StructNameCache, SuccessCache};
pub use lock::{LockFile, LockGuard, LockOwner, LockState, WaitOutcome};
pub use store::{load as load_cache, CacheStore, MergeReport};
