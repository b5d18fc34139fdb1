//! halscan Core
//!
//! Shared types for the halscan fact-extraction engine: configuration,
//! errors, source locations and the records persisted in the caches.

pub mod config;
pub mod error;
pub mod facts;
pub mod location;
pub mod types;

pub use config::{AnalysisConfig, CachePaths, Config, LockConfig};
pub use error::{Error, Result};
pub use facts::TuFacts;
pub use location::{LoopSpan, PresumedLoc, RawLoc, RawRange};
pub use types::*;
