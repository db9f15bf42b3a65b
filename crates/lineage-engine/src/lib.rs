//! Incremental inheritance resolution: cache, engine and pipeline adapter

pub mod cache;
pub mod engine;
pub mod reporter;
pub mod stream;


#[cfg(test)]
pub mod test_utils;

pub use cache::{CACHE_VERSION, CacheEntry, PruneReport, ResolutionCache, ResolveContext, Resolved};
pub use engine::{BatchOutcome, Engine};
pub use reporter::{ErrorRecord, ErrorReporter};
pub use stream::{SourceFile, StreamEvent, run_stream};
