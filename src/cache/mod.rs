//! Source caching policy and the per-walk request memo

pub mod memo;

use crate::core::config::CacheConfig;

pub use memo::{settle, AsyncMemo, MemoLookup};

/// How providers should treat their own caches for one request
///
/// Passed to every provider call. Cheap to clone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCacheContext {
    /// Skip any on-disk HTTP or metadata cache
    pub no_cache: bool,
    /// Do not keep downloaded packages in the global folder
    pub direct_download: bool,
    /// Bypass in-memory listings; set when retrying a vanished package
    pub refresh_memory_cache: bool,
}

impl SourceCacheContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[cache]` config section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            no_cache: config.no_cache,
            direct_download: config.direct_download,
            refresh_memory_cache: false,
        }
    }

    /// Copy of this context that forces providers to re-list
    pub fn with_refresh_memory_cache(&self) -> Self {
        Self {
            refresh_memory_cache: true,
            ..*self
        }
    }
}
