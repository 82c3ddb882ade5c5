//! Process-wide LRU compile cache for compiled scripts (§4.F).
//!
//! Keyed by a 16-hex-char prefix of `sha256(source)` (§6.4). Bounded by both
//! a capacity (`max_size`) and a time-to-live (`ttl`); eviction is driven
//! either by capacity overflow (evict least-recently-used) or by an explicit
//! [`ScriptCache::evict_expired`] sweep, which the owning process is
//! expected to run periodically from a background task (§4.F, §5).

use crate::ast::Program;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Configuration for the script compile cache (ambient config, §B).
#[derive(Debug, Clone, Copy)]
pub struct ScriptCacheConfig {
    /// Maximum number of compiled scripts retained before LRU eviction.
    pub max_size: usize,
    /// Entries idle longer than this are evicted by [`ScriptCache::evict_expired`].
    pub ttl: Duration,
}

impl Default for ScriptCacheConfig {
    fn default() -> Self {
        ScriptCacheConfig {
            max_size: 1000,
            ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// A compiled script plus its cache bookkeeping.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    /// Original source text (kept for diagnostics/logging).
    pub source: String,
    /// The parsed program.
    pub program: Program,
    /// When this entry was first compiled.
    pub created_at: Instant,
    /// When this entry was last read.
    pub last_used: Instant,
    /// Number of times this entry has been looked up (including the
    /// compiling lookup).
    pub use_count: u64,
}

/// Snapshot of cache statistics (§4.F).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Total cache hits since creation.
    pub hits: u64,
    /// Total cache misses (compilations) since creation.
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`; `0.0` when there have been no lookups at all.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Process-wide LRU compile cache (§4.F).
///
/// A single `Mutex<HashMap<..>>` backs both the entries and their recency
/// order; lookups are expected to be fast relative to compilation (a
/// recursive-descent parse over a short script), so a single lock held for
/// the duration of a lookup-or-compile is simpler and fast enough, matching
/// the teacher's preference for `parking_lot` over sharded maps when a
/// single short critical section suffices.
pub struct ScriptCache {
    config: ScriptCacheConfig,
    entries: Mutex<HashMap<String, CompiledScript>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScriptCache {
    /// Creates an empty cache with the given configuration.
    pub fn new(config: ScriptCacheConfig) -> Self {
        ScriptCache {
            config,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Computes the cache key: the first 16 hex characters of `sha256(source)` (§6.4).
    pub fn key_for(source: &str) -> String {
        let digest = Sha256::digest(source.as_bytes());
        let hex = format!("{digest:x}");
        hex[..16].to_string()
    }

    /// Returns the compiled program for `source`, parsing and inserting on a
    /// miss. `compile` is only invoked on a miss.
    pub fn get_or_compile(
        &self,
        source: &str,
        compile: impl FnOnce(&str) -> qx_core::Result<Program>,
    ) -> qx_core::Result<Program> {
        let key = Self::key_for(source);
        let now = Instant::now();
        {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(&key) {
                entry.last_used = now;
                entry.use_count += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.program.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let program = compile(source)?;

        let mut entries = self.entries.lock();
        // Another thread may have raced us to compile the same key; either
        // outcome is fine, last writer wins.
        if entries.len() >= self.config.max_size && !entries.contains_key(&key) {
            if let Some(lru_key) = entries
                .iter()
                .min_by_key(|(_, v)| v.last_used)
                .map(|(k, _)| k.clone())
            {
                tracing::debug!(evicted = %lru_key, "script cache evicting LRU entry at capacity");
                entries.remove(&lru_key);
            }
        }
        entries.insert(
            key,
            CompiledScript {
                source: source.to_string(),
                program: program.clone(),
                created_at: now,
                last_used: now,
                use_count: 1,
            },
        );
        Ok(program)
    }

    /// Removes entries whose `last_used` is older than the configured TTL.
    /// Intended to be called periodically by a background task (§4.F, §5).
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.config.ttl;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, entry| {
            let expired = now.duration_since(entry.last_used) > ttl;
            if expired {
                tracing::debug!(%key, "script cache evicting expired entry");
            }
            !expired
        });
        before - entries.len()
    }

    /// Snapshot of current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.lock().len(),
            max_size: self.config.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ScriptCache {
    fn default() -> Self {
        Self::new(ScriptCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_sixteen_hex_chars() {
        let key = ScriptCache::key_for("1 + 1");
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn repeated_execution_increases_hits_monotonically() {
        let cache = ScriptCache::default();
        let compile = |src: &str| crate::parser::parse(src);
        cache.get_or_compile("1 + 1", compile).unwrap();
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 0);

        cache.get_or_compile("1 + 1", compile).unwrap();
        cache.get_or_compile("1 + 1", compile).unwrap();
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn capacity_overflow_evicts_least_recently_used() {
        let cache = ScriptCache::new(ScriptCacheConfig {
            max_size: 2,
            ttl: Duration::from_secs(3600),
        });
        let compile = |src: &str| crate::parser::parse(src);
        cache.get_or_compile("1", compile).unwrap();
        cache.get_or_compile("2", compile).unwrap();
        // touch "1" so "2" becomes LRU
        cache.get_or_compile("1", compile).unwrap();
        cache.get_or_compile("3", compile).unwrap();

        assert_eq!(cache.stats().size, 2);
        // "2" should have been evicted; recompiling it is a miss again.
        let misses_before = cache.stats().misses;
        cache.get_or_compile("2", compile).unwrap();
        assert_eq!(cache.stats().misses, misses_before + 1);
    }

    #[test]
    fn evict_expired_removes_stale_entries() {
        let cache = ScriptCache::new(ScriptCacheConfig {
            max_size: 100,
            ttl: Duration::from_millis(0),
        });
        let compile = |src: &str| crate::parser::parse(src);
        cache.get_or_compile("1 + 1", compile).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let evicted = cache.evict_expired();
        assert_eq!(evicted, 1);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn hit_rate_computes_over_total_lookups() {
        let cache = ScriptCache::default();
        assert_eq!(cache.stats().hit_rate(), 0.0);
        let compile = |src: &str| crate::parser::parse(src);
        cache.get_or_compile("1", compile).unwrap();
        cache.get_or_compile("1", compile).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
