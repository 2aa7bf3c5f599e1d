// index-gate-core/src/runtime/facade.rs
// ============================================================================
// Module: Index Gate External-Lookup Facade
// Description: Cached, single-flight access to cluster metadata.
// Purpose: Bound every metadata lookup with a deadline and a per-key cache.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Rules reach cluster metadata exclusively through this facade. Each lookup
//! key carries its own cache slot with a TTL and a fetch gate: concurrent
//! requests for the same key perform one backend fetch while the rest wait on
//! the gate and read the filled slot. Cache reads and writes hold their lock
//! only briefly; the gate is the only lock held across a suspension, and it
//! exists precisely to serialize fetches. Every fetch runs under an
//! independent deadline; timeouts surface as [`LookupError::Timeout`] and the
//! calling rule rejects instead of failing the whole evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::core::metadata::IndexWithAliases;
use crate::core::metadata::RemoteIndexWithAliases;
use crate::core::metadata::TemplateCatalog;
use crate::core::names::NamePattern;
use crate::interfaces::LookupError;
use crate::interfaces::MetadataSource;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Facade tuning knobs.
///
/// # Invariants
/// - `lookup_timeout` applies independently to every backend fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacadeConfig {
    /// How long a cached value stays fresh.
    pub cache_ttl: Duration,
    /// Deadline for one backend fetch.
    pub lookup_timeout: Duration,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(10),
            lookup_timeout: Duration::from_millis(5_000),
        }
    }
}

// ============================================================================
// SECTION: Cache Cells
// ============================================================================

/// A cached value with its fill time.
#[derive(Debug, Clone)]
struct CacheSlot<T> {
    /// Cached value.
    value: T,
    /// When the value was stored.
    stored_at: Instant,
}

/// One cache key: a value slot plus a fetch gate.
///
/// # Invariants
/// - `slot` is locked only for reads and writes, never across an await.
/// - `gate` serializes fetches for the key.
#[derive(Debug)]
struct CacheCell<T> {
    /// Cached value slot.
    slot: Mutex<Option<CacheSlot<T>>>,
    /// Fetch gate providing single-flight behavior.
    gate: Mutex<()>,
}

impl<T: Clone> CacheCell<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            gate: Mutex::new(()),
        }
    }

    /// Reads the slot when it is still fresh.
    async fn read_fresh(&self, ttl: Duration) -> Option<T> {
        let guard = self.slot.lock().await;
        guard
            .as_ref()
            .filter(|slot| slot.stored_at.elapsed() < ttl)
            .map(|slot| slot.value.clone())
    }

    /// Returns the cached value or performs one gated fetch.
    async fn get_or_fetch<F>(&self, ttl: Duration, fetch: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, LookupError>>,
    {
        if let Some(value) = self.read_fresh(ttl).await {
            return Ok(value);
        }
        let _gate = self.gate.lock().await;
        if let Some(value) = self.read_fresh(ttl).await {
            return Ok(value);
        }
        let value = fetch.await?;
        let mut guard = self.slot.lock().await;
        *guard = Some(CacheSlot {
            value: value.clone(),
            stored_at: Instant::now(),
        });
        drop(guard);
        Ok(value)
    }
}

/// String-keyed collection of cache cells.
#[derive(Debug)]
struct KeyedCache<T> {
    /// Cells by key.
    cells: Mutex<HashMap<String, Arc<CacheCell<T>>>>,
}

impl<T: Clone> KeyedCache<T> {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cell for a key, creating it on first use.
    async fn cell(&self, key: &str) -> Arc<CacheCell<T>> {
        let mut guard = self.cells.lock().await;
        Arc::clone(guard.entry(key.to_string()).or_insert_with(|| Arc::new(CacheCell::new())))
    }
}

// ============================================================================
// SECTION: Facade
// ============================================================================

/// Cached, deadline-bounded view of the metadata source.
pub struct ClusterStateFacade {
    /// Backing metadata source.
    source: Arc<dyn MetadataSource>,
    /// Tuning knobs.
    config: FacadeConfig,
    /// Local indices cache.
    local: CacheCell<Vec<IndexWithAliases>>,
    /// Template catalog cache.
    templates: CacheCell<TemplateCatalog>,
    /// Repository list cache.
    repositories: CacheCell<Vec<String>>,
    /// Snapshot lists keyed by repository.
    snapshots: KeyedCache<Vec<String>>,
    /// Remote index lists keyed by cluster selector text.
    remote: KeyedCache<Vec<RemoteIndexWithAliases>>,
}

impl ClusterStateFacade {
    /// Creates a facade over a metadata source.
    #[must_use]
    pub fn new(source: Arc<dyn MetadataSource>, config: FacadeConfig) -> Self {
        Self {
            source,
            config,
            local: CacheCell::new(),
            templates: CacheCell::new(),
            repositories: CacheCell::new(),
            snapshots: KeyedCache::new(),
            remote: KeyedCache::new(),
        }
    }

    /// Lists local indices with aliases.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the fetch fails or times out.
    pub async fn local_indices(&self) -> Result<Vec<IndexWithAliases>, LookupError> {
        self.local
            .get_or_fetch(self.config.cache_ttl, bounded(self.config.lookup_timeout, async {
                self.source.local_indices().await
            }))
            .await
    }

    /// Lists remote indices for clusters matching the selector.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the fetch fails or times out.
    pub async fn remote_indices(
        &self,
        cluster: &NamePattern,
    ) -> Result<Vec<RemoteIndexWithAliases>, LookupError> {
        let cell = self.remote.cell(cluster.as_str()).await;
        cell.get_or_fetch(self.config.cache_ttl, bounded(self.config.lookup_timeout, async {
            self.source.remote_indices(cluster).await
        }))
        .await
    }

    /// Lists existing templates of every kind.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the fetch fails or times out.
    pub async fn templates(&self) -> Result<TemplateCatalog, LookupError> {
        self.templates
            .get_or_fetch(self.config.cache_ttl, bounded(self.config.lookup_timeout, async {
                self.source.templates().await
            }))
            .await
    }

    /// Lists snapshots inside a repository.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the fetch fails or times out.
    pub async fn snapshots(&self, repository: &str) -> Result<Vec<String>, LookupError> {
        let cell = self.snapshots.cell(repository).await;
        cell.get_or_fetch(self.config.cache_ttl, bounded(self.config.lookup_timeout, async {
            self.source.snapshots(repository).await
        }))
        .await
    }

    /// Lists registered repositories.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the fetch fails or times out.
    pub async fn repositories(&self) -> Result<Vec<String>, LookupError> {
        self.repositories
            .get_or_fetch(self.config.cache_ttl, bounded(self.config.lookup_timeout, async {
                self.source.repositories().await
            }))
            .await
    }
}

// ============================================================================
// SECTION: Deadlines
// ============================================================================

/// Wraps a fetch with an independent deadline.
async fn bounded<T, F>(deadline: Duration, fetch: F) -> Result<T, LookupError>
where
    F: Future<Output = Result<T, LookupError>>,
{
    match tokio::time::timeout(deadline, fetch).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout(deadline)),
    }
}
