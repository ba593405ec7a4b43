//! Raw analyzer payload cache
//!
//! Keys are SHA-256 digests of the analyzer kind plus the canonical JSON of its
//! input, so identical designs (or screenshot sets) reuse a prior payload.
//! Only successful payloads are stored.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Injected raw-payload cache
pub trait AnalysisCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: String, payload: Value);
}

/// Cache key for `input` analyzed by `kind`
///
/// The input goes through `serde_json::Value`, whose object maps are key
/// sorted, so logically equal inputs hash identically.
pub fn cache_key<T: Serialize + ?Sized>(
    kind: &str,
    input: &T,
) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(&serde_json::to_value(input)?)?;

    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Value>,
    /// Insertion order for FIFO eviction
    order: VecDeque<String>,
}

/// Bounded in-memory cache with FIFO eviction
#[derive(Debug)]
pub struct InMemoryAnalysisCache {
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl InMemoryAnalysisCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries stay consistent even if a holder panicked mid-insert
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AnalysisCache for InMemoryAnalysisCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).cloned()
    }

    fn put(&self, key: String, payload: Value) {
        let mut state = self.lock();
        if state.entries.insert(key.clone(), payload).is_some() {
            return;
        }
        state.order.push_back(key);

        while state.order.len() > self.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                debug!(key = %oldest, "Evicted cached analyzer payload");
            }
        }
    }
}
