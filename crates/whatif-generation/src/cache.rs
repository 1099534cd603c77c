// Generation response cache (in-memory, TTL-based)

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// How long a generated response stays valid
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const SCENARIO_KEY_CHARS: usize = 50;

#[derive(Debug, Clone)]
struct CachedResponse {
    data: Value,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// In-memory store of validated generation payloads
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<RwLock<HashMap<String, CachedResponse>>>,
    default_ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Get a cached payload. Expired entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<Value> {
        let store = self.store.read().ok()?;
        let cached = store.get(key)?;

        if cached.is_expired() {
            drop(store);
            self.invalidate(key);
            return None;
        }

        Some(cached.data.clone())
    }

    pub fn set(&self, key: String, data: Value) {
        self.set_with_ttl(key, data, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: String, data: Value, ttl: Duration) {
        if let Ok(mut store) = self.store.write() {
            store.insert(
                key,
                CachedResponse {
                    data,
                    cached_at: Instant::now(),
                    ttl,
                },
            );
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut store) = self.store.write() {
            store.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut store) = self.store.write() {
            store.clear();
        }
    }

    /// Remove expired entries (periodic cleanup)
    pub fn cleanup_expired(&self) {
        if let Ok(mut store) = self.store.write() {
            store.retain(|_, v| !v.is_expired());
        }
    }

    pub fn stats(&self) -> CacheStats {
        if let Ok(store) = self.store.read() {
            let total = store.len();
            let expired = store.values().filter(|v| v.is_expired()).count();

            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

pub fn timeline_cache_key(person: &str) -> String {
    format!("timeline:{}", person.trim().to_lowercase())
}

/// Same parent and the same opening 50 characters of scenario share a key
pub fn branch_cache_key(parent_node_id: &str, scenario: &str) -> String {
    let scenario: String = scenario
        .trim()
        .to_lowercase()
        .chars()
        .take(SCENARIO_KEY_CHARS)
        .collect();
    format!("branch:{}:{}", parent_node_id, scenario)
}
