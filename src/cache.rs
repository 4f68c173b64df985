//! Edge key-value cache abstraction.
//!
//! The rate limiter and the JWKS cache both live in the platform's edge KV
//! store. Modelled as an explicit get/set-with-TTL trait so handlers take
//! the cache as an injected collaborator and tests can substitute one with
//! controllable expiry. Read-modify-write over this interface is not
//! atomic; counter races under concurrent bursts are an accepted
//! approximation, not a bug.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait KvCache: Send + Sync {
    /// Fetch a value, or None if absent or expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value with a time-to-live.
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// In-process cache with per-entry expiry instants.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
    }
}
