//! Access gate for GET presigning: rate limit, then scan status.
//!
//! The rate limit runs first so an already-throttled client never costs a
//! HEAD call against the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::KvCache;
use crate::constants::RATE_LIMIT_WINDOW_MS;
use crate::error::BreakwaterError;

/// Verdict from an object's antivirus scan metadata tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Clean,
    Infected,
    Pending,
}

impl ScanStatus {
    /// Interpret the raw tag value. Missing or unrecognized values count as
    /// pending so the caller polls rather than downloading an unscanned
    /// object.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("clean") => ScanStatus::Clean,
            Some("infected") | Some("quarantine") => ScanStatus::Infected,
            _ => ScanStatus::Pending,
        }
    }

    /// Map the verdict onto the gate decision for GET presigning.
    pub fn check(self, key: &str) -> Result<(), BreakwaterError> {
        match self {
            ScanStatus::Clean => Ok(()),
            ScanStatus::Infected => {
                warn!(key = %key, "Refusing presign for infected object");
                Err(BreakwaterError::Forbidden(
                    "object failed antivirus scan".to_string(),
                ))
            }
            ScanStatus::Pending => Err(BreakwaterError::ScanPending),
        }
    }
}

/// One fixed 60-second window per client identifier, replaced on expiry.
#[derive(Debug, Serialize, Deserialize)]
struct RateLimitWindow {
    count: u32,
    reset_at_epoch_ms: i64,
}

/// Sliding-window-by-replacement rate limiter over the edge cache.
///
/// Lookup and store are separate cache calls, so two concurrent requests
/// from the same client can both observe the same count. An off-by-one
/// under such a burst is an accepted relaxation.
pub struct RateLimiter {
    cache: Arc<dyn KvCache>,
    ceiling: u32,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn KvCache>, ceiling: u32) -> Self {
        Self { cache, ceiling }
    }

    /// Count one request for this client, rejecting with `RateLimited` once
    /// the ceiling is reached inside the current window.
    pub async fn check(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BreakwaterError> {
        let cache_key = format!("ratelimit:{client_id}");
        let now_ms = now.timestamp_millis();

        let current: Option<RateLimitWindow> = match self.cache.get(&cache_key).await {
            Some(raw) => serde_json::from_str(&raw).ok(),
            None => None,
        };

        let window = match current {
            Some(window) if window.reset_at_epoch_ms > now_ms => {
                if window.count >= self.ceiling {
                    debug!(client_id = %client_id, count = window.count, "Rate limit exceeded");
                    return Err(BreakwaterError::RateLimited);
                }
                RateLimitWindow {
                    count: window.count + 1,
                    reset_at_epoch_ms: window.reset_at_epoch_ms,
                }
            }
            // No record, or the window has lapsed: start fresh.
            _ => RateLimitWindow {
                count: 1,
                reset_at_epoch_ms: now_ms + RATE_LIMIT_WINDOW_MS,
            },
        };

        let ttl_ms = (window.reset_at_epoch_ms - now_ms).max(0) as u64;
        self.cache
            .set(
                &cache_key,
                serde_json::to_string(&window)?,
                Duration::from_millis(ttl_ms),
            )
            .await;
        Ok(())
    }
}
