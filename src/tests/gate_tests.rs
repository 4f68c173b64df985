use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::cache::MemoryCache;
use crate::error::BreakwaterError;
use crate::gate::{RateLimiter, ScanStatus};

#[test]
fn scan_status_tag_mapping() {
    assert_eq!(ScanStatus::from_tag(Some("clean")), ScanStatus::Clean);
    assert_eq!(ScanStatus::from_tag(Some("infected")), ScanStatus::Infected);
    assert_eq!(
        ScanStatus::from_tag(Some("quarantine")),
        ScanStatus::Infected
    );
    assert_eq!(ScanStatus::from_tag(Some("pending")), ScanStatus::Pending);
    assert_eq!(ScanStatus::from_tag(Some("CLEAN")), ScanStatus::Pending);
    assert_eq!(ScanStatus::from_tag(None), ScanStatus::Pending);
}

#[test]
fn scan_status_gate_decisions() {
    assert!(ScanStatus::Clean.check("a.txt").is_ok());
    assert!(matches!(
        ScanStatus::Infected.check("a.txt"),
        Err(BreakwaterError::Forbidden(_))
    ));
    assert!(matches!(
        ScanStatus::Pending.check("a.txt"),
        Err(BreakwaterError::ScanPending)
    ));
}

#[tokio::test]
async fn rate_limiter_rejects_above_ceiling() {
    crate::logging::setup_test_logging();
    let limiter = RateLimiter::new(Arc::new(MemoryCache::new()), 3);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    for _ in 0..3 {
        limiter.check("198.51.100.7", now).await.unwrap();
    }
    assert!(matches!(
        limiter.check("198.51.100.7", now).await,
        Err(BreakwaterError::RateLimited)
    ));
}

#[tokio::test]
async fn rate_limiter_windows_are_per_client() {
    let limiter = RateLimiter::new(Arc::new(MemoryCache::new()), 1);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    limiter.check("client-a", now).await.unwrap();
    assert!(limiter.check("client-a", now).await.is_err());
    limiter.check("client-b", now).await.unwrap();
}

#[tokio::test]
async fn rate_limit_window_lapses_after_sixty_seconds() {
    let limiter = RateLimiter::new(Arc::new(MemoryCache::new()), 1);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    limiter.check("client", start).await.unwrap();
    assert!(limiter.check("client", start).await.is_err());

    // Still inside the window at 59s, replaced at 61s.
    let late = start + Duration::seconds(59);
    assert!(limiter.check("client", late).await.is_err());
    let lapsed = start + Duration::seconds(61);
    limiter.check("client", lapsed).await.unwrap();
}
