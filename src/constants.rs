/// Expiry clamps for presigned URLs, in seconds.
pub(crate) const PRESIGN_GET_MIN_EXPIRES: u64 = 60;
pub(crate) const PRESIGN_GET_MAX_EXPIRES: u64 = 3600;
pub(crate) const PRESIGN_PUT_MIN_EXPIRES: u64 = 60;
pub(crate) const PRESIGN_PUT_MAX_EXPIRES: u64 = 900;

/// Fixed expiry for multipart part-upload URLs, in seconds.
pub(crate) const PRESIGN_PART_EXPIRES: u64 = 900;

/// Length of a rate-limit window, in milliseconds.
pub(crate) const RATE_LIMIT_WINDOW_MS: i64 = 60_000;

/// How long a fetched JWKS document stays cached, in seconds.
pub(crate) const JWKS_CACHE_TTL_SECS: u64 = 3600;

/// Tolerated clock skew when validating JWT time claims, in seconds.
/// Currently zero; the single knob to loosen if issuer clocks drift.
pub(crate) const CLOCK_SKEW_SECS: i64 = 0;

/// Object metadata key carrying the antivirus scan verdict.
pub(crate) const SCAN_STATUS_HEADER: &str = "x-amz-meta-scan-status";

pub(crate) const DEFAULT_COOKIE_NAME: &str = "MMSESSION";
