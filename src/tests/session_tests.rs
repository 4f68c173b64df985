use chrono::{TimeZone, Utc};
use http::{HeaderMap, HeaderValue, header::COOKIE};

use crate::session::CookieConfig;

fn config() -> CookieConfig {
    CookieConfig {
        name: "MMSESSION".to_string(),
        domain: "chat.example.com".to_string(),
        secure: true,
        ttl_secs: 2_592_000,
    }
}

#[test]
fn session_cookie_uses_the_upstream_expiry() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let expires = Utc.with_ymd_and_hms(2024, 1, 31, 8, 30, 0).unwrap();

    let cookie = config().session_cookie("tok123", Some(expires), now);
    assert_eq!(
        cookie,
        "MMSESSION=tok123; Path=/; Domain=chat.example.com; \
         Expires=Wed, 31 Jan 2024 08:30:00 GMT; SameSite=None; HttpOnly; Secure"
    );
}

#[test]
fn session_cookie_falls_back_to_configured_ttl() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let cookie = config().session_cookie("tok123", None, now);
    // 30 days from now.
    assert!(cookie.contains("Expires=Wed, 31 Jan 2024 00:00:00 GMT"));
}

#[test]
fn insecure_config_omits_the_secure_attribute() {
    let mut config = config();
    config.secure = false;
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let cookie = config.session_cookie("tok123", None, now);
    assert!(!cookie.contains("Secure"));
    assert!(cookie.contains("HttpOnly"));
}

#[test]
fn expired_cookie_clears_value_and_age() {
    let cookie = config().expired_cookie();
    assert!(cookie.starts_with("MMSESSION=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    assert!(cookie.contains("SameSite=None"));
}

#[test]
fn reads_own_cookie_from_header() {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_static("theme=dark; MMSESSION=tok456; lang=en"),
    );
    assert_eq!(config().read_from(&headers), Some("tok456".to_string()));
}

#[test]
fn missing_cookie_reads_as_none() {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
    assert_eq!(config().read_from(&headers), None);
    assert_eq!(config().read_from(&HeaderMap::new()), None);
}
