//! Session cookie construction and parsing.
//!
//! The bridge represents the upstream session to the browser as an
//! HttpOnly, SameSite=None cookie. Secure is on unless explicitly disabled
//! for local development.

use chrono::{DateTime, Duration, TimeZone, Utc};
use http::HeaderMap;

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub domain: String,
    pub secure: bool,
    /// Fallback lifetime when the upstream session has no expiry, seconds.
    pub ttl_secs: i64,
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

impl CookieConfig {
    /// Build the Set-Cookie value carrying a session token.
    pub fn session_cookie(
        &self,
        token: &str,
        session_expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> String {
        let expires = session_expires_at.unwrap_or(now + Duration::seconds(self.ttl_secs));
        let mut cookie = format!(
            "{}={}; Path=/; Domain={}; Expires={}; SameSite=None; HttpOnly",
            self.name,
            token,
            self.domain,
            http_date(expires)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Build the Set-Cookie value that clears the session cookie.
    pub fn expired_cookie(&self) -> String {
        let epoch = Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now);
        let mut cookie = format!(
            "{}=; Path=/; Domain={}; Max-Age=0; Expires={}; SameSite=None; HttpOnly",
            self.name,
            self.domain,
            http_date(epoch)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Read this cookie's value from an incoming request's Cookie headers.
    pub fn read_from(&self, headers: &HeaderMap) -> Option<String> {
        let prefix = format!("{}=", self.name);
        headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix(&prefix))
            .map(|token| token.to_string())
    }
}
