//! Centralized error types for the breakwater edge services.

use std::net::AddrParseError;

use http::{
    HeaderValue, Response, StatusCode,
    header::{CONTENT_TYPE, InvalidHeaderValue},
};
use http_body_util::Full;
use hyper::body::Bytes;
use serde_json::json;

use crate::jwt::VerifyError;

#[derive(Debug)]
pub enum BreakwaterError {
    /// Bad or missing client input (400)
    Validation(String),
    /// Token malformed, invalid or expired (401)
    Auth(String),
    /// Object is scan-flagged as infected (403)
    Forbidden(String),
    /// Too many requests from this client within the window (429)
    RateLimited,
    /// Object scan still pending, caller should poll (202)
    ScanPending,
    /// Requested object does not exist (404)
    NotFound(String),
    /// Object store or chat API returned an unexpected status
    Upstream { status: u16, body: String },
    Configuration(String),
    Http(String),
    Hyper(String),
    Io(std::io::Error),
    Reqwest(String),
    SerdeJson(serde_json::Error),
    Xml(String),
    Other(String),
}

impl std::fmt::Display for BreakwaterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakwaterError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            BreakwaterError::Auth(msg) => write!(f, "Authentication Error: {}", msg),
            BreakwaterError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            BreakwaterError::RateLimited => f.write_str("Rate limit exceeded"),
            BreakwaterError::ScanPending => f.write_str("Object scan pending"),
            BreakwaterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            BreakwaterError::Upstream { status, body } => {
                write!(f, "Upstream Error: status={} body={}", status, body)
            }
            BreakwaterError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            BreakwaterError::Http(msg) => write!(f, "HTTP Response Error: {}", msg),
            BreakwaterError::Hyper(msg) => write!(f, "Hyper HTTP Error: {}", msg),
            BreakwaterError::Io(e) => write!(f, "IO Error: {:?}", e),
            BreakwaterError::Reqwest(msg) => write!(f, "Reqwest HTTP Error: {}", msg),
            BreakwaterError::SerdeJson(e) => write!(f, "Serde-JSON Error: {}", e),
            BreakwaterError::Xml(msg) => write!(f, "XML Error: {}", msg),
            BreakwaterError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl BreakwaterError {
    /// HTTP status for this error per the broker/bridge error taxonomy.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BreakwaterError::Validation(_) => StatusCode::BAD_REQUEST,
            BreakwaterError::Auth(_) => StatusCode::UNAUTHORIZED,
            BreakwaterError::Forbidden(_) => StatusCode::FORBIDDEN,
            BreakwaterError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            BreakwaterError::ScanPending => StatusCode::ACCEPTED,
            BreakwaterError::NotFound(_) => StatusCode::NOT_FOUND,
            BreakwaterError::Upstream { status, .. } => {
                // 4xx/5xx passthrough, anything else collapses to 500
                StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short client-facing message. Infrastructure details stay in the logs.
    fn client_message(&self) -> String {
        match self {
            BreakwaterError::Validation(msg) => msg.clone(),
            BreakwaterError::Auth(_) => "invalid token".to_string(),
            BreakwaterError::Forbidden(msg) => msg.clone(),
            BreakwaterError::RateLimited => "rate limit exceeded".to_string(),
            BreakwaterError::ScanPending => "scan pending, retry later".to_string(),
            BreakwaterError::NotFound(msg) => msg.clone(),
            BreakwaterError::Upstream { .. } => "upstream request failed".to_string(),
            _ => "internal error".to_string(),
        }
    }
}

impl From<InvalidHeaderValue> for BreakwaterError {
    fn from(err: InvalidHeaderValue) -> Self {
        BreakwaterError::Other(err.to_string())
    }
}

impl From<reqwest::Error> for BreakwaterError {
    fn from(err: reqwest::Error) -> Self {
        BreakwaterError::Reqwest(err.to_string())
    }
}

impl From<hyper::Error> for BreakwaterError {
    fn from(err: hyper::Error) -> Self {
        BreakwaterError::Hyper(err.to_string())
    }
}

impl From<http::Error> for BreakwaterError {
    fn from(err: http::Error) -> Self {
        BreakwaterError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for BreakwaterError {
    fn from(err: serde_json::Error) -> Self {
        BreakwaterError::SerdeJson(err)
    }
}

impl From<std::io::Error> for BreakwaterError {
    fn from(err: std::io::Error) -> Self {
        BreakwaterError::Io(err)
    }
}

impl From<AddrParseError> for BreakwaterError {
    fn from(err: AddrParseError) -> Self {
        BreakwaterError::Other(err.to_string())
    }
}

impl From<quick_xml::DeError> for BreakwaterError {
    fn from(err: quick_xml::DeError) -> Self {
        BreakwaterError::Xml(err.to_string())
    }
}

impl From<quick_xml::SeError> for BreakwaterError {
    fn from(err: quick_xml::SeError) -> Self {
        BreakwaterError::Xml(err.to_string())
    }
}

impl From<VerifyError> for BreakwaterError {
    fn from(err: VerifyError) -> Self {
        BreakwaterError::Auth(err.to_string())
    }
}

impl From<BreakwaterError> for Box<dyn std::error::Error + Send + Sync> {
    fn from(val: BreakwaterError) -> Self {
        Box::new(std::io::Error::other(val.to_string()))
    }
}

impl From<BreakwaterError> for Response<Full<Bytes>> {
    fn from(err: BreakwaterError) -> Response<Full<Bytes>> {
        let mut body = json!({
            "ok": false,
            "error": err.client_message(),
        });
        if let BreakwaterError::Upstream { status, .. } = &err
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("upstreamStatus".to_string(), json!(status));
        }

        let mut res = Response::new(Full::new(Bytes::from(body.to_string())));
        *res.status_mut() = err.status_code();
        res.headers_mut()
            .append(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        res.headers_mut().append(
            "access-control-allow-origin",
            HeaderValue::from_static("*"),
        );
        res
    }
}
