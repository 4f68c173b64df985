//! Request router dispatching between the broker and bridge handlers.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::header::ORIGIN;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};

use crate::broker::BrokerHandler;
use crate::bridge::BridgeHandler;

/// Route on path prefix: `/s3/*` is the credential broker, the rest is the
/// identity bridge. Preflights are answered here for both families.
pub async fn route_request(
    req: Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
    broker: Arc<BrokerHandler>,
    bridge: Arc<BridgeHandler>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() == Method::OPTIONS {
        return Ok(preflight_response(&req));
    }

    if req.uri().path().starts_with("/s3/") {
        broker.handle_request(req, remote_addr).await
    } else {
        bridge.handle_request(req).await
    }
}

/// CORS preflight: echo the request Origin and allow credentials so the
/// bridge's cookie survives cross-site calls.
fn preflight_response(req: &Request<hyper::body::Incoming>) -> Response<Full<Bytes>> {
    let allow_origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| http::HeaderValue::from_str(v.to_str().ok()?).ok())
        .unwrap_or_else(|| http::HeaderValue::from_static("*"));

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", allow_origin);
    headers.insert(
        "access-control-allow-methods",
        http::HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        http::HeaderValue::from_static("content-type, authorization, x-client-id"),
    );
    headers.insert(
        "access-control-allow-credentials",
        http::HeaderValue::from_static("true"),
    );
    response
}
