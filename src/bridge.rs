//! Identity Bridge HTTP handlers (`/exchange`, `/refresh`, `/logout`).
//!
//! Exchanges a verified third-party identity token for an upstream chat
//! session, carried to the browser as a cookie. Cookie-bearing endpoints
//! answer CORS with the caller's Origin and allow credentials; a wildcard
//! origin would make the browser drop the cookie.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::header::{ORIGIN, SET_COOKIE};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::broker::{json_response, parse_json, read_body};
use crate::error::BreakwaterError;
use crate::jwt::Verifier;
use crate::report::ErrorReporter;
use crate::session::CookieConfig;
use crate::upstream::{Provisioner, UpstreamUser};

#[derive(Debug, Deserialize)]
struct ExchangeRequest {
    token: String,
}

pub struct BridgeHandler {
    verifier: Verifier,
    provisioner: Arc<Provisioner>,
    cookie: CookieConfig,
    reporter: ErrorReporter,
}

impl BridgeHandler {
    pub fn new(
        verifier: Verifier,
        provisioner: Arc<Provisioner>,
        cookie: CookieConfig,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            verifier,
            provisioner,
            cookie,
            reporter,
        }
    }

    pub async fn handle_request(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let path = req.uri().path().to_string();
        let origin = req
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        info!(method = %req.method(), path = %path, "Incoming bridge request");

        if req.method() != hyper::Method::POST {
            return Ok(with_cors(
                BreakwaterError::NotFound(format!("no route for {path}")).into(),
                origin.as_deref(),
            ));
        }

        let result = match path.as_str() {
            "/exchange" => self.exchange(req).await,
            "/refresh" => self.refresh(&req).await,
            "/logout" => self.logout(),
            _ => Err(BreakwaterError::NotFound(format!("no route for {path}"))),
        };

        Ok(match result {
            Ok(response) => with_cors(response, origin.as_deref()),
            Err(e) => {
                warn!(path = %path, error = %e, "Bridge request failed");
                if e.status_code().is_server_error() {
                    self.reporter.report(&path, &e.to_string());
                }
                with_cors(e.into(), origin.as_deref())
            }
        })
    }

    /// Verify the identity token, provision the upstream account and mint a
    /// session cookie. No cookie is set on any failure path.
    async fn exchange(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, BreakwaterError> {
        let body = read_body(req).await?;
        let request: ExchangeRequest = parse_json(&body)?;
        if request.token.trim().is_empty() {
            return Err(BreakwaterError::Validation(
                "token must be a non-empty string".to_string(),
            ));
        }

        let now = Utc::now();
        let claims = match self.verifier.verify(&request.token, now).await {
            Ok(claims) => claims,
            Err(e) => {
                // The kind stays in the logs; the client sees a bare 401.
                warn!(kind = %e, "Token verification failed");
                return Err(e.into());
            }
        };

        let (user, session) = self.provisioner.provision(&claims).await?;
        let token = session.token.unwrap_or_default();
        let expires_at = session
            .expires_at
            .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms));

        info!(user_id = %user.id, email = %user.email, "Exchanged identity token for session");

        let body = json!({
            "ok": true,
            "user": user_json(&user),
            "expiresAt": session.expires_at,
        });
        let mut response = json_response(StatusCode::OK, &body);
        response.headers_mut().insert(
            SET_COOKIE,
            http::HeaderValue::from_str(&self.cookie.session_cookie(&token, expires_at, now))?,
        );
        Ok(response)
    }

    /// Validate the session cookie against upstream and report the user.
    async fn refresh(
        &self,
        req: &Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, BreakwaterError> {
        let token = self
            .cookie
            .read_from(req.headers())
            .ok_or_else(|| BreakwaterError::Auth("missing session cookie".to_string()))?;

        let user = self.provisioner.client().get_me(&token).await?;
        let body = json!({ "ok": true, "user": user_json(&user) });
        Ok(json_response(StatusCode::OK, &body))
    }

    /// Expire the cookie. Succeeds whether or not a cookie was sent.
    fn logout(&self) -> Result<Response<Full<Bytes>>, BreakwaterError> {
        let mut response = json_response(StatusCode::OK, &json!({ "ok": true }));
        response.headers_mut().insert(
            SET_COOKIE,
            http::HeaderValue::from_str(&self.cookie.expired_cookie())?,
        );
        Ok(response)
    }
}

fn user_json(user: &UpstreamUser) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "first_name": user.first_name,
        "last_name": user.last_name,
    })
}

/// Replace the wildcard CORS header with an Origin echo plus credentials.
pub(crate) fn with_cors(
    mut response: Response<Full<Bytes>>,
    origin: Option<&str>,
) -> Response<Full<Bytes>> {
    let allow_origin = origin
        .and_then(|o| http::HeaderValue::from_str(o).ok())
        .unwrap_or_else(|| http::HeaderValue::from_static("*"));
    response
        .headers_mut()
        .insert("access-control-allow-origin", allow_origin);
    response.headers_mut().insert(
        "access-control-allow-credentials",
        http::HeaderValue::from_static("true"),
    );
    response
}
