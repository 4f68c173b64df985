//! Credential Broker HTTP handlers (`/s3/*`).
//!
//! JSON in, JSON out, CORS open. GET presigning sits behind the access
//! gate; everything else just validates input and signs.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use http::header::CONTENT_TYPE;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::constants::{
    PRESIGN_GET_MAX_EXPIRES, PRESIGN_GET_MIN_EXPIRES, PRESIGN_PART_EXPIRES,
    PRESIGN_PUT_MAX_EXPIRES, PRESIGN_PUT_MIN_EXPIRES,
};
use crate::error::BreakwaterError;
use crate::gate::{RateLimiter, ScanStatus};
use crate::report::ErrorReporter;
use crate::store::ObjectStoreClient;
use crate::xml::CompletedPart;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    key: String,
    content_type: Option<String>,
    acl: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignPartRequest {
    key: String,
    upload_id: String,
    part_number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest {
    key: String,
    upload_id: String,
    parts: Vec<CompletedPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresignGetRequest {
    key: String,
    expires: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresignPutRequest {
    key: String,
    content_type: Option<String>,
    expires: Option<u64>,
}

pub struct BrokerHandler {
    store: Arc<ObjectStoreClient>,
    limiter: RateLimiter,
    reporter: ErrorReporter,
}

impl BrokerHandler {
    pub fn new(store: Arc<ObjectStoreClient>, limiter: RateLimiter, reporter: ErrorReporter) -> Self {
        Self {
            store,
            limiter,
            reporter,
        }
    }

    pub async fn handle_request(
        &self,
        req: Request<hyper::body::Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let path = req.uri().path().to_string();
        let client_id = client_identifier(&req, remote_addr);

        info!(method = %req.method(), path = %path, client_id = %client_id, "Incoming broker request");

        if req.method() != hyper::Method::POST {
            return Ok(BreakwaterError::NotFound(format!("no route for {path}")).into());
        }

        let body = match read_body(req).await {
            Ok(body) => body,
            Err(e) => return Ok(e.into()),
        };

        let result = match path.as_str() {
            "/s3/create" => self.create(&body).await,
            "/s3/sign" => self.sign_part(&body).await,
            "/s3/complete" => self.complete(&body).await,
            "/s3/presign" => self.presign_get(&body, &client_id).await,
            "/s3/presign-put" => self.presign_put(&body).await,
            _ => Err(BreakwaterError::NotFound(format!("no route for {path}"))),
        };

        Ok(match result {
            Ok(value) => json_response(StatusCode::OK, &value),
            Err(e) => {
                warn!(path = %path, error = %e, "Broker request failed");
                if e.status_code().is_server_error() {
                    self.reporter.report(&path, &e.to_string());
                }
                e.into()
            }
        })
    }

    async fn create(&self, body: &[u8]) -> Result<Value, BreakwaterError> {
        let request: CreateRequest = parse_json(body)?;
        require_non_empty("key", &request.key)?;

        let upload_id = self
            .store
            .create_multipart_upload(
                &request.key,
                request.content_type.as_deref(),
                request.acl.as_deref(),
            )
            .await?;

        Ok(json!({
            "uploadId": upload_id,
            "key": request.key,
            "bucket": self.store.signer().bucket(),
        }))
    }

    async fn sign_part(&self, body: &[u8]) -> Result<Value, BreakwaterError> {
        let request: SignPartRequest = parse_json(body)?;
        require_non_empty("key", &request.key)?;
        require_non_empty("uploadId", &request.upload_id)?;
        if request.part_number == 0 {
            return Err(BreakwaterError::Validation(
                "partNumber must be a positive integer".to_string(),
            ));
        }

        let url = self.store.signer().presign(
            "PUT",
            &request.key,
            PRESIGN_PART_EXPIRES,
            &[
                ("partNumber".to_string(), request.part_number.to_string()),
                ("uploadId".to_string(), request.upload_id.clone()),
            ],
            Utc::now(),
        );

        Ok(json!({ "url": url }))
    }

    async fn complete(&self, body: &[u8]) -> Result<Value, BreakwaterError> {
        let request: CompleteRequest = parse_json(body)?;
        require_non_empty("key", &request.key)?;
        require_non_empty("uploadId", &request.upload_id)?;
        if request.parts.is_empty() {
            return Err(BreakwaterError::Validation(
                "parts must not be empty".to_string(),
            ));
        }
        if request.parts.iter().any(|p| p.part_number == 0) {
            return Err(BreakwaterError::Validation(
                "partNumber must be a positive integer".to_string(),
            ));
        }

        self.store
            .complete_multipart_upload(&request.key, &request.upload_id, request.parts)
            .await?;

        Ok(json!({ "ok": true }))
    }

    async fn presign_get(&self, body: &[u8], client_id: &str) -> Result<Value, BreakwaterError> {
        let request: PresignGetRequest = parse_json(body)?;
        require_non_empty("key", &request.key)?;

        let now = Utc::now();

        // Rate limit before the HEAD so a throttled client costs nothing
        // against the store.
        self.limiter.check(client_id, now).await?;

        let tag = self.store.head_scan_status(&request.key).await?;
        ScanStatus::from_tag(tag.as_deref()).check(&request.key)?;

        let expires = clamp_expires(
            request.expires,
            PRESIGN_GET_MIN_EXPIRES,
            PRESIGN_GET_MAX_EXPIRES,
        );
        let url = self
            .store
            .signer()
            .presign("GET", &request.key, expires, &[], now);

        Ok(json!({ "url": url }))
    }

    async fn presign_put(&self, body: &[u8]) -> Result<Value, BreakwaterError> {
        let request: PresignPutRequest = parse_json(body)?;
        require_non_empty("key", &request.key)?;

        let expires = clamp_expires(
            request.expires,
            PRESIGN_PUT_MIN_EXPIRES,
            PRESIGN_PUT_MAX_EXPIRES,
        );
        let url = self
            .store
            .signer()
            .presign("PUT", &request.key, expires, &[], Utc::now());

        Ok(json!({
            "url": url,
            "key": request.key,
            "bucket": self.store.signer().bucket(),
            "contentType": request.content_type,
        }))
    }
}

pub(crate) fn client_identifier(
    req: &Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> String {
    req.headers()
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| remote_addr.ip().to_string())
}

pub(crate) async fn read_body(
    req: Request<hyper::body::Incoming>,
) -> Result<Vec<u8>, BreakwaterError> {
    let collected = req
        .into_body()
        .collect()
        .await
        .map_err(|e| BreakwaterError::Hyper(e.to_string()))?;
    Ok(collected.to_bytes().to_vec())
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    body: &[u8],
) -> Result<T, BreakwaterError> {
    serde_json::from_slice(body)
        .map_err(|e| BreakwaterError::Validation(format!("invalid request body: {e}")))
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), BreakwaterError> {
    if value.trim().is_empty() {
        return Err(BreakwaterError::Validation(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(())
}

pub(crate) fn json_response(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(value.to_string())));
    *res.status_mut() = status;
    res.headers_mut().insert(
        CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    res.headers_mut().insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );
    res
}

fn clamp_expires(requested: Option<u64>, min: u64, max: u64) -> u64 {
    requested.unwrap_or(max).clamp(min, max)
}
