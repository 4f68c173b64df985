//! Signed outbound calls to the S3-compatible object store.
//!
//! The broker only talks to the store for the multipart bookends
//! (initiate and complete) and for the HEAD metadata check that gates GET
//! presigning. Part uploads and downloads go straight from the client to
//! the store via presigned URLs and never pass through this service.

use std::str::FromStr;

use chrono::Utc;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::{debug, warn};

use crate::constants::SCAN_STATUS_HEADER;
use crate::error::BreakwaterError;
use crate::sigv4::{SignedRequest, Signer};
use crate::xml::{CompleteMultipartUpload, CompletedPart, InitiateMultipartUploadResult};

pub struct ObjectStoreClient {
    signer: Signer,
    http: reqwest::Client,
}

impl ObjectStoreClient {
    pub fn new(signer: Signer) -> Self {
        Self {
            signer,
            http: reqwest::Client::new(),
        }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    fn request(
        &self,
        method: Method,
        signed: &SignedRequest,
    ) -> Result<reqwest::RequestBuilder, BreakwaterError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &signed.headers {
            headers.insert(
                HeaderName::from_str(name)
                    .map_err(|e| BreakwaterError::Http(e.to_string()))?,
                HeaderValue::from_str(value)?,
            );
        }
        Ok(self.http.request(method, &signed.url).headers(headers))
    }

    /// Initiate a multipart upload and return the store-assigned upload id.
    pub async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: Option<&str>,
        acl: Option<&str>,
    ) -> Result<String, BreakwaterError> {
        let mut extra_headers: Vec<(String, String)> = Vec::new();
        if let Some(ct) = content_type {
            extra_headers.push(("content-type".to_string(), ct.to_string()));
        }
        if let Some(acl) = acl {
            extra_headers.push(("x-amz-acl".to_string(), acl.to_string()));
        }

        let signed = self.signer.sign_request(
            "POST",
            key,
            &[("uploads".to_string(), String::new())],
            &extra_headers,
            b"",
            Utc::now(),
        );

        let response = self.request(Method::POST, &signed)?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(key = %key, status = %status, "Initiate multipart upload failed");
            return Err(BreakwaterError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let upload_id = InitiateMultipartUploadResult::parse_upload_id(&body)?;
        debug!(key = %key, upload_id = %upload_id, "Initiated multipart upload");
        Ok(upload_id)
    }

    /// Submit the part manifest to finalize a multipart upload.
    pub async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), BreakwaterError> {
        let manifest = CompleteMultipartUpload::new(parts).to_xml()?;

        let signed = self.signer.sign_request(
            "POST",
            key,
            &[("uploadId".to_string(), upload_id.to_string())],
            &[("content-type".to_string(), "application/xml".to_string())],
            manifest.as_bytes(),
            Utc::now(),
        );

        let response = self
            .request(Method::POST, &signed)?
            .body(manifest)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await?;
            warn!(key = %key, upload_id = %upload_id, status = %status, "Complete multipart upload failed");
            return Err(BreakwaterError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        debug!(key = %key, upload_id = %upload_id, "Completed multipart upload");
        Ok(())
    }

    /// HEAD the object and return its scan-status metadata tag, or None if
    /// the object exists but carries no tag.
    pub async fn head_scan_status(&self, key: &str) -> Result<Option<String>, BreakwaterError> {
        let signed = self
            .signer
            .sign_request("HEAD", key, &[], &[], b"", Utc::now());

        let response = self.request(Method::HEAD, &signed)?.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BreakwaterError::NotFound(format!("no such object: {key}")));
        }
        if !status.is_success() {
            return Err(BreakwaterError::Upstream {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        Ok(response
            .headers()
            .get(SCAN_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()))
    }
}
