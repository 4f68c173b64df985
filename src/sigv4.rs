//! AWS Signature Version 4 request signing.
//!
//! Implements the canonical request format:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! followed by the `AWS4-HMAC-SHA256` string-to-sign and the four-step HMAC
//! key derivation chain. Produces both presigned URLs (query auth, payload
//! `UNSIGNED-PAYLOAD`) and signed header sets for outbound requests the
//! broker makes itself (create/complete multipart, HEAD).
//!
//! Everything here is a pure function of the credentials, the request
//! description and the supplied timestamp, so re-signing within the same
//! wall-clock second is deterministic.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::error::BreakwaterError;

type HmacSha256 = Hmac<Sha256>;

/// Payload hash literal used for all presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Characters percent-encoded in path segments and query components.
///
/// Everything except RFC 3986 unreserved characters (A-Z, a-z, 0-9, `-`,
/// `_`, `.`, `~`) is encoded. Path separators are preserved by encoding
/// each segment independently.
const SIGV4_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A fully signed outbound request: the URL to call and the headers to send.
#[derive(Debug)]
pub struct SignedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// SigV4 signer bound to one credential pair, region, bucket and endpoint.
#[derive(Debug, Clone)]
pub struct Signer {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    bucket: String,
    scheme: String,
    endpoint_host: String,
    path_style: bool,
}

impl Signer {
    pub fn new(
        access_key_id: String,
        secret_access_key: String,
        region: String,
        bucket: String,
        endpoint: &str,
        path_style: bool,
    ) -> Result<Self, BreakwaterError> {
        let (scheme, host) = endpoint
            .split_once("://")
            .ok_or_else(|| {
                BreakwaterError::Configuration(format!(
                    "Endpoint '{endpoint}' must include a scheme"
                ))
            })?;
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return Err(BreakwaterError::Configuration(format!(
                "Endpoint '{endpoint}' has no host"
            )));
        }
        Ok(Self {
            access_key_id,
            secret_access_key,
            region,
            bucket,
            scheme: scheme.to_string(),
            endpoint_host: host.to_string(),
            path_style,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Host header value: the bare endpoint under path-style addressing,
    /// `{bucket}.{endpoint}` under virtual-host addressing.
    fn host_header(&self) -> String {
        if self.path_style {
            self.endpoint_host.clone()
        } else {
            format!("{}.{}", self.bucket, self.endpoint_host)
        }
    }

    /// Canonical URI for an object key. Each path segment is encoded
    /// independently so `/` separators survive; the bucket is folded into
    /// the path only under path-style addressing.
    fn canonical_path(&self, key: &str) -> String {
        let encoded_key = encode_path(key);
        if self.path_style {
            format!("/{}/{}", encode_path(&self.bucket), encoded_key)
        } else {
            format!("/{}", encoded_key)
        }
    }

    fn credential_scope(&self, date_stamp: &str) -> String {
        format!("{}/{}/s3/aws4_request", date_stamp, self.region)
    }

    /// Derive the signing key: HMAC chain over date, region, service.
    fn signing_key(&self, date_stamp: &str) -> [u8; 32] {
        let secret = format!("AWS4{}", self.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        hmac_sha256(&k_service, b"aws4_request")
    }

    fn string_to_sign(&self, amz_date: &str, date_stamp: &str, canonical_request: &str) -> String {
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            self.credential_scope(date_stamp),
            canonical_hash
        )
    }

    fn signature(&self, date_stamp: &str, string_to_sign: &str) -> String {
        let key = self.signing_key(date_stamp);
        hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()))
    }

    /// Build a presigned URL. Query auth only signs the `host` header and
    /// uses the `UNSIGNED-PAYLOAD` literal; the signature is appended to the
    /// already-canonicalized query string.
    ///
    /// No expiry clamping happens here; the handlers own their clamps.
    pub fn presign(
        &self,
        method: &str,
        key: &str,
        expires_secs: u64,
        extra_query: &[(String, String)],
        now: DateTime<Utc>,
    ) -> String {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let host = self.host_header();

        let mut pairs: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".to_string(), "AWS4-HMAC-SHA256".to_string()),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{}", self.access_key_id, self.credential_scope(&date_stamp)),
            ),
            ("X-Amz-Date".to_string(), amz_date.clone()),
            ("X-Amz-Expires".to_string(), expires_secs.to_string()),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];
        pairs.extend(extra_query.iter().cloned());

        let canonical_query = canonical_query_string(&pairs);
        let canonical_path = self.canonical_path(key);
        let canonical_request = format!(
            "{method}\n{canonical_path}\n{canonical_query}\nhost:{host}\n\nhost\n{UNSIGNED_PAYLOAD}"
        );

        let string_to_sign = self.string_to_sign(&amz_date, &date_stamp, &canonical_request);
        let signature = self.signature(&date_stamp, &string_to_sign);

        format!(
            "{}://{}{}?{}&X-Amz-Signature={}",
            self.scheme, host, canonical_path, canonical_query, signature
        )
    }

    /// Sign a request the broker sends itself, attaching the signature as an
    /// `Authorization` header. The payload hash covers the actual body.
    ///
    /// `extra_headers` (lowercase names) are included in the signed header
    /// set; `host` is always signed but left off the returned header list
    /// since the HTTP client derives it from the URL.
    pub fn sign_request(
        &self,
        method: &str,
        key: &str,
        query: &[(String, String)],
        extra_headers: &[(String, String)],
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> SignedRequest {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let host = self.host_header();
        let payload_hash = hex::encode(Sha256::digest(payload));

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        for (name, value) in extra_headers {
            headers.push((name.to_lowercase(), value.trim().to_string()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers = headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join("\n");

        let canonical_query = canonical_query_string(query);
        let canonical_path = self.canonical_path(key);
        let canonical_request = format!(
            "{method}\n{canonical_path}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}"
        );

        let string_to_sign = self.string_to_sign(&amz_date, &date_stamp, &canonical_request);
        let signature = self.signature(&date_stamp, &string_to_sign);

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key_id,
            self.credential_scope(&date_stamp),
            signed_headers,
            signature
        );

        let mut out_headers: Vec<(String, String)> = headers
            .into_iter()
            .filter(|(name, _)| name != "host")
            .collect();
        out_headers.push(("authorization".to_string(), authorization));

        let url = if canonical_query.is_empty() {
            format!("{}://{}{}", self.scheme, host, canonical_path)
        } else {
            format!("{}://{}{}?{}", self.scheme, host, canonical_path, canonical_query)
        };

        SignedRequest {
            url,
            headers: out_headers,
        }
    }
}

/// Percent-encode one URI component with the SigV4 unreserved set.
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, SIGV4_ENCODE_SET).to_string()
}

/// Encode an object key path segment by segment, preserving `/` separators.
pub fn encode_path(key: &str) -> String {
    key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Canonicalize a query string from an ordered association list: encode
/// every key and value, sort pairs by encoded key breaking ties on encoded
/// value, join with `&`. Re-ordering the input never changes the output.
pub fn canonical_query_string(pairs: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}
