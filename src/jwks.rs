//! JWKS retrieval with a one-hour edge-cache entry per JWKS URL.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::KvCache;
use crate::constants::JWKS_CACHE_TTL_SECS;
use crate::error::BreakwaterError;

/// One RSA public key from a JWKS document. Modulus and exponent are
/// base64url as published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Fetch-and-cache JWKS lookup, keyed by the JWKS URL itself.
pub struct JwksCache {
    cache: Arc<dyn KvCache>,
    http: reqwest::Client,
}

impl JwksCache {
    pub fn new(cache: Arc<dyn KvCache>) -> Self {
        Self {
            cache,
            http: reqwest::Client::new(),
        }
    }

    /// Look up a key id. On cache miss the JWKS is fetched fresh and the
    /// raw document repopulates the cache. A key id absent from the current
    /// document is None; the verifier turns that into an unknown-key error.
    pub async fn get_key(
        &self,
        jwks_url: &str,
        kid: &str,
    ) -> Result<Option<Jwk>, BreakwaterError> {
        let cache_key = format!("jwks:{jwks_url}");

        let raw = match self.cache.get(&cache_key).await {
            Some(raw) => raw,
            None => {
                debug!(jwks_url = %jwks_url, "JWKS cache miss, fetching");
                let response = self.http.get(jwks_url).send().await?;
                let status = response.status();
                let body = response.text().await?;
                if !status.is_success() {
                    return Err(BreakwaterError::Upstream {
                        status: status.as_u16(),
                        body,
                    });
                }
                self.cache
                    .set(
                        &cache_key,
                        body.clone(),
                        Duration::from_secs(JWKS_CACHE_TTL_SECS),
                    )
                    .await;
                body
            }
        };

        let jwks: JwkSet = serde_json::from_str(&raw)?;
        Ok(jwks.keys.into_iter().find(|key| key.kid == kid))
    }
}
