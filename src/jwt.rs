//! RS256 JWT verification against a cached JWKS.
//!
//! Verification failures carry a distinguishable kind for logging, but the
//! HTTP layer collapses all of them into a generic 401 so callers cannot
//! probe which check failed.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::CLOCK_SKEW_SECS;
use crate::jwks::JwksCache;

/// Why a token was rejected. Kept internally distinguishable; never exposed
/// verbatim to clients.
#[derive(Debug, PartialEq, Eq)]
pub enum VerifyError {
    MalformedToken,
    UnknownKey,
    InvalidSignature,
    Expired,
    NotYetValid,
    IssuerMismatch,
    AudienceMismatch,
    /// JWKS endpoint unreachable or returned an error.
    Fetch(String),
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::MalformedToken => f.write_str("malformed token"),
            VerifyError::UnknownKey => f.write_str("unknown signing key"),
            VerifyError::InvalidSignature => f.write_str("invalid signature"),
            VerifyError::Expired => f.write_str("token expired"),
            VerifyError::NotYetValid => f.write_str("token not yet valid"),
            VerifyError::IssuerMismatch => f.write_str("issuer mismatch"),
            VerifyError::AudienceMismatch => f.write_str("audience mismatch"),
            VerifyError::Fetch(msg) => write!(f, "JWKS fetch failed: {}", msg),
        }
    }
}

/// The `aud` claim may be a bare string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Claims of a successfully verified identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub iss: String,
    pub aud: Audience,
    pub sub: String,
    pub email: String,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Stateless RS256 verifier bound to an expected issuer and audience.
pub struct Verifier {
    jwks: JwksCache,
    jwks_url: String,
    issuer: String,
    audience: String,
}

impl Verifier {
    pub fn new(jwks: JwksCache, jwks_url: String, issuer: String, audience: String) -> Self {
        Self {
            jwks,
            jwks_url,
            issuer,
            audience,
        }
    }

    /// Verify structure, signature and claims. Signature first: claims are
    /// only read from a token whose signature checked out.
    pub async fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedClaims, VerifyError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(VerifyError::MalformedToken);
        }

        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Failed to decode token header");
            VerifyError::MalformedToken
        })?;
        let kid = header.kid.ok_or(VerifyError::UnknownKey)?;

        let jwk = self
            .jwks
            .get_key(&self.jwks_url, &kid)
            .await
            .map_err(|e| VerifyError::Fetch(e.to_string()))?
            .ok_or(VerifyError::UnknownKey)?;

        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| VerifyError::Fetch(format!("bad JWK material: {e}")))?;

        // Time and identity claims are checked by hand below so each failure
        // stays distinguishable; jsonwebtoken only checks the signature here.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        let data = decode::<VerifiedClaims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
                _ => {
                    debug!(error = %e, "Token decode failed");
                    VerifyError::MalformedToken
                }
            }
        })?;
        let claims = data.claims;

        if claims.iss != self.issuer {
            return Err(VerifyError::IssuerMismatch);
        }
        if !claims.aud.contains(&self.audience) {
            return Err(VerifyError::AudienceMismatch);
        }

        let now_secs = now.timestamp();
        if claims.exp + CLOCK_SKEW_SECS <= now_secs {
            return Err(VerifyError::Expired);
        }
        if let Some(nbf) = claims.nbf
            && nbf > now_secs + CLOCK_SKEW_SECS
        {
            return Err(VerifyError::NotYetValid);
        }

        Ok(claims)
    }
}
