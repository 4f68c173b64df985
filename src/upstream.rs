//! Downstream chat-platform admin API client and user provisioning.
//!
//! Provisioning is lookup-or-create on the user directory keyed by email,
//! followed by idempotent team/channel membership and a fresh session.
//! Accounts are OIDC-bound; the password set at creation is random and
//! never used.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::BreakwaterError;
use crate::jwt::VerifiedClaims;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamUser {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSession {
    pub token: Option<String>,
    /// Epoch milliseconds, when the platform reports one.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Thin typed client over the chat platform's v4 admin surface.
pub struct ChatClient {
    base_url: String,
    admin_token: String,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: String, admin_token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token,
            http: reqwest::Client::new(),
        }
    }

    fn admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.admin_token)
    }

    async fn upstream_error(response: reqwest::Response) -> BreakwaterError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        BreakwaterError::Upstream { status, body }
    }

    pub async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UpstreamUser>, BreakwaterError> {
        let url = format!("{}/api/v4/users/email/{}", self.base_url, email);
        let response = self.admin(self.http.get(&url)).send().await?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(Self::upstream_error(response).await),
        }
    }

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        subject: &str,
    ) -> Result<UpstreamUser, BreakwaterError> {
        let url = format!("{}/api/v4/users", self.base_url);
        let body = json!({
            "email": email,
            "username": username,
            "first_name": first_name,
            "last_name": last_name,
            "auth_service": "oidc",
            "auth_data": subject,
            "password": throwaway_password(),
        });
        let response = self.admin(self.http.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Rebind the auth service/data and refresh names on an existing user.
    pub async fn patch_user(
        &self,
        user_id: &str,
        first_name: &str,
        last_name: &str,
        subject: &str,
    ) -> Result<(), BreakwaterError> {
        let url = format!("{}/api/v4/users/{}/patch", self.base_url, user_id);
        let body = json!({
            "first_name": first_name,
            "last_name": last_name,
            "auth_service": "oidc",
            "auth_data": subject,
        });
        let response = self.admin(self.http.put(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }
        Ok(())
    }

    /// Add the user to a team unless already a member.
    pub async fn ensure_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), BreakwaterError> {
        let url = format!(
            "{}/api/v4/teams/{}/members/{}",
            self.base_url, team_id, user_id
        );
        let response = self.admin(self.http.get(&url)).send().await?;
        match response.status() {
            status if status.is_success() => return Ok(()),
            reqwest::StatusCode::NOT_FOUND => {}
            _ => return Err(Self::upstream_error(response).await),
        }

        let url = format!("{}/api/v4/teams/{}/members", self.base_url, team_id);
        let body = json!({ "team_id": team_id, "user_id": user_id });
        let response = self.admin(self.http.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }
        debug!(team_id = %team_id, user_id = %user_id, "Added team member");
        Ok(())
    }

    /// Add the user to a channel unless already a member.
    pub async fn ensure_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), BreakwaterError> {
        let url = format!(
            "{}/api/v4/channels/{}/members/{}",
            self.base_url, channel_id, user_id
        );
        let response = self.admin(self.http.get(&url)).send().await?;
        match response.status() {
            status if status.is_success() => return Ok(()),
            reqwest::StatusCode::NOT_FOUND => {}
            _ => return Err(Self::upstream_error(response).await),
        }

        let url = format!("{}/api/v4/channels/{}/members", self.base_url, channel_id);
        let body = json!({ "user_id": user_id });
        let response = self.admin(self.http.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }
        debug!(channel_id = %channel_id, user_id = %user_id, "Added channel member");
        Ok(())
    }

    pub async fn create_session(&self, user_id: &str) -> Result<UpstreamSession, BreakwaterError> {
        let url = format!("{}/api/v4/users/{}/sessions", self.base_url, user_id);
        let body = json!({ "device_id": "" });
        let response = self.admin(self.http.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Resolve the user a session token belongs to. 401/403 from upstream
    /// means the session is gone.
    pub async fn get_me(&self, session_token: &str) -> Result<UpstreamUser, BreakwaterError> {
        let url = format!("{}/api/v4/users/me", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(session_token)
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(
                BreakwaterError::Auth("session rejected by upstream".to_string()),
            ),
            _ => Err(Self::upstream_error(response).await),
        }
    }
}

/// Reconcile a verified identity into an upstream user plus a fresh session.
pub struct Provisioner {
    client: ChatClient,
    team_id: String,
    default_channel_id: Option<String>,
}

impl Provisioner {
    pub fn new(client: ChatClient, team_id: String, default_channel_id: Option<String>) -> Self {
        Self {
            client,
            team_id,
            default_channel_id,
        }
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    pub async fn provision(
        &self,
        claims: &VerifiedClaims,
    ) -> Result<(UpstreamUser, UpstreamSession), BreakwaterError> {
        let first_name = claims.given_name.as_deref().unwrap_or("");
        let last_name = claims.family_name.as_deref().unwrap_or("");

        let user = match self.client.get_user_by_email(&claims.email).await? {
            Some(user) => {
                // Keep the auth binding in sync. A 4xx here is non-critical
                // (the account already exists and can hold a session), so it
                // is logged and tolerated; transport failures still propagate.
                match self
                    .client
                    .patch_user(&user.id, first_name, last_name, &claims.sub)
                    .await
                {
                    Ok(()) => {}
                    Err(BreakwaterError::Upstream { status, body }) if status < 500 => {
                        warn!(
                            user_id = %user.id,
                            status = status,
                            body = %body,
                            "Non-critical user patch failure, continuing"
                        );
                    }
                    Err(e) => return Err(e),
                }
                user
            }
            None => {
                let username = build_username(&claims.email, &claims.sub);
                info!(email = %claims.email, username = %username, "Creating upstream user");
                self.client
                    .create_user(&claims.email, &username, first_name, last_name, &claims.sub)
                    .await?
            }
        };

        self.client
            .ensure_team_member(&self.team_id, &user.id)
            .await?;
        if let Some(channel_id) = &self.default_channel_id {
            self.client
                .ensure_channel_member(channel_id, &user.id)
                .await?;
        }

        let session = self.client.create_session(&user.id).await?;
        if session.token.as_deref().unwrap_or("").is_empty() {
            return Err(BreakwaterError::Other(
                "upstream session response missing token".to_string(),
            ));
        }

        Ok((user, session))
    }
}

/// Derive a stable username: lowercase alphanumeric email local part, an
/// underscore, and a 6-character suffix from the sanitized subject claim.
pub fn build_username(email: &str, subject: &str) -> String {
    let sanitize = |s: &str| {
        s.to_lowercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
    };

    let local = sanitize(email.split('@').next().unwrap_or(""));
    let sub = sanitize(subject);
    let suffix_start = sub.len().saturating_sub(6);
    let suffix = &sub[suffix_start..];

    // Collapse repeated underscores and trim the ends, so empty components
    // never leave a dangling separator.
    let mut username = String::with_capacity(local.len() + suffix.len() + 1);
    for part in [local.as_str(), suffix] {
        if part.is_empty() {
            continue;
        }
        if !username.is_empty() {
            username.push('_');
        }
        username.push_str(part);
    }
    username
}

/// Random throwaway password for OIDC-bound accounts.
fn throwaway_password() -> String {
    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..32)
        .map(|_| chars[rng.random_range(0..chars.len())] as char)
        .collect()
}
