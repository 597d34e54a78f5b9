//! Client-side view of the session authority.
//!
//! The trait is the seam the session cache depends on; the reqwest
//! implementation speaks the authority's JSON envelope. Any transport
//! failure — connect error, timeout, malformed body — becomes
//! `AuthorityUnreachable`, which the cache treats exactly like a rejection.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::models::user::UserInfo;

/// Successful login response: the raw session token plus the user snapshot
/// and the server-chosen expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    pub user: UserInfo,
    pub expires_at: NaiveDateTime,
}

/// Remote operations the local session cache performs against the
/// authority.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Authenticate and obtain a fresh session.
    async fn login(
        &self,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginGrant, AuthError>;

    /// Revalidate an existing session token from this device.
    async fn verify(&self, token: &str, device_id: &str) -> Result<UserInfo, AuthError>;

    /// Revoke a session (logout). Idempotent on the server.
    async fn revoke(&self, token: &str) -> Result<(), AuthError>;
}

#[async_trait]
impl<C: AuthorityClient + ?Sized> AuthorityClient for std::sync::Arc<C> {
    async fn login(
        &self,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginGrant, AuthError> {
        (**self).login(username, password, device_id).await
    }

    async fn verify(&self, token: &str, device_id: &str) -> Result<UserInfo, AuthError> {
        (**self).verify(token, device_id).await
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        (**self).revoke(token).await
    }
}

// ── Wire types (the authority's response envelope) ──

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    device_id: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
    device_id: &'a str,
}

#[derive(Debug, Serialize)]
struct RevokeRequest<'a> {
    token: &'a str,
}

/// HTTP implementation of [`AuthorityClient`].
#[derive(Debug, Clone)]
pub struct HttpAuthorityClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthorityClient {
    /// Build a client for the authority at `base_url`. `timeout` bounds
    /// every round trip; a timed-out call is reported as
    /// `AuthorityUnreachable`, never retried.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to build http client: {}", e)))?;

        Ok(HttpAuthorityClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::AuthorityUnreachable(e.to_string()))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AuthError::AuthorityUnreachable(format!("malformed response: {}", e)))?;

        if envelope.success {
            envelope.data.ok_or_else(|| {
                AuthError::AuthorityUnreachable("success response without data".to_string())
            })
        } else {
            let err = envelope.error.ok_or_else(|| {
                AuthError::AuthorityUnreachable("failure response without error".to_string())
            })?;
            Err(AuthError::from_code(&err.code, &err.message))
        }
    }

    /// Like [`Self::post`] for endpoints whose success payload is empty.
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), AuthError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::AuthorityUnreachable(e.to_string()))?;

        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AuthError::AuthorityUnreachable(format!("malformed response: {}", e)))?;

        if envelope.success {
            Ok(())
        } else {
            let err = envelope.error.ok_or_else(|| {
                AuthError::AuthorityUnreachable("failure response without error".to_string())
            })?;
            Err(AuthError::from_code(&err.code, &err.message))
        }
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn login(
        &self,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginGrant, AuthError> {
        self.post(
            "/auth/login",
            &LoginRequest {
                username,
                password,
                device_id,
            },
        )
        .await
    }

    async fn verify(&self, token: &str, device_id: &str) -> Result<UserInfo, AuthError> {
        self.post("/auth/verify", &VerifyRequest { token, device_id })
            .await
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.post_unit("/auth/logout", &RevokeRequest { token }).await
    }
}
