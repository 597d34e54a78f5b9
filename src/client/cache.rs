//! Encrypted local session cache.
//!
//! Lets the client remember "who is logged in" across restarts without ever
//! treating that memory as proof of authentication. The cache is one
//! encrypted file; its keys come from the device fingerprint (see
//! [`crate::client::keys`]), and anything suspicious about it — failed
//! decryption, bad signature, wrong device, past expiry — deletes the file.
//! Even a pristine record is only returned after the session authority has
//! confirmed it online; if the authority cannot be reached, the cache is
//! cleared and the caller gets "not authenticated". Fail closed, always.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use rand::Rng;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use serde::{Deserialize, Serialize};

use crate::client::keys::{derive_cache_key, sign_record, verify_record_signature};
use crate::client::remote::AuthorityClient;
use crate::config::Config;
use crate::error::AuthError;
use crate::fingerprint::{compute_device_id, DeviceId};
use crate::models::user::UserInfo;

const CACHE_FORMAT_VERSION: u32 = 1;

/// The decrypted, verified contents of the cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    pub token: String,
    pub user: UserInfo,
    pub expires_at: NaiveDateTime,
    pub device_id: String,
    pub created_at: NaiveDateTime,
}

/// What actually gets serialized and encrypted: the record plus its
/// signature and a format version for forward migration.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    version: u32,
    record: CachedSession,
    signature: String,
}

/// Default location of the cache file: `%APPDATA%\TetherAuth` on Windows,
/// `~/.tether` elsewhere.
pub fn default_cache_path() -> PathBuf {
    #[cfg(windows)]
    let dir = {
        let base = std::env::var("APPDATA")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(base).join("TetherAuth")
    };

    #[cfg(not(windows))]
    let dir = {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".tether")
    };

    dir.join("session.cache")
}

/// The client-side session cache. Generic over the authority client so
/// tests can substitute a scripted one.
pub struct SessionCache<C: AuthorityClient> {
    client: C,
    path: PathBuf,
    device_id: DeviceId,
}

impl<C: AuthorityClient> SessionCache<C> {
    /// Build a cache over an explicit file path and device identity.
    pub fn new(client: C, path: PathBuf, device_id: DeviceId) -> Self {
        SessionCache {
            client,
            path,
            device_id,
        }
    }

    /// Build a cache for this machine: fingerprint computed from local
    /// hardware, path from config (or the per-user default).
    pub fn from_config(client: C, config: &Config) -> Self {
        let path = config
            .cache_dir
            .as_ref()
            .map(|dir| dir.join("session.cache"))
            .unwrap_or_else(default_cache_path);
        SessionCache::new(client, path, compute_device_id())
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn cache_path(&self) -> &Path {
        &self.path
    }

    /// Encrypt and persist a session record, replacing any previous one.
    pub fn save(
        &self,
        token: &str,
        user: &UserInfo,
        expires_at: NaiveDateTime,
    ) -> Result<(), AuthError> {
        let record = CachedSession {
            token: token.to_string(),
            user: user.clone(),
            expires_at,
            device_id: self.device_id.as_str().to_string(),
            created_at: Utc::now().naive_utc(),
        };

        let envelope = CacheEnvelope {
            version: CACHE_FORMAT_VERSION,
            signature: sign_record(token, user.id, expires_at, &self.device_id)?,
            record,
        };

        let plaintext = serde_json::to_vec(&envelope)
            .map_err(|e| AuthError::Internal(format!("failed to serialize cache: {}", e)))?;
        let blob = self.encrypt(&plaintext)?;

        self.write_atomically(&blob)?;
        tracing::debug!(path = %self.path.display(), "saved session cache");
        Ok(())
    }

    /// Read, decrypt and verify the cached record. Any failure — missing
    /// pieces, tampering, wrong device, past expiry — deletes the file and
    /// yields `None`; a partially-trusted record is never returned.
    pub fn load(&self) -> Option<CachedSession> {
        if !self.path.exists() {
            return None;
        }

        match self.try_load() {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(
                    reason = err.error_code(),
                    "discarding local session cache"
                );
                self.clear();
                None
            }
        }
    }

    /// Delete the cache file. Missing files are fine.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %err, "failed to remove session cache");
            }
        }
    }

    /// The fail-closed session check.
    ///
    /// A structurally valid local record is necessary but never sufficient:
    /// the authority must confirm the token online. Explicit rejection and
    /// unreachable authority are treated the same way — clear the cache,
    /// report no session. The user info in the returned record is refreshed
    /// from the server's response.
    pub async fn get_current_session(&self) -> Option<CachedSession> {
        let record = self.load()?;

        match self
            .client
            .verify(&record.token, self.device_id.as_str())
            .await
        {
            Ok(user) => Some(CachedSession { user, ..record }),
            Err(err) if err.is_rejection() => {
                tracing::info!(reason = err.error_code(), "authority rejected cached session");
                self.clear();
                None
            }
            Err(err) => {
                tracing::warn!(
                    reason = err.error_code(),
                    "authority unreachable; failing closed"
                );
                self.clear();
                None
            }
        }
    }

    /// Log in against the authority and cache the granted session.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, AuthError> {
        let grant = self
            .client
            .login(username, password, self.device_id.as_str())
            .await?;

        // The login itself succeeded; a cache write failure only costs the
        // user a re-login after restart.
        if let Err(err) = self.save(&grant.token, &grant.user, grant.expires_at) {
            tracing::warn!(error = %err, "failed to persist session cache");
        }

        Ok(grant.user)
    }

    /// Log out: best-effort revoke at the authority, then clear the local
    /// cache no matter what the network said.
    pub async fn logout(&self) {
        if let Some(record) = self.load() {
            if let Err(err) = self.client.revoke(&record.token).await {
                tracing::warn!(reason = err.error_code(), "remote logout failed");
            }
        }
        self.clear();
    }

    /// Whether a server-confirmed session currently exists.
    pub async fn is_authenticated(&self) -> bool {
        self.get_current_session().await.is_some()
    }

    // ── internals ──

    fn try_load(&self) -> Result<CachedSession, AuthError> {
        let blob = fs::read(&self.path)?;
        let plaintext = self.decrypt(&blob)?;

        let envelope: CacheEnvelope =
            serde_json::from_slice(&plaintext).map_err(|_| AuthError::CacheIntegrity)?;

        if envelope.version != CACHE_FORMAT_VERSION {
            return Err(AuthError::CacheIntegrity);
        }

        let record = envelope.record;

        if record.device_id != self.device_id.as_str() {
            return Err(AuthError::DeviceMismatch);
        }

        let valid = verify_record_signature(
            &record.token,
            record.user.id,
            record.expires_at,
            &self.device_id,
            &envelope.signature,
        )?;
        if !valid {
            return Err(AuthError::CacheIntegrity);
        }

        if record.expires_at < Utc::now().naive_utc() {
            return Err(AuthError::SessionExpired);
        }

        Ok(record)
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
        let key = derive_cache_key(&self.device_id);
        let unbound = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| AuthError::Crypto("failed to build cache key".to_string()))?;
        let sealing = LessSafeKey::new(unbound);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        sealing
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AuthError::Crypto("failed to encrypt cache".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(blob)
    }

    fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, AuthError> {
        if blob.len() <= NONCE_LEN {
            return Err(AuthError::CacheIntegrity);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

        let key = derive_cache_key(&self.device_id);
        let unbound = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| AuthError::Crypto("failed to build cache key".to_string()))?;
        let opening = LessSafeKey::new(unbound);

        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AuthError::CacheIntegrity)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = opening
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AuthError::CacheIntegrity)?;

        Ok(plaintext.to_vec())
    }

    /// Write via a sibling temp file and rename, so a crash mid-write never
    /// leaves a truncated cache. Owner-only permissions where supported.
    fn write_atomically(&self, blob: &[u8]) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("cache.tmp");
        // A stale temp file keeps its old mode; recreate instead of reusing.
        let _ = fs::remove_file(&tmp);

        // Owner-only from the moment the file exists, not chmod'd after.
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp)?;
        io::Write::write_all(&mut file, blob)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
