//! Test support: an in-memory database with the schema applied, and a
//! scripted authority client for exercising the session cache offline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::client::remote::{AuthorityClient, LoginGrant};
use crate::error::AuthError;
use crate::migrations::Migrator;
use crate::models::user::UserInfo;

/// Connect an in-memory SQLite database and apply all migrations.
///
/// Pool size is pinned to one connection: each SQLite `:memory:` connection
/// is its own database, so a larger pool would hand out empty ones.
pub async fn test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("failed to connect test database");
    Migrator::up(&db, None)
        .await
        .expect("failed to apply migrations");
    db
}

/// What the mock authority should answer to `verify`.
#[derive(Debug, Clone)]
pub enum MockVerdict {
    /// Confirm the session and return this user snapshot.
    Accept(UserInfo),
    /// Explicitly reject with the given error code
    /// (an `AuthError::error_code()` string, e.g. `"SESSION_REVOKED"`).
    Reject(&'static str),
    /// Simulate a dead network: every call fails as unreachable.
    Unreachable,
}

/// Scripted [`AuthorityClient`] for session-cache tests. Wrap it in an
/// `Arc` to keep a handle for reprogramming verdicts mid-test.
pub struct MockAuthority {
    pub login_grant: Mutex<Option<LoginGrant>>,
    pub verify_verdict: Mutex<MockVerdict>,
    pub revoke_fails: bool,
    pub revoke_calls: AtomicUsize,
}

impl MockAuthority {
    pub fn new(verdict: MockVerdict) -> Self {
        MockAuthority {
            login_grant: Mutex::new(None),
            verify_verdict: Mutex::new(verdict),
            revoke_fails: false,
            revoke_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_login(grant: LoginGrant, verdict: MockVerdict) -> Self {
        let mock = MockAuthority::new(verdict);
        *mock.login_grant.lock().unwrap() = Some(grant);
        mock
    }

    pub fn set_verdict(&self, verdict: MockVerdict) {
        *self.verify_verdict.lock().unwrap() = verdict;
    }

    pub fn revoke_count(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorityClient for MockAuthority {
    async fn login(
        &self,
        _username: &str,
        _password: &str,
        _device_id: &str,
    ) -> Result<LoginGrant, AuthError> {
        if matches!(*self.verify_verdict.lock().unwrap(), MockVerdict::Unreachable) {
            return Err(AuthError::AuthorityUnreachable("mock offline".to_string()));
        }
        self.login_grant
            .lock()
            .unwrap()
            .clone()
            .ok_or(AuthError::InvalidCredentials)
    }

    async fn verify(&self, _token: &str, _device_id: &str) -> Result<UserInfo, AuthError> {
        let verdict = self.verify_verdict.lock().unwrap().clone();
        match verdict {
            MockVerdict::Accept(user) => Ok(user),
            MockVerdict::Reject(code) => Err(AuthError::from_code(code, "mock rejection")),
            MockVerdict::Unreachable => {
                Err(AuthError::AuthorityUnreachable("mock offline".to_string()))
            }
        }
    }

    async fn revoke(&self, _token: &str) -> Result<(), AuthError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.revoke_fails
            || matches!(*self.verify_verdict.lock().unwrap(), MockVerdict::Unreachable)
        {
            return Err(AuthError::AuthorityUnreachable("mock offline".to_string()));
        }
        Ok(())
    }
}
