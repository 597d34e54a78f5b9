//! Session lifecycle: issue, verify, revoke.
//!
//! Sessions are opaque random tokens; the database stores only their
//! SHA-256 hash. Expiry is lazy — it is enforced at verification time, and
//! an optional sweep reclaims rows so no background job is ever required
//! for correctness.

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth::token::{generate_session_token, hash_token};
use crate::error::AuthError;
use crate::models::session::{self, Entity as Session};
use crate::models::user::{Entity as User, UserInfo};

/// A freshly issued session. The raw token goes to the client and is never
/// stored server-side.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: NaiveDateTime,
}

/// Issue a new session for a user on a given device.
pub async fn issue_session(
    db: &DatabaseConnection,
    user_id: i32,
    device_id: &str,
    ttl: Duration,
) -> Result<IssuedSession, AuthError> {
    let token = generate_session_token();
    let now = Utc::now().naive_utc();
    let expires_at = now + ttl;

    let model = session::ActiveModel {
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        device_id: Set(device_id.to_string()),
        expires_at: Set(expires_at),
        last_activity: Set(now),
        revoked: Set(false),
        created_at: Set(now),
        ..Default::default()
    };

    model.insert(db).await?;
    tracing::debug!(user_id, device_id, %expires_at, "issued session");

    Ok(IssuedSession { token, expires_at })
}

/// Verify a session token presented from a given device.
///
/// Check order matters: expiry is tested before the revoked flag, so a
/// token that lapsed keeps reporting `SessionExpired` on every verify even
/// though the first detection also flips `revoked` on the row.
pub async fn verify_session(
    db: &DatabaseConnection,
    token: &str,
    device_id: &str,
) -> Result<UserInfo, AuthError> {
    let now = Utc::now().naive_utc();

    let session_model = Session::find()
        .filter(session::Column::TokenHash.eq(hash_token(token)))
        .one(db)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

    if session_model.expires_at < now {
        if !session_model.revoked {
            let mut active: session::ActiveModel = session_model.into();
            active.revoked = Set(true);
            active.update(db).await?;
        }
        return Err(AuthError::SessionExpired);
    }

    if session_model.revoked {
        return Err(AuthError::SessionRevoked);
    }

    if session_model.device_id != device_id {
        return Err(AuthError::DeviceMismatch);
    }

    // The account itself may have been deactivated or lapsed since the
    // session was issued.
    let user_model = User::find_by_id(session_model.user_id)
        .one(db)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

    if !user_model.is_active {
        return Err(AuthError::AccountInactive);
    }
    if let Some(expires_at) = user_model.expires_at {
        if expires_at < now {
            return Err(AuthError::AccountExpired);
        }
    }

    let mut active: session::ActiveModel = session_model.into();
    active.last_activity = Set(now);
    active.update(db).await?;

    Ok(UserInfo::from(user_model))
}

/// Revoke a session. Idempotent: revoking an already-revoked or unknown
/// token is a no-op success.
pub async fn revoke_session(db: &DatabaseConnection, token: &str) -> Result<(), AuthError> {
    let session_model = Session::find()
        .filter(session::Column::TokenHash.eq(hash_token(token)))
        .one(db)
        .await?;

    if let Some(session_model) = session_model {
        if !session_model.revoked {
            let user_id = session_model.user_id;
            let mut active: session::ActiveModel = session_model.into();
            active.revoked = Set(true);
            active.update(db).await?;
            tracing::debug!(user_id, "revoked session");
        }
    }

    Ok(())
}

/// Revoke every live session a user holds (deactivation, password change).
pub async fn revoke_all_user_sessions(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(), AuthError> {
    use sea_orm::sea_query::Expr;

    Session::update_many()
        .col_expr(session::Column::Revoked, Expr::value(true))
        .filter(session::Column::UserId.eq(user_id))
        .filter(session::Column::Revoked.eq(false))
        .exec(db)
        .await?;

    Ok(())
}

/// Mark every lapsed-but-still-active session revoked, returning the count.
/// Purely a storage-reclaim aid; verification already enforces expiry.
pub async fn sweep_expired_sessions(db: &DatabaseConnection) -> Result<u64, AuthError> {
    use sea_orm::sea_query::Expr;

    let now = Utc::now().naive_utc();
    let result = Session::update_many()
        .col_expr(session::Column::Revoked, Expr::value(true))
        .filter(session::Column::ExpiresAt.lt(now))
        .filter(session::Column::Revoked.eq(false))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        tracing::debug!(count = result.rows_affected, "swept expired sessions");
    }
    Ok(result.rows_affected)
}
