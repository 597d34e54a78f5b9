//! Credential verification and device binding.
//!
//! An account starts unbound. The first successful login stamps the
//! presenting device's fingerprint onto the account with a single
//! conditional UPDATE, so two concurrent first logins from different
//! machines can never both bind; every later login must present the same
//! fingerprint or fail with `DeviceMismatch`.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth::audit::record_login_event;
use crate::auth::password::{burn_verification, hash_password, verify_password};
use crate::error::AuthError;
use crate::models::user::{self, Entity as User};

/// Create a new account. `valid_days = None` means the account never
/// expires. The account is unbound until its first successful login.
pub async fn register_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    account_type: &str,
    valid_days: Option<i64>,
) -> Result<user::Model, AuthError> {
    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(AuthError::UsernameTaken);
    }

    let password_hash = hash_password(password)?;
    let now = Utc::now().naive_utc();
    let expires_at = valid_days.map(|days| now + Duration::days(days));

    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        device_id: Set(None),
        account_type: Set(account_type.to_string()),
        is_active: Set(true),
        expires_at: Set(expires_at),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user_model = new_user.insert(db).await?;
    tracing::info!(user_id = user_model.id, username, "registered user");
    Ok(user_model)
}

/// Decide whether a (username, password, device) triple may proceed to
/// session issuance. Returns the user row with the (now) bound device id.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    device_id: &str,
) -> Result<user::Model, AuthError> {
    let now = Utc::now().naive_utc();

    let user_model = match User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
    {
        Some(u) => u,
        None => {
            // Equalize timing with the real verification below so the
            // response never reveals whether the username exists.
            burn_verification(password);
            let _ = record_login_event(
                db,
                None,
                username,
                Some(device_id),
                false,
                Some(AuthError::InvalidCredentials.error_code()),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user_model.password_hash)? {
        let _ = record_login_event(
            db,
            Some(user_model.id),
            username,
            Some(device_id),
            false,
            Some(AuthError::InvalidCredentials.error_code()),
        )
        .await;
        return Err(AuthError::InvalidCredentials);
    }

    if !user_model.is_active {
        let _ = record_login_event(
            db,
            Some(user_model.id),
            username,
            Some(device_id),
            false,
            Some(AuthError::AccountInactive.error_code()),
        )
        .await;
        return Err(AuthError::AccountInactive);
    }

    if let Some(expires_at) = user_model.expires_at {
        if expires_at < now {
            let _ = record_login_event(
                db,
                Some(user_model.id),
                username,
                Some(device_id),
                false,
                Some(AuthError::AccountExpired.error_code()),
            )
            .await;
            return Err(AuthError::AccountExpired);
        }
    }

    let user_model = match &user_model.device_id {
        None => bind_device(db, user_model, device_id).await?,
        Some(bound) if bound == device_id => user_model,
        Some(_) => {
            let _ = record_login_event(
                db,
                Some(user_model.id),
                username,
                Some(device_id),
                false,
                Some(AuthError::DeviceMismatch.error_code()),
            )
            .await;
            return Err(AuthError::DeviceMismatch);
        }
    };

    let _ = record_login_event(db, Some(user_model.id), username, Some(device_id), true, None)
        .await;

    Ok(user_model)
}

/// Bind the account to `device_id` with compare-and-set semantics: the
/// UPDATE only applies while `device_id` is still NULL, so exactly one of
/// any number of concurrent first logins wins. Losers re-read the row and
/// report `DeviceMismatch` unless the winner bound the same device.
async fn bind_device(
    db: &DatabaseConnection,
    user_model: user::Model,
    device_id: &str,
) -> Result<user::Model, AuthError> {
    use sea_orm::sea_query::Expr;

    let now = Utc::now().naive_utc();

    let result = User::update_many()
        .col_expr(user::Column::DeviceId, Expr::value(device_id))
        .col_expr(user::Column::UpdatedAt, Expr::value(now))
        .filter(user::Column::Id.eq(user_model.id))
        .filter(user::Column::DeviceId.is_null())
        .exec(db)
        .await?;

    if result.rows_affected == 1 {
        tracing::info!(user_id = user_model.id, device_id, "bound account to device");
        return Ok(user::Model {
            device_id: Some(device_id.to_string()),
            updated_at: now,
            ..user_model
        });
    }

    // Lost the race: someone else bound the account between our read and
    // the conditional update.
    let fresh = User::find_by_id(user_model.id)
        .one(db)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    match &fresh.device_id {
        Some(bound) if bound == device_id => Ok(fresh),
        _ => {
            let _ = record_login_event(
                db,
                Some(fresh.id),
                &fresh.username,
                Some(device_id),
                false,
                Some(AuthError::DeviceMismatch.error_code()),
            )
            .await;
            Err(AuthError::DeviceMismatch)
        }
    }
}

/// Administrative reset of the device binding. The only path by which a
/// bound account returns to the unbound state.
pub async fn reset_device_binding(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(), AuthError> {
    let user_model = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AuthError::Internal(format!("no user with id {}", user_id)))?;

    let mut active: user::ActiveModel = user_model.into();
    active.device_id = Set(None);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(db).await?;

    tracing::info!(user_id, "reset device binding");
    Ok(())
}

/// Administrative deactivation. Also revokes every live session the user
/// holds, so the account is locked out immediately rather than at next
/// login.
pub async fn deactivate_user(db: &DatabaseConnection, user_id: i32) -> Result<(), AuthError> {
    let user_model = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AuthError::Internal(format!("no user with id {}", user_id)))?;

    let mut active: user::ActiveModel = user_model.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(db).await?;

    crate::auth::authority::revoke_all_user_sessions(db, user_id).await?;

    tracing::info!(user_id, "deactivated user");
    Ok(())
}
