use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::error::AuthError;
use crate::models::login_event;

/// Record a login attempt for auditing. Callers invoke this best-effort
/// (`let _ = ...`); a failed insert must never change the outcome of the
/// authentication itself.
pub async fn record_login_event(
    db: &DatabaseConnection,
    user_id: Option<i32>,
    username: &str,
    device_id: Option<&str>,
    success: bool,
    failure_reason: Option<&str>,
) -> Result<(), AuthError> {
    let model = login_event::ActiveModel {
        user_id: Set(user_id),
        username: Set(username.to_string()),
        device_id: Set(device_id.map(|d| d.to_string())),
        success: Set(success),
        failure_reason: Set(failure_reason.map(|r| r.to_string())),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    model.insert(db).await?;
    Ok(())
}
