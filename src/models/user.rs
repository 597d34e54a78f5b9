use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User entity. An account is permanently tied to the first device that
/// logs into it: `device_id` starts null and is set exactly once by the
/// authenticator's conditional update. Only an administrative reset clears
/// it again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2 PHC string (excluded from serialization via serde skip)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Device fingerprint digest bound on first successful login; null for
    /// accounts that have never logged in.
    pub device_id: Option<String>,

    /// Account class (trial, standard, lifetime, ...). Opaque to this
    /// crate; callers decide what each class unlocks.
    pub account_type: String,

    pub is_active: bool,

    /// Account-level expiry; null means the account never expires.
    pub expires_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Public user data, safe to return to clients and to snapshot into the
/// local session cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub account_type: String,
    pub expires_at: Option<NaiveDateTime>,
}

impl From<Model> for UserInfo {
    fn from(user: Model) -> Self {
        UserInfo {
            id: user.id,
            username: user.username,
            account_type: user.account_type,
            expires_at: user.expires_at,
        }
    }
}
