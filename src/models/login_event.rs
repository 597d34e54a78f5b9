use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Login attempt for audit logging. Written best-effort; authentication
/// never fails because an event could not be recorded.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "login_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// The user who attempted to log in, when the username matched one
    pub user_id: Option<i32>,

    /// Username used in the attempt (even if no such user exists)
    pub username: String,

    /// Device fingerprint digest presented with the attempt
    pub device_id: Option<String>,

    pub success: bool,

    /// Error code if unsuccessful
    pub failure_reason: Option<String>,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
