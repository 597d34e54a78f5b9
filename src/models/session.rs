use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Server-side session entity. Rows hold only a SHA-256 hash of the issued
/// token; the raw token exists solely on the client.
///
/// Lifecycle: active → expired (lazily, at verification time) or → revoked
/// (explicitly). Both are terminal; expired rows also get `revoked` set so
/// a periodic sweep has nothing special to do.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// The user who owns this session
    pub user_id: i32,

    #[sea_orm(unique)]
    pub token_hash: String,

    /// Device fingerprint digest captured at issuance; verification
    /// requires the same digest.
    pub device_id: String,

    pub expires_at: NaiveDateTime,

    pub last_activity: NaiveDateTime,

    #[sea_orm(default_value = false)]
    pub revoked: bool,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
