use thiserror::Error;

/// Standard error type for tether-auth.
///
/// Authentication and session failures are always returned as typed values;
/// nothing in this crate panics across the trust boundary. The caller (an
/// API layer, a CLI) decides how each kind is presented.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username/password mismatch. Deliberately does not distinguish
    /// "unknown user" from "wrong password".
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is deactivated")]
    AccountInactive,

    #[error("account has expired")]
    AccountExpired,

    /// Device binding violated, either at login or at session verification.
    #[error("account is bound to another device")]
    DeviceMismatch,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("session not found")]
    SessionNotFound,

    #[error("session has been revoked")]
    SessionRevoked,

    #[error("session has expired")]
    SessionExpired,

    /// The local cache failed decryption, parsing or its signature check.
    /// Treated identically to "no session".
    #[error("local session cache failed integrity checks")]
    CacheIntegrity,

    /// The session authority could not be reached at all. Never silently
    /// trusted; treated identically to "no session".
    #[error("session authority unreachable: {0}")]
    AuthorityUnreachable(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Stable code string for this error, used on the wire and in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::AccountExpired => "ACCOUNT_EXPIRED",
            AuthError::DeviceMismatch => "DEVICE_MISMATCH",
            AuthError::UsernameTaken => "USERNAME_TAKEN",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::SessionRevoked => "SESSION_REVOKED",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::CacheIntegrity => "CACHE_INTEGRITY",
            AuthError::AuthorityUnreachable(_) => "AUTHORITY_UNREACHABLE",
            AuthError::Crypto(_) => "CRYPTO_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
            AuthError::Database(_) => "DATABASE_ERROR",
            AuthError::Io(_) => "IO_ERROR",
        }
    }

    /// Decode a wire error code back into the matching kind. Unknown codes
    /// become `Internal` so a newer server cannot be mistaken for a
    /// transport failure.
    pub fn from_code(code: &str, message: &str) -> Self {
        match code {
            "INVALID_CREDENTIALS" => AuthError::InvalidCredentials,
            "ACCOUNT_INACTIVE" => AuthError::AccountInactive,
            "ACCOUNT_EXPIRED" => AuthError::AccountExpired,
            "DEVICE_MISMATCH" => AuthError::DeviceMismatch,
            "USERNAME_TAKEN" => AuthError::UsernameTaken,
            "SESSION_NOT_FOUND" => AuthError::SessionNotFound,
            "SESSION_REVOKED" => AuthError::SessionRevoked,
            "SESSION_EXPIRED" => AuthError::SessionExpired,
            _ => AuthError::Internal(format!("{}: {}", code, message)),
        }
    }

    /// True when the authority explicitly denied the request, as opposed to
    /// the request never completing. The session cache clears itself in
    /// both cases, but only rejections mean the server actually saw us.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountInactive
                | AuthError::AccountExpired
                | AuthError::DeviceMismatch
                | AuthError::SessionNotFound
                | AuthError::SessionRevoked
                | AuthError::SessionExpired
        )
    }
}
