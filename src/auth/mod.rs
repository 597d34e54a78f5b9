pub mod audit;
pub mod authenticator;
pub mod authority;
pub mod password;
pub mod token;

pub use authenticator::{authenticate, deactivate_user, register_user, reset_device_binding};
pub use authority::{
    issue_session, revoke_all_user_sessions, revoke_session, sweep_expired_sessions,
    verify_session, IssuedSession,
};
pub use password::{hash_password, verify_password};
pub use token::{generate_session_token, hash_token};
