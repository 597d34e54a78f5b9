pub mod login_event;
pub mod session;
pub mod user;

pub use user::UserInfo;
