//! tether-auth: device-bound authentication and session core.
//!
//! One account, one machine. Users authenticate with username/password and
//! the account is permanently bound to the first device that logs in
//! (identified by a hardware fingerprint digest). The server issues opaque
//! session tokens with lazy expiry; the client keeps an encrypted,
//! signature-protected cache of its session but never trusts it without
//! revalidating online — any doubt resolves to "not authenticated".
//!
//! Server side: [`auth`] over a sea-orm store. Client side: [`client`] with
//! the fail-closed [`client::SessionCache`]. [`fingerprint`] is shared by
//! both halves.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod testing;

pub use config::Config;
pub use error::AuthError;
pub use fingerprint::{compute_device_id, DeviceId};
pub use models::UserInfo;
