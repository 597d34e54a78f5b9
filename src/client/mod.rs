pub mod cache;
pub mod keys;
pub mod remote;

pub use cache::{default_cache_path, CachedSession, SessionCache};
pub use remote::{AuthorityClient, HttpAuthorityClient, LoginGrant};
