use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};

use tether_auth::auth::generate_session_token;
use tether_auth::client::{LoginGrant, SessionCache};
use tether_auth::fingerprint::DeviceId;
use tether_auth::models::user::UserInfo;
use tether_auth::testing::{MockAuthority, MockVerdict};

const DEVICE_A: &str = "aaaaaaaa-1111-2222-3333-444444444444";
const DEVICE_B: &str = "bbbbbbbb-5555-6666-7777-888888888888";

fn temp_cache_path() -> PathBuf {
    std::env::temp_dir().join(format!("tether-cache-test-{}.cache", generate_session_token()))
}

fn alice() -> UserInfo {
    UserInfo {
        id: 1,
        username: "alice".to_string(),
        account_type: "trial".to_string(),
        expires_at: None,
    }
}

fn cache_with(
    verdict: MockVerdict,
    device: &str,
) -> (SessionCache<Arc<MockAuthority>>, Arc<MockAuthority>, PathBuf) {
    let mock = Arc::new(MockAuthority::new(verdict));
    let path = temp_cache_path();
    let cache = SessionCache::new(mock.clone(), path.clone(), DeviceId::new(device));
    (cache, mock, path)
}

#[test]
fn save_then_load_round_trips() {
    let (cache, _, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);

    cache.save("token-1", &alice(), expires).expect("save");

    let record = cache.load().expect("load");
    assert_eq!(record.token, "token-1");
    assert_eq!(record.user, alice());
    assert_eq!(record.device_id, DEVICE_A);

    // The file on disk is ciphertext; the token must not appear in it.
    let raw = fs::read(&path).unwrap();
    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains("token-1"));
    assert!(!haystack.contains("alice"));

    cache.clear();
}

#[test]
fn flipping_any_byte_destroys_the_cache() {
    let (cache, _, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    let mut blob = fs::read(&path).unwrap();
    let mid = blob.len() / 2;
    blob[mid] ^= 0x01;
    fs::write(&path, &blob).unwrap();

    assert!(cache.load().is_none(), "tampered cache must not load");
    assert!(!path.exists(), "tampered cache must be deleted");
}

#[test]
fn cache_is_unreadable_on_a_different_machine() {
    let (cache_a, _, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache_a.save("token-1", &alice(), expires).unwrap();

    // Same file, different device fingerprint: the derived key changes, so
    // decryption fails and the file is discarded.
    let mock = Arc::new(MockAuthority::new(MockVerdict::Unreachable));
    let cache_b = SessionCache::new(mock, path.clone(), DeviceId::new(DEVICE_B));

    assert!(cache_b.load().is_none());
    assert!(!path.exists());
}

#[test]
fn expired_record_is_discarded_on_load() {
    let (cache, _, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expired = Utc::now().naive_utc() - Duration::seconds(1);
    cache.save("token-1", &alice(), expired).unwrap();

    assert!(cache.load().is_none());
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn cache_file_is_owner_only_from_creation() {
    use std::os::unix::fs::PermissionsExt;

    let (cache, _, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600, "cache file must be readable by its owner only");

    // Overwriting an existing cache keeps the mode.
    cache.save("token-2", &alice(), expires).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);

    cache.clear();
}

#[test]
fn missing_file_loads_as_no_session() {
    let (cache, _, _) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    assert!(cache.load().is_none());
}

#[tokio::test]
async fn confirmed_session_is_returned_with_refreshed_user_info() {
    let mut refreshed = alice();
    refreshed.account_type = "lifetime".to_string();

    let (cache, _, path) = cache_with(MockVerdict::Accept(refreshed.clone()), DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    let record = cache
        .get_current_session()
        .await
        .expect("authority confirmed the session");
    assert_eq!(record.token, "token-1");
    assert_eq!(
        record.user, refreshed,
        "user info must come from the server, not the cache"
    );

    fs::remove_file(&path).ok();
}

#[tokio::test]
async fn rejected_session_clears_the_cache() {
    let (cache, _, path) = cache_with(MockVerdict::Reject("SESSION_REVOKED"), DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    assert!(cache.get_current_session().await.is_none());
    assert!(!path.exists(), "rejected session must clear the cache file");
}

// The deliberate availability/security tradeoff: a valid, signed,
// unexpired record is worthless when the authority cannot confirm it.
#[tokio::test]
async fn unreachable_authority_fails_closed() {
    let (cache, _, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    assert!(cache.load().is_some(), "record itself is locally valid");
    assert!(cache.get_current_session().await.is_none());
    assert!(!path.exists(), "offline verification must clear the cache");
    assert!(!cache.is_authenticated().await);
}

#[tokio::test]
async fn login_caches_the_granted_session() {
    let grant = LoginGrant {
        token: "granted-token".to_string(),
        user: alice(),
        expires_at: Utc::now().naive_utc() + Duration::hours(24),
    };
    let mock = Arc::new(MockAuthority::with_login(
        grant,
        MockVerdict::Accept(alice()),
    ));
    let path = temp_cache_path();
    let cache = SessionCache::new(mock.clone(), path.clone(), DeviceId::new(DEVICE_A));

    let user = cache.login("alice", "secret").await.expect("login");
    assert_eq!(user, alice());

    let record = cache.load().expect("session was cached");
    assert_eq!(record.token, "granted-token");

    fs::remove_file(&path).ok();
}

#[tokio::test]
async fn failed_login_leaves_no_cache_behind() {
    // No grant programmed: the mock rejects credentials.
    let (cache, _, path) = cache_with(MockVerdict::Accept(alice()), DEVICE_A);

    assert!(cache.login("alice", "wrong").await.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn logout_revokes_remotely_and_always_clears() {
    let (cache, mock, path) = cache_with(MockVerdict::Accept(alice()), DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    cache.logout().await;
    assert_eq!(mock.revoke_count(), 1);
    assert!(!path.exists());
}

#[tokio::test]
async fn logout_clears_even_when_the_authority_is_down() {
    let (cache, mock, path) = cache_with(MockVerdict::Unreachable, DEVICE_A);
    let expires = Utc::now().naive_utc() + Duration::hours(24);
    cache.save("token-1", &alice(), expires).unwrap();

    cache.logout().await;
    assert_eq!(mock.revoke_count(), 1, "revoke must still be attempted");
    assert!(!path.exists(), "local cache must clear regardless");
}
