use chrono::Duration;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use tether_auth::auth::{
    authenticate, deactivate_user, issue_session, register_user, revoke_all_user_sessions,
    revoke_session, sweep_expired_sessions, verify_session,
};
use tether_auth::auth::{generate_session_token, hash_token};
use tether_auth::error::AuthError;
use tether_auth::models::session::{self, Entity as Session};
use tether_auth::testing::test_db;

const DEVICE_A: &str = "aaaaaaaa-1111-2222-3333-444444444444";
const DEVICE_B: &str = "bbbbbbbb-5555-6666-7777-888888888888";

#[test]
fn tokens_are_long_random_and_hashed_for_storage() {
    let t1 = generate_session_token();
    let t2 = generate_session_token();
    assert_eq!(t1.len(), 64);
    assert_ne!(t1, t2);

    let h = hash_token(&t1);
    assert_eq!(h.len(), 64);
    assert_ne!(h, t1, "stored hash must differ from the raw token");
    assert_eq!(h, hash_token(&t1));
}

#[tokio::test]
async fn issue_then_verify_returns_user_info_and_bumps_activity() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "standard", None)
        .await
        .unwrap();

    let issued = issue_session(&db, user.id, DEVICE_A, Duration::hours(24))
        .await
        .unwrap();

    let before = Session::find()
        .filter(session::Column::TokenHash.eq(hash_token(&issued.token)))
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    let info = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .expect("verify");
    assert_eq!(info.id, user.id);
    assert_eq!(info.username, "alice");
    assert_eq!(info.account_type, "standard");

    let after = Session::find_by_id(before.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(after.last_activity >= before.last_activity);
}

#[tokio::test]
async fn verify_from_wrong_device_fails() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();
    let issued = issue_session(&db, user.id, DEVICE_A, Duration::hours(24))
        .await
        .unwrap();

    let err = verify_session(&db, &issued.token, DEVICE_B)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DeviceMismatch));
}

#[tokio::test]
async fn unknown_token_fails_with_not_found() {
    let db = test_db().await;
    let err = verify_session(&db, &generate_session_token(), DEVICE_A)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
}

#[tokio::test]
async fn expiry_is_lazy_and_idempotent() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();

    // Already expired at issuance.
    let issued = issue_session(&db, user.id, DEVICE_A, Duration::seconds(-5))
        .await
        .unwrap();

    let err = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));

    // Detection marked the row revoked...
    let row = Session::find()
        .filter(session::Column::TokenHash.eq(hash_token(&issued.token)))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(row.revoked);

    // ...but repeated verifies keep reporting expiry, not revocation.
    let err = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionExpired));
}

#[tokio::test]
async fn unexpired_session_verifies_right_up_to_the_boundary() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();

    // Just inside the lifetime.
    let issued = issue_session(&db, user.id, DEVICE_A, Duration::seconds(60))
        .await
        .unwrap();
    verify_session(&db, &issued.token, DEVICE_A)
        .await
        .expect("session well inside its lifetime must verify");
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();
    let issued = issue_session(&db, user.id, DEVICE_A, Duration::hours(24))
        .await
        .unwrap();

    revoke_session(&db, &issued.token).await.expect("revoke");
    revoke_session(&db, &issued.token)
        .await
        .expect("re-revoking is a no-op success");
    revoke_session(&db, &generate_session_token())
        .await
        .expect("revoking an unknown token is a no-op success");

    let err = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));
}

#[tokio::test]
async fn deactivating_a_user_kills_their_live_sessions() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();
    let issued = issue_session(&db, user.id, DEVICE_A, Duration::hours(24))
        .await
        .unwrap();

    deactivate_user(&db, user.id).await.unwrap();

    let err = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));
}

#[tokio::test]
async fn revoke_all_and_sweep_reclaim_sessions() {
    let db = test_db().await;
    let user = register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();

    issue_session(&db, user.id, DEVICE_A, Duration::hours(1))
        .await
        .unwrap();
    issue_session(&db, user.id, DEVICE_A, Duration::hours(2))
        .await
        .unwrap();
    issue_session(&db, user.id, DEVICE_A, Duration::seconds(-5))
        .await
        .unwrap();

    // The sweep only touches lapsed rows.
    let swept = sweep_expired_sessions(&db).await.unwrap();
    assert_eq!(swept, 1);
    let swept_again = sweep_expired_sessions(&db).await.unwrap();
    assert_eq!(swept_again, 0);

    revoke_all_user_sessions(&db, user.id).await.unwrap();
    let live = Session::find()
        .filter(session::Column::Revoked.eq(false))
        .all(&db)
        .await
        .unwrap();
    assert!(live.is_empty());
}

// The end-to-end scenario: register alice, log in from device D1, exercise
// the issued token from both devices, then revoke it.
#[tokio::test]
async fn end_to_end_login_verify_revoke() {
    let db = test_db().await;
    register_user(&db, "alice", "secret", "trial", None)
        .await
        .unwrap();

    let user = authenticate(&db, "alice", "secret", DEVICE_A)
        .await
        .expect("login from D1");
    let issued = issue_session(&db, user.id, DEVICE_A, Duration::hours(24))
        .await
        .expect("issue T1");

    let info = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .expect("verify T1 with D1");
    assert_eq!(info.username, "alice");

    let err = verify_session(&db, &issued.token, DEVICE_B)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DeviceMismatch));

    revoke_session(&db, &issued.token).await.unwrap();

    let err = verify_session(&db, &issued.token, DEVICE_A)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));
}
