//! Token lifecycle tests: issuance, verification window and rotation.
#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use notekeep_core::db::unix_timestamp;

use super::error::ServiceError;
use super::token::{EXPIRY_GRACE_SECS, TokenService, past_grace};
use crate::auth::{JwtManager, TokenKind};
use crate::storage::{Database, User};

const SECRET: &[u8] = b"token-service-test-secret";

async fn setup() -> (TokenService, Database, User) {
    let db = Database::open_in_memory().await.unwrap();
    let user = db
        .create_user("u1", "alice@example.com", "hash", "Alice")
        .await
        .unwrap();
    let jwt = Arc::new(JwtManager::new(SECRET, 1800, 86_400));
    (TokenService::new(db.clone(), jwt), db, user)
}

#[tokio::test]
async fn issued_pair_has_both_kinds_for_same_user() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    let jwt = JwtManager::new(SECRET, 1800, 86_400);
    let access = jwt.decode(&pair.access.token).unwrap();
    let refresh = jwt.decode(&pair.refresh.token).unwrap();

    assert_eq!(access.kind, TokenKind::Access);
    assert_eq!(refresh.kind, TokenKind::Refresh);
    assert_eq!(access.sub, user.id);
    assert_eq!(refresh.sub, user.id);
    assert_eq!(pair.access.record.user_id, user.id);
    assert_eq!(pair.refresh.record.token_type, TokenKind::Refresh);
    assert!(pair.refresh.expires_at() > pair.access.expires_at());
}

#[tokio::test]
async fn verify_returns_matching_record() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    let record = svc
        .verify(&pair.access.token, TokenKind::Access)
        .await
        .unwrap();
    assert_eq!(record.id, pair.access.record.id);
}

#[tokio::test]
async fn wrong_kind_is_invalid() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    let err = svc
        .verify(&pair.access.token, TokenKind::Refresh)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));
}

#[tokio::test]
async fn foreign_signature_is_invalid() {
    let (svc, _db, user) = setup().await;
    let other = JwtManager::new(b"someone-elses-secret", 1800, 86_400);
    let now = unix_timestamp();
    let forged = other
        .sign(&user.id, &user.email, TokenKind::Access, now, now + 60)
        .unwrap();

    let err = svc.verify(&forged, TokenKind::Access).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));

    let err = svc.verify("garbage", TokenKind::Access).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));
}

#[test]
fn grace_window_boundary_is_inclusive() {
    let exp = 1_000_000;
    assert!(!past_grace(exp, exp));
    assert!(!past_grace(exp, exp + EXPIRY_GRACE_SECS));
    assert!(past_grace(exp, exp + EXPIRY_GRACE_SECS + 1));
    assert!(!past_grace(i64::MAX, i64::MIN));
    assert!(past_grace(i64::MIN, i64::MAX));
}

#[tokio::test]
async fn expired_at_grace_edge_still_verifies() {
    let (svc, _db, user) = setup().await;
    // One second of slack so a clock tick before verify stays inside the window.
    let issued = svc
        .create_token(
            &user,
            TokenKind::Access,
            unix_timestamp() - EXPIRY_GRACE_SECS + 1,
        )
        .await
        .unwrap();

    svc.verify(&issued.token, TokenKind::Access).await.unwrap();
}

#[tokio::test]
async fn expired_just_past_grace_window_fails() {
    let (svc, _db, user) = setup().await;
    let issued = svc
        .create_token(
            &user,
            TokenKind::Access,
            unix_timestamp() - EXPIRY_GRACE_SECS - 2,
        )
        .await
        .unwrap();

    let err = svc
        .verify(&issued.token, TokenKind::Access)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TokenExpired));
}

#[tokio::test]
async fn out_of_range_lifetime_fails_to_issue() {
    let db = Database::open_in_memory().await.unwrap();
    let user = db
        .create_user("u1", "alice@example.com", "hash", "Alice")
        .await
        .unwrap();
    let jwt = Arc::new(JwtManager::new(SECRET, 1800, i64::MAX));
    let svc = TokenService::new(db, jwt);

    let err = svc.issue_pair(&user).await.unwrap_err();
    assert!(matches!(err, ServiceError::TokenCreation(_)));
}

#[tokio::test]
async fn token_without_record_is_not_found() {
    let (svc, db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();
    assert!(db.delete_token(&pair.access.record.id).await.unwrap());

    let err = svc
        .verify(&pair.access.token, TokenKind::Access)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TokenNotFound));
}

#[tokio::test]
async fn verify_matches_the_exact_token() {
    let (svc, db, user) = setup().await;
    let first = svc.issue_pair(&user).await.unwrap();
    let second = svc.issue_pair(&user).await.unwrap();

    // Removing the first record must not let the first token ride on the
    // second token's record.
    db.delete_token(&first.refresh.record.id).await.unwrap();

    let err = svc
        .verify(&first.refresh.token, TokenKind::Refresh)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TokenNotFound));

    let record = svc
        .verify(&second.refresh.token, TokenKind::Refresh)
        .await
        .unwrap();
    assert_eq!(record.id, second.refresh.record.id);
}

#[tokio::test]
async fn rotate_issues_new_pair_and_consumes_old_token() {
    let (svc, db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    let (fresh, owner) = svc.rotate(&pair.refresh.token).await.unwrap();
    assert_eq!(owner.id, user.id);
    assert_ne!(fresh.refresh.token, pair.refresh.token);
    assert!(db.get_token(&pair.refresh.record.id).await.is_err());

    let err = svc
        .verify(&pair.refresh.token, TokenKind::Refresh)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TokenNotFound));

    svc.verify(&fresh.access.token, TokenKind::Access)
        .await
        .unwrap();
}

#[tokio::test]
async fn rotate_is_single_use() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    svc.rotate(&pair.refresh.token).await.unwrap();
    let err = svc.rotate(&pair.refresh.token).await.unwrap_err();
    assert!(matches!(err, ServiceError::TokenNotFound));
}

#[tokio::test]
async fn concurrent_rotations_yield_one_winner() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    let (a, b) = tokio::join!(
        svc.rotate(&pair.refresh.token),
        svc.rotate(&pair.refresh.token)
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser.unwrap_err(), ServiceError::TokenNotFound));
}

#[tokio::test]
async fn access_token_cannot_rotate() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    let err = svc.rotate(&pair.access.token).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));
}

#[tokio::test]
async fn revoked_tokens_are_not_found() {
    let (svc, _db, user) = setup().await;
    let pair = svc.issue_pair(&user).await.unwrap();

    assert_eq!(svc.revoke_all(&user.id).await.unwrap(), 2);

    let err = svc
        .verify(&pair.access.token, TokenKind::Access)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TokenNotFound));

    let err = svc.rotate(&pair.refresh.token).await.unwrap_err();
    assert!(matches!(err, ServiceError::TokenNotFound));
}
