use chrono::{Duration, Utc};
use sea_orm::Database;

use engine::{Engine, EngineError, InvitationStatus};
use migration::MigratorTrait;

async fn engine_with_users(users: &[(&str, &str)]) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    for (id, email) in users {
        engine.sync_user(id, email, id, Utc::now()).await.unwrap();
    }
    engine
}

#[tokio::test]
async fn owner_invites_and_invitee_accepts() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();

    let created = engine
        .create_invitation(&group_id, "Bob@Example.com", "alice", now)
        .await
        .unwrap();
    assert_eq!(created.invitee_email, "bob@example.com");
    assert_eq!(created.expires_at, now + Duration::days(7));

    let joined_group = engine
        .accept_invitation(&created.token, "bob", now)
        .await
        .unwrap();
    assert_eq!(joined_group, group_id);
    assert!(engine.is_member(&group_id, "bob").await.unwrap());

    let invitations = engine
        .list_group_invitations(&group_id, "alice")
        .await
        .unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].status, InvitationStatus::Accepted);
    assert!(invitations[0].accepted_at.is_some());
}

#[tokio::test]
async fn acceptance_is_idempotent() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();

    engine
        .accept_invitation(&created.token, "bob", now)
        .await
        .unwrap();
    let again = engine
        .accept_invitation(&created.token, "bob", now)
        .await
        .unwrap();
    assert_eq!(again, group_id);

    // Membership exactly once.
    let overview = engine.group_overview(&group_id, "alice").await.unwrap();
    assert_eq!(overview.members.len(), 2);
}

#[tokio::test]
async fn duplicate_pending_invitation_conflicts() {
    let engine = engine_with_users(&[("alice", "alice@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    engine
        .create_invitation(&group_id, "carol@example.com", "alice", now)
        .await
        .unwrap();

    let err = engine
        .create_invitation(&group_id, "Carol@example.com", "alice", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn inviting_an_existing_member_conflicts() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();
    engine
        .accept_invitation(&created.token, "bob", now)
        .await
        .unwrap();

    let err = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn only_the_owner_may_invite() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();
    engine
        .accept_invitation(&created.token, "bob", now)
        .await
        .unwrap();

    // bob is a member, not the owner.
    let err = engine
        .create_invitation(&group_id, "carol@example.com", "bob", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn mismatched_email_gets_the_unknown_token_rejection() {
    let engine = engine_with_users(&[
        ("alice", "alice@example.com"),
        ("mallory", "mallory@example.com"),
    ])
    .await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();

    let err = engine
        .accept_invitation(&created.token, "mallory", now)
        .await
        .unwrap_err();
    // Same class as a token that does not exist.
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(!engine.is_member(&group_id, "mallory").await.unwrap());
}

#[tokio::test]
async fn malformed_invitee_email_rejected() {
    let engine = engine_with_users(&[("alice", "alice@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let err = engine
        .create_invitation(&group_id, "not-an-email", "alice", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidEmail(_)));
}

#[tokio::test]
async fn expired_invitation_fails_and_is_marked_expired() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();

    let later = now + Duration::days(8);
    let err = engine
        .accept_invitation(&created.token, "bob", later)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Expired(_)));

    // The terminal transition was committed despite the failure.
    let invitations = engine
        .list_group_invitations(&group_id, "alice")
        .await
        .unwrap();
    assert_eq!(invitations[0].status, InvitationStatus::Expired);

    // A fresh invitation for the same email is allowed again.
    engine
        .create_invitation(&group_id, "bob@example.com", "alice", later)
        .await
        .unwrap();
}

#[tokio::test]
async fn revoked_invitation_cannot_be_accepted() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();

    engine
        .revoke_invitation(&group_id, created.invitation_id, "alice")
        .await
        .unwrap();

    let err = engine
        .accept_invitation(&created.token, "bob", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    // Revoking twice is a conflict, not a success.
    let err = engine
        .revoke_invitation(&group_id, created.invitation_id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn sweep_expires_stale_pending_invitations() {
    let engine = engine_with_users(&[("alice", "alice@example.com")]).await;
    let now = Utc::now();

    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    engine
        .create_invitation(&group_id, "carol@example.com", "alice", now)
        .await
        .unwrap();
    engine
        .create_invitation(&group_id, "dan@example.com", "alice", now)
        .await
        .unwrap();

    assert_eq!(engine.expire_stale_invitations(now).await.unwrap(), 0);
    assert_eq!(
        engine
            .expire_stale_invitations(now + Duration::days(8))
            .await
            .unwrap(),
        2
    );

    let invitations = engine
        .list_group_invitations(&group_id, "alice")
        .await
        .unwrap();
    assert!(
        invitations
            .iter()
            .all(|i| i.status == InvitationStatus::Expired)
    );
}

#[tokio::test]
async fn custom_ttl_is_honoured() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .invitation_ttl(Duration::days(1))
        .build()
        .await
        .unwrap();
    engine
        .sync_user("alice", "alice@example.com", "alice", Utc::now())
        .await
        .unwrap();

    let now = Utc::now();
    let group_id = engine
        .create_group("Goa Trip", None, "alice", now)
        .await
        .unwrap();
    let created = engine
        .create_invitation(&group_id, "bob@example.com", "alice", now)
        .await
        .unwrap();
    assert_eq!(created.expires_at, now + Duration::days(1));
}
