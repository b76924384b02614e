use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{Mailer, app};

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    app(engine, Mailer::noop())
}

fn request(method: &str, uri: &str, user: Option<(&str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, email)) = user {
        builder = builder
            .header("x-user-id", id)
            .header("x-user-email", email);
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_identity_headers_are_unauthorized() {
    let app = test_app().await;

    let response = app
        .oneshot(request("GET", "/groups", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn group_expense_balance_settlement_flow() {
    let app = test_app().await;
    let alice = Some(("alice", "alice@example.com"));
    let bob = Some(("bob", "bob@example.com"));

    // Alice creates a group.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/groups",
            alice,
            Some(json!({"name": "Goa Trip", "currency": "INR"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let group_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Alice invites bob; bob accepts with the token.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/groups/{group_id}/invitations"),
            alice,
            Some(json!({"email": "bob@example.com"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/invitations/accept",
            bob,
            Some(json!({"token": token})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["group_id"], json!(group_id));

    // Dinner 100.00 split in half.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/groups/{group_id}/expenses"),
            alice,
            Some(json!({
                "description": "Dinner",
                "amount_minor": 10000,
                "splits": [
                    {"user_id": "alice", "amount_minor": 5000},
                    {"user_id": "bob", "amount_minor": 5000}
                ]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/groups/{group_id}/balances/bob"),
            bob,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let balance = body_json(response).await;
    assert_eq!(balance["amount_owes_minor"], json!(5000));
    assert_eq!(balance["net_minor"], json!(-5000));

    // Bob settles in full.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/groups/{group_id}/settlements"),
            bob,
            Some(json!({
                "from_user_id": "bob",
                "to_user_id": "alice",
                "amount_minor": 5000
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["settled_amount_minor"], json!(5000));
    assert_eq!(outcome["remaining_amount_minor"], json!(0));
    assert!(outcome["receipt_id"].is_string());

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/groups/{group_id}/balances/bob"),
            bob,
            None,
        ))
        .await
        .unwrap();
    let balance = body_json(response).await;
    assert_eq!(balance["net_minor"], json!(0));

    // The audit trail is visible to members.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/groups/{group_id}/settlements"),
            alice,
            None,
        ))
        .await
        .unwrap();
    let receipts = body_json(response).await;
    assert_eq!(receipts["settlements"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_invitation_maps_to_conflict() {
    let app = test_app().await;
    let alice = Some(("alice", "alice@example.com"));

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/groups",
            alice,
            Some(json!({"name": "Flat 4B"})),
        ))
        .await
        .unwrap();
    let group_id = body_json(response).await["id"].as_str().unwrap().to_string();

    for expected in [StatusCode::OK, StatusCode::CONFLICT] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/groups/{group_id}/invitations"),
                alice,
                Some(json!({"email": "carol@example.com"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn outsiders_get_not_found_for_member_resources() {
    let app = test_app().await;
    let alice = Some(("alice", "alice@example.com"));
    let dave = Some(("dave", "dave@example.com"));

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/groups",
            alice,
            Some(json!({"name": "Goa Trip"})),
        ))
        .await
        .unwrap();
    let group_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Existence of the group is not revealed.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/groups/{group_id}/balances"),
            dave,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn split_sum_mismatch_maps_to_unprocessable() {
    let app = test_app().await;
    let alice = Some(("alice", "alice@example.com"));

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/groups",
            alice,
            Some(json!({"name": "Goa Trip"})),
        ))
        .await
        .unwrap();
    let group_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/groups/{group_id}/expenses"),
            alice,
            Some(json!({
                "description": "Dinner",
                "amount_minor": 10000,
                "splits": [{"user_id": "alice", "amount_minor": 4000}]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
