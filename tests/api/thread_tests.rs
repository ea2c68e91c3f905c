//! Thread API Tests

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::*;

async fn create_group(app: &TestApp, creator: i64, members: &[i64]) -> Value {
    let ids: Vec<String> = members.iter().map(|id| id.to_string()).collect();
    let (status, body) = app
        .post(
            "/api/v1/threads",
            creator,
            json!({"title": "Release", "participant_ids": ids}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/threads", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], 10003);
    assert_eq!(body["message"], "Missing authorization header");
}

#[tokio::test]
async fn test_invalid_and_revoked_tokens_are_unauthorized() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .uri("/api/v1/threads")
        .header("Authorization", "Bearer not-a-jwt")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    let token = token_with_id(ALICE, Some(REVOKED_TOKEN_ID));
    let request = axum::http::Request::builder()
        .uri("/api/v1/threads")
        .header("Authorization", format!("Bearer {}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token revoked");
}

#[tokio::test]
async fn test_create_and_get_thread() {
    let app = TestApp::new().await;

    let thread = create_group(&app, ALICE, &[BOB]).await;
    assert_eq!(thread["is_direct"], false);
    assert_eq!(thread["title"], "Release");
    assert_eq!(thread["created_by_id"], ALICE.to_string());
    assert_eq!(thread["participants"].as_array().unwrap().len(), 2);

    let uri = format!("/api/v1/threads/{}", thread["id"].as_str().unwrap());
    let (status, body) = app.get(&uri, BOB).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["id"], thread["id"]);

    let (status, body) = app.get(&uri, DAVE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Participant not found");
}

#[tokio::test]
async fn test_bad_requests() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/threads/not-a-number", ALICE).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid thread ID");

    let (status, _) = app.get("/api/v1/threads/123456", ALICE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/api/v1/threads",
            ALICE,
            json!({"title": "x".repeat(201)}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 10007);

    let (status, body) = app
        .post(
            "/api/v1/threads",
            ALICE,
            json!({"participant_ids": [GHOST.to_string()]}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Participant not found");
}

#[tokio::test]
async fn test_participants_and_leaving() {
    let app = TestApp::new().await;
    let thread = create_group(&app, ALICE, &[BOB]).await;
    let thread_id = thread["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/participants", thread_id),
            BOB,
            json!({"user_ids": [CAROL.to_string()]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["participants"].as_array().unwrap().len(), 3);

    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/participants", thread_id),
            DAVE,
            json!({"user_ids": [DAVE.to_string()]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["participants"].as_array().unwrap().len(), 4);

    let (status, body) = app
        .delete(&format!("/api/v1/threads/{}/participants/@me", thread_id), CAROL)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, listed) = app.get("/api/v1/threads", CAROL).await;
    assert_eq!(listed["data"], json!([]));

    let (_, listed) = app.get("/api/v1/threads?limit=10", ALICE).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_threads_excludes_direct_unless_asked() {
    let app = TestApp::new().await;
    create_group(&app, ALICE, &[BOB]).await;
    app.post(
        "/api/v1/direct/conversations",
        ALICE,
        json!({"recipient_id": CAROL.to_string()}),
    )
    .await;

    let (_, groups) = app.get("/api/v1/threads", ALICE).await;
    assert_eq!(groups["data"].as_array().unwrap().len(), 1);

    let (_, all) = app.get("/api/v1/threads?include_direct=true", ALICE).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);
}
