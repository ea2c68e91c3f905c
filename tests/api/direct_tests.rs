//! Direct conversation API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_open_conversation_is_idempotent() {
    let app = TestApp::new().await;

    let (status, first) = app
        .post(
            "/api/v1/direct/conversations",
            ALICE,
            json!({"recipient_id": BOB.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["is_direct"], true);
    assert_eq!(first["data"]["other_participant_id"], BOB.to_string());

    let (_, second) = app
        .post(
            "/api/v1/direct/conversations",
            BOB,
            json!({"recipient_id": ALICE.to_string()}),
        )
        .await;
    assert_eq!(second["data"]["id"], first["data"]["id"]);
    assert_eq!(second["data"]["other_participant_id"], ALICE.to_string());
    assert_eq!(app.store.direct_thread_count(), 1);
}

#[tokio::test]
async fn test_self_conversation_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/direct/conversations",
            ALICE,
            json!({"recipient_id": ALICE.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot message yourself");

    let (status, body) = app
        .post(
            "/api/v1/direct/messages",
            ALICE,
            json!({"recipient_id": ALICE.to_string(), "content": "note to self"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot message yourself");
}

#[tokio::test]
async fn test_get_conversation_before_and_after_first_message() {
    let app = TestApp::new().await;
    let uri = format!("/api/v1/direct/conversations/{}", BOB);

    let (status, body) = app.get(&uri, ALICE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Thread not found");

    let (_, opened) = app
        .post(
            "/api/v1/direct/conversations",
            BOB,
            json!({"recipient_id": ALICE.to_string()}),
        )
        .await;
    let mut bob_rx = connect(
        &app.registry,
        id(opened["data"]["id"].as_str().unwrap()),
        BOB,
    );

    let (status, sent) = app
        .post(
            "/api/v1/direct/messages",
            ALICE,
            json!({"recipient_id": BOB.to_string(), "content": "lunch?"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(sent["data"]["thread"]["id"], opened["data"]["id"]);
    assert_eq!(sent["data"]["thread"]["other_participant_id"], BOB.to_string());

    let event = next_event(&mut bob_rx);
    assert_eq!(event["event"], "message");
    assert_eq!(event["data"], sent["data"]["message"]);

    let (status, body) = app.get(&uri, ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], sent["data"]["message"]["thread_id"]);
    assert_eq!(body["data"]["last_message"]["content"], "lunch?");

    let (_, listed) = app.get("/api/v1/direct/conversations", BOB).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_direct_message_history() {
    let app = TestApp::new().await;

    for content in ["a", "b", "c"] {
        let (status, _) = app
            .post(
                "/api/v1/direct/messages",
                ALICE,
                json!({"recipient_id": CAROL.to_string(), "content": content}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .get(&format!("/api/v1/direct/messages/{}?limit=2", ALICE), CAROL)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["other_participant_id"], ALICE.to_string());
    let contents: Vec<_> = body["data"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["c", "b"]);

    let (status, _) = app
        .get(&format!("/api/v1/direct/messages/{}", DAVE), CAROL)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_direct_message_with_missing_attachment() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/direct/messages",
            ALICE,
            json!({
                "recipient_id": BOB.to_string(),
                "content": "see file",
                "attachment_ids": [MISSING_UPLOAD.to_string()]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Attachment not found");
    assert_eq!(app.store.direct_thread_count(), 0);
}
