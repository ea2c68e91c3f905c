//! Thread message API Tests, including realtime fan-out

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::*;

async fn group_id(app: &TestApp, creator: i64, members: &[i64]) -> String {
    let ids: Vec<String> = members.iter().map(|id| id.to_string()).collect();
    let (_, body) = app
        .post(
            "/api/v1/threads",
            creator,
            json!({"title": "Ops", "participant_ids": ids}),
        )
        .await;
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn post_message(app: &TestApp, thread_id: &str, sender: i64, content: &str) -> Value {
    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/messages", thread_id),
            sender,
            json!({"content": content}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn test_created_message_is_broadcast_to_thread() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let other_thread = group_id(&app, CAROL, &[DAVE]).await;

    let mut bob_rx = connect(&app.registry, id(&thread_id), BOB);
    let mut dave_rx = connect(&app.registry, id(&other_thread), DAVE);

    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/messages", thread_id),
            ALICE,
            json!({"content": "deploy at 5", "attachment_ids": [UPLOAD_PHOTO.to_string()]}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["content"], "deploy at 5");
    assert_eq!(body["data"]["attachments"][0]["file_name"], "photo.png");

    let event = next_event(&mut bob_rx);
    assert_eq!(event["event"], "message");
    assert_eq!(event["data"], body["data"]);
    assert!(dave_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_message_validation_and_attachments() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let uri = format!("/api/v1/threads/{}/messages", thread_id);

    let (status, body) = app.post(&uri, ALICE, json!({"content": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 10007);

    let (status, _) = app
        .post(&uri, ALICE, json!({"content": "x".repeat(4001)}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &uri,
            ALICE,
            json!({"content": "file", "attachment_ids": [MISSING_UPLOAD.to_string()]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Attachment not found");
    assert_eq!(app.store.message_rows(), 0);

    let (status, body) = app.post(&uri, DAVE, json!({"content": "hello"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Participant not found");
}

#[tokio::test]
async fn test_list_messages_with_cursor() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;

    let first = post_message(&app, &thread_id, ALICE, "one").await;
    post_message(&app, &thread_id, BOB, "two").await;
    post_message(&app, &thread_id, ALICE, "three").await;

    let (status, body) = app
        .get(&format!("/api/v1/threads/{}/messages?limit=2", thread_id), BOB)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["thread_id"], thread_id.as_str());
    assert_eq!(body["data"]["other_participant_id"], Value::Null);
    let page = body["data"]["messages"].as_array().unwrap();
    let contents: Vec<_> = page.iter().map(|m| m["content"].clone()).collect();
    assert_eq!(contents, vec![json!("three"), json!("two")]);

    let cursor = page[1]["id"].as_str().unwrap();
    let (_, body) = app
        .get(
            &format!("/api/v1/threads/{}/messages?limit=2&before={}", thread_id, cursor),
            BOB,
        )
        .await;
    assert_eq!(body["data"]["messages"], json!([first]));

    let (status, body) = app
        .get(&format!("/api/v1/threads/{}/messages?before=abc", thread_id), BOB)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid message ID");
}

#[tokio::test]
async fn test_edit_message_broadcasts_update() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let message = post_message(&app, &thread_id, ALICE, "draft").await;
    let uri = format!(
        "/api/v1/threads/{}/messages/{}",
        thread_id,
        message["id"].as_str().unwrap()
    );

    let mut bob_rx = connect(&app.registry, id(&thread_id), BOB);

    let (status, _) = app.patch(&uri, BOB, json!({"content": "hijack"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&uri, ALICE, json!({"content": "final"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "final");
    assert!(body["data"]["edited_at"].is_string());

    let event = next_event(&mut bob_rx);
    assert_eq!(event["event"], "message_edited");
    assert_eq!(event["data"]["content"], "final");
    assert!(bob_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_delete_message_broadcasts_removal() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let message = post_message(&app, &thread_id, BOB, "remove me").await;
    let message_id = message["id"].as_str().unwrap();
    let uri = format!("/api/v1/threads/{}/messages/{}", thread_id, message_id);

    let mut alice_rx = connect(&app.registry, id(&thread_id), ALICE);

    let (status, body) = app.delete(&uri, BOB).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"id": message_id, "thread_id": thread_id})
    );

    let event = next_event(&mut alice_rx);
    assert_eq!(
        event,
        json!({"event": "message_deleted", "data": {"id": message_id, "thread_id": thread_id}})
    );

    let (status, _) = app.delete(&uri, BOB).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app
        .get(&format!("/api/v1/threads/{}/messages", thread_id), ALICE)
        .await;
    assert_eq!(listed["data"]["messages"], json!([]));
}

#[tokio::test]
async fn test_delete_all_messages() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    post_message(&app, &thread_id, BOB, "a").await;
    post_message(&app, &thread_id, BOB, "b").await;
    let uri = format!("/api/v1/threads/{}/messages", thread_id);

    let mut bob_rx = connect(&app.registry, id(&thread_id), BOB);

    let (status, _) = app.delete(&uri, BOB).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&uri, ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"deleted": 2}));

    assert_eq!(
        next_event(&mut bob_rx),
        json!({"event": "messages_deleted", "data": {"deleted": 2}})
    );
}
