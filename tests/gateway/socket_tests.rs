//! WebSocket endpoints served over TCP: handshake credentials and close codes

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::header::AUTHORIZATION, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::common::*;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const POLICY_VIOLATION: u16 = 4401;
const ACCESS_REFUSED: u16 = 4403;
const INTERNAL_ERROR: u16 = 1011;

/// Complete the upgrade handshake, failing the test on anything but 101.
async fn open(addr: SocketAddr, path: &str, authorization: Option<&str>) -> Client {
    let mut request = format!("ws://{}{}", addr, path).into_client_request().unwrap();
    if let Some(value) = authorization {
        request
            .headers_mut()
            .insert(AUTHORIZATION, value.parse().unwrap());
    }

    let (client, response) = connect_async(request).await.unwrap();
    assert_eq!(response.status().as_u16(), 101);
    client
}

async fn next_frame(client: &mut Client) -> Message {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("no frame within 5s")
        .expect("connection ended without a close frame")
        .expect("invalid frame")
}

async fn next_event(client: &mut Client) -> Value {
    match next_frame(client).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected an event, got {:?}", other),
    }
}

async fn close_code(client: &mut Client) -> u16 {
    match next_frame(client).await {
        Message::Close(Some(frame)) => u16::from(frame.code),
        other => panic!("expected a close frame, got {:?}", other),
    }
}

async fn group_id(app: &TestApp, creator: i64, members: &[i64]) -> i64 {
    let ids: Vec<String> = members.iter().map(|id| id.to_string()).collect();
    let (_, body) = app
        .post(
            "/api/v1/threads",
            creator,
            json!({"title": "Ops", "participant_ids": ids}),
        )
        .await;
    id(body["data"]["id"].as_str().unwrap())
}

async fn wait_until_connected(app: &TestApp, thread_id: i64, user_id: i64) {
    for _ in 0..100 {
        if app.registry.is_connected(thread_id, user_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("user {} never registered on thread {}", user_id, thread_id);
}

#[tokio::test]
async fn test_missing_or_invalid_credential_closes_with_policy_violation() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let addr = app.serve().await;
    let path = format!("/ws/chat/{}", thread_id);

    let mut anonymous = open(addr, &path, None).await;
    assert_eq!(close_code(&mut anonymous).await, POLICY_VIOLATION);

    let mut garbage = open(addr, &format!("{}?token=not-a-jwt", path), None).await;
    assert_eq!(close_code(&mut garbage).await, POLICY_VIOLATION);

    let revoked = token_with_id(ALICE, Some(REVOKED_TOKEN_ID));
    let mut revoked = open(addr, &path, Some(&format!("Bearer {}", revoked))).await;
    assert_eq!(close_code(&mut revoked).await, POLICY_VIOLATION);

    // A non-bearer header is not a credential either.
    let mut basic = open(addr, &path, Some("Basic Zm9vOmJhcg==")).await;
    assert_eq!(close_code(&mut basic).await, POLICY_VIOLATION);

    assert_eq!(app.registry.total_connections(), 0);
}

#[tokio::test]
async fn test_query_token_is_used_when_header_is_not_bearer() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    let path = format!("/ws/direct/{}?token={}", BOB, token_for(ALICE));
    let mut alice = open(addr, &path, Some("Basic Zm9vOmJhcg==")).await;

    alice
        .send(Message::Text(json!({"content": "hi bob"}).to_string().into()))
        .await
        .unwrap();

    let event = next_event(&mut alice).await;
    assert_eq!(event["event"], "message");
    assert_eq!(event["data"]["content"], "hi bob");
    assert_eq!(event["data"]["sender_id"], ALICE.to_string());
}

#[tokio::test]
async fn test_bearer_scheme_is_case_insensitive() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let addr = app.serve().await;

    let header = format!("bearer {}", token_for(BOB));
    let _bob = open(addr, &format!("/ws/chat/{}", thread_id), Some(&header)).await;

    wait_until_connected(&app, thread_id, BOB).await;
}

#[tokio::test]
async fn test_refused_access_sends_reason_then_closes() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let addr = app.serve().await;

    let header = format!("Bearer {}", token_for(DAVE));
    let mut outsider = open(addr, &format!("/ws/chat/{}", thread_id), Some(&header)).await;
    assert_eq!(
        next_event(&mut outsider).await,
        json!({"event": "error", "message": "Participant not found"})
    );
    assert_eq!(close_code(&mut outsider).await, ACCESS_REFUSED);

    let path = format!("/ws/direct/{}?token={}", DAVE, token_for(DAVE));
    let mut to_self = open(addr, &path, None).await;
    assert_eq!(
        next_event(&mut to_self).await,
        json!({"event": "error", "message": "You cannot message yourself"})
    );
    assert_eq!(close_code(&mut to_self).await, ACCESS_REFUSED);

    assert_eq!(app.registry.total_connections(), 0);
}

#[tokio::test]
async fn test_store_failure_on_open_closes_with_internal_error() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let addr = app.serve().await;
    app.store.set_offline(true);

    let path = format!("/ws/chat/{}?token={}", thread_id, token_for(ALICE));
    let mut alice = open(addr, &path, None).await;

    assert_eq!(close_code(&mut alice).await, INTERNAL_ERROR);
    assert_eq!(app.registry.total_connections(), 0);
}

#[tokio::test]
async fn test_store_failure_mid_session_closes_with_internal_error() {
    let app = TestApp::new().await;
    let thread_id = group_id(&app, ALICE, &[BOB]).await;
    let addr = app.serve().await;

    let path = format!("/ws/chat/{}?token={}", thread_id, token_for(ALICE));
    let mut alice = open(addr, &path, None).await;
    wait_until_connected(&app, thread_id, ALICE).await;

    app.store.set_offline(true);
    alice
        .send(Message::Text(json!({"content": "lost"}).to_string().into()))
        .await
        .unwrap();

    assert_eq!(close_code(&mut alice).await, INTERNAL_ERROR);
    assert_eq!(app.store.message_rows(), 0);
}
