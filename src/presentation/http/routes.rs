//! Route Configuration
//!
//! Configures all HTTP and WebSocket routes.

use axum::{
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth_middleware;
use crate::presentation::websocket::{chat_ws_handler, direct_ws_handler};
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // WebSocket endpoints authenticate during the handshake
        .route("/ws/chat/{thread_id}", get(chat_ws_handler))
        .route("/ws/direct/{recipient_id}", get(direct_ws_handler))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// API v1 routes, all authenticated
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/threads", thread_routes())
        .nest("/direct", direct_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn thread_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::thread::create_thread).get(handlers::thread::list_threads),
        )
        .route("/{thread_id}", get(handlers::thread::get_thread))
        .route(
            "/{thread_id}/participants",
            post(handlers::thread::add_participants),
        )
        .route(
            "/{thread_id}/participants/@me",
            delete(handlers::thread::leave_thread),
        )
        .route(
            "/{thread_id}/messages",
            get(handlers::message::list_messages)
                .post(handlers::message::create_message)
                .delete(handlers::message::delete_all_messages),
        )
        .route(
            "/{thread_id}/messages/{message_id}",
            patch(handlers::message::edit_message).delete(handlers::message::delete_message),
        )
}

fn direct_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations",
            post(handlers::direct::open_conversation).get(handlers::direct::list_conversations),
        )
        .route(
            "/conversations/{recipient_id}",
            get(handlers::direct::get_conversation),
        )
        .route("/messages", post(handlers::direct::send_message))
        .route(
            "/messages/{recipient_id}",
            get(handlers::direct::list_messages),
        )
}
