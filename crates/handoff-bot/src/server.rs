//! Webhook server
//!
//! Two routes: `/health` for liveness and `/webhook/event` for platform
//! callbacks. The event route acks immediately and processes the body
//! on a spawned task — the platform retries slow webhooks, and task
//! runs can take hours, so nothing user-visible may block the response.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use handoff_core::{CallbackRouter, InboundEvent, TaskSupervisor};
use handoff_lark::webhook;

/// Shared state for the webhook handlers.
pub struct AppState {
    pub supervisor: Arc<TaskSupervisor>,
    pub router: Arc<CallbackRouter>,
}

/// Build the axum router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/event", post(webhook_event))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn webhook_event(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Json<Value> {
    // Endpoint registration handshake: echo the challenge synchronously.
    if let Some(challenge) = webhook::challenge(&body) {
        info!("url verification challenge received");
        return Json(json!({ "challenge": challenge }));
    }

    tokio::spawn(process_event(state, body));
    Json(json!({ "code": 0 }))
}

/// Handle one normalized event. Runs detached from the HTTP response.
pub(crate) async fn process_event(state: Arc<AppState>, body: Value) {
    match webhook::parse_event(&body) {
        InboundEvent::NewInstruction { user_id, text } => {
            info!(user_id = %user_id, "new instruction received");
            let result = state.supervisor.run(&user_id, &text).await;
            info!(user_id = %user_id, ?result, "task run finished");
        }
        InboundEvent::CardAction {
            user_id,
            correlation_id,
            action,
        } => {
            state.router.dispatch(&user_id, &correlation_id, action);
        }
        InboundEvent::Unrecognized { event_type } => {
            if event_type.is_empty() {
                warn!("event body without an event type");
            } else {
                debug!(event_type = %event_type, "ignoring unrecognized event");
            }
        }
    }
}
