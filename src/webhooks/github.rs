use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::Value;
use tracing::{info, warn};

use super::{pull_request, AppState};
use crate::github::webhooks::{WebhookEvent, WebhookProcessor};

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let event_name = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let event = WebhookProcessor::process_webhook(
        event_name,
        &payload,
        state.config.github_app_id,
        &state.config.cla_version,
    );

    match event {
        Ok(WebhookEvent::Evaluate(info)) => {
            pull_request::handle_pull_request_event(&state, &info).await
        }
        Ok(WebhookEvent::Ignored { event, action }) => {
            info!("Ignoring webhook: {} - {}", event, action);
            (StatusCode::ACCEPTED, Json(serde_json::json!({"status": "ignored"})))
        }
        Err(e) => {
            warn!("Rejected webhook {}: {}", event_name, e);
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}
