use axum::{http::StatusCode, response::Json};
use serde_json::Value;
use tracing::{error, info};

use super::AppState;
use crate::database::models::EvaluationInfo;

pub async fn handle_pull_request_event(
    state: &AppState,
    info: &EvaluationInfo,
) -> (StatusCode, Json<Value>) {
    info!(
        "Processing PR #{} in {}/{}",
        info.pr_number, info.repo_owner, info.repo_name
    );

    match state.evaluator.evaluate(info).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "evaluated",
                "outcome": outcome
            })),
        ),
        Err(e) => {
            error!(
                "Evaluation of PR #{} in {}/{} failed: {}",
                info.pr_number, info.repo_owner, info.repo_name, e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}
