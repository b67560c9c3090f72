pub mod github;
pub mod pull_request;
pub mod signing;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::database::SignatureStore;
use crate::enforcement::{PullRequestEvaluator, ReevaluationTrigger};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SignatureStore>,
    pub evaluator: Arc<PullRequestEvaluator>,
    pub trigger: Arc<ReevaluationTrigger>,
}

impl AppState {
    pub fn new(config: AppConfig, evaluator: Arc<PullRequestEvaluator>) -> Self {
        Self {
            config: Arc::new(config),
            store: evaluator.store(),
            trigger: Arc::new(ReevaluationTrigger::new(Arc::clone(&evaluator))),
            evaluator,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhooks/github", post(github::handle_webhook))
        .route("/signatures", post(signing::sign_cla))
        .route("/signatures/:login", get(signing::get_signature))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cla-bot",
        "timestamp": chrono::Utc::now()
    }))
}
