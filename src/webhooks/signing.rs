use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::AppState;
use crate::database::models::{Signature, UserSignature};

/// Body of a signing request. The caller is expected to have authenticated
/// `login` already.
#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub login: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    pub cla_version: Option<String>,
}

/// Records a signature, then re-evaluates every pull request the signer was
/// blocking. A re-evaluation failure is reported but keeps the signature.
pub async fn sign_cla(
    State(state): State<AppState>,
    Json(request): Json<SignRequest>,
) -> (StatusCode, Json<Value>) {
    let login = request.login.trim().to_string();
    if login.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "login is required"})),
        );
    }

    let signature = Signature {
        login,
        email: request.email,
        given_name: request.given_name,
        cla_version: request
            .cla_version
            .unwrap_or_else(|| state.config.cla_version.clone()),
        signed_at: Utc::now(),
    };

    if let Err(e) = state.store.insert_signature(&signature).await {
        if e.is_duplicate() {
            warn!("{} already signed CLA {}", signature.login, signature.cla_version);
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": e.to_string()})),
            );
        }
        error!("Failed to store signature for {}: {}", signature.login, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        );
    }

    let user = UserSignature::from(signature.clone());
    match state.trigger.reevaluate(&user).await {
        Ok(count) => {
            info!("{} signed CLA {}; re-evaluated {} pull requests", user.login, user.cla_version, count);
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "signature": signature,
                    "reevaluated": count
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "signature": signature,
                "error": e.to_string()
            })),
        ),
    }
}

pub async fn get_signature(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.store.has_signed(&login, &state.config.cla_version).await {
        Ok(Some(signature)) => (StatusCode::OK, Json(serde_json::json!(signature))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "login": login,
                "cla_version": state.config.cla_version,
                "signed": false
            })),
        ),
        Err(e) => {
            error!("Failed to look up signature for {}: {}", login, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}
