use serde::Deserialize;
use serde_json::Value;

use crate::database::models::EvaluationInfo;
use crate::error::ClaBotError;

/// Pull request actions that change the set of commits or reopen review.
pub const EVALUATED_ACTIONS: &[&str] = &["opened", "reopened", "synchronize"];

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestPayload,
    pub repository: RepositoryPayload,
    pub installation: Option<InstallationPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub head: HeadPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadPayload {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    pub owner: OwnerPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerPayload {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationPayload {
    pub id: u64,
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// A pull request event that must be evaluated.
    Evaluate(EvaluationInfo),
    /// Anything else; acknowledged without work.
    Ignored { event: String, action: String },
}

pub struct WebhookProcessor;

impl WebhookProcessor {
    pub fn process_webhook(
        event_name: &str,
        payload: &Value,
        app_id: u64,
        cla_version: &str,
    ) -> Result<WebhookEvent, ClaBotError> {
        let action = payload
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        if event_name != "pull_request" || !EVALUATED_ACTIONS.contains(&action.as_str()) {
            return Ok(WebhookEvent::Ignored {
                event: event_name.to_string(),
                action,
            });
        }

        let event: PullRequestEvent = serde_json::from_value(payload.clone())?;
        let install_id = event
            .installation
            .as_ref()
            .map(|i| i.id)
            .ok_or_else(|| ClaBotError::Webhook("pull_request event has no installation".to_string()))?;

        Ok(WebhookEvent::Evaluate(EvaluationInfo::new(
            event.repository.owner.login,
            event.repository.name,
            event.pull_request.head.sha,
            event.number,
            app_id,
            install_id,
            cla_version,
        )))
    }
}
