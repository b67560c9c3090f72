use std::sync::Arc;
use tracing::{error, info};

use super::evaluator::PullRequestEvaluator;
use crate::database::models::UserSignature;
use crate::database::SignatureStore;
use crate::error::ClaBotError;

/// Re-runs the evaluator on every pull request a newly signed user was blocking.
pub struct ReevaluationTrigger {
    evaluator: Arc<PullRequestEvaluator>,
    store: Arc<dyn SignatureStore>,
}

impl ReevaluationTrigger {
    pub fn new(evaluator: Arc<PullRequestEvaluator>) -> Self {
        let store = evaluator.store();
        Self { evaluator, store }
    }

    /// Evaluates tracked pull requests one at a time and stops at the first
    /// failure; the rest wait for the next trigger. Returns how many were
    /// evaluated.
    pub async fn reevaluate(&self, user: &UserSignature) -> Result<usize, ClaBotError> {
        let tracked = self.store.get_tracked_pull_requests(user).await?;
        info!(
            "{} has {} tracked pull requests for CLA {}",
            user.login,
            tracked.len(),
            user.cla_version
        );

        for (done, info) in tracked.iter().enumerate() {
            if let Err(e) = self.evaluator.evaluate(info).await {
                error!(
                    "Re-evaluation of PR #{} in {}/{} failed after {} of {}: {}",
                    info.pr_number,
                    info.repo_owner,
                    info.repo_name,
                    done,
                    tracked.len(),
                    e
                );
                return Err(e);
            }
        }

        Ok(tracked.len())
    }
}
