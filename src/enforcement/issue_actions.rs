use tracing::debug;

use super::labels::LabelSpec;
use crate::error::GitHubError;
use crate::github::types::CommitStatus;
use crate::github::RepoApi;

/// Idempotent side effects against one pull request.
///
/// Re-running any of these with no change in state issues no new writes:
/// labels are created only when missing, added only when absent, removals
/// treat not-found as done, and comments are skipped when an identical body
/// is already on the issue.
pub struct IssueActions<'a> {
    api: &'a dyn RepoApi,
    owner: &'a str,
    repo: &'a str,
    number: u64,
    sha: &'a str,
}

impl<'a> IssueActions<'a> {
    pub fn new(api: &'a dyn RepoApi, owner: &'a str, repo: &'a str, number: u64, sha: &'a str) -> Self {
        Self {
            api,
            owner,
            repo,
            number,
            sha,
        }
    }

    pub async fn set_status(&self, status: &CommitStatus) -> Result<(), GitHubError> {
        debug!(
            "Setting {} status on {}/{}@{}",
            status.state.as_str(),
            self.owner,
            self.repo,
            self.sha
        );
        self.api.create_status(self.owner, self.repo, self.sha, status).await
    }

    async fn ensure_label_exists(&self, spec: &LabelSpec) -> Result<(), GitHubError> {
        match self.api.get_label(self.owner, self.repo, spec.name).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Creating label '{}' in {}/{}", spec.name, self.owner, self.repo);
                self.api.create_label(self.owner, self.repo, &spec.to_label()).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn apply_label(&self, spec: &LabelSpec) -> Result<(), GitHubError> {
        self.ensure_label_exists(spec).await?;

        let current = self.api.list_issue_labels(self.owner, self.repo, self.number).await?;
        if current.iter().any(|label| label.name == spec.name) {
            return Ok(());
        }

        self.api
            .add_labels(self.owner, self.repo, self.number, &[spec.name.to_string()])
            .await
    }

    pub async fn remove_label(&self, spec: &LabelSpec) -> Result<(), GitHubError> {
        match self.api.remove_label(self.owner, self.repo, self.number, spec.name).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Returns whether a new comment was posted.
    pub async fn comment_once(&self, body: &str) -> Result<bool, GitHubError> {
        let existing = self.api.list_issue_comments(self.owner, self.repo, self.number).await?;
        if existing.iter().any(|comment| comment.body == body) {
            debug!("Comment already present on {}/{}#{}", self.owner, self.repo, self.number);
            return Ok(false);
        }

        self.api
            .create_issue_comment(self.owner, self.repo, self.number, body)
            .await?;
        Ok(true)
    }
}
