//! GitHub facade
//!
//! The evaluator only talks to GitHub through these traits. Two
//! authentication contexts exist: the app JWT, which can read installation
//! metadata, and an installation token, which acts on repositories.
//! Implementations do not retry or cache; that policy belongs to callers.

pub mod client;
pub mod types;
pub mod webhooks;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GitHubError;
use types::*;

/// Operations available with the app JWT.
#[async_trait]
pub trait AppApi: Send + Sync {
    async fn get_installation(&self, installation_id: u64) -> Result<InstallationInfo, GitHubError>;
}

/// Operations available with an installation token.
#[async_trait]
pub trait RepoApi: Send + Sync {
    async fn create_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), GitHubError>;

    async fn is_collaborator(&self, owner: &str, repo: &str, login: &str) -> Result<bool, GitHubError>;

    async fn list_pull_request_commits(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestCommit>, GitHubError>;

    /// Fails with [`GitHubError::NotFound`] when the repository has no such label.
    async fn get_label(&self, owner: &str, repo: &str, name: &str) -> Result<Label, GitHubError>;

    async fn create_label(&self, owner: &str, repo: &str, label: &Label) -> Result<Label, GitHubError>;

    async fn list_issue_labels(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Label>, GitHubError>;

    async fn add_labels(&self, owner: &str, repo: &str, number: u64, names: &[String]) -> Result<(), GitHubError>;

    /// Fails with [`GitHubError::NotFound`] when the label is not on the issue.
    async fn remove_label(&self, owner: &str, repo: &str, number: u64, name: &str) -> Result<(), GitHubError>;

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, GitHubError>;

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubError>;
}

/// Hands out authenticated clients for one evaluation.
#[async_trait]
pub trait GitHubClients: Send + Sync {
    async fn app_client(&self, app_id: u64) -> Result<Arc<dyn AppApi>, GitHubError>;

    async fn installation_client(&self, app_id: u64, install_id: u64) -> Result<Arc<dyn RepoApi>, GitHubError>;
}
