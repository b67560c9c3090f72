//! Pull request CLA evaluation
//!
//! Classifies every commit on a pull request, then reports exactly one of
//! two gates back to GitHub: the commit-quality gate (unattributed or
//! unverified commits) or the CLA gate (authors without a signature).
//! Quality violations take precedence and end the evaluation early.
//!
//! Any GitHub or store error aborts the evaluation and is returned as-is.
//! Nothing is rolled back; every step is safe to repeat, so the next
//! triggering event converges the pull request to the right state.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::issue_actions::IssueActions;
use super::labels::{CLA_NOT_SIGNED, CLA_SIGNED, MISSING_AUTHOR, MISSING_VERIFICATION};
use super::status_checks::StatusCheckGenerator;
use crate::database::models::{EvaluationInfo, UserSignature};
use crate::database::SignatureStore;
use crate::error::ClaBotError;
use crate::github::types::PullRequestCommit;
use crate::github::{GitHubClients, RepoApi};

/// Commits and authors sorted by what the evaluation must do about them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitBuckets {
    pub missing_author: Vec<PullRequestCommit>,
    pub missing_verification: Vec<PullRequestCommit>,
    /// One entry per login, without a signed timestamp.
    pub needs_signature: Vec<UserSignature>,
    /// One entry per login that has signed; used to clear tracking rows.
    pub signed: Vec<UserSignature>,
}

impl CommitBuckets {
    pub fn has_quality_violations(&self) -> bool {
        !self.missing_author.is_empty() || !self.missing_verification.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    QualityViolations {
        missing_author: usize,
        missing_verification: usize,
    },
    SignaturesMissing {
        logins: Vec<String>,
    },
    AllSigned,
}

pub struct PullRequestEvaluator {
    clients: Arc<dyn GitHubClients>,
    store: Arc<dyn SignatureStore>,
    cla_url: Option<String>,
}

impl PullRequestEvaluator {
    pub fn new(clients: Arc<dyn GitHubClients>, store: Arc<dyn SignatureStore>) -> Self {
        Self {
            clients,
            store,
            cla_url: None,
        }
    }

    /// Link used in comments and failure statuses instead of the installation page.
    pub fn with_cla_url(mut self, cla_url: Option<String>) -> Self {
        self.cla_url = cla_url;
        self
    }

    pub fn store(&self) -> Arc<dyn SignatureStore> {
        Arc::clone(&self.store)
    }

    pub async fn evaluate(&self, info: &EvaluationInfo) -> Result<EvaluationOutcome, ClaBotError> {
        info!(
            "Evaluating PR #{} in {}/{} at {} against CLA {}",
            info.pr_number, info.repo_owner, info.repo_name, info.sha, info.cla_version
        );

        let app = self.clients.app_client(info.app_id).await?;
        let installation = app.get_installation(info.install_id).await?;
        let context = installation.app_slug.as_str();
        let sign_url = self.cla_url.as_deref().unwrap_or(&installation.html_url);
        debug!(
            "Acting as {} (app {}, installation {})",
            installation.app_slug, installation.app_id, installation.id
        );

        let api = self.clients.installation_client(info.app_id, info.install_id).await?;
        let actions = IssueActions::new(api.as_ref(), &info.repo_owner, &info.repo_name, info.pr_number, &info.sha);

        actions.set_status(&StatusCheckGenerator::pending(context)).await?;

        let commits = api
            .list_pull_request_commits(&info.repo_owner, &info.repo_name, info.pr_number)
            .await?;
        let buckets = self.classify_commits(api.as_ref(), info, commits).await?;

        debug!(
            "PR #{} buckets: {} missing author, {} missing verification, {} need signature, {} signed",
            info.pr_number,
            buckets.missing_author.len(),
            buckets.missing_verification.len(),
            buckets.needs_signature.len(),
            buckets.signed.len()
        );

        if buckets.has_quality_violations() {
            return self.report_quality_violations(&actions, context, &buckets).await;
        }

        // Quality labels left by an earlier pass no longer apply.
        actions.remove_label(&MISSING_AUTHOR).await?;
        actions.remove_label(&MISSING_VERIFICATION).await?;

        let outcome = if buckets.needs_signature.is_empty() {
            actions.apply_label(&CLA_SIGNED).await?;
            actions.remove_label(&CLA_NOT_SIGNED).await?;
            actions.set_status(&StatusCheckGenerator::all_signed(context)).await?;
            info!("PR #{} in {}/{}: every author has signed", info.pr_number, info.repo_owner, info.repo_name);
            EvaluationOutcome::AllSigned
        } else {
            actions.apply_label(&CLA_NOT_SIGNED).await?;
            actions.remove_label(&CLA_SIGNED).await?;

            let tracked = info.clone().with_user_signatures(buckets.needs_signature.clone());
            self.store.store_unsigned_authors(&tracked, Utc::now()).await?;

            let message =
                StatusCheckGenerator::signatures_missing_comment(&buckets.needs_signature, &info.cla_version, sign_url);
            actions.comment_once(&message).await?;
            actions
                .set_status(&StatusCheckGenerator::signatures_missing(context, sign_url))
                .await?;

            let logins: Vec<String> = buckets.needs_signature.iter().map(|u| u.login.clone()).collect();
            info!(
                "PR #{} in {}/{}: waiting on signatures from {}",
                info.pr_number,
                info.repo_owner,
                info.repo_name,
                logins.join(", ")
            );
            EvaluationOutcome::SignaturesMissing { logins }
        };

        // Runs on both branches so resolved pull requests are always collected.
        self.store.remove_resolved_authors(&buckets.signed, info).await?;

        Ok(outcome)
    }

    /// Applies, in order: missing author, missing verification, collaborator
    /// exemption, signature lookup. Each login is looked up at most once.
    pub async fn classify_commits(
        &self,
        api: &dyn RepoApi,
        info: &EvaluationInfo,
        commits: Vec<PullRequestCommit>,
    ) -> Result<CommitBuckets, ClaBotError> {
        let mut buckets = CommitBuckets::default();
        let mut seen: HashSet<String> = HashSet::new();

        for commit in commits {
            let Some(login) = commit.author_login.clone() else {
                buckets.missing_author.push(commit);
                continue;
            };

            if !commit.verified {
                buckets.missing_verification.push(commit);
                continue;
            }

            if !seen.insert(login.clone()) {
                continue;
            }

            if api.is_collaborator(&info.repo_owner, &info.repo_name, &login).await? {
                debug!("{} is a collaborator on {}/{}, skipping CLA check", login, info.repo_owner, info.repo_name);
                continue;
            }

            match self.store.has_signed(&login, &info.cla_version).await? {
                Some(signature) => buckets.signed.push(UserSignature::from(signature)),
                None => buckets.needs_signature.push(UserSignature::unsigned(
                    login,
                    commit.author_email,
                    commit.author_name,
                    info.cla_version.clone(),
                )),
            }
        }

        Ok(buckets)
    }

    // Signed authors are not cleaned up on this path; the next full
    // evaluation after the commits are fixed does that.
    async fn report_quality_violations(
        &self,
        actions: &IssueActions<'_>,
        context: &str,
        buckets: &CommitBuckets,
    ) -> Result<EvaluationOutcome, ClaBotError> {
        if !buckets.missing_author.is_empty() {
            actions.apply_label(&MISSING_AUTHOR).await?;
        }
        if !buckets.missing_verification.is_empty() {
            actions.apply_label(&MISSING_VERIFICATION).await?;
        }

        let message = StatusCheckGenerator::quality_comment(&buckets.missing_author, &buckets.missing_verification);
        actions.comment_once(&message).await?;
        actions.set_status(&StatusCheckGenerator::quality_failure(context)).await?;

        warn!(
            "Commit quality violations: {} without author, {} without verification",
            buckets.missing_author.len(),
            buckets.missing_verification.len()
        );

        Ok(EvaluationOutcome::QualityViolations {
            missing_author: buckets.missing_author.len(),
            missing_verification: buckets.missing_verification.len(),
        })
    }
}
