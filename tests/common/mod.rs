#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cla_bot::database::models::{EvaluationInfo, Signature, UserSignature};
use cla_bot::database::{Database, RemovalOutcome, SignatureStore};
use cla_bot::enforcement::PullRequestEvaluator;
use cla_bot::error::{GitHubError, StoreError};
use cla_bot::github::types::*;
use cla_bot::github::{AppApi, GitHubClients, RepoApi};

pub const OWNER: &str = "acme";
pub const REPO: &str = "widgets";
pub const APP_ID: u64 = 1001;
pub const INSTALL_ID: u64 = 2002;
pub const CLA_VERSION: &str = "1.0";
pub const APP_SLUG: &str = "cla-bot";
pub const INSTALL_URL: &str = "https://github.com/apps/cla-bot";

pub fn evaluation_info(pr_number: u64) -> EvaluationInfo {
    EvaluationInfo::new(OWNER, REPO, format!("sha-{}", pr_number), pr_number, APP_ID, INSTALL_ID, CLA_VERSION)
}

pub fn verified_commit(sha: &str, login: &str) -> PullRequestCommit {
    PullRequestCommit {
        sha: sha.to_string(),
        html_url: format!("https://github.com/{}/{}/commit/{}", OWNER, REPO, sha),
        author_login: Some(login.to_string()),
        author_name: format!("{} name", login),
        author_email: format!("{}@example.com", login),
        verified: true,
    }
}

pub fn unverified_commit(sha: &str, login: &str) -> PullRequestCommit {
    PullRequestCommit {
        verified: false,
        ..verified_commit(sha, login)
    }
}

pub fn unattributed_commit(sha: &str) -> PullRequestCommit {
    PullRequestCommit {
        author_login: None,
        ..verified_commit(sha, "ghost")
    }
}

pub fn signature(login: &str, cla_version: &str) -> Signature {
    Signature {
        login: login.to_string(),
        email: format!("{}@example.com", login),
        given_name: format!("{} name", login),
        cla_version: cla_version.to_string(),
        signed_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct FakeState {
    pub collaborators: HashSet<String>,
    pub commits: HashMap<u64, Vec<PullRequestCommit>>,
    pub repo_labels: Vec<Label>,
    pub issue_labels: HashMap<u64, Vec<String>>,
    pub comments: HashMap<u64, Vec<IssueComment>>,
    pub statuses: Vec<(String, CommitStatus)>,
    pub labels_created: Vec<String>,
    pub labels_added: Vec<(u64, String)>,
    pub labels_removed: Vec<(u64, String)>,
    pub removal_attempts: Vec<(u64, String)>,
    pub comments_posted: Vec<(u64, String)>,
    /// Pull request whose commit listing fails with a server error.
    pub fail_commits_for: Option<u64>,
    pub fail_installation: bool,
    next_comment_id: u64,
}

/// In-memory GitHub that records every write it receives.
#[derive(Default)]
pub struct FakeGitHub {
    pub state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_collaborator(&self, login: &str) {
        self.state.lock().unwrap().collaborators.insert(login.to_string());
    }

    pub fn set_commits(&self, pr_number: u64, commits: Vec<PullRequestCommit>) {
        self.state.lock().unwrap().commits.insert(pr_number, commits);
    }

    pub fn statuses_for(&self, sha: &str) -> Vec<CommitState> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .iter()
            .filter(|(s, _)| s == sha)
            .map(|(_, status)| status.state)
            .collect()
    }

    pub fn last_status(&self, sha: &str) -> Option<CommitStatus> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .iter()
            .rev()
            .find(|(s, _)| s == sha)
            .map(|(_, status)| status.clone())
    }

    pub fn issue_labels(&self, pr_number: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .issue_labels
            .get(&pr_number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn comments(&self, pr_number: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&pr_number)
            .map(|c| c.iter().map(|c| c.body.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clients(self: &Arc<Self>) -> Arc<FakeClients> {
        Arc::new(FakeClients(Arc::clone(self)))
    }
}

fn store_failure() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

fn server_error(message: &str) -> GitHubError {
    GitHubError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[async_trait]
impl AppApi for FakeGitHub {
    async fn get_installation(&self, installation_id: u64) -> Result<InstallationInfo, GitHubError> {
        if self.state.lock().unwrap().fail_installation {
            return Err(server_error("installation lookup failed"));
        }
        Ok(InstallationInfo {
            id: installation_id,
            app_id: APP_ID,
            app_slug: APP_SLUG.to_string(),
            html_url: INSTALL_URL.to_string(),
        })
    }
}

#[async_trait]
impl RepoApi for FakeGitHub {
    async fn create_status(&self, _owner: &str, _repo: &str, sha: &str, status: &CommitStatus) -> Result<(), GitHubError> {
        self.state.lock().unwrap().statuses.push((sha.to_string(), status.clone()));
        Ok(())
    }

    async fn is_collaborator(&self, _owner: &str, _repo: &str, login: &str) -> Result<bool, GitHubError> {
        Ok(self.state.lock().unwrap().collaborators.contains(login))
    }

    async fn list_pull_request_commits(
        &self,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestCommit>, GitHubError> {
        let state = self.state.lock().unwrap();
        if state.fail_commits_for == Some(pr_number) {
            return Err(server_error("commit listing failed"));
        }
        Ok(state.commits.get(&pr_number).cloned().unwrap_or_default())
    }

    async fn get_label(&self, _owner: &str, _repo: &str, name: &str) -> Result<Label, GitHubError> {
        self.state
            .lock()
            .unwrap()
            .repo_labels
            .iter()
            .find(|l| l.name == name)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound(name.to_string()))
    }

    async fn create_label(&self, _owner: &str, _repo: &str, label: &Label) -> Result<Label, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.repo_labels.push(label.clone());
        state.labels_created.push(label.name.clone());
        Ok(label.clone())
    }

    async fn list_issue_labels(&self, _owner: &str, _repo: &str, number: u64) -> Result<Vec<Label>, GitHubError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .issue_labels
            .get(&number)
            .map(|names| {
                names
                    .iter()
                    .map(|name| Label {
                        name: name.clone(),
                        color: "ffffff".to_string(),
                        description: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_labels(&self, _owner: &str, _repo: &str, number: u64, names: &[String]) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        for name in names {
            state.labels_added.push((number, name.clone()));
            let labels = state.issue_labels.entry(number).or_default();
            if !labels.contains(name) {
                labels.push(name.clone());
            }
        }
        Ok(())
    }

    async fn remove_label(&self, _owner: &str, _repo: &str, number: u64, name: &str) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.removal_attempts.push((number, name.to_string()));
        let labels = state.issue_labels.entry(number).or_default();
        match labels.iter().position(|l| l == name) {
            Some(index) => {
                labels.remove(index);
                state.labels_removed.push((number, name.to_string()));
                Ok(())
            }
            None => Err(GitHubError::NotFound(format!("label {} not on issue", name))),
        }
    }

    async fn list_issue_comments(&self, _owner: &str, _repo: &str, number: u64) -> Result<Vec<IssueComment>, GitHubError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_issue_comment(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.next_comment_id += 1;
        let comment = IssueComment {
            id: state.next_comment_id,
            body: body.to_string(),
        };
        state.comments.entry(number).or_default().push(comment.clone());
        state.comments_posted.push((number, body.to_string()));
        Ok(comment)
    }
}

pub struct FakeClients(pub Arc<FakeGitHub>);

#[async_trait]
impl GitHubClients for FakeClients {
    async fn app_client(&self, _app_id: u64) -> Result<Arc<dyn AppApi>, GitHubError> {
        let api: Arc<dyn AppApi> = Arc::clone(&self.0) as Arc<dyn AppApi>;
        Ok(api)
    }

    async fn installation_client(&self, _app_id: u64, _install_id: u64) -> Result<Arc<dyn RepoApi>, GitHubError> {
        let api: Arc<dyn RepoApi> = Arc::clone(&self.0) as Arc<dyn RepoApi>;
        Ok(api)
    }
}

/// Wraps the SQLite store and records which logins were looked up and
/// which cleanups were requested.
pub struct RecordingStore {
    pub inner: Database,
    pub lookups: Mutex<Vec<String>>,
    pub cleanups: Mutex<Vec<Vec<String>>>,
    pub stored: Mutex<Vec<Vec<String>>>,
    pub fail_lookups: AtomicBool,
    pub fail_tracking: AtomicBool,
}

impl RecordingStore {
    pub fn new(inner: Database) -> Arc<Self> {
        Arc::new(Self {
            inner,
            lookups: Mutex::new(Vec::new()),
            cleanups: Mutex::new(Vec::new()),
            stored: Mutex::new(Vec::new()),
            fail_lookups: AtomicBool::new(false),
            fail_tracking: AtomicBool::new(false),
        })
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn cleanups(&self) -> Vec<Vec<String>> {
        self.cleanups.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<Vec<String>> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignatureStore for RecordingStore {
    async fn insert_signature(&self, signature: &Signature) -> Result<(), StoreError> {
        self.inner.insert_signature(signature).await
    }

    async fn has_signed(&self, login: &str, cla_version: &str) -> Result<Option<Signature>, StoreError> {
        self.lookups.lock().unwrap().push(login.to_string());
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(store_failure());
        }
        self.inner.has_signed(login, cla_version).await
    }

    async fn store_unsigned_authors(&self, info: &EvaluationInfo, checked_at: DateTime<Utc>) -> Result<String, StoreError> {
        self.stored
            .lock()
            .unwrap()
            .push(info.user_signatures.iter().map(|u| u.login.clone()).collect());
        if self.fail_tracking.load(Ordering::SeqCst) {
            return Err(store_failure());
        }
        self.inner.store_unsigned_authors(info, checked_at).await
    }

    async fn get_tracked_pull_requests(&self, user: &UserSignature) -> Result<Vec<EvaluationInfo>, StoreError> {
        self.inner.get_tracked_pull_requests(user).await
    }

    async fn remove_resolved_authors(
        &self,
        signed_users: &[UserSignature],
        info: &EvaluationInfo,
    ) -> Result<RemovalOutcome, StoreError> {
        self.cleanups
            .lock()
            .unwrap()
            .push(signed_users.iter().map(|u| u.login.clone()).collect());
        self.inner.remove_resolved_authors(signed_users, info).await
    }

    async fn migrate_schema(&self) -> Result<(), StoreError> {
        self.inner.migrate_schema().await
    }
}

pub async fn setup_test_db() -> Database {
    Database::new_in_memory().await.expect("Failed to create test database")
}

pub struct Harness {
    pub github: Arc<FakeGitHub>,
    pub store: Arc<RecordingStore>,
    pub evaluator: Arc<PullRequestEvaluator>,
}

pub async fn harness() -> Harness {
    let github = FakeGitHub::new();
    let store = RecordingStore::new(setup_test_db().await);
    let evaluator = Arc::new(PullRequestEvaluator::new(
        github.clients(),
        Arc::clone(&store) as Arc<dyn SignatureStore>,
    ));
    Harness {
        github,
        store,
        evaluator,
    }
}

pub async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db.pool())
        .await
        .unwrap()
}
