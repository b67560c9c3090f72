use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signed CLA. Append-only; unique per (login, CLA version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Signature {
    pub login: String,
    pub email: String,
    pub given_name: String,
    pub cla_version: String,
    pub signed_at: DateTime<Utc>,
}

/// A contributor identity as seen on a commit, optionally carrying the
/// time they signed. Unsigned authors never have a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSignature {
    pub login: String,
    pub email: String,
    pub given_name: String,
    pub cla_version: String,
    pub signed_at: Option<DateTime<Utc>>,
}

impl UserSignature {
    pub fn unsigned(
        login: impl Into<String>,
        email: impl Into<String>,
        given_name: impl Into<String>,
        cla_version: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            email: email.into(),
            given_name: given_name.into(),
            cla_version: cla_version.into(),
            signed_at: None,
        }
    }
}

impl From<Signature> for UserSignature {
    fn from(signature: Signature) -> Self {
        Self {
            login: signature.login,
            email: signature.email,
            given_name: signature.given_name,
            cla_version: signature.cla_version,
            signed_at: Some(signature.signed_at),
        }
    }
}

/// Everything needed to evaluate one pull request, plus the authors that
/// are (or are about to be) tracked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationInfo {
    pub repo_owner: String,
    pub repo_name: String,
    pub sha: String,
    pub pr_number: u64,
    pub app_id: u64,
    pub install_id: u64,
    pub cla_version: String,
    /// Tracking record id, populated when the info was read back from the store.
    pub unsigned_pr_id: Option<String>,
    pub user_signatures: Vec<UserSignature>,
}

impl EvaluationInfo {
    pub fn new(
        repo_owner: impl Into<String>,
        repo_name: impl Into<String>,
        sha: impl Into<String>,
        pr_number: u64,
        app_id: u64,
        install_id: u64,
        cla_version: impl Into<String>,
    ) -> Self {
        Self {
            repo_owner: repo_owner.into(),
            repo_name: repo_name.into(),
            sha: sha.into(),
            pr_number,
            app_id,
            install_id,
            cla_version: cla_version.into(),
            unsigned_pr_id: None,
            user_signatures: Vec::new(),
        }
    }

    pub fn with_user_signatures(mut self, user_signatures: Vec<UserSignature>) -> Self {
        self.user_signatures = user_signatures;
        self
    }
}

/// Join of a tracked pull request with one of its tracked author rows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedAuthorRow {
    pub unsigned_pr_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub sha: String,
    pub pr_number: i64,
    pub app_id: i64,
    pub install_id: i64,
    pub login: String,
    pub email: String,
    pub given_name: String,
    pub cla_version: String,
}

impl From<TrackedAuthorRow> for EvaluationInfo {
    fn from(row: TrackedAuthorRow) -> Self {
        let author = UserSignature::unsigned(row.login, row.email, row.given_name, row.cla_version.clone());
        Self {
            repo_owner: row.repo_owner,
            repo_name: row.repo_name,
            sha: row.sha,
            pr_number: row.pr_number as u64,
            app_id: row.app_id as u64,
            install_id: row.install_id as u64,
            cla_version: row.cla_version,
            unsigned_pr_id: Some(row.unsigned_pr_id),
            user_signatures: vec![author],
        }
    }
}
