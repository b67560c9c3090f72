use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::models::{AppId, InstallationId};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::types::*;
use super::{AppApi, GitHubClients, RepoApi};
use crate::error::GitHubError;

const PER_PAGE: u8 = 100;

/// Builds octocrab clients from the app's PEM private key.
///
/// The key is read on every acquisition so a rotated key file is picked up
/// without a restart. A missing or unparsable key is a credential error.
pub struct OctocrabClients {
    private_key_path: PathBuf,
}

impl OctocrabClients {
    pub fn new(private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
        }
    }

    fn read_key(&self) -> Result<EncodingKey, GitHubError> {
        let pem = std::fs::read(&self.private_key_path).map_err(|e| {
            GitHubError::Credentials(format!(
                "Failed to read private key {}: {}",
                self.private_key_path.display(),
                e
            ))
        })?;

        EncodingKey::from_rsa_pem(&pem).map_err(|e| {
            GitHubError::Credentials(format!(
                "Failed to parse private key {}: {}",
                self.private_key_path.display(),
                e
            ))
        })
    }

    fn app_octocrab(&self, app_id: u64) -> Result<Octocrab, GitHubError> {
        let key = self.read_key()?;
        Octocrab::builder()
            .app(AppId(app_id), key)
            .build()
            .map_err(GitHubError::from)
    }
}

#[async_trait]
impl GitHubClients for OctocrabClients {
    async fn app_client(&self, app_id: u64) -> Result<Arc<dyn AppApi>, GitHubError> {
        Ok(Arc::new(OctocrabAppApi::new(self.app_octocrab(app_id)?)))
    }

    async fn installation_client(&self, app_id: u64, install_id: u64) -> Result<Arc<dyn RepoApi>, GitHubError> {
        let app = self.app_octocrab(app_id)?;
        let (client, _token) = app.installation_and_token(InstallationId(install_id)).await?;
        debug!("Acquired installation token for installation {}", install_id);
        Ok(Arc::new(OctocrabRepoApi::new(client)))
    }
}

#[derive(Deserialize)]
struct InstallationResponse {
    id: u64,
    app_id: u64,
    app_slug: String,
    html_url: String,
}

pub struct OctocrabAppApi {
    client: Octocrab,
}

impl OctocrabAppApi {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AppApi for OctocrabAppApi {
    async fn get_installation(&self, installation_id: u64) -> Result<InstallationInfo, GitHubError> {
        let response: InstallationResponse = self
            .client
            .get(format!("/app/installations/{}", installation_id), None::<&()>)
            .await?;

        Ok(InstallationInfo {
            id: response.id,
            app_id: response.app_id,
            app_slug: response.app_slug,
            html_url: response.html_url,
        })
    }
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    #[serde(default)]
    html_url: String,
    author: Option<AccountResponse>,
    commit: GitCommitResponse,
}

#[derive(Deserialize)]
struct AccountResponse {
    login: String,
}

#[derive(Deserialize)]
struct GitCommitResponse {
    author: Option<GitActorResponse>,
    verification: Option<VerificationResponse>,
}

#[derive(Deserialize)]
struct GitActorResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct VerificationResponse {
    verified: bool,
}

impl From<CommitResponse> for PullRequestCommit {
    fn from(response: CommitResponse) -> Self {
        let (author_name, author_email) = response
            .commit
            .author
            .map(|a| (a.name.unwrap_or_default(), a.email.unwrap_or_default()))
            .unwrap_or_default();

        PullRequestCommit {
            sha: response.sha,
            html_url: response.html_url,
            author_login: response.author.map(|a| a.login).filter(|l| !l.is_empty()),
            author_name,
            author_email,
            verified: response.commit.verification.map(|v| v.verified).unwrap_or(false),
        }
    }
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: &'a [String],
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

/// Percent-encodes a value for use as a single URL path segment.
fn encode_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Repository operations over an installation-scoped octocrab client.
pub struct OctocrabRepoApi {
    client: Octocrab,
}

impl OctocrabRepoApi {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    async fn get_all<T: DeserializeOwned>(&self, route: &str) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let params = PageParams {
                per_page: PER_PAGE,
                page,
            };
            let batch: Vec<T> = self.client.get(route, Some(&params)).await?;
            let fetched = batch.len();
            items.extend(batch);
            if fetched < PER_PAGE as usize {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

#[async_trait]
impl RepoApi for OctocrabRepoApi {
    async fn create_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> Result<(), GitHubError> {
        let route = format!("/repos/{}/{}/statuses/{}", owner, repo, sha);
        let _: serde_json::Value = self.client.post(route, Some(status)).await?;
        Ok(())
    }

    async fn is_collaborator(&self, owner: &str, repo: &str, login: &str) -> Result<bool, GitHubError> {
        let route = format!("/repos/{}/{}/collaborators/{}", owner, repo, encode_segment(login));
        let response = self.client._get(route).await?;

        match response.status().as_u16() {
            204 => Ok(true),
            404 => Ok(false),
            status => Err(GitHubError::Api {
                status,
                message: format!("unexpected response checking collaborator {}", login),
            }),
        }
    }

    async fn list_pull_request_commits(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestCommit>, GitHubError> {
        let route = format!("/repos/{}/{}/pulls/{}/commits", owner, repo, pr_number);
        let commits: Vec<CommitResponse> = self.get_all(&route).await?;
        Ok(commits.into_iter().map(PullRequestCommit::from).collect())
    }

    async fn get_label(&self, owner: &str, repo: &str, name: &str) -> Result<Label, GitHubError> {
        let route = format!("/repos/{}/{}/labels/{}", owner, repo, encode_segment(name));
        let label: Label = self.client.get(route, None::<&()>).await?;
        Ok(label)
    }

    async fn create_label(&self, owner: &str, repo: &str, label: &Label) -> Result<Label, GitHubError> {
        let route = format!("/repos/{}/{}/labels", owner, repo);
        let created: Label = self.client.post(route, Some(label)).await?;
        Ok(created)
    }

    async fn list_issue_labels(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Label>, GitHubError> {
        let route = format!("/repos/{}/{}/issues/{}/labels", owner, repo, number);
        self.get_all(&route).await
    }

    async fn add_labels(&self, owner: &str, repo: &str, number: u64, names: &[String]) -> Result<(), GitHubError> {
        let route = format!("/repos/{}/{}/issues/{}/labels", owner, repo, number);
        let _: Vec<Label> = self.client.post(route, Some(&LabelsBody { labels: names })).await?;
        Ok(())
    }

    async fn remove_label(&self, owner: &str, repo: &str, number: u64, name: &str) -> Result<(), GitHubError> {
        let route = format!(
            "/repos/{}/{}/issues/{}/labels/{}",
            owner,
            repo,
            number,
            encode_segment(name)
        );
        let _: Vec<Label> = self.client.delete(route, None::<&()>).await?;
        Ok(())
    }

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, GitHubError> {
        let route = format!("/repos/{}/{}/issues/{}/comments", owner, repo, number);
        self.get_all(&route).await
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubError> {
        let route = format!("/repos/{}/{}/issues/{}/comments", owner, repo, number);
        let comment: IssueComment = self.client.post(route, Some(&CommentBody { body })).await?;
        Ok(comment)
    }
}
