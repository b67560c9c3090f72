use thiserror::Error;

/// Errors surfaced by the GitHub facade.
///
/// Callers check the `Result` first and only then look at the kind; a
/// not-found response is its own variant so idempotent operations can
/// tolerate it without inspecting message text.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("GitHub transport error: {0}")]
    Transport(String),

    #[error("GitHub credential error: {0}")]
    Credentials(String),
}

impl GitHubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<octocrab::Error> for GitHubError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404 => {
                Self::NotFound(source.message.clone())
            }
            octocrab::Error::GitHub { source, .. } => Self::Api {
                status: source.status_code.as_u16(),
                message: source.message.clone(),
            },
            _ => Self::Transport(err.to_string()),
        }
    }
}

/// Errors surfaced by the signature store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("signature for {login} on CLA version {cla_version} already exists or was not written")]
    DuplicateSignature { login: String, cla_version: String },

    #[error("could not resolve tracking record for {repo_name}#{pr_number}")]
    MissingParent { repo_name: String, pr_number: u64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateSignature { .. })
    }
}

#[derive(Error, Debug)]
pub enum ClaBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GitHub API error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Webhook processing error: {0}")]
    Webhook(String),
}

impl From<serde_json::Error> for ClaBotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Webhook(format!("JSON payload error: {}", err))
    }
}
