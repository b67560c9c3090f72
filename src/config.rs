use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ClaBotError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub github_app_id: u64,
    pub github_private_key_path: String,
    /// CLA version new signatures are recorded against and pull requests are checked for.
    pub cla_version: String,
    /// Public signing page. When unset, comments link to the app installation page.
    pub cla_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn load() -> Result<Self, ClaBotError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClaBotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://cla-bot.db".to_string());

        let github_app_id = lookup("GITHUB_APP_ID")
            .ok_or_else(|| ClaBotError::Config("GITHUB_APP_ID is not set".to_string()))?
            .trim()
            .parse()
            .map_err(|e| ClaBotError::Config(format!("GITHUB_APP_ID is not a valid app id: {}", e)))?;

        let github_private_key_path = lookup("GITHUB_PRIVATE_KEY_PATH")
            .unwrap_or_else(|| "private-key.pem".to_string());

        let cla_version = lookup("CLA_VERSION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "1.0".to_string());

        let cla_url = lookup("CLA_URL").filter(|v| !v.trim().is_empty());

        let server_host = lookup("SERVER_HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| ClaBotError::Config(format!("SERVER_PORT is not a valid port: {}", e)))?;

        Ok(AppConfig {
            database_url,
            github_app_id,
            github_private_key_path,
            cla_version,
            cla_url,
            server_host,
            server_port,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
