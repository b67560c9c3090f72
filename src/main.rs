use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cla_bot::config::AppConfig;
use cla_bot::database::models::UserSignature;
use cla_bot::database::{Database, SignatureStore};
use cla_bot::enforcement::{PullRequestEvaluator, ReevaluationTrigger};
use cla_bot::github::client::OctocrabClients;
use cla_bot::webhooks::{self, AppState};

#[derive(Parser)]
#[command(name = "cla-bot", about = "GitHub App enforcing Contributor License Agreements")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Re-evaluate every pull request a user is blocking
    Reevaluate {
        login: String,
        /// Defaults to the configured CLA version
        #[arg(long)]
        cla_version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cla_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load()?;
    info!("Configuration loaded");

    let database = Database::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    database.migrate_schema().await?;

    let store: Arc<dyn SignatureStore> = Arc::new(database);
    let clients = Arc::new(OctocrabClients::new(&config.github_private_key_path));
    let evaluator = Arc::new(
        PullRequestEvaluator::new(clients, Arc::clone(&store)).with_cla_url(config.cla_url.clone()),
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            info!("Migrations complete");
        }
        Command::Reevaluate { login, cla_version } => {
            let cla_version = cla_version.unwrap_or_else(|| config.cla_version.clone());
            let user = UserSignature::unsigned(login, "", "", cla_version);
            let count = ReevaluationTrigger::new(evaluator).reevaluate(&user).await?;
            info!("Re-evaluated {} pull requests for {}", count, user.login);
        }
        Command::Serve => {
            let addr = config.bind_address();
            let app = webhooks::router(AppState::new(config, evaluator));

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Server listening on {}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
