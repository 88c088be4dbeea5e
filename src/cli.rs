use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::auth::Token;
use crate::collector::Collector;
use crate::config::{Config, StorageBackend};
use crate::output;
use crate::providers::GitLabClient;
use crate::storage::{InMemoryRepository, MongoRepository};

#[derive(Parser)]
#[command(name = "metrix")]
#[command(author, version, about = "Deployment collector for delivery metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./metrix.{toml,json,yaml} or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON run report to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect projects and production deployments from GitLab
    Collect(CollectArgs),

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Default)]
struct CollectArgs {
    #[arg(short, long, env = "METRIX_GITLAB_URL")]
    url: Option<String>,

    #[arg(short, long, env = "METRIX_GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// MongoDB connection string
    #[arg(long, env = "METRIX_DB_CONN_STRING", hide_env_values = true)]
    db: Option<String>,

    /// MongoDB database name
    #[arg(long)]
    database: Option<String>,

    /// Environment whose deployments are collected
    #[arg(short, long)]
    environment: Option<String>,

    #[arg(long)]
    per_page: Option<u32>,

    /// Abort a listing after this many pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Keep results in memory and print them instead of writing to MongoDB
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a configuration file with default values
    Init { path: PathBuf },
}

impl CollectArgs {
    /// Layers command-line and environment values over the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.gitlab.url.clone_from(url);
        }
        if let Some(token) = &self.token {
            config.gitlab.token = Some(token.clone());
        }
        if let Some(db) = &self.db {
            config.storage.conn_string = Some(db.clone());
        }
        if let Some(database) = &self.database {
            config.storage.database.clone_from(database);
        }
        if let Some(environment) = &self.environment {
            config.collector.environment.clone_from(environment);
        }
        if let Some(per_page) = self.per_page {
            config.gitlab.per_page = per_page;
        }
        if let Some(max_pages) = self.max_pages {
            config.gitlab.max_pages = max_pages;
        }
        if self.dry_run {
            config.storage.backend = StorageBackend::Memory;
        }
    }
}

impl Cli {
    async fn execute_collect(&self, args: &CollectArgs) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        args.apply(&mut config);
        config.validate()?;

        info!("Collecting deployments from {}", config.gitlab.url);

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, stopping after the current request");
                ctrl_c.cancel();
            }
        });

        let token = config.gitlab.token.as_deref().map(Token::from);
        let client = GitLabClient::new(&config.gitlab.url, token, config.client_options())?
            .with_cancellation(cancel.clone());
        let source_name = client.api_url().to_string();
        let collector = Collector::new(
            client,
            source_name,
            config.collector_options(!args.no_progress && console::user_attended_stderr()),
        )
        .with_cancellation(cancel);

        let json_output = match config.storage.backend {
            StorageBackend::Memory => {
                let repository = InMemoryRepository::new();
                let report = collector.refresh_data(&repository).await?;
                output::print_summary(&report);

                let dry_run = serde_json::json!({
                    "report": report,
                    "projects": repository.projects()?,
                    "deployments": repository.deployments()?,
                });
                self.to_json(&dry_run)?
            }
            StorageBackend::Mongo => {
                let conn_string = config.storage.conn_string.as_deref().unwrap_or_default();
                let repository =
                    MongoRepository::connect(conn_string, &config.storage.database).await?;
                let result = collector.refresh_data(&repository).await;
                repository.shutdown().await;

                let report = result?;
                output::print_summary(&report);
                self.to_json(&report)?
            }
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)
                .with_context(|| format!("Failed to write report: {}", output_path.display()))?;
            info!("Run report written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    fn to_json(&self, value: &impl serde::Serialize) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    fn execute_config_init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Refusing to overwrite existing file: {}", path.display());
        }
        Config::default().save(path)?;
        info!("Default configuration written to: {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Collect(args) => self.execute_collect(args).await,
            Commands::Config {
                action: ConfigAction::Init { path },
            } => Self::execute_config_init(path),
        }
    }
}
