pub mod commands;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::database::{ConnectionProvider, PgConnector, PgUserStore};

#[derive(Parser)]
#[command(name = "foundation")]
#[command(about = "Foundation CLI - operator tasks for the Foundation API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Admin account management")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "Bearer token utilities")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Database connectivity and schema")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Storage handles for one CLI invocation.
pub struct CliContext {
    pub config: AppConfig,
    pub db: Arc<ConnectionProvider<PgConnector>>,
    pub users: PgUserStore,
}

impl CliContext {
    pub fn new(config: AppConfig) -> Self {
        let db = Arc::new(PgConnector::provider(config.database.clone()));
        let users = PgUserStore::new(db.clone());
        Self { config, db, users }
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let ctx = CliContext::new(crate::config::config().clone());

    let result = match cli.command {
        Commands::Admin { cmd } => commands::admin::handle(cmd, &ctx, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, &ctx, output_format).await,
        Commands::Db { cmd } => commands::db::handle(cmd, &ctx, output_format).await,
    };

    ctx.close().await;
    result
}
