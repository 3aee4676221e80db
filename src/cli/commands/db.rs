use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};
use crate::database::Connector;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Connect and run a trivial query")]
    Check,

    #[command(about = "Create the users table if missing")]
    Migrate,
}

pub async fn handle(cmd: DbCommands, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let target = ctx.db.connector().target();

    match cmd {
        DbCommands::Check => {
            let pool = ctx.db.acquire().await?;
            sqlx::query("SELECT 1").execute(&pool).await?;
            output_success(
                &output_format,
                &format!("Database reachable at {}", target),
                Some(json!({ "target": target })),
            )
        }
        DbCommands::Migrate => {
            ctx.users.ensure_schema().await?;
            output_success(&output_format, &format!("Schema ready at {}", target), None)
        }
    }
}
