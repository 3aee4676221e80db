use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_rows, output_success};
use crate::cli::{CliContext, OutputFormat};
use crate::database::UserStore;
use crate::services::{ensure_admin, BootstrapOutcome};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create the admin account if it does not exist (defaults from ADMIN_* env)")]
    Create {
        #[arg(long, help = "Admin email")]
        email: Option<String>,
        #[arg(long, help = "Admin password")]
        password: Option<String>,
        #[arg(long, help = "Display name")]
        name: Option<String>,
    },

    #[command(about = "List all accounts")]
    List,
}

pub async fn handle(cmd: AdminCommands, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create { email, password, name } => {
            let mut admin = ctx.config.admin.clone();
            if email.is_some() {
                admin.email = email;
            }
            if password.is_some() {
                admin.password = password;
            }
            if let Some(name) = name {
                admin.name = name;
            }

            ctx.users.ensure_schema().await?;
            match ensure_admin(&ctx.users, &admin).await? {
                BootstrapOutcome::Created(user) => output_success(
                    &output_format,
                    &format!("Admin user {} created", user.email),
                    Some(json!({ "id": user.id, "email": user.email })),
                ),
                BootstrapOutcome::AlreadyExists(user) => output_success(
                    &output_format,
                    &format!("Admin user {} already exists", user.email),
                    Some(json!({ "id": user.id, "email": user.email })),
                ),
                BootstrapOutcome::NotConfigured => {
                    anyhow::bail!("admin email and password are required (--email/--password or ADMIN_EMAIL/ADMIN_PASSWORD)")
                }
            }
        }
        AdminCommands::List => {
            let users = ctx.users.list().await?;
            let rows = users.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?;
            output_rows(&output_format, rows, |row| {
                format!(
                    "{}  {:<6} {}{}",
                    row["id"].as_str().unwrap_or_default(),
                    row["role"].as_str().unwrap_or_default(),
                    row["email"].as_str().unwrap_or_default(),
                    if row["is_active"].as_bool().unwrap_or(false) { "" } else { " (inactive)" },
                )
            })
        }
    }
}
