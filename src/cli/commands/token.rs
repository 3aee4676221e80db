use clap::Subcommand;
use serde_json::json;

use crate::auth::JwtKeys;
use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};
use crate::database::UserStore;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for an existing account")]
    Issue {
        #[arg(help = "Account email")]
        email: String,
    },

    #[command(about = "Verify a bearer token against the configured secret")]
    Verify {
        #[arg(help = "Token to check")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let keys = JwtKeys::from_config(&ctx.config.security)?;

    match cmd {
        TokenCommands::Issue { email } => {
            let user = ctx
                .users
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no account with email '{}'", email))?;
            if !user.is_active {
                anyhow::bail!("account '{}' is inactive", email);
            }

            let issued = keys.issue(&user)?;
            match output_format {
                OutputFormat::Text => {
                    println!("{}", issued.token);
                    Ok(())
                }
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("Token issued for {}", user.email),
                    Some(json!({ "token": issued.token, "expires_in": issued.expires_in })),
                ),
            }
        }
        TokenCommands::Verify { token } => {
            let claims = keys.verify(&token)?;
            output_success(
                &output_format,
                &format!("Token valid for {} ({}), expires at {}", claims.sub, claims.role, claims.exp),
                Some(serde_json::to_value(&claims)?),
            )
        }
    }
}
