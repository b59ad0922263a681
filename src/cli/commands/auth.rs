use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::app::App;
use crate::auth;
use crate::cli::utils::{output_details, output_error, output_success, prompt_password};
use crate::cli::OutputFormat;
use crate::types::LoginRequest;
use crate::ui::LoginPhase;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login and store the access token")]
    Login {
        #[arg(help = "Username (email)")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, default_value = "", help = "Space separated OAuth2 scopes")]
        scope: String,
    },

    #[command(about = "Forget the stored access token")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, app: &App, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password, scope } => {
            let password = prompt_password(password)?;
            let credentials = LoginRequest::new(username.clone(), password).with_scope(scope);

            match app.submit_login(credentials).await {
                LoginPhase::Succeeded => output_success(
                    &output_format,
                    &format!("Logged in as {}", username),
                    Some(json!({ "username": username })),
                ),
                _ => {
                    for toast in app.toaster().drain() {
                        output_error(&output_format, &toast.title, None)?;
                    }
                    anyhow::bail!("Login failed for {}", username)
                }
            }
        }
        AuthCommands::Logout => {
            app.logout().await?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let Some(token) = app.session().access_token.get() else {
                return output_details(
                    &output_format,
                    "Not authenticated",
                    json!({ "authenticated": false }),
                );
            };

            let details = match auth::inspect(&token, Utc::now()) {
                Ok(info) => json!({
                    "authenticated": true,
                    "subject": info.subject,
                    "scopes": info.scopes,
                    "expires_at": info.expires_at.map(|at| at.to_rfc3339()),
                    "expired": info.expired,
                }),
                Err(e) => {
                    tracing::warn!("Could not inspect stored token: {}", e);
                    json!({ "authenticated": true })
                }
            };
            output_details(&output_format, "Authenticated", details)
        }
        AuthCommands::Whoami => {
            let state = app.session().load_current_user().await;
            if let Some(e) = state.error {
                return Err(e.into());
            }
            match state.data.flatten() {
                Some(user) => output_details(
                    &output_format,
                    user.full_name.as_deref().unwrap_or(&user.email),
                    serde_json::to_value(&user)?,
                ),
                None => anyhow::bail!("Not authenticated; run `coffeeshop auth login <username>`"),
            }
        }
    }
}
