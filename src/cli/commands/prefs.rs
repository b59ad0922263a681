use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::app::App;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum PrefsCommands {
    #[command(about = "Show or set dark mode")]
    DarkMode {
        #[arg(value_enum, help = "Leave out to show the current setting")]
        value: Option<Toggle>,
    },
}

pub async fn handle(cmd: PrefsCommands, app: &App, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PrefsCommands::DarkMode { value } => {
            if let Some(value) = value {
                app.session().set_dark_mode(matches!(value, Toggle::On))?;
            }
            let enabled = app.session().dark_mode.get();
            output_success(
                &output_format,
                &format!("Dark mode is {}", if enabled { "on" } else { "off" }),
                Some(json!({ "dark_mode": enabled })),
            )
        }
    }
}
