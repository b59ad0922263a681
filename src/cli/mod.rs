pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::config;

#[derive(Parser)]
#[command(name = "coffeeshop")]
#[command(about = "Cyborg Coffeeshop - command-line storefront client")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check that the API is reachable")]
    Health,

    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Browse the storefront")]
    Products {
        #[command(subcommand)]
        cmd: commands::products::ProductsCommands,
    },

    #[command(about = "Display preferences")]
    Prefs {
        #[command(subcommand)]
        cmd: commands::prefs::PrefsCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let app = App::from_config(config::config().clone())?;

    match cli.command {
        Commands::Health => commands::health::handle(&app, output_format).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, &app, output_format).await,
        Commands::Products { cmd } => commands::products::handle(cmd, &app, output_format).await,
        Commands::Prefs { cmd } => commands::prefs::handle(cmd, &app, output_format).await,
    }
}
