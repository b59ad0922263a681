use clap::Subcommand;

use crate::app::{App, PageBody};
use crate::cli::utils::{output_empty_collection, output_error};
use crate::cli::OutputFormat;
use crate::ui::ProductGrid;

#[derive(Subcommand)]
pub enum ProductsCommands {
    #[command(about = "List products with their rating summaries")]
    List,
}

pub async fn handle(cmd: ProductsCommands, app: &App, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProductsCommands::List => {
            let page = app.visit("/").await;
            let PageBody::Storefront(view) = page.body else {
                anyhow::bail!("Storefront not available at {}", page.pathname);
            };

            let cards = match view.grid {
                ProductGrid::Products { cards } => cards,
                ProductGrid::Failed { message } => {
                    output_error(&output_format, &message, Some("PRODUCTS_UNAVAILABLE"))?;
                    anyhow::bail!("Could not load products");
                }
                ProductGrid::Loading => anyhow::bail!("Products are still loading"),
            };

            if cards.is_empty() {
                return output_empty_collection(&output_format, "products", "No products available");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&cards)?);
                }
                OutputFormat::Text => {
                    println!("{}", view.title);
                    for card in cards {
                        let rating = card
                            .rating
                            .map(|summary| summary.to_string())
                            .unwrap_or_else(|| "no reviews".to_string());
                        let categories: Vec<&str> =
                            card.badges.iter().map(|badge| badge.label.as_str()).collect();
                        println!(
                            "  {:<30} {:>14}  {:<10} [{}]",
                            card.name,
                            card.price,
                            rating,
                            categories.join(", ")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
