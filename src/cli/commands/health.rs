use serde_json::json;

use crate::app::App;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub async fn handle(app: &App, output_format: OutputFormat) -> anyhow::Result<()> {
    let base_url = app.client().base_url().to_string();
    let healthy = app.health().await?;
    if !healthy {
        anyhow::bail!("API at {} reported unhealthy", base_url);
    }

    output_success(
        &output_format,
        &format!("API at {} is healthy", base_url),
        Some(json!({ "base_url": base_url })),
    )
}
