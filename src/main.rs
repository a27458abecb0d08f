use std::error::Error;

use ai_llm_service::telemetry;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // `.env` is optional; real deployments pass the environment directly.
    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::INFO))
        .with(
            fmt::layer()
                .with_target(false)
                .with_filter(telemetry::not_library_filter()),
        )
        .with(telemetry::layer())
        .try_init()?;

    println!(
        "{} {}",
        "groundwater-rag-backend".bold().cyan(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded .env");
    }

    api::start().await?;

    Ok(())
}
