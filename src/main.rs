pub mod aggregate;
pub mod classify;
pub mod config;
pub mod data;
pub mod interaction;
pub mod legend;
pub mod region_layer;
pub mod render;
pub mod server;
pub mod style;
pub mod types;

use aggregate::CountryCountTable;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use region_layer::RegionLayer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth tiles, styled GeoJSON and legend
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map, tiles and hover API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print airport totals and the best-served countries
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, default_value_t = 10)]
        top: usize,
    },
}

/// Load both datasets, count airports and join the counts onto the regions.
async fn build_layer(app_config: &config::AppConfig) -> Result<RegionLayer> {
    let (regions, airports) = data::load_datasets(&app_config.input).await?;
    let table = CountryCountTable::from_records(&airports);
    if table.is_empty() {
        return Err(anyhow!(
            "No airport records carried a '{}' value",
            app_config.input.country_field
        ));
    }
    Ok(RegionLayer::new(regions, Arc::new(table)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let layer = build_layer(&app_config).await?;
            render::generate_tiles(&app_config, &layer)?;

            info!("Generation complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let layer = build_layer(&app_config).await?;
            server::start_server(app_config, layer).await?;
        }
        Commands::Summary { config, top } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let layer = build_layer(&app_config).await?;
            let table = layer.table();

            info!(
                "{} airports across {} countries ({} records skipped)",
                table.total(),
                table.len(),
                table.skipped()
            );
            for (rank, (country, count)) in table.top(*top).into_iter().enumerate() {
                info!(
                    "{:>3}. {:<40} {:>6}  {}",
                    rank + 1,
                    country,
                    count,
                    classify::color_for(Some(count))
                );
            }

            let unmatched: Vec<&str> = layer
                .regions()
                .iter()
                .filter(|r| layer.count(&r.name).is_none())
                .map(|r| r.name.as_str())
                .collect();
            info!("{} regions have no airport data", unmatched.len());
        }
    }

    Ok(())
}
