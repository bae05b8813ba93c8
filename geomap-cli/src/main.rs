//! Geomap CLI - render choropleth and heat maps from tables and GeoJSON boundaries.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "geomap",
    version,
    about = "Choropleth and coordinate heat map toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: geomap_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    geomap_cmd::run(cli.command).await
}
