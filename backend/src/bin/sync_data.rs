use backend::database::Database;
use backend::providers::HighwayDataClient;
use backend::sync::{sync_interchanges, sync_rest_areas};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Refresh rest area and interchange reference data from the open-data portal"
)]
struct Args {
    /// Only sync rest areas
    #[arg(long, conflicts_with = "interchanges_only")]
    rest_areas_only: bool,

    /// Only sync interchanges
    #[arg(long)]
    interchanges_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let client = HighwayDataClient::from_env()?;
    let db = Database::new().await?;
    db.migrate().await?;

    if !args.interchanges_only {
        let count = sync_rest_areas(&client, &db).await?;
        tracing::info!(count, "rest areas synced");
    }
    if !args.rest_areas_only {
        let count = sync_interchanges(&client, &db).await?;
        tracing::info!(count, "interchanges synced");
    }

    Ok(())
}
