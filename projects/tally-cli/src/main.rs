mod app;
mod audit_text;
mod sinks;
mod views;

use anyhow::Result;
use app::App;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tally_db::Database;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Personal portfolio tracker")]
struct Args {
    /// Database file to use instead of ~/.tally/tally.db
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    log::info!("Tally starting up...");
    let args = Args::parse();

    let db = match args.db {
        Some(path) => Database::open_at_path(path).await?,
        None => Database::new().await?,
    };

    let mut app = App::new(Arc::new(db));
    app.run().await
}
