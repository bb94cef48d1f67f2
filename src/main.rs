use std::path::PathBuf;

use clap::Parser;
use tally::config::{TallyConfig, create_app};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Serves the tabulation API")]
pub struct Serve {
    /// TOML configuration file.
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Overrides `database_url` (and `DATABASE_URL`).
    #[clap(long)]
    database_url: Option<String>,
    /// Overrides `bind` (and `TALLY_BIND`).
    #[clap(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Serve::parse();

    let mut config = TallyConfig::load(args.config.as_deref())?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log)),
        )
        .init();

    let pool = config.open_database()?;
    let app = create_app(pool);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(bind = %config.bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
