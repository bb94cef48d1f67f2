//! Rebuilds (or, with `--check`, audits) the standings of a tournament
//! directly against a database file.

use clap::Parser;
use tally::{
    state::{ConnectionOptions, connect, run_migrations},
    tournaments::standings::recalculate::{audit, recalculate},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
pub struct Recalculate {
    tournament_id: String,
    #[clap(long, env = "DATABASE_URL")]
    database_url: String,
    /// Report drift between stored totals and the ballot ledger without
    /// writing anything.
    #[clap(long, action)]
    check: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Recalculate::parse();

    // Waits on a running server's write lock instead of failing at once.
    let mut conn = connect(&args.database_url, ConnectionOptions::default())?;
    run_migrations(&mut conn)?;

    if args.check {
        let report = audit(&args.tournament_id, &mut conn)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_clean() {
            std::process::exit(1);
        }
    } else {
        let processed = recalculate(&args.tournament_id, &mut conn)?;
        println!("recalculated {processed} matches");
    }

    Ok(())
}
