//! Registers teams (`name,institution,speaker,...`), adjudicators
//! (`name,institution`) or rooms (`name`) from a CSV file.

use std::{fs::File, path::PathBuf};

use clap::{Parser, ValueEnum};
use tally::{
    state::{ConnectionOptions, connect, run_migrations},
    tournaments::import::{import_adjudicators, import_rooms, import_teams},
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Teams,
    Adjudicators,
    Rooms,
}

#[derive(Parser)]
pub struct Import {
    tournament_id: String,
    file: PathBuf,
    #[clap(long, value_enum, default_value = "teams")]
    kind: Kind,
    #[clap(long, env = "DATABASE_URL")]
    database_url: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Import::parse();

    let mut conn = connect(&args.database_url, ConnectionOptions::default())?;
    run_migrations(&mut conn)?;

    let file = File::open(&args.file)?;
    match args.kind {
        Kind::Teams => {
            let summary = import_teams(&args.tournament_id, file, &mut conn)?;
            println!(
                "created {} teams and {} speakers",
                summary.teams_created, summary.speakers_created
            );
        }
        Kind::Adjudicators => {
            let count =
                import_adjudicators(&args.tournament_id, file, &mut conn)?;
            println!("created {} adjudicators", count.created);
        }
        Kind::Rooms => {
            let count = import_rooms(&args.tournament_id, file, &mut conn)?;
            println!("created {} rooms", count.created);
        }
    }

    Ok(())
}
