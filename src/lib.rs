//! Tabulation for two-team parliamentary debate tournaments: ballot
//! submission and correction, winner resolution, running team and speaker
//! totals, standings, and reconciliation of those totals against the ballot
//! ledger.

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod config;
pub mod error;
pub mod schema;
pub mod score;
pub mod state;
pub mod tournaments;
pub mod util_resp;
pub mod validation;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
