use std::{path::Path, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{
    error::{Result, TabError},
    state::{ConnectionOptions, DbPool, make_pool, run_migrations},
    tournaments::{
        self,
        import::{do_import_adjudicators, do_import_rooms, do_import_teams},
        participants::{
            do_create_adjudicator, do_create_room, list_adjudicators,
            list_rooms,
        },
        rounds::{
            ballots::{list_ballots, submit::do_submit_ballot},
            do_create_round, do_publish_draw, do_publish_motion, list_rounds,
            matches::{do_create_match, list_matches},
        },
        standings::{
            public::{institution_tab, speaker_tab, team_tab},
            recalculate::{do_recalculate, view_audit},
        },
        teams::{do_create_team, list_teams},
    },
};

/// Runtime settings, read from an optional TOML file and then overridden by
/// the environment (`DATABASE_URL`, `TALLY_BIND`, `TALLY_LOG`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TallyConfig {
    pub database_url: String,
    pub bind: String,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            bind: "127.0.0.1:8000".to_string(),
            log: "info,tally=debug".to_string(),
            max_connections: 10,
            busy_timeout_ms: 5_000,
        }
    }
}

impl TallyConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            TabError::invalid(format!("invalid configuration file: {e}"))
        })
    }

    /// Reads `path` if given (a missing file is an error), then applies the
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    TabError::invalid(format!(
                        "could not read configuration file `{}`: {e}",
                        path.display()
                    ))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(bind) = var("TALLY_BIND") {
            self.bind = bind;
        }
        if let Some(log) = var("TALLY_LOG") {
            self.log = log;
        }
        self
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            enable_wal: true,
        }
    }

    /// Opens the pool and brings the schema up to date.
    pub fn open_database(&self) -> Result<DbPool> {
        tracing::info!(location = %self.database_url, "opening database");
        let pool = make_pool(
            &self.database_url,
            self.max_connections,
            self.connection_options(),
        )?;
        run_migrations(&mut *pool.get()?)?;
        Ok(pool)
    }
}

pub fn create_app(pool: DbPool) -> Router {
    Router::new()
        .route("/api/tournaments", post(tournaments::do_create_tournament))
        .route("/api/tournaments/:tid", get(tournaments::view_tournament))
        .route(
            "/api/tournaments/:tid/teams",
            post(do_create_team).get(list_teams),
        )
        .route("/api/tournaments/:tid/teams/import", post(do_import_teams))
        .route(
            "/api/tournaments/:tid/rounds",
            post(do_create_round).get(list_rounds),
        )
        .route(
            "/api/tournaments/:tid/adjudicators",
            post(do_create_adjudicator).get(list_adjudicators),
        )
        .route(
            "/api/tournaments/:tid/adjudicators/import",
            post(do_import_adjudicators),
        )
        .route(
            "/api/tournaments/:tid/rooms",
            post(do_create_room).get(list_rooms),
        )
        .route("/api/tournaments/:tid/rooms/import", post(do_import_rooms))
        .route("/api/rounds/:rid/publish-draw", post(do_publish_draw))
        .route("/api/rounds/:rid/publish-motion", post(do_publish_motion))
        .route("/api/rounds/:rid/matches", post(do_create_match))
        .route("/api/matches", get(list_matches))
        .route("/api/matches/:mid/ballots", post(do_submit_ballot))
        .route("/api/ballots", get(list_ballots))
        .route("/api/tournaments/:tid/standings/teams", get(team_tab))
        .route("/api/tournaments/:tid/standings/speakers", get(speaker_tab))
        .route(
            "/api/tournaments/:tid/standings/institutions",
            get(institution_tab),
        )
        .route("/api/tournaments/:tid/recalculate", post(do_recalculate))
        .route("/api/tournaments/:tid/audit", get(view_audit))
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}
