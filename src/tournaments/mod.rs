use std::{fmt, str::FromStr};

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::tournaments,
    state::{DbPool, with_conn},
    util_resp::{StandardResponse, success},
    validation::{is_valid_slug, require_non_blank},
};

pub mod import;
pub mod participants;
pub mod rounds;
pub mod speakers;
pub mod standings;
pub mod stats;
pub mod teams;

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = tournaments)]
#[diesel(check_for_backend(Sqlite))]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub format: String,
    pub created_at: NaiveDateTime,
}

/// Debate formats the engine knows how to tabulate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Two teams (government and opposition), one victory point per win.
    Asian,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Asian => "asian",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = TabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asian" | "ap" => Ok(Format::Asian),
            other => Err(TabError::invalid(format!(
                "unsupported tournament format `{other}` (only `asian` is implemented)"
            ))),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CreateTournamentForm {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub format: Option<String>,
}

impl Tournament {
    pub fn fetch(
        tournament_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Tournament> {
        tournaments::table
            .filter(tournaments::id.eq(tournament_id))
            .select(Tournament::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("tournament", tournament_id))
    }

    #[tracing::instrument(skip(conn))]
    pub fn create(
        form: &CreateTournamentForm,
        conn: &mut SqliteConnection,
    ) -> Result<Tournament> {
        let name = require_non_blank("tournament name", &form.name)?;
        let slug = form.slug.trim();
        is_valid_slug(slug)?;
        let format = match &form.format {
            Some(f) if !f.trim().is_empty() => f.parse::<Format>()?,
            _ => Format::Asian,
        };

        conn.immediate_transaction(|conn| {
            let taken = tournaments::table
                .filter(tournaments::slug.eq(slug))
                .count()
                .get_result::<i64>(conn)?
                > 0;
            if taken {
                return Err(TabError::Conflict(format!(
                    "a tournament with slug `{slug}` already exists"
                )));
            }

            let tournament = Tournament {
                id: Uuid::now_v7().to_string(),
                name: name.to_string(),
                slug: slug.to_string(),
                format: format.as_str().to_string(),
                created_at: Utc::now().naive_utc(),
            };

            diesel::insert_into(tournaments::table)
                .values((
                    tournaments::id.eq(&tournament.id),
                    tournaments::name.eq(&tournament.name),
                    tournaments::slug.eq(&tournament.slug),
                    tournaments::format.eq(&tournament.format),
                    tournaments::created_at.eq(tournament.created_at),
                ))
                .execute(conn)?;

            tracing::info!(id = %tournament.id, "created tournament");
            Ok(tournament)
        })
    }
}

pub async fn do_create_tournament(
    State(pool): State<DbPool>,
    Json(form): Json<CreateTournamentForm>,
) -> StandardResponse<Tournament> {
    let tournament =
        with_conn(&pool, move |conn| Tournament::create(&form, conn)).await?;
    success(tournament)
}

pub async fn view_tournament(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Tournament> {
    let tournament =
        with_conn(&pool, move |conn| Tournament::fetch(&tid, conn)).await?;
    success(tournament)
}
