use std::collections::HashMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::{speakers, teams},
    score::Score,
    tournaments::stats,
    validation::require_non_blank,
};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug, Hash)]
#[diesel(table_name = speakers)]
#[diesel(check_for_backend(Sqlite))]
pub struct Speaker {
    pub id: String,
    pub team_id: String,
    pub name: String,
}

impl Speaker {
    pub fn fetch(
        speaker_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Speaker> {
        speakers::table
            .filter(speakers::id.eq(speaker_id))
            .select(Speaker::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("speaker", speaker_id))
    }

    /// Exact (case-sensitive) name match within one team.
    pub fn find_by_name(
        team_id: &str,
        name: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<Speaker>> {
        Ok(speakers::table
            .filter(speakers::team_id.eq(team_id))
            .filter(speakers::name.eq(name))
            .order_by(speakers::id.asc())
            .select(Speaker::as_select())
            .first(conn)
            .optional()?)
    }

    /// Registers a speaker with a zeroed statistics record. Must be called
    /// inside the caller's transaction.
    pub fn create(
        team_id: &str,
        name: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Speaker> {
        let name = require_non_blank("speaker name", name)?;
        let speaker = Speaker {
            id: Uuid::now_v7().to_string(),
            team_id: team_id.to_string(),
            name: name.to_string(),
        };

        diesel::insert_into(speakers::table)
            .values((
                speakers::id.eq(&speaker.id),
                speakers::team_id.eq(&speaker.team_id),
                speakers::name.eq(&speaker.name),
            ))
            .execute(conn)?;
        stats::store_speaker_total(&speaker.id, Score::ZERO, conn)?;

        Ok(speaker)
    }

    /// All speakers of the tournament, grouped by team id.
    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<HashMap<String, Vec<Speaker>>> {
        let all = speakers::table
            .inner_join(teams::table)
            .filter(teams::tournament_id.eq(tid))
            .order_by((speakers::name.asc(), speakers::id.asc()))
            .select(Speaker::as_select())
            .load::<Speaker>(conn)?;

        let mut grouped: HashMap<String, Vec<Speaker>> = HashMap::new();
        for speaker in all {
            grouped
                .entry(speaker.team_id.clone())
                .or_default()
                .push(speaker);
        }
        Ok(grouped)
    }
}
