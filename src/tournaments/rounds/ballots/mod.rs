//! The ballot ledger.
//!
//! A ballot row is one speaker's score in one match. Rows are never updated:
//! a corrected submission deletes every row of the match and writes a fresh
//! set.

use axum::extract::{Query, State};
use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TabError},
    schema::{ballots, matches, speakers},
    score::Score,
    state::{DbPool, with_conn},
    util_resp::{StandardResponse, success},
};

pub mod aggregate;
pub mod submit;
pub mod winner;

use winner::TeamRole;

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = ballots)]
#[diesel(check_for_backend(Sqlite))]
pub struct Ballot {
    pub id: String,
    pub match_id: String,
    pub speaker_id: String,
    pub adjudicator_id: Option<String>,
    pub team_role: TeamRole,
    pub score: Score,
    pub position: String,
    pub is_reply: bool,
    /// Order of the entry within its submission.
    pub seq: i64,
    pub submitted_at: NaiveDateTime,
}

/// A ballot together with the name of the speaker it scores.
#[derive(Serialize, Debug, Clone)]
pub struct BallotView {
    #[serde(flatten)]
    pub ballot: Ballot,
    pub speaker_name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct BallotQuery {
    pub match_id: Option<String>,
    pub round_id: Option<String>,
}

impl Ballot {
    pub fn of_match(
        match_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Ballot>> {
        Ok(ballots::table
            .filter(ballots::match_id.eq(match_id))
            .order_by(ballots::seq.asc())
            .select(Ballot::as_select())
            .load(conn)?)
    }

    pub fn views_of_match(
        match_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<BallotView>> {
        let rows = ballots::table
            .inner_join(speakers::table)
            .filter(ballots::match_id.eq(match_id))
            .order_by(ballots::seq.asc())
            .select((Ballot::as_select(), speakers::name))
            .load::<(Ballot, String)>(conn)?;
        Ok(rows.into_iter().map(into_view).collect())
    }

    pub fn views_of_round(
        round_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<BallotView>> {
        let rows = ballots::table
            .inner_join(speakers::table)
            .inner_join(matches::table)
            .filter(matches::round_id.eq(round_id))
            .order_by((ballots::match_id.asc(), ballots::seq.asc()))
            .select((Ballot::as_select(), speakers::name))
            .load::<(Ballot, String)>(conn)?;
        Ok(rows.into_iter().map(into_view).collect())
    }

    pub fn delete_of_match(
        match_id: &str,
        conn: &mut SqliteConnection,
    ) -> Result<usize> {
        Ok(diesel::delete(ballots::table.filter(ballots::match_id.eq(match_id)))
            .execute(conn)?)
    }
}

fn into_view((ballot, speaker_name): (Ballot, String)) -> BallotView {
    BallotView {
        ballot,
        speaker_name,
    }
}

pub async fn list_ballots(
    Query(query): Query<BallotQuery>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<BallotView>> {
    let found = with_conn(&pool, move |conn| match (&query.match_id, &query.round_id) {
        (Some(match_id), _) => Ballot::views_of_match(match_id, conn),
        (None, Some(round_id)) => Ballot::views_of_round(round_id, conn),
        (None, None) => Err(TabError::invalid(
            "either `match_id` or `round_id` must be given",
        )),
    })
    .await?;
    success(found)
}
