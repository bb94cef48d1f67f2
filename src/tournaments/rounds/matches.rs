use axum::{
    Json,
    extract::{Path, Query, State},
};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::{matches, rounds},
    state::{DbPool, with_conn},
    tournaments::{
        participants::{Adjudicator, Room},
        rounds::{Round, ballots::winner::TeamRole},
        teams::Team,
    },
    util_resp::{StandardResponse, success},
    validation::non_blank_opt,
};

/// One pairing of a government and an opposition team in a round.
///
/// The team slots are nullable because rounds are paired incrementally; a
/// ballot can only be submitted once both are filled.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = matches)]
#[diesel(check_for_backend(Sqlite))]
pub struct Match {
    pub id: String,
    pub round_id: String,
    pub room_id: Option<String>,
    pub adjudicator_id: Option<String>,
    pub gov_team_id: Option<String>,
    pub opp_team_id: Option<String>,
    pub winner_id: Option<String>,
    pub is_completed: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CreateMatchForm {
    #[serde(default)]
    pub gov_team_id: Option<String>,
    #[serde(default)]
    pub opp_team_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub adjudicator_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MatchQuery {
    pub round_id: Option<String>,
    pub tournament_id: Option<String>,
    pub team_id: Option<String>,
}

impl Match {
    pub fn fetch(
        match_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Match> {
        matches::table
            .filter(matches::id.eq(match_id))
            .select(Match::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("match", match_id))
    }

    /// The team occupying the given side, if the slot has been filled.
    pub fn team_of(&self, role: TeamRole) -> Option<&str> {
        match role {
            TeamRole::Gov => self.gov_team_id.as_deref(),
            TeamRole::Opp => self.opp_team_id.as_deref(),
        }
    }

    pub fn tournament_id(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<String> {
        Ok(rounds::table
            .filter(rounds::id.eq(&self.round_id))
            .select(rounds::tournament_id)
            .first::<String>(conn)?)
    }

    /// Completed matches of every round of the tournament, in round order.
    pub fn completed_of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Match>> {
        Ok(matches::table
            .inner_join(rounds::table)
            .filter(rounds::tournament_id.eq(tid))
            .filter(matches::is_completed.eq(true))
            .order_by((rounds::seq.asc(), matches::id.asc()))
            .select(Match::as_select())
            .load(conn)?)
    }

    /// Ids of every team placed in a match of the tournament, on either side.
    pub fn paired_team_ids(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<String>> {
        let slots = matches::table
            .inner_join(rounds::table)
            .filter(rounds::tournament_id.eq(tid))
            .select((matches::gov_team_id, matches::opp_team_id))
            .load::<(Option<String>, Option<String>)>(conn)?;

        let mut ids = slots
            .into_iter()
            .flat_map(|(gov, opp)| [gov, opp])
            .flatten()
            .collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub fn list(
        query: &MatchQuery,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Match>> {
        let mut q = matches::table
            .inner_join(rounds::table)
            .select(Match::as_select())
            .order_by((rounds::seq.asc(), matches::id.asc()))
            .into_boxed();

        if let Some(round_id) = &query.round_id {
            q = q.filter(matches::round_id.eq(round_id));
        }
        if let Some(tid) = &query.tournament_id {
            q = q.filter(rounds::tournament_id.eq(tid));
        }
        if let Some(team_id) = &query.team_id {
            q = q.filter(
                matches::gov_team_id
                    .eq(team_id)
                    .or(matches::opp_team_id.eq(team_id)),
            );
        }

        Ok(q.load(conn)?)
    }

    /// Creates a match. Every referenced record must belong to the round's
    /// tournament, and a team cannot meet itself.
    #[tracing::instrument(skip(conn))]
    pub fn create(
        round_id: &str,
        form: &CreateMatchForm,
        conn: &mut SqliteConnection,
    ) -> Result<Match> {
        let gov_team_id = non_blank_opt(form.gov_team_id.clone());
        let opp_team_id = non_blank_opt(form.opp_team_id.clone());
        let room_id = non_blank_opt(form.room_id.clone());
        let adjudicator_id = non_blank_opt(form.adjudicator_id.clone());

        if gov_team_id.is_some() && gov_team_id == opp_team_id {
            return Err(TabError::invalid(
                "the government and opposition teams must be different",
            ));
        }

        conn.immediate_transaction(|conn| {
            let round = Round::fetch(round_id, conn)?;

            for team_id in gov_team_id.iter().chain(opp_team_id.iter()) {
                let team = Team::fetch(team_id, conn)?;
                if team.tournament_id != round.tournament_id {
                    return Err(TabError::invalid(format!(
                        "team `{team_id}` is not registered in this tournament"
                    )));
                }
            }
            if let Some(room_id) = &room_id {
                Room::fetch_in_tournament(room_id, &round.tournament_id, conn)?;
            }
            if let Some(adjudicator_id) = &adjudicator_id {
                Adjudicator::fetch_in_tournament(
                    adjudicator_id,
                    &round.tournament_id,
                    conn,
                )?;
            }

            let created = Match {
                id: Uuid::now_v7().to_string(),
                round_id: round.id.clone(),
                room_id,
                adjudicator_id,
                gov_team_id,
                opp_team_id,
                winner_id: None,
                is_completed: false,
            };

            diesel::insert_into(matches::table)
                .values((
                    matches::id.eq(&created.id),
                    matches::round_id.eq(&created.round_id),
                    matches::room_id.eq(&created.room_id),
                    matches::adjudicator_id.eq(&created.adjudicator_id),
                    matches::gov_team_id.eq(&created.gov_team_id),
                    matches::opp_team_id.eq(&created.opp_team_id),
                    matches::winner_id.eq(&created.winner_id),
                    matches::is_completed.eq(created.is_completed),
                ))
                .execute(conn)?;

            Ok(created)
        })
    }
}

pub async fn do_create_match(
    Path(round_id): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<CreateMatchForm>,
) -> StandardResponse<Match> {
    let created =
        with_conn(&pool, move |conn| Match::create(&round_id, &form, conn))
            .await?;
    success(created)
}

pub async fn list_matches(
    Query(query): Query<MatchQuery>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<Match>> {
    let found = with_conn(&pool, move |conn| Match::list(&query, conn)).await?;
    success(found)
}
