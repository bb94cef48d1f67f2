use axum::{
    Json,
    extract::{Path, State},
};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::{team_stats, teams},
    state::{DbPool, with_conn},
    tournaments::{
        Tournament,
        speakers::Speaker,
        stats::{self, TeamStats, TeamTotals},
    },
    util_resp::{StandardResponse, success},
    validation::{non_blank_opt, require_non_blank},
};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(Sqlite))]
pub struct Team {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub institution: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CreateTeamForm {
    pub name: String,
    #[serde(default)]
    pub institution: Option<String>,
    /// Names of speakers to register straight away. Speakers can also be
    /// created later, when a ballot first names them.
    #[serde(default)]
    pub speakers: Vec<String>,
}

/// A team together with its speakers and current totals.
#[derive(Serialize, Debug, Clone)]
pub struct TeamOverview {
    #[serde(flatten)]
    pub team: Team,
    #[serde(flatten)]
    pub totals: TeamTotals,
    pub speakers: Vec<Speaker>,
}

impl Team {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        team_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Team> {
        let ret = teams::table
            .filter(teams::id.eq(team_id))
            .select(Team::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("team", team_id));

        tracing::trace!("ok? {}", ret.is_ok());

        ret
    }

    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Team>> {
        Ok(teams::table
            .filter(teams::tournament_id.eq(tid))
            .order_by((teams::name.asc(), teams::id.asc()))
            .select(Team::as_select())
            .load(conn)?)
    }

    /// Creates the team, its (zeroed) statistics record and any speakers
    /// named in the form.
    pub fn create(
        tid: &str,
        form: &CreateTeamForm,
        conn: &mut SqliteConnection,
    ) -> Result<(Team, Vec<Speaker>)> {
        conn.immediate_transaction(|conn| Team::create_in_tx(tid, form, conn))
    }

    /// As [`Team::create`], for callers that already hold a transaction.
    pub fn create_in_tx(
        tid: &str,
        form: &CreateTeamForm,
        conn: &mut SqliteConnection,
    ) -> Result<(Team, Vec<Speaker>)> {
        Tournament::fetch(tid, conn)?;
        let name = require_non_blank("team name", &form.name)?;

        let team = Team {
            id: Uuid::now_v7().to_string(),
            tournament_id: tid.to_string(),
            name: name.to_string(),
            institution: non_blank_opt(form.institution.clone()),
        };

        diesel::insert_into(teams::table)
            .values((
                teams::id.eq(&team.id),
                teams::tournament_id.eq(&team.tournament_id),
                teams::name.eq(&team.name),
                teams::institution.eq(&team.institution),
            ))
            .execute(conn)?;
        stats::store_team_totals(&team.id, TeamTotals::default(), conn)?;

        let speakers = form
            .speakers
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| Speaker::create(&team.id, name, conn))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            team = %team.id,
            speakers = speakers.len(),
            "created team"
        );

        Ok((team, speakers))
    }

    pub fn overviews_of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<TeamOverview>> {
        let rows = teams::table
            .left_join(team_stats::table)
            .filter(teams::tournament_id.eq(tid))
            .order_by((teams::name.asc(), teams::id.asc()))
            .select((Team::as_select(), Option::<TeamStats>::as_select()))
            .load::<(Team, Option<TeamStats>)>(conn)?;

        let mut speakers_of_team = Speaker::of_tournament(tid, conn)?;

        Ok(rows
            .into_iter()
            .map(|(team, stats)| TeamOverview {
                speakers: speakers_of_team.remove(&team.id).unwrap_or_default(),
                totals: stats.as_ref().map(TeamTotals::from).unwrap_or_default(),
                team,
            })
            .collect())
    }
}

#[derive(Serialize, Debug)]
pub struct CreatedTeam {
    #[serde(flatten)]
    pub team: Team,
    pub speakers: Vec<Speaker>,
}

pub async fn do_create_team(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<CreateTeamForm>,
) -> StandardResponse<CreatedTeam> {
    let (team, speakers) =
        with_conn(&pool, move |conn| Team::create(&tid, &form, conn)).await?;
    success(CreatedTeam { team, speakers })
}

pub async fn list_teams(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<TeamOverview>> {
    let teams = with_conn(&pool, move |conn| {
        Tournament::fetch(&tid, conn)?;
        Team::overviews_of_tournament(&tid, conn)
    })
    .await?;
    success(teams)
}
