use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::{
    state::{DbPool, with_conn},
    tournaments::standings::{
        InstitutionStanding, SpeakerStanding, TeamScope, TeamStanding,
        compute::{speaker_standings, team_standings},
        institutions::institution_standings,
    },
    util_resp::{StandardResponse, success},
};

#[derive(Deserialize, Debug, Default)]
pub struct TeamStandingsQuery {
    /// Restrict the standings to teams that have been paired at least once.
    #[serde(default)]
    pub participating: bool,
}

pub async fn team_tab(
    Path(tid): Path<String>,
    Query(query): Query<TeamStandingsQuery>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<TeamStanding>> {
    let scope = if query.participating {
        TeamScope::Participating
    } else {
        TeamScope::All
    };
    let standings =
        with_conn(&pool, move |conn| team_standings(&tid, scope, conn))
            .await?;
    success(standings)
}

pub async fn speaker_tab(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<SpeakerStanding>> {
    let standings =
        with_conn(&pool, move |conn| speaker_standings(&tid, conn)).await?;
    success(standings)
}

pub async fn institution_tab(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<InstitutionStanding>> {
    let standings =
        with_conn(&pool, move |conn| institution_standings(&tid, conn))
            .await?;
    success(standings)
}
