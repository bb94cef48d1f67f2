use std::collections::HashSet;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;

use crate::{
    error::Result,
    schema::{speaker_stats, speakers, teams},
    score::Score,
    tournaments::{
        Tournament,
        rounds::matches::Match,
        speakers::Speaker,
        standings::{SpeakerStanding, TeamScope, TeamStanding},
        stats::{self, TeamTotals},
        teams::Team,
    },
};

/// Orders teams by victory points, then total speaker score. Name and id only
/// make the order deterministic; they are not ranking criteria, and teams
/// that are level on both still receive different ranks.
pub fn rank_teams(
    rows: impl IntoIterator<Item = (Team, TeamTotals)>,
) -> Vec<TeamStanding> {
    rows.into_iter()
        .sorted_by(|(a, a_totals), (b, b_totals)| {
            b_totals
                .total_vp
                .cmp(&a_totals.total_vp)
                .then(
                    b_totals
                        .total_speaker_score
                        .cmp(&a_totals.total_speaker_score),
                )
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        })
        .enumerate()
        .map(|(i, (team, totals))| TeamStanding {
            rank: i + 1,
            team_id: team.id,
            name: team.name,
            institution: team.institution,
            total_vp: totals.total_vp,
            total_speaker_score: totals.total_speaker_score,
            wins: totals.wins,
            losses: totals.losses,
        })
        .collect()
}

pub fn rank_speakers(
    rows: impl IntoIterator<Item = (Speaker, Team, Score)>,
) -> Vec<SpeakerStanding> {
    rows.into_iter()
        .sorted_by(|(a, _, a_total), (b, _, b_total)| {
            b_total
                .cmp(a_total)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        })
        .enumerate()
        .map(|(i, (speaker, team, total_score))| SpeakerStanding {
            rank: i + 1,
            speaker_id: speaker.id,
            name: speaker.name,
            team_id: team.id,
            team_name: team.name,
            institution: team.institution,
            total_score,
        })
        .collect()
}

/// Teams within `scope`, in tournament order.
pub fn teams_in_scope(
    tid: &str,
    scope: TeamScope,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<Team>> {
    let mut teams = Team::of_tournament(tid, conn)?;

    if scope == TeamScope::Participating {
        let paired = Match::paired_team_ids(tid, conn)?
            .into_iter()
            .collect::<HashSet<_>>();
        if !paired.is_empty() {
            teams.retain(|team| paired.contains(&team.id));
        }
    }

    Ok(teams)
}

#[tracing::instrument(skip(conn))]
pub fn team_standings(
    tid: &str,
    scope: TeamScope,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<TeamStanding>> {
    Tournament::fetch(tid, conn)?;

    let totals = stats::team_totals_of_tournament(tid, conn)?;
    let teams = teams_in_scope(tid, scope, conn)?;

    Ok(rank_teams(teams.into_iter().map(|team| {
        let team_totals = totals.get(&team.id).copied().unwrap_or_default();
        (team, team_totals)
    })))
}

#[tracing::instrument(skip(conn))]
pub fn speaker_standings(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<SpeakerStanding>> {
    Tournament::fetch(tid, conn)?;

    let rows = speakers::table
        .inner_join(teams::table)
        .left_join(speaker_stats::table)
        .filter(teams::tournament_id.eq(tid))
        .select((
            Speaker::as_select(),
            Team::as_select(),
            speaker_stats::total_score.nullable(),
        ))
        .load::<(Speaker, Team, Option<Score>)>(conn)?;

    Ok(rank_speakers(rows.into_iter().map(|(speaker, team, total)| {
        (speaker, team, total.unwrap_or_default())
    })))
}
