//! The aggregate store: running totals for teams and speakers.
//!
//! Totals are kept in their own rows (`team_stats`, `speaker_stats`), apart
//! from the identity records in `teams` and `speakers`. Every write bumps the
//! row's `version`.

use std::{collections::HashMap, ops::Neg};

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TabError},
    schema::{speaker_stats, speakers, team_stats, teams},
    score::Score,
};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = team_stats)]
#[diesel(check_for_backend(Sqlite))]
pub struct TeamStats {
    pub team_id: String,
    pub total_vp: i64,
    pub total_speaker_score: Score,
    pub wins: i64,
    pub losses: i64,
    pub version: i64,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = speaker_stats)]
#[diesel(check_for_backend(Sqlite))]
pub struct SpeakerStats {
    pub speaker_id: String,
    pub total_score: Score,
    pub version: i64,
}

/// Team aggregates. Used both for stored totals and for the change a single
/// match makes to them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTotals {
    pub total_vp: i64,
    pub total_speaker_score: Score,
    pub wins: i64,
    pub losses: i64,
}

impl TeamTotals {
    /// Field-wise sum. Fails instead of wrapping when a count or the score
    /// total leaves its range.
    pub fn checked_add(self, rhs: TeamTotals) -> Result<TeamTotals> {
        let count = |a: i64, b: i64| {
            a.checked_add(b)
                .ok_or_else(|| TabError::invalid("team count out of range"))
        };
        Ok(TeamTotals {
            total_vp: count(self.total_vp, rhs.total_vp)?,
            total_speaker_score: self
                .total_speaker_score
                .checked_add(rhs.total_speaker_score)?,
            wins: count(self.wins, rhs.wins)?,
            losses: count(self.losses, rhs.losses)?,
        })
    }
}

impl Neg for TeamTotals {
    type Output = TeamTotals;

    fn neg(self) -> TeamTotals {
        TeamTotals {
            total_vp: -self.total_vp,
            total_speaker_score: -self.total_speaker_score,
            wins: -self.wins,
            losses: -self.losses,
        }
    }
}

impl From<&TeamStats> for TeamTotals {
    fn from(stats: &TeamStats) -> Self {
        TeamTotals {
            total_vp: stats.total_vp,
            total_speaker_score: stats.total_speaker_score,
            wins: stats.wins,
            losses: stats.losses,
        }
    }
}

pub fn team_totals(
    team_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<TeamTotals> {
    let stats = team_stats::table
        .filter(team_stats::team_id.eq(team_id))
        .select(TeamStats::as_select())
        .first(conn)
        .optional()?;
    Ok(stats.as_ref().map(TeamTotals::from).unwrap_or_default())
}

pub fn speaker_total(
    speaker_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Score> {
    let total = speaker_stats::table
        .filter(speaker_stats::speaker_id.eq(speaker_id))
        .select(speaker_stats::total_score)
        .first::<Score>(conn)
        .optional()?;
    Ok(total.unwrap_or_default())
}

/// Overwrites (or creates) the statistics row of a team.
pub fn store_team_totals(
    team_id: &str,
    totals: TeamTotals,
    conn: &mut SqliteConnection,
) -> Result<()> {
    diesel::insert_into(team_stats::table)
        .values((
            team_stats::team_id.eq(team_id),
            team_stats::total_vp.eq(totals.total_vp),
            team_stats::total_speaker_score.eq(totals.total_speaker_score),
            team_stats::wins.eq(totals.wins),
            team_stats::losses.eq(totals.losses),
            team_stats::version.eq(0),
        ))
        .on_conflict(team_stats::team_id)
        .do_update()
        .set((
            team_stats::total_vp.eq(totals.total_vp),
            team_stats::total_speaker_score.eq(totals.total_speaker_score),
            team_stats::wins.eq(totals.wins),
            team_stats::losses.eq(totals.losses),
            team_stats::version.eq(team_stats::version + 1),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn store_speaker_total(
    speaker_id: &str,
    total: Score,
    conn: &mut SqliteConnection,
) -> Result<()> {
    diesel::insert_into(speaker_stats::table)
        .values((
            speaker_stats::speaker_id.eq(speaker_id),
            speaker_stats::total_score.eq(total),
            speaker_stats::version.eq(0),
        ))
        .on_conflict(speaker_stats::speaker_id)
        .do_update()
        .set((
            speaker_stats::total_score.eq(total),
            speaker_stats::version.eq(speaker_stats::version + 1),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn add_to_team(
    team_id: &str,
    delta: TeamTotals,
    conn: &mut SqliteConnection,
) -> Result<()> {
    let current = team_totals(team_id, conn)?;
    store_team_totals(team_id, current.checked_add(delta)?, conn)
}

pub fn add_to_speaker(
    speaker_id: &str,
    delta: Score,
    conn: &mut SqliteConnection,
) -> Result<()> {
    let current = speaker_total(speaker_id, conn)?;
    store_speaker_total(speaker_id, current.checked_add(delta)?, conn)
}

/// Stored totals of every team registered in the tournament. Teams without a
/// statistics row read as zero.
pub fn team_totals_of_tournament(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<HashMap<String, TeamTotals>> {
    let rows = teams::table
        .left_join(team_stats::table)
        .filter(teams::tournament_id.eq(tid))
        .select((teams::id, Option::<TeamStats>::as_select()))
        .load::<(String, Option<TeamStats>)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, stats)| {
            (id, stats.as_ref().map(TeamTotals::from).unwrap_or_default())
        })
        .collect())
}

/// Stored totals of every speaker on a team of the tournament.
pub fn speaker_totals_of_tournament(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<HashMap<String, Score>> {
    let rows = speakers::table
        .inner_join(teams::table)
        .left_join(speaker_stats::table)
        .filter(teams::tournament_id.eq(tid))
        .select((speakers::id, speaker_stats::total_score.nullable()))
        .load::<(String, Option<Score>)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, total)| (id, total.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_totals_cancel() {
        let delta = TeamTotals {
            total_vp: 1,
            total_speaker_score: "165.5".parse().unwrap(),
            wins: 1,
            losses: 0,
        };
        assert_eq!(delta.checked_add(-delta).unwrap(), TeamTotals::default());
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let full = TeamTotals {
            wins: i64::MAX,
            ..TeamTotals::default()
        };
        let win = TeamTotals {
            wins: 1,
            ..TeamTotals::default()
        };
        assert!(matches!(
            full.checked_add(win),
            Err(TabError::InvalidInput(_))
        ));
    }
}
