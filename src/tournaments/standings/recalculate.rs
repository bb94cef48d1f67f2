//! Rebuilds the aggregate store from the ballot ledger.

use std::collections::HashMap;

use axum::extract::{Path, State};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    score::Score,
    state::{DbPool, with_conn},
    tournaments::{
        Tournament,
        rounds::{ballots::aggregate::MatchContribution, matches::Match},
        stats::{self, TeamTotals},
    },
    util_resp::{StandardResponse, success},
};

/// Totals derived purely from completed matches and their ballots.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerTotals {
    pub teams: HashMap<String, TeamTotals>,
    pub speakers: HashMap<String, Score>,
    pub matches_processed: usize,
}

/// Folds the contribution of every completed match of the tournament,
/// starting from zero for every team and speaker registered in it. The
/// stored winner of each match is trusted; it is not resolved again.
pub fn fold_ledger(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<LedgerTotals> {
    let mut totals = LedgerTotals {
        teams: stats::team_totals_of_tournament(tid, conn)?
            .into_keys()
            .map(|id| (id, TeamTotals::default()))
            .collect(),
        speakers: stats::speaker_totals_of_tournament(tid, conn)?
            .into_keys()
            .map(|id| (id, Score::ZERO))
            .collect(),
        matches_processed: 0,
    };

    for debate in Match::completed_of_tournament(tid, conn)? {
        MatchContribution::of_completed_match(&debate, conn)?
            .fold_into(&mut totals.teams, &mut totals.speakers)?;
        totals.matches_processed += 1;
    }

    Ok(totals)
}

/// Replaces every team and speaker total of the tournament with the ledger
/// fold, in one transaction. Returns the number of matches processed.
#[tracing::instrument(skip(conn))]
pub fn recalculate(tid: &str, conn: &mut SqliteConnection) -> Result<usize> {
    conn.immediate_transaction(|conn| {
        Tournament::fetch(tid, conn)?;
        let ledger = fold_ledger(tid, conn)?;

        for (team_id, totals) in &ledger.teams {
            stats::store_team_totals(team_id, *totals, conn)?;
        }
        for (speaker_id, total) in &ledger.speakers {
            stats::store_speaker_total(speaker_id, *total, conn)?;
        }

        tracing::info!(
            matches = ledger.matches_processed,
            teams = ledger.teams.len(),
            speakers = ledger.speakers.len(),
            "recalculated standings"
        );

        Ok(ledger.matches_processed)
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TeamDrift {
    pub team_id: String,
    pub stored: TeamTotals,
    pub expected: TeamTotals,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpeakerDrift {
    pub speaker_id: String,
    pub stored: Score,
    pub expected: Score,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub matches_checked: usize,
    pub teams: Vec<TeamDrift>,
    pub speakers: Vec<SpeakerDrift>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.teams.is_empty() && self.speakers.is_empty()
    }
}

/// Compares the stored totals with the ledger fold without writing anything.
#[tracing::instrument(skip(conn))]
pub fn audit(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<DriftReport> {
    Tournament::fetch(tid, conn)?;

    let stored_teams = stats::team_totals_of_tournament(tid, conn)?;
    let stored_speakers = stats::speaker_totals_of_tournament(tid, conn)?;
    let ledger = fold_ledger(tid, conn)?;

    let teams = ledger
        .teams
        .into_iter()
        .filter_map(|(team_id, expected)| {
            let stored = stored_teams.get(&team_id).copied().unwrap_or_default();
            (stored != expected).then_some(TeamDrift {
                team_id,
                stored,
                expected,
            })
        })
        .sorted_by(|a, b| a.team_id.cmp(&b.team_id))
        .collect::<Vec<_>>();

    let speakers = ledger
        .speakers
        .into_iter()
        .filter_map(|(speaker_id, expected)| {
            let stored =
                stored_speakers.get(&speaker_id).copied().unwrap_or_default();
            (stored != expected).then_some(SpeakerDrift {
                speaker_id,
                stored,
                expected,
            })
        })
        .sorted_by(|a, b| a.speaker_id.cmp(&b.speaker_id))
        .collect::<Vec<_>>();

    if !teams.is_empty() || !speakers.is_empty() {
        tracing::warn!(
            teams = teams.len(),
            speakers = speakers.len(),
            "stored totals drifted from the ballot ledger"
        );
    }

    Ok(DriftReport {
        matches_checked: ledger.matches_processed,
        teams,
        speakers,
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Recalculated {
    pub matches_processed: usize,
}

pub async fn do_recalculate(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Recalculated> {
    let matches_processed =
        with_conn(&pool, move |conn| recalculate(&tid, conn)).await?;
    success(Recalculated { matches_processed })
}

pub async fn view_audit(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<DriftReport> {
    let report = with_conn(&pool, move |conn| audit(&tid, conn)).await?;
    success(report)
}
