use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::{ballots, matches},
    score::Score,
    state::{DbPool, with_conn},
    tournaments::{
        participants::Adjudicator,
        rounds::{
            ballots::{
                Ballot,
                aggregate::{BallotLine, MatchContribution, totals_by_role},
                winner::{TeamRole, parse_explicit_winner, resolve_winner},
            },
            matches::Match,
        },
        speakers::Speaker,
    },
    util_resp::{StandardResponse, success},
    validation::{non_blank_opt, require_non_blank},
};

/// One speaker's score as sent by a judge.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ScoreEntry {
    /// When absent the speaker is looked up by name within the team on the
    /// entry's side, and registered if no such speaker exists.
    #[serde(default)]
    pub speaker_id: Option<String>,
    #[serde(default)]
    pub speaker_name: String,
    pub score: Score,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub is_reply: bool,
    /// `gov` or `opp`. Parsed during submission so that an unknown side is
    /// reported as invalid input along with the other validation failures.
    pub team_role: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BallotSubmission {
    #[serde(default)]
    pub adjudicator_id: Option<String>,
    pub scores: Vec<ScoreEntry>,
    /// Optional `gov` or `opp` decision overriding the score totals.
    #[serde(default)]
    pub winner: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub match_id: String,
    pub winner_id: String,
    pub winner_side: TeamRole,
    pub total_gov: Score,
    pub total_opp: Score,
    pub ballots_written: usize,
    /// Whether an earlier submission for this match was undone first.
    pub reverted: bool,
}

/// Records the ballots of a match and brings the aggregates up to date.
///
/// A match that already has a result is corrected: the contribution of the
/// previous submission is subtracted and its ballots removed before the new
/// ones are written. The whole operation runs in one immediate transaction,
/// so a concurrent submission (for any match) waits until this one has
/// committed or rolled back, and an error leaves no trace.
#[tracing::instrument(skip(submission, conn), fields(entries = submission.scores.len()))]
pub fn submit_ballot(
    match_id: &str,
    submission: &BallotSubmission,
    conn: &mut SqliteConnection,
) -> Result<SubmissionResult> {
    let explicit_winner = parse_explicit_winner(submission.winner.as_deref())?;
    if submission.scores.is_empty() {
        return Err(TabError::invalid("a ballot must contain at least one score"));
    }
    let adjudicator_id = non_blank_opt(submission.adjudicator_id.clone());

    conn.immediate_transaction(|conn| {
        let debate = Match::fetch(match_id, conn)?;
        let tid = debate.tournament_id(conn)?;

        let (Some(gov_team_id), Some(opp_team_id)) =
            (debate.gov_team_id.clone(), debate.opp_team_id.clone())
        else {
            return Err(TabError::invalid(format!(
                "match `{match_id}` does not have both teams assigned"
            )));
        };

        if let Some(adjudicator_id) = &adjudicator_id {
            Adjudicator::fetch_in_tournament(adjudicator_id, &tid, conn)?;
        }

        let reverted = debate.is_completed;
        if reverted {
            let previous = MatchContribution::of_completed_match(&debate, conn)?;
            previous.revert(conn)?;
            let removed = Ballot::delete_of_match(&debate.id, conn)?;
            tracing::debug!(removed, "reverted previous result");
        }

        let submitted_at = Utc::now().naive_utc();
        let mut lines = Vec::with_capacity(submission.scores.len());

        for (seq, entry) in submission.scores.iter().enumerate() {
            let role = entry.team_role.parse::<TeamRole>()?;
            let score = entry.score.check_speech()?;
            let team_id = match role {
                TeamRole::Gov => &gov_team_id,
                TeamRole::Opp => &opp_team_id,
            };
            let speaker = resolve_speaker(entry, team_id, conn)?;

            diesel::insert_into(ballots::table)
                .values((
                    ballots::id.eq(Uuid::now_v7().to_string()),
                    ballots::match_id.eq(&debate.id),
                    ballots::speaker_id.eq(&speaker.id),
                    ballots::adjudicator_id.eq(&adjudicator_id),
                    ballots::team_role.eq(role),
                    ballots::score.eq(score),
                    ballots::position.eq(entry.position.trim()),
                    ballots::is_reply.eq(entry.is_reply),
                    ballots::seq.eq(seq as i64),
                    ballots::submitted_at.eq(submitted_at),
                ))
                .execute(conn)?;

            lines.push(BallotLine {
                speaker_id: speaker.id,
                team_role: role,
                score,
            });
        }

        let (total_gov, total_opp) = totals_by_role(&lines)?;
        let winner_side = resolve_winner(total_gov, total_opp, explicit_winner);
        let winner_id = match winner_side {
            TeamRole::Gov => gov_team_id,
            TeamRole::Opp => opp_team_id,
        };

        diesel::update(matches::table.filter(matches::id.eq(&debate.id)))
            .set((
                matches::winner_id.eq(&winner_id),
                matches::is_completed.eq(true),
            ))
            .execute(conn)?;

        MatchContribution::compute(&debate, Some(&winner_id), &lines)?
            .apply(conn)?;

        tracing::info!(
            winner = %winner_id,
            %total_gov,
            %total_opp,
            reverted,
            "recorded ballot"
        );

        Ok(SubmissionResult {
            match_id: debate.id,
            winner_id,
            winner_side,
            total_gov,
            total_opp,
            ballots_written: lines.len(),
            reverted,
        })
    })
}

/// Finds the speaker an entry refers to, registering a new speaker on
/// `team_id` when the entry names one that does not exist yet.
fn resolve_speaker(
    entry: &ScoreEntry,
    team_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Speaker> {
    let name = require_non_blank("speaker name", &entry.speaker_name)?;

    if let Some(speaker_id) = non_blank_opt(entry.speaker_id.clone()) {
        let speaker = Speaker::fetch(&speaker_id, conn)?;
        if speaker.team_id != team_id {
            return Err(TabError::invalid(format!(
                "speaker `{speaker_id}` does not belong to the team on this side"
            )));
        }
        return Ok(speaker);
    }

    match Speaker::find_by_name(team_id, name, conn)? {
        Some(speaker) => Ok(speaker),
        None => {
            let speaker = Speaker::create(team_id, name, conn)?;
            tracing::debug!(speaker = %speaker.id, name, "registered speaker");
            Ok(speaker)
        }
    }
}

pub async fn do_submit_ballot(
    Path(match_id): Path<String>,
    State(pool): State<DbPool>,
    Json(submission): Json<BallotSubmission>,
) -> StandardResponse<SubmissionResult> {
    let result = with_conn(&pool, move |conn| {
        submit_ballot(&match_id, &submission, conn)
    })
    .await?;
    success(result)
}
