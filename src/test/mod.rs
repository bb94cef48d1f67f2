//! Shared fixtures for the database-backed tests.

use std::collections::{BTreeMap, HashMap};

use diesel::{connection::SimpleConnection, prelude::*};

use crate::{
    schema::{ballots, speakers},
    score::Score,
    state::run_migrations,
    tournaments::{
        CreateTournamentForm, Tournament,
        rounds::{
            CreateRoundForm, Round,
            ballots::submit::{BallotSubmission, ScoreEntry},
            matches::{CreateMatchForm, Match},
        },
        speakers::Speaker,
        stats::{self, TeamTotals},
        teams::{CreateTeamForm, Team},
    },
};

mod reconcile;

pub fn conn() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
    run_migrations(&mut conn).unwrap();
    conn
}

pub fn tournament(slug: &str, conn: &mut SqliteConnection) -> Tournament {
    Tournament::create(
        &CreateTournamentForm {
            name: format!("Tournament {slug}"),
            slug: slug.to_string(),
            format: None,
        },
        conn,
    )
    .unwrap()
}

pub fn team(
    tid: &str,
    name: &str,
    institution: Option<&str>,
    speaker_names: &[&str],
    conn: &mut SqliteConnection,
) -> (Team, Vec<Speaker>) {
    Team::create(
        tid,
        &CreateTeamForm {
            name: name.to_string(),
            institution: institution.map(str::to_string),
            speakers: speaker_names.iter().map(|s| s.to_string()).collect(),
        },
        conn,
    )
    .unwrap()
}

pub fn round(tid: &str, name: &str, conn: &mut SqliteConnection) -> Round {
    Round::create(
        tid,
        &CreateRoundForm {
            name: name.to_string(),
            ..Default::default()
        },
        conn,
    )
    .unwrap()
}

pub fn pairing(
    round_id: &str,
    gov: Option<&Team>,
    opp: Option<&Team>,
    conn: &mut SqliteConnection,
) -> Match {
    Match::create(
        round_id,
        &CreateMatchForm {
            gov_team_id: gov.map(|t| t.id.clone()),
            opp_team_id: opp.map(|t| t.id.clone()),
            ..Default::default()
        },
        conn,
    )
    .unwrap()
}

pub fn entry(name: &str, role: &str, score: &str) -> ScoreEntry {
    ScoreEntry {
        speaker_id: None,
        speaker_name: name.to_string(),
        score: score.parse().unwrap(),
        position: String::new(),
        is_reply: false,
        team_role: role.to_string(),
    }
}

pub fn ballot(scores: Vec<ScoreEntry>, winner: Option<&str>) -> BallotSubmission {
    BallotSubmission {
        adjudicator_id: None,
        scores,
        winner: winner.map(str::to_string),
    }
}

/// The standard four-speaker ballot: gov `{85, 80}`, opp `{78, 82}`.
pub fn scenario_ballot() -> BallotSubmission {
    ballot(
        vec![
            entry("Ana", "gov", "85"),
            entry("Ben", "gov", "80"),
            entry("Cat", "opp", "78"),
            entry("Dan", "opp", "82"),
        ],
        None,
    )
}

/// A tournament with two teams (speakers registered up front) and a single
/// match between them.
pub struct Debate {
    pub tournament: Tournament,
    pub gov: Team,
    pub opp: Team,
    pub round: Round,
    pub debate: Match,
}

pub fn debate(conn: &mut SqliteConnection) -> Debate {
    let tournament = tournament("open", conn);
    let (gov, _) = team(
        &tournament.id,
        "Alpha A",
        Some("Alpha University"),
        &["Ana", "Ben"],
        conn,
    );
    let (opp, _) = team(
        &tournament.id,
        "Beta A",
        Some("Beta College"),
        &["Cat", "Dan"],
        conn,
    );
    let round = round(&tournament.id, "Round 1", conn);
    let debate = pairing(&round.id, Some(&gov), Some(&opp), conn);

    Debate {
        tournament,
        gov,
        opp,
        round,
        debate,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub teams: HashMap<String, TeamTotals>,
    pub speakers: HashMap<String, Score>,
}

pub fn snapshot(tid: &str, conn: &mut SqliteConnection) -> Snapshot {
    Snapshot {
        teams: stats::team_totals_of_tournament(tid, conn).unwrap(),
        speakers: stats::speaker_totals_of_tournament(tid, conn).unwrap(),
    }
}

/// Totals keyed by team name and by `(team name, speaker name)`, so that
/// two databases can be compared.
pub fn named_snapshot(
    tid: &str,
    conn: &mut SqliteConnection,
) -> (BTreeMap<String, TeamTotals>, BTreeMap<(String, String), Score>) {
    let mut teams = BTreeMap::new();
    let mut speakers = BTreeMap::new();
    let speaker_totals = stats::speaker_totals_of_tournament(tid, conn).unwrap();

    for overview in Team::overviews_of_tournament(tid, conn).unwrap() {
        for speaker in &overview.speakers {
            speakers.insert(
                (overview.team.name.clone(), speaker.name.clone()),
                speaker_totals[&speaker.id],
            );
        }
        teams.insert(overview.team.name.clone(), overview.totals);
    }

    (teams, speakers)
}

pub fn ballot_count(match_id: &str, conn: &mut SqliteConnection) -> i64 {
    ballots::table
        .filter(ballots::match_id.eq(match_id))
        .count()
        .get_result(conn)
        .unwrap()
}

pub fn speaker_count(team_id: &str, conn: &mut SqliteConnection) -> i64 {
    speakers::table
        .filter(speakers::team_id.eq(team_id))
        .count()
        .get_result(conn)
        .unwrap()
}

pub fn totals(vp: i64, score: &str, wins: i64, losses: i64) -> TeamTotals {
    TeamTotals {
        total_vp: vp,
        total_speaker_score: score.parse().unwrap(),
        wins,
        losses,
    }
}
