//! Ranked, read-only views of the aggregate store.

use serde::{Deserialize, Serialize};

use crate::score::Score;

pub mod compute;
pub mod institutions;
pub mod public;
pub mod recalculate;

/// Which teams appear in the team standings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamScope {
    /// Every team registered in the tournament.
    #[default]
    All,
    /// Only teams placed in at least one match. Falls back to every team
    /// while nothing has been paired yet.
    Participating,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamStanding {
    /// Position in the standings, starting at 1. Tied teams still receive
    /// distinct, consecutive ranks.
    pub rank: usize,
    pub team_id: String,
    pub name: String,
    pub institution: Option<String>,
    pub total_vp: i64,
    pub total_speaker_score: Score,
    pub wins: i64,
    pub losses: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SpeakerStanding {
    pub rank: usize,
    pub speaker_id: String,
    pub name: String,
    pub team_id: String,
    pub team_name: String,
    pub institution: Option<String>,
    pub total_score: Score,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InstitutionStanding {
    pub rank: usize,
    pub institution: String,
    pub team_count: usize,
    pub total_vp: i64,
    pub average_vp: f64,
}
