use std::{collections::HashMap, ops::Neg};

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use indexmap::IndexMap;

use crate::{
    error::Result,
    score::Score,
    tournaments::{
        rounds::{
            ballots::{Ballot, winner::TeamRole},
            matches::Match,
        },
        stats::{self, TeamTotals},
    },
};

/// The part of a ballot that feeds the aggregates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BallotLine {
    pub speaker_id: String,
    pub team_role: TeamRole,
    pub score: Score,
}

impl From<&Ballot> for BallotLine {
    fn from(ballot: &Ballot) -> Self {
        BallotLine {
            speaker_id: ballot.speaker_id.clone(),
            team_role: ballot.team_role,
            score: ballot.score,
        }
    }
}

/// Sum of the scores on each side: `(gov, opp)`.
pub fn totals_by_role(lines: &[BallotLine]) -> Result<(Score, Score)> {
    let side = |role: TeamRole| {
        Score::try_sum(
            lines
                .iter()
                .filter(|line| line.team_role == role)
                .map(|line| line.score),
        )
    };
    Ok((side(TeamRole::Gov)?, side(TeamRole::Opp)?))
}

/// Everything one completed match adds to the aggregate store.
///
/// Submitting a ballot applies it; correcting a ballot first applies its
/// negation (built from the stored winner and the old ballots); reconciling
/// folds it over every completed match. All three paths therefore agree by
/// construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchContribution {
    pub teams: IndexMap<String, TeamTotals>,
    pub speakers: IndexMap<String, Score>,
}

impl MatchContribution {
    /// `winner_id` is the stored winner. A filled side whose team is not the
    /// winner is credited with a loss; an empty side contributes nothing.
    pub fn compute(
        debate: &Match,
        winner_id: Option<&str>,
        lines: &[BallotLine],
    ) -> Result<Self> {
        let (total_gov, total_opp) = totals_by_role(lines)?;

        let mut teams = IndexMap::new();
        for (role, total) in
            [(TeamRole::Gov, total_gov), (TeamRole::Opp, total_opp)]
        {
            let Some(team_id) = debate.team_of(role) else {
                continue;
            };
            let won = winner_id == Some(team_id);
            let delta = TeamTotals {
                total_vp: i64::from(won),
                total_speaker_score: total,
                wins: i64::from(won),
                losses: i64::from(!won),
            };
            let slot: &mut TeamTotals =
                teams.entry(team_id.to_string()).or_default();
            *slot = slot.checked_add(delta)?;
        }

        let mut speakers: IndexMap<String, Score> = IndexMap::new();
        for line in lines {
            let slot = speakers.entry(line.speaker_id.clone()).or_default();
            *slot = slot.checked_add(line.score)?;
        }

        Ok(MatchContribution { teams, speakers })
    }

    /// The contribution a completed match currently has, according to its
    /// stored winner and its ballots in the ledger.
    pub fn of_completed_match(
        debate: &Match,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Self> {
        let lines = Ballot::of_match(&debate.id, conn)?
            .iter()
            .map(BallotLine::from)
            .collect::<Vec<_>>();
        Self::compute(debate, debate.winner_id.as_deref(), &lines)
    }

    pub fn apply(&self, conn: &mut SqliteConnection) -> Result<()> {
        for (team_id, delta) in &self.teams {
            stats::add_to_team(team_id, *delta, conn)?;
        }
        for (speaker_id, delta) in &self.speakers {
            stats::add_to_speaker(speaker_id, *delta, conn)?;
        }
        Ok(())
    }

    pub fn revert(&self, conn: &mut SqliteConnection) -> Result<()> {
        self.clone().neg().apply(conn)
    }

    pub fn fold_into(
        &self,
        teams: &mut HashMap<String, TeamTotals>,
        speakers: &mut HashMap<String, Score>,
    ) -> Result<()> {
        for (team_id, delta) in &self.teams {
            let slot = teams.entry(team_id.clone()).or_default();
            *slot = slot.checked_add(*delta)?;
        }
        for (speaker_id, delta) in &self.speakers {
            let slot = speakers.entry(speaker_id.clone()).or_default();
            *slot = slot.checked_add(*delta)?;
        }
        Ok(())
    }
}

impl Neg for MatchContribution {
    type Output = MatchContribution;

    fn neg(self) -> MatchContribution {
        MatchContribution {
            teams: self.teams.into_iter().map(|(k, v)| (k, -v)).collect(),
            speakers: self.speakers.into_iter().map(|(k, v)| (k, -v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debate() -> Match {
        Match {
            id: "m".into(),
            round_id: "r".into(),
            room_id: None,
            adjudicator_id: None,
            gov_team_id: Some("gov-team".into()),
            opp_team_id: Some("opp-team".into()),
            winner_id: None,
            is_completed: false,
        }
    }

    fn line(speaker: &str, role: TeamRole, score: i64) -> BallotLine {
        BallotLine {
            speaker_id: speaker.into(),
            team_role: role,
            score: Score::from(score),
        }
    }

    #[test]
    fn winner_and_loser_deltas() {
        let lines = vec![
            line("g1", TeamRole::Gov, 85),
            line("g2", TeamRole::Gov, 80),
            line("o1", TeamRole::Opp, 78),
            line("o2", TeamRole::Opp, 82),
        ];
        assert_eq!(
            totals_by_role(&lines).unwrap(),
            (Score::from(165), Score::from(160))
        );

        let contribution =
            MatchContribution::compute(&debate(), Some("gov-team"), &lines)
                .unwrap();

        assert_eq!(
            contribution.teams["gov-team"],
            TeamTotals {
                total_vp: 1,
                total_speaker_score: Score::from(165),
                wins: 1,
                losses: 0,
            }
        );
        assert_eq!(
            contribution.teams["opp-team"],
            TeamTotals {
                total_vp: 0,
                total_speaker_score: Score::from(160),
                wins: 0,
                losses: 1,
            }
        );
        assert_eq!(contribution.speakers.len(), 4);
    }

    #[test]
    fn reply_speeches_accumulate_per_speaker() {
        let lines = vec![
            line("g1", TeamRole::Gov, 75),
            line("g1", TeamRole::Gov, 37),
            line("o1", TeamRole::Opp, 76),
        ];
        let contribution =
            MatchContribution::compute(&debate(), Some("opp-team"), &lines)
                .unwrap();
        assert_eq!(contribution.speakers["g1"], Score::from(112));
        assert_eq!(contribution.teams["opp-team"].total_vp, 1);
    }

    #[test]
    fn folding_a_contribution_and_its_negation_is_zero() {
        let lines = vec![
            line("g1", TeamRole::Gov, 70),
            line("o1", TeamRole::Opp, 71),
        ];
        let contribution =
            MatchContribution::compute(&debate(), Some("opp-team"), &lines)
                .unwrap();

        let mut teams = HashMap::new();
        let mut speakers = HashMap::new();
        contribution.fold_into(&mut teams, &mut speakers).unwrap();
        (-contribution).fold_into(&mut teams, &mut speakers).unwrap();

        assert!(teams.values().all(|t| *t == TeamTotals::default()));
        assert!(speakers.values().all(|s| *s == Score::ZERO));
    }

    #[test]
    fn oversized_totals_are_an_error() {
        let huge = BallotLine {
            speaker_id: "g1".into(),
            team_role: TeamRole::Gov,
            score: Score::new(rust_decimal::Decimal::MAX),
        };
        let lines = vec![huge.clone(), huge];
        assert!(totals_by_role(&lines).is_err());
        assert!(
            MatchContribution::compute(&debate(), Some("gov-team"), &lines)
                .is_err()
        );
    }
}
