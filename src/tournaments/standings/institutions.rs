use diesel::{connection::LoadConnection, sqlite::Sqlite};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    error::Result,
    tournaments::{
        Tournament,
        standings::{
            InstitutionStanding, TeamScope, TeamStanding,
            compute::team_standings,
        },
    },
};

/// Groups team standings by institution. Teams without an institution are
/// left out.
pub fn rank_institutions(
    teams: &[TeamStanding],
) -> Vec<InstitutionStanding> {
    let mut grouped: IndexMap<&str, (usize, i64)> = IndexMap::new();
    for team in teams {
        let Some(institution) = team.institution.as_deref() else {
            continue;
        };
        let entry = grouped.entry(institution).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(team.total_vp);
    }

    grouped
        .into_iter()
        .sorted_by(|(a_name, (_, a_vp)), (b_name, (_, b_vp))| {
            b_vp.cmp(a_vp).then_with(|| a_name.cmp(b_name))
        })
        .enumerate()
        .map(|(i, (institution, (team_count, total_vp)))| {
            InstitutionStanding {
                rank: i + 1,
                institution: institution.to_string(),
                team_count,
                total_vp,
                average_vp: total_vp as f64 / team_count as f64,
            }
        })
        .collect()
}

pub fn institution_standings(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<InstitutionStanding>> {
    Tournament::fetch(tid, conn)?;
    let teams = team_standings(tid, TeamScope::Participating, conn)?;
    Ok(rank_institutions(&teams))
}
