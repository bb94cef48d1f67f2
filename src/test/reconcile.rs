use diesel::prelude::*;

use crate::{
    error::TabError,
    schema::{speaker_stats, team_stats},
    score::Score,
    test::{
        ballot, conn, debate, entry, pairing, round, scenario_ballot,
        snapshot, team, totals, tournament,
    },
    tournaments::{
        rounds::ballots::submit::submit_ballot,
        standings::{
            TeamScope,
            compute::{speaker_standings, team_standings},
            institutions::institution_standings,
            recalculate::{audit, recalculate},
        },
    },
};

#[test]
fn test_recalculate_agrees_with_incremental_totals() {
    let mut conn = conn();
    let t = tournament("league", &mut conn);
    let teams = ["A", "B", "C", "D"]
        .into_iter()
        .map(|name| team(&t.id, name, None, &[], &mut conn).0)
        .collect::<Vec<_>>();

    let r1 = round(&t.id, "Round 1", &mut conn);
    let r2 = round(&t.id, "Round 2", &mut conn);
    let m1 = pairing(&r1.id, Some(&teams[0]), Some(&teams[1]), &mut conn);
    let m2 = pairing(&r1.id, Some(&teams[2]), Some(&teams[3]), &mut conn);
    let m3 = pairing(&r2.id, Some(&teams[1]), Some(&teams[2]), &mut conn);
    // Paired but never decided; contributes nothing.
    pairing(&r2.id, Some(&teams[3]), Some(&teams[0]), &mut conn);

    let submit = |conn: &mut SqliteConnection, id: &str, gov, opp, winner| {
        submit_ballot(
            id,
            &ballot(
                vec![
                    entry("First", "gov", gov),
                    entry("First", "opp", opp),
                ],
                winner,
            ),
            conn,
        )
        .unwrap();
    };

    // Round 2 is entered before round 1 is finished.
    submit(&mut conn, &m3.id, "76.5", "76", None);
    submit(&mut conn, &m1.id, "75", "77", None);
    submit(&mut conn, &m2.id, "80", "70", Some("opp"));
    submit(&mut conn, &m1.id, "78", "77", None);

    let incremental = snapshot(&t.id, &mut conn);

    assert_eq!(recalculate(&t.id, &mut conn).unwrap(), 3);
    let first = snapshot(&t.id, &mut conn);
    assert_eq!(recalculate(&t.id, &mut conn).unwrap(), 3);
    let second = snapshot(&t.id, &mut conn);

    assert_eq!(first, incremental);
    assert_eq!(second, first);

    assert_eq!(first.teams[&teams[0].id], totals(1, "78", 1, 0));
    assert_eq!(first.teams[&teams[1].id], totals(1, "153.5", 1, 1));
    assert_eq!(first.teams[&teams[2].id], totals(0, "156", 0, 2));
    assert_eq!(first.teams[&teams[3].id], totals(1, "70", 1, 0));
}

#[test]
fn test_recalculate_repairs_drift() {
    let mut conn = conn();
    let d = debate(&mut conn);
    submit_ballot(&d.debate.id, &scenario_ballot(), &mut conn).unwrap();
    let correct = snapshot(&d.tournament.id, &mut conn);

    assert!(audit(&d.tournament.id, &mut conn).unwrap().is_clean());

    diesel::update(team_stats::table.filter(team_stats::team_id.eq(&d.opp.id)))
        .set((team_stats::total_vp.eq(7), team_stats::wins.eq(7)))
        .execute(&mut conn)
        .unwrap();
    diesel::update(speaker_stats::table)
        .set(speaker_stats::total_score.eq(Score::from(1)))
        .execute(&mut conn)
        .unwrap();

    let report = audit(&d.tournament.id, &mut conn).unwrap();
    assert_eq!(report.matches_checked, 1);
    assert_eq!(report.teams.len(), 1);
    assert_eq!(report.teams[0].team_id, d.opp.id);
    assert_eq!(report.teams[0].stored.total_vp, 7);
    assert_eq!(report.teams[0].expected, totals(0, "160", 0, 1));
    assert_eq!(report.speakers.len(), 4);

    recalculate(&d.tournament.id, &mut conn).unwrap();
    assert_eq!(snapshot(&d.tournament.id, &mut conn), correct);
    assert!(audit(&d.tournament.id, &mut conn).unwrap().is_clean());
}

#[test]
fn test_recalculate_bumps_versions() {
    let mut conn = conn();
    let d = debate(&mut conn);
    let version = |conn: &mut SqliteConnection| {
        team_stats::table
            .filter(team_stats::team_id.eq(&d.gov.id))
            .select(team_stats::version)
            .first::<i64>(conn)
            .unwrap()
    };

    assert_eq!(version(&mut conn), 0);
    submit_ballot(&d.debate.id, &scenario_ballot(), &mut conn).unwrap();
    assert_eq!(version(&mut conn), 1);
    recalculate(&d.tournament.id, &mut conn).unwrap();
    assert_eq!(version(&mut conn), 2);
}

#[test]
fn test_unknown_tournament() {
    let mut conn = conn();
    assert!(matches!(
        recalculate("nope", &mut conn),
        Err(TabError::NotFound {
            resource: "tournament",
            ..
        })
    ));
    assert!(team_standings("nope", TeamScope::All, &mut conn).is_err());
}

#[test]
fn test_standings_order() {
    let mut conn = conn();
    let t = tournament("ranked", &mut conn);
    let (a, _) = team(&t.id, "A", Some("North"), &[], &mut conn);
    let (b, _) = team(&t.id, "B", Some("South"), &[], &mut conn);
    let (c, _) = team(&t.id, "C", Some("North"), &[], &mut conn);
    let (idle, _) = team(&t.id, "Idle", Some("West"), &[], &mut conn);

    // Nothing paired yet: the participating view falls back to every team.
    assert_eq!(
        team_standings(&t.id, TeamScope::Participating, &mut conn)
            .unwrap()
            .len(),
        4
    );

    let r = round(&t.id, "Round 1", &mut conn);
    let ab = pairing(&r.id, Some(&a), Some(&b), &mut conn);
    let bc = pairing(&r.id, Some(&b), Some(&c), &mut conn);
    let ca = pairing(&r.id, Some(&c), Some(&a), &mut conn);

    let two = |gov: &str, opp: &str, winner| {
        ballot(
            vec![entry("Lead", "gov", gov), entry("Lead", "opp", opp)],
            winner,
        )
    };
    submit_ballot(&ab.id, &two("250", "225", None), &mut conn).unwrap();
    submit_ballot(&bc.id, &two("225", "260", Some("gov")), &mut conn).unwrap();
    submit_ballot(&ca.id, &two("260", "250", None), &mut conn).unwrap();

    // A: 1 VP, 500. B: 1 VP, 450. C: 1 VP, 520.
    let all = team_standings(&t.id, TeamScope::All, &mut conn).unwrap();
    let order = all
        .iter()
        .map(|s| (s.name.as_str(), s.rank, s.total_vp))
        .collect::<Vec<_>>();
    assert_eq!(
        order,
        vec![("C", 1, 1), ("A", 2, 1), ("B", 3, 1), ("Idle", 4, 0)]
    );

    let participating =
        team_standings(&t.id, TeamScope::Participating, &mut conn).unwrap();
    assert_eq!(participating.len(), 3);
    assert!(participating.iter().all(|s| s.team_id != idle.id));

    let speakers = speaker_standings(&t.id, &mut conn).unwrap();
    assert_eq!(speakers.len(), 3);
    assert_eq!(speakers[0].team_id, c.id);
    assert_eq!(speakers[0].total_score, Score::from(520));
    assert_eq!(
        speakers.iter().map(|s| s.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let institutions = institution_standings(&t.id, &mut conn).unwrap();
    assert_eq!(institutions.len(), 2);
    assert_eq!(institutions[0].institution, "North");
    assert_eq!(institutions[0].team_count, 2);
    assert_eq!(institutions[0].total_vp, 2);
}
