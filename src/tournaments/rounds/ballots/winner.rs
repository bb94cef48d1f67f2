use std::{fmt, str::FromStr};

use diesel::{
    backend::Backend,
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    serialize::{self, Output, ToSql},
    sql_types::Text,
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TabError},
    score::Score,
};

/// The side of a two-team match a team occupies.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Gov,
    Opp,
}

impl TeamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::Gov => "gov",
            TeamRole::Opp => "opp",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = TabError;

    /// Exact match only: no trimming, no case folding.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gov" => Ok(TeamRole::Gov),
            "opp" => Ok(TeamRole::Opp),
            other => Err(TabError::invalid(format!(
                "team role must be `gov` or `opp`, not `{other}`"
            ))),
        }
    }
}

impl FromSql<Text, Sqlite> for TeamRole {
    fn from_sql(
        bytes: <Sqlite as Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(s.parse()?)
    }
}

impl ToSql<Text, Sqlite> for TeamRole {
    fn to_sql<'b>(
        &'b self,
        out: &mut Output<'b, '_, Sqlite>,
    ) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(serialize::IsNull::No)
    }
}

/// Parses the optional winner side sent with a submission. Absent or blank
/// means "decide on scores".
pub fn parse_explicit_winner(raw: Option<&str>) -> Result<Option<TeamRole>> {
    match raw {
        None => Ok(None),
        Some(side) if side.trim().is_empty() => Ok(None),
        Some(side) => side.parse().map(Some),
    }
}

/// Decides the winning side of a match.
///
/// An explicit decision always stands, even against the score totals. Without
/// one the strictly higher total wins, and a tie goes to the opposition.
pub fn resolve_winner(
    total_gov: Score,
    total_opp: Score,
    explicit: Option<TeamRole>,
) -> TeamRole {
    if let Some(side) = explicit {
        return side;
    }

    if total_gov > total_opp {
        TeamRole::Gov
    } else {
        if total_gov == total_opp {
            tracing::warn!(
                %total_gov,
                "tied totals with no explicit winner, awarding opposition"
            );
        }
        TeamRole::Opp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_total_wins() {
        let winner = resolve_winner(Score::from(165), Score::from(160), None);
        assert_eq!(winner, TeamRole::Gov);

        let winner = resolve_winner(
            "150.5".parse().unwrap(),
            "150.75".parse().unwrap(),
            None,
        );
        assert_eq!(winner, TeamRole::Opp);
    }

    #[test]
    fn explicit_side_overrides_scores() {
        let winner = resolve_winner(
            Score::from(165),
            Score::from(160),
            Some(TeamRole::Opp),
        );
        assert_eq!(winner, TeamRole::Opp);

        let winner = resolve_winner(
            Score::from(100),
            Score::from(200),
            Some(TeamRole::Gov),
        );
        assert_eq!(winner, TeamRole::Gov);
    }

    #[test]
    fn tie_goes_to_opposition() {
        let winner = resolve_winner(Score::from(160), Score::from(160), None);
        assert_eq!(winner, TeamRole::Opp);
    }

    #[test]
    fn roles_parse_strictly() {
        assert_eq!("gov".parse::<TeamRole>().unwrap(), TeamRole::Gov);
        assert_eq!("opp".parse::<TeamRole>().unwrap(), TeamRole::Opp);
        assert!(" opp ".parse::<TeamRole>().is_err());
        assert!("gov\n".parse::<TeamRole>().is_err());
        assert!(matches!(
            "home".parse::<TeamRole>(),
            Err(TabError::InvalidInput(_))
        ));
        assert!("GOV".parse::<TeamRole>().is_err());

        assert_eq!(parse_explicit_winner(None).unwrap(), None);
        assert_eq!(parse_explicit_winner(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_explicit_winner(Some("opp")).unwrap(),
            Some(TeamRole::Opp)
        );
        assert!(parse_explicit_winner(Some("draw")).is_err());
        assert!(parse_explicit_winner(Some(" gov")).is_err());
    }
}
