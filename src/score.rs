use std::{fmt, ops::Neg, str::FromStr};

use diesel::{
    backend::Backend,
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
    sqlite::Sqlite,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabError};

/// An exact speaker score (or a sum of them).
///
/// SQLite has no decimal type, so scores are stored as normalized decimal
/// text. Summing floats would make reconciliation drift from the incremental
/// totals by rounding error; summing these never does.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(transparent)]
pub struct Score(pub Decimal);

impl Score {
    pub const ZERO: Score = Score(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Score(value)
    }

    /// Upper bound on a single speech's score.
    pub const MAX_SPEECH: Score = Score(Decimal::ONE_THOUSAND);

    pub fn value(self) -> Decimal {
        self.0
    }

    /// Sum of two scores. Totals never wrap or panic; a sum outside the
    /// decimal range is rejected.
    pub fn checked_add(self, rhs: Score) -> Result<Score> {
        self.0.checked_add(rhs.0).map(Score).ok_or_else(|| {
            TabError::invalid(format!(
                "score total out of range: {self} + {rhs}"
            ))
        })
    }

    /// Sums scores, failing on the first sum out of range.
    pub fn try_sum(scores: impl IntoIterator<Item = Score>) -> Result<Score> {
        scores
            .into_iter()
            .try_fold(Score::ZERO, |total, score| total.checked_add(score))
    }

    /// Checks the score of a single speech: between zero and
    /// [`Score::MAX_SPEECH`].
    pub fn check_speech(self) -> Result<Score> {
        if self < Score::ZERO || self > Score::MAX_SPEECH {
            return Err(TabError::invalid(format!(
                "speech score {self} is outside 0..={}",
                Score::MAX_SPEECH
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Score {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Score)
    }
}

impl From<i64> for Score {
    fn from(value: i64) -> Self {
        Score(Decimal::from(value))
    }
}

impl From<Decimal> for Score {
    fn from(value: Decimal) -> Self {
        Score(value)
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        Score(-self.0)
    }
}

impl FromSql<Text, Sqlite> for Score {
    fn from_sql(
        bytes: <Sqlite as Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(Score(Decimal::from_str(&text)?))
    }
}

impl ToSql<Text, Sqlite> for Score {
    fn to_sql<'b>(
        &'b self,
        out: &mut Output<'b, '_, Sqlite>,
    ) -> serialize::Result {
        out.set_value(self.0.normalize().to_string());
        Ok(IsNull::No)
    }
}
