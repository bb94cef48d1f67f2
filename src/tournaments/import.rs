//! Bulk registration from CSV.
//!
//! Teams are `name,institution,speaker,speaker,...`, adjudicators are
//! `name,institution` and rooms are `name`. A first record whose first column
//! is `name` (or `team`, `adjudicator`, `room` for the matching import) is
//! treated as a header. Blank records and blank speaker cells are skipped.
//! Columns past the ones listed are ignored.

use std::io::Read;

use axum::extract::{Path, State};
use csv::StringRecord;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TabError},
    state::{DbPool, with_conn},
    tournaments::{
        participants::{
            Adjudicator, CreateAdjudicatorForm, CreateRoomForm, Room,
        },
        teams::{CreateTeamForm, Team},
    },
    util_resp::{StandardResponse, success},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub teams_created: usize,
    pub speakers_created: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCount {
    pub created: usize,
}

/// Reads the non-blank records, dropping a header whose first cell is one of
/// `header` (compared case-insensitively).
fn records(reader: impl Read, header: &[&str]) -> Result<Vec<StringRecord>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, record) in csv.records().enumerate() {
        let record = record.map_err(|e| {
            TabError::invalid(format!("malformed CSV record {}: {e}", i + 1))
        })?;

        if record.iter().all(str::is_empty) {
            continue;
        }
        if i == 0
            && record.get(0).is_some_and(|first| {
                header.iter().any(|word| first.eq_ignore_ascii_case(word))
            })
        {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

fn optional(field: Option<&str>) -> Option<String> {
    field.filter(|value| !value.is_empty()).map(str::to_string)
}

/// Parses the CSV into team forms without touching the database.
pub fn parse_teams(reader: impl Read) -> Result<Vec<CreateTeamForm>> {
    Ok(records(reader, &["name", "team"])?
        .iter()
        .map(|record| {
            let mut fields = record.iter();
            let name = fields.next().unwrap_or_default().to_string();
            let institution = optional(fields.next());
            let speakers = fields
                .filter(|speaker| !speaker.is_empty())
                .map(str::to_string)
                .collect();
            CreateTeamForm {
                name,
                institution,
                speakers,
            }
        })
        .collect())
}

pub fn parse_adjudicators(
    reader: impl Read,
) -> Result<Vec<CreateAdjudicatorForm>> {
    Ok(records(reader, &["name", "adjudicator"])?
        .iter()
        .map(|record| CreateAdjudicatorForm {
            name: record.get(0).unwrap_or_default().to_string(),
            institution: optional(record.get(1)),
        })
        .collect())
}

pub fn parse_rooms(reader: impl Read) -> Result<Vec<CreateRoomForm>> {
    Ok(records(reader, &["name", "room"])?
        .iter()
        .map(|record| CreateRoomForm {
            name: record.get(0).unwrap_or_default().to_string(),
        })
        .collect())
}

/// Registers every team in the CSV. Either all of them are created or, if
/// any record is invalid, none are.
#[tracing::instrument(skip(reader, conn))]
pub fn import_teams(
    tid: &str,
    reader: impl Read,
    conn: &mut SqliteConnection,
) -> Result<ImportSummary> {
    let forms = parse_teams(reader)?;

    conn.immediate_transaction(|conn| {
        let mut summary = ImportSummary::default();
        for form in &forms {
            let (_, speakers) = Team::create_in_tx(tid, form, conn)?;
            summary.teams_created += 1;
            summary.speakers_created += speakers.len();
        }

        tracing::info!(
            teams = summary.teams_created,
            speakers = summary.speakers_created,
            "imported teams"
        );
        Ok(summary)
    })
}

#[tracing::instrument(skip(reader, conn))]
pub fn import_adjudicators(
    tid: &str,
    reader: impl Read,
    conn: &mut SqliteConnection,
) -> Result<ImportCount> {
    let forms = parse_adjudicators(reader)?;

    conn.immediate_transaction(|conn| {
        for form in &forms {
            Adjudicator::create_in_tx(tid, form, conn)?;
        }
        tracing::info!(adjudicators = forms.len(), "imported adjudicators");
        Ok(ImportCount {
            created: forms.len(),
        })
    })
}

#[tracing::instrument(skip(reader, conn))]
pub fn import_rooms(
    tid: &str,
    reader: impl Read,
    conn: &mut SqliteConnection,
) -> Result<ImportCount> {
    let forms = parse_rooms(reader)?;

    conn.immediate_transaction(|conn| {
        for form in &forms {
            Room::create_in_tx(tid, form, conn)?;
        }
        tracing::info!(rooms = forms.len(), "imported rooms");
        Ok(ImportCount {
            created: forms.len(),
        })
    })
}

pub async fn do_import_teams(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    body: String,
) -> StandardResponse<ImportSummary> {
    let summary = with_conn(&pool, move |conn| {
        import_teams(&tid, body.as_bytes(), conn)
    })
    .await?;
    success(summary)
}

pub async fn do_import_adjudicators(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    body: String,
) -> StandardResponse<ImportCount> {
    let count = with_conn(&pool, move |conn| {
        import_adjudicators(&tid, body.as_bytes(), conn)
    })
    .await?;
    success(count)
}

pub async fn do_import_rooms(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    body: String,
) -> StandardResponse<ImportCount> {
    let count =
        with_conn(&pool, move |conn| import_rooms(&tid, body.as_bytes(), conn))
            .await?;
    success(count)
}
