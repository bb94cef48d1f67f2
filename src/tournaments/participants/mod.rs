//! Adjudicators and rooms. The engine only needs to resolve them by id.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::{adjudicators, matches, rooms, rounds},
    state::{DbPool, with_conn},
    tournaments::Tournament,
    util_resp::{StandardResponse, success},
    validation::{non_blank_opt, require_non_blank},
};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = adjudicators)]
#[diesel(check_for_backend(Sqlite))]
pub struct Adjudicator {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub institution: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(Sqlite))]
pub struct Room {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CreateAdjudicatorForm {
    pub name: String,
    #[serde(default)]
    pub institution: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CreateRoomForm {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AdjudicatorOverview {
    #[serde(flatten)]
    pub adjudicator: Adjudicator,
    /// Completed matches this adjudicator was assigned to.
    pub matches_judged: usize,
}

impl Adjudicator {
    pub fn fetch(
        adjudicator_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Adjudicator> {
        adjudicators::table
            .filter(adjudicators::id.eq(adjudicator_id))
            .select(Adjudicator::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("adjudicator", adjudicator_id))
    }

    /// Like [`Adjudicator::fetch`], but an adjudicator of another tournament
    /// is reported as missing.
    pub fn fetch_in_tournament(
        adjudicator_id: &str,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Adjudicator> {
        let adjudicator = Adjudicator::fetch(adjudicator_id, conn)?;
        if adjudicator.tournament_id != tid {
            return Err(TabError::not_found("adjudicator", adjudicator_id));
        }
        Ok(adjudicator)
    }

    pub fn create(
        tid: &str,
        form: &CreateAdjudicatorForm,
        conn: &mut SqliteConnection,
    ) -> Result<Adjudicator> {
        conn.immediate_transaction(|conn| {
            Adjudicator::create_in_tx(tid, form, conn)
        })
    }

    /// As [`Adjudicator::create`], for callers that already hold a
    /// transaction.
    pub fn create_in_tx(
        tid: &str,
        form: &CreateAdjudicatorForm,
        conn: &mut SqliteConnection,
    ) -> Result<Adjudicator> {
        Tournament::fetch(tid, conn)?;
        let name = require_non_blank("adjudicator name", &form.name)?;
        let adjudicator = Adjudicator {
            id: Uuid::now_v7().to_string(),
            tournament_id: tid.to_string(),
            name: name.to_string(),
            institution: non_blank_opt(form.institution.clone()),
        };
        diesel::insert_into(adjudicators::table)
            .values((
                adjudicators::id.eq(&adjudicator.id),
                adjudicators::tournament_id.eq(&adjudicator.tournament_id),
                adjudicators::name.eq(&adjudicator.name),
                adjudicators::institution.eq(&adjudicator.institution),
            ))
            .execute(conn)?;
        Ok(adjudicator)
    }

    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Adjudicator>> {
        Ok(adjudicators::table
            .filter(adjudicators::tournament_id.eq(tid))
            .order_by((adjudicators::name.asc(), adjudicators::id.asc()))
            .select(Adjudicator::as_select())
            .load(conn)?)
    }

    /// Every adjudicator of the tournament, by name, with the number of
    /// completed matches they judged.
    pub fn overviews(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<AdjudicatorOverview>> {
        Tournament::fetch(tid, conn)?;

        let judged: HashMap<String, usize> = matches::table
            .inner_join(rounds::table)
            .filter(rounds::tournament_id.eq(tid))
            .filter(matches::is_completed.eq(true))
            .select(matches::adjudicator_id)
            .load::<Option<String>>(conn)?
            .into_iter()
            .flatten()
            .counts();

        Ok(Adjudicator::of_tournament(tid, conn)?
            .into_iter()
            .map(|adjudicator| AdjudicatorOverview {
                matches_judged: judged
                    .get(&adjudicator.id)
                    .copied()
                    .unwrap_or_default(),
                adjudicator,
            })
            .collect())
    }
}

impl Room {
    pub fn fetch_in_tournament(
        room_id: &str,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Room> {
        rooms::table
            .filter(rooms::id.eq(room_id))
            .filter(rooms::tournament_id.eq(tid))
            .select(Room::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("room", room_id))
    }

    pub fn create(
        tid: &str,
        form: &CreateRoomForm,
        conn: &mut SqliteConnection,
    ) -> Result<Room> {
        conn.immediate_transaction(|conn| Room::create_in_tx(tid, form, conn))
    }

    pub fn create_in_tx(
        tid: &str,
        form: &CreateRoomForm,
        conn: &mut SqliteConnection,
    ) -> Result<Room> {
        Tournament::fetch(tid, conn)?;
        let name = require_non_blank("room name", &form.name)?;
        let room = Room {
            id: Uuid::now_v7().to_string(),
            tournament_id: tid.to_string(),
            name: name.to_string(),
        };
        diesel::insert_into(rooms::table)
            .values((
                rooms::id.eq(&room.id),
                rooms::tournament_id.eq(&room.tournament_id),
                rooms::name.eq(&room.name),
            ))
            .execute(conn)?;
        Ok(room)
    }

    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Room>> {
        Tournament::fetch(tid, conn)?;
        Ok(rooms::table
            .filter(rooms::tournament_id.eq(tid))
            .order_by((rooms::name.asc(), rooms::id.asc()))
            .select(Room::as_select())
            .load(conn)?)
    }
}

pub async fn do_create_adjudicator(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<CreateAdjudicatorForm>,
) -> StandardResponse<Adjudicator> {
    let adjudicator =
        with_conn(&pool, move |conn| Adjudicator::create(&tid, &form, conn))
            .await?;
    success(adjudicator)
}

pub async fn do_create_room(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<CreateRoomForm>,
) -> StandardResponse<Room> {
    let room =
        with_conn(&pool, move |conn| Room::create(&tid, &form, conn)).await?;
    success(room)
}

pub async fn list_adjudicators(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<AdjudicatorOverview>> {
    let adjudicators =
        with_conn(&pool, move |conn| Adjudicator::overviews(&tid, conn))
            .await?;
    success(adjudicators)
}

pub async fn list_rooms(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<Room>> {
    let rooms =
        with_conn(&pool, move |conn| Room::of_tournament(&tid, conn)).await?;
    success(rooms)
}
