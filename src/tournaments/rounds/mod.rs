use axum::{
    Json,
    extract::{Path, State},
};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, TabError},
    schema::rounds,
    state::{DbPool, with_conn},
    tournaments::Tournament,
    util_resp::{StandardResponse, success},
    validation::{non_blank_opt, require_non_blank},
};

pub mod ballots;
pub mod matches;

/// Publication flags and the motion are kept for the collaborating
/// front-end; tabulation never reads them.
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = rounds)]
#[diesel(check_for_backend(Sqlite))]
pub struct Round {
    pub id: String,
    pub tournament_id: String,
    pub seq: i64,
    pub name: String,
    pub motion: Option<String>,
    pub info_slide: Option<String>,
    pub draw_published: bool,
    pub motion_published: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CreateRoundForm {
    pub name: String,
    /// Defaults to one past the highest existing sequence number.
    #[serde(default)]
    pub seq: Option<i64>,
    #[serde(default)]
    pub motion: Option<String>,
    #[serde(default)]
    pub info_slide: Option<String>,
}

/// Shows (`true`) or hides (`false`) part of a round.
#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
pub struct PublishForm {
    pub published: bool,
}

impl Round {
    pub fn fetch(
        round_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Self> {
        rounds::table
            .filter(rounds::id.eq(round_id))
            .select(Round::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| TabError::not_found("round", round_id))
    }

    pub fn of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Round>> {
        Ok(rounds::table
            .filter(rounds::tournament_id.eq(tid))
            .order_by((rounds::seq.asc(), rounds::id.asc()))
            .select(Round::as_select())
            .load(conn)?)
    }

    pub fn create(
        tid: &str,
        form: &CreateRoundForm,
        conn: &mut SqliteConnection,
    ) -> Result<Round> {
        let name = require_non_blank("round name", &form.name)?.to_string();

        conn.immediate_transaction(|conn| {
            Tournament::fetch(tid, conn)?;

            let seq = match form.seq {
                Some(seq) => seq,
                None => {
                    rounds::table
                        .filter(rounds::tournament_id.eq(tid))
                        .select(diesel::dsl::max(rounds::seq))
                        .get_result::<Option<i64>>(conn)?
                        .unwrap_or(0)
                        + 1
                }
            };

            let round = Round {
                id: Uuid::now_v7().to_string(),
                tournament_id: tid.to_string(),
                seq,
                name,
                motion: non_blank_opt(form.motion.clone()),
                info_slide: non_blank_opt(form.info_slide.clone()),
                draw_published: false,
                motion_published: false,
            };

            diesel::insert_into(rounds::table)
                .values((
                    rounds::id.eq(&round.id),
                    rounds::tournament_id.eq(&round.tournament_id),
                    rounds::seq.eq(round.seq),
                    rounds::name.eq(&round.name),
                    rounds::motion.eq(&round.motion),
                    rounds::info_slide.eq(&round.info_slide),
                    rounds::draw_published.eq(round.draw_published),
                    rounds::motion_published.eq(round.motion_published),
                ))
                .execute(conn)?;

            Ok(round)
        })
    }

    #[tracing::instrument(skip(conn))]
    pub fn set_draw_published(
        round_id: &str,
        published: bool,
        conn: &mut SqliteConnection,
    ) -> Result<Round> {
        conn.immediate_transaction(|conn| {
            Round::fetch(round_id, conn)?;
            diesel::update(rounds::table.filter(rounds::id.eq(round_id)))
                .set(rounds::draw_published.eq(published))
                .execute(conn)?;
            Round::fetch(round_id, conn)
        })
    }

    /// A round without a motion cannot have its motion published.
    #[tracing::instrument(skip(conn))]
    pub fn set_motion_published(
        round_id: &str,
        published: bool,
        conn: &mut SqliteConnection,
    ) -> Result<Round> {
        conn.immediate_transaction(|conn| {
            let round = Round::fetch(round_id, conn)?;
            if published && round.motion.is_none() {
                return Err(TabError::invalid(format!(
                    "round `{round_id}` has no motion to publish"
                )));
            }
            diesel::update(rounds::table.filter(rounds::id.eq(round_id)))
                .set(rounds::motion_published.eq(published))
                .execute(conn)?;
            Round::fetch(round_id, conn)
        })
    }
}

pub async fn do_create_round(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<CreateRoundForm>,
) -> StandardResponse<Round> {
    let round =
        with_conn(&pool, move |conn| Round::create(&tid, &form, conn)).await?;
    success(round)
}

pub async fn list_rounds(
    Path(tid): Path<String>,
    State(pool): State<DbPool>,
) -> StandardResponse<Vec<Round>> {
    let rounds = with_conn(&pool, move |conn| {
        Tournament::fetch(&tid, conn)?;
        Round::of_tournament(&tid, conn)
    })
    .await?;
    success(rounds)
}

pub async fn do_publish_draw(
    Path(rid): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<PublishForm>,
) -> StandardResponse<Round> {
    let round = with_conn(&pool, move |conn| {
        Round::set_draw_published(&rid, form.published, conn)
    })
    .await?;
    success(round)
}

pub async fn do_publish_motion(
    Path(rid): Path<String>,
    State(pool): State<DbPool>,
    Json(form): Json<PublishForm>,
) -> StandardResponse<Round> {
    let round = with_conn(&pool, move |conn| {
        Round::set_motion_published(&rid, form.published, conn)
    })
    .await?;
    success(round)
}
