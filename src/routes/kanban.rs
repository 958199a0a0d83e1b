use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::{pg::PgConnection, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    kanban::{Board, Card, Column, DragEnd, MoveError, MoveOutcome, Slot, COLUMNS},
    models::Survey,
    schema::{contracts, surveys},
    state::AppState,
    status::{StatusBadge, SurveyStatus},
};

#[derive(Deserialize)]
pub struct BoardQuery {
    pub contract_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub survey_id: i64,
    pub source: Slot,
    #[serde(default)]
    pub destination: Option<Slot>,
    /// Narrows the board the move is resolved against.
    #[serde(default)]
    pub contract_id: Option<i64>,
}

#[derive(Serialize)]
pub struct CardView {
    #[serde(flatten)]
    pub card: Card,
    pub badge: StatusBadge,
    pub mine: bool,
}

#[derive(Serialize)]
pub struct ColumnView {
    pub column: Column,
    pub title: &'static str,
    pub color: &'static str,
    pub count: usize,
    pub cards: Vec<CardView>,
}

#[derive(Serialize)]
pub struct BoardResponse {
    pub can_move: bool,
    pub columns: Vec<ColumnView>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Skipped,
    Ignored,
    Committed,
    Reverted,
}

#[derive(Serialize, Debug)]
pub struct MoveResponse {
    pub outcome: MoveKind,
    pub survey_id: i64,
    pub status: Option<SurveyStatus>,
    pub column: Option<Column>,
    pub alert: Option<String>,
}

pub async fn get_board(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<BoardResponse>> {
    let mut conn = state.db()?;
    let user = user.with_current_role(&mut conn)?;
    let board = load_board(&mut conn, query.contract_id)?;

    let now = Utc::now().naive_utc();
    let retention = state.config.completed_retention();
    let columns = COLUMNS
        .iter()
        .map(|spec| {
            let cards: Vec<CardView> = board
                .column(spec.column, now, retention)
                .into_iter()
                .map(|card| CardView {
                    badge: card.status.badge(card.urgent),
                    mine: card.created_by == user.user_id,
                    card: card.clone(),
                })
                .collect();
            ColumnView {
                column: spec.column,
                title: spec.title,
                color: spec.color,
                count: cards.len(),
                cards,
            }
        })
        .collect();

    Ok(Json(BoardResponse {
        can_move: user.is_admin(),
        columns,
    }))
}

pub async fn move_card(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<MoveRequest>,
) -> AppResult<(StatusCode, Json<MoveResponse>)> {
    let (user, mut board) = {
        let mut conn = state.db()?;
        let user = user.with_current_role(&mut conn)?;
        let board = load_board(&mut conn, payload.contract_id)?;
        (user, board)
    };

    let drag = DragEnd {
        survey_id: payload.survey_id,
        source: payload.source,
        destination: payload.destination,
    };
    let writer = state.status_writer(&user);
    let outcome = board.drop_card(&drag, user.is_admin(), &writer).await;

    match &outcome {
        MoveOutcome::Committed { survey_id, status } => {
            tracing::info!(
                survey_id,
                status = %status,
                actor = %user.user_id,
                "card moved"
            );
        }
        MoveOutcome::Ignored => {
            tracing::debug!(survey_id = drag.survey_id, actor = %user.user_id, "move ignored for non-admin");
        }
        _ => {}
    }

    let (status_code, response) = move_response(drag.survey_id, outcome);
    Ok((status_code, Json(response)))
}

fn move_response(survey_id: i64, outcome: MoveOutcome) -> (StatusCode, MoveResponse) {
    match outcome {
        MoveOutcome::Skipped => (
            StatusCode::OK,
            MoveResponse {
                outcome: MoveKind::Skipped,
                survey_id,
                status: None,
                column: None,
                alert: None,
            },
        ),
        MoveOutcome::Ignored => (
            StatusCode::OK,
            MoveResponse {
                outcome: MoveKind::Ignored,
                survey_id,
                status: None,
                column: None,
                alert: None,
            },
        ),
        MoveOutcome::Committed { survey_id, status } => (
            StatusCode::OK,
            MoveResponse {
                outcome: MoveKind::Committed,
                survey_id,
                status: Some(status),
                column: Some(Column::of(status)),
                alert: None,
            },
        ),
        MoveOutcome::Reverted {
            survey_id,
            status,
            error,
        } => {
            let code = match error {
                MoveError::WriteIneffective => StatusCode::FORBIDDEN,
                MoveError::WriteRejected(_) => StatusCode::CONFLICT,
            };
            (
                code,
                MoveResponse {
                    outcome: MoveKind::Reverted,
                    survey_id,
                    status: Some(status),
                    column: Some(Column::of(status)),
                    alert: Some(error.to_string()),
                },
            )
        }
    }
}

/// Loads every survey with its contract, ordered by needed date with undated
/// requests last, then newest first.
fn load_board(conn: &mut PgConnection, contract_id: Option<i64>) -> AppResult<Board> {
    let mut query = surveys::table
        .inner_join(contracts::table)
        .select((surveys::all_columns, contracts::code, contracts::title))
        .order((
            surveys::needed_date.asc().nulls_last(),
            surveys::created_at.desc(),
        ))
        .into_boxed();
    if let Some(contract_id) = contract_id {
        query = query.filter(surveys::contract_id.eq(contract_id));
    }
    let rows: Vec<(Survey, String, String)> = query.load(conn)?;

    let mut cards = Vec::with_capacity(rows.len());
    for (survey, code, title) in rows {
        cards.push(Card {
            id: survey.id,
            status: survey.status()?,
            urgent: survey.urgent,
            created_by: survey.created_by,
            requester: survey.requester,
            needed_date: survey.needed_date,
            admin_deadline: survey.admin_deadline,
            completed_at: survey.completed_at,
            contract_code: Some(code),
            contract_title: Some(title),
        });
    }
    Ok(Board::new(cards))
}
