use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::{pg::PgConnection, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    error::{AppError, AppResult},
    kanban::{store, Column, RowPolicy},
    models::{Contract, NewSurvey, Survey},
    schema::{contracts, surveys},
    state::AppState,
    status::{StatusBadge, SurveyStatus},
    utils::json::{classify_nullable_date, NullableValue},
};

#[derive(Deserialize)]
pub struct CreateSurveyRequest {
    pub contract_id: Option<i64>,
    pub requester: Option<String>,
    pub needed_date: Option<NaiveDate>,
    pub request_text: Option<String>,
    #[serde(default)]
    pub urgent: bool,
}

#[derive(Deserialize)]
pub struct SurveyListQuery {
    pub contract_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: SurveyStatus,
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub needed_date: NaiveDate,
}

#[derive(Serialize)]
pub struct ContractRef {
    pub id: i64,
    pub code: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct SurveyResponse {
    pub id: i64,
    pub contract: ContractRef,
    pub status: SurveyStatus,
    pub column: Column,
    pub badge: StatusBadge,
    pub urgent: bool,
    pub requester: Option<String>,
    pub request_text: Option<String>,
    pub needed_date: Option<NaiveDate>,
    pub admin_deadline: Option<NaiveDate>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub mine: bool,
}

#[derive(Serialize)]
pub struct DeadlineOverview {
    pub pending: Vec<SurveyResponse>,
    pub scheduled: Vec<SurveyResponse>,
}

pub async fn create_survey(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateSurveyRequest>,
) -> AppResult<(StatusCode, Json<SurveyResponse>)> {
    let contract_id = payload
        .contract_id
        .ok_or_else(|| AppError::bad_request("contract_id is required"))?;
    let requester = required_text(payload.requester.as_deref(), "requester")?;
    let request_text = required_text(payload.request_text.as_deref(), "request_text")?;
    let needed_date = payload
        .needed_date
        .ok_or_else(|| AppError::bad_request("needed_date is required"))?;

    let mut conn = state.db()?;
    let contract = contracts::table
        .find(contract_id)
        .first::<Contract>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::bad_request("contract not found"))?;

    let status = SurveyStatus::initial(payload.urgent);
    let new_survey = NewSurvey {
        contract_id,
        status: status.as_str().to_string(),
        urgent: payload.urgent,
        created_by: user.user_id,
        requester: Some(requester),
        request_text: Some(request_text),
        needed_date: Some(needed_date),
    };

    let survey: Survey = diesel::insert_into(surveys::table)
        .values(&new_survey)
        .get_result(&mut conn)?;

    tracing::info!(
        survey_id = survey.id,
        contract_id,
        status = %status,
        "survey submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(to_survey_response(survey, contract, &user)?),
    ))
}

pub async fn list_surveys(
    State(state): State<AppState>,
    Query(query): Query<SurveyListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<SurveyResponse>>> {
    let mut conn = state.db()?;

    let mut rows_query = surveys::table
        .inner_join(contracts::table)
        .select((surveys::all_columns, contracts::all_columns))
        .order((
            surveys::admin_deadline.asc().nulls_last(),
            surveys::created_at.desc(),
        ))
        .into_boxed();
    if let Some(contract_id) = query.contract_id {
        rows_query = rows_query.filter(surveys::contract_id.eq(contract_id));
    }
    let rows: Vec<(Survey, Contract)> = rows_query.load(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|(survey, contract)| to_survey_response(survey, contract, &user))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(response))
}

pub async fn get_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    user: AuthenticatedUser,
) -> AppResult<Json<SurveyResponse>> {
    let mut conn = state.db()?;
    let (survey, contract) = load_survey(&mut conn, survey_id)?;
    Ok(Json(to_survey_response(survey, contract, &user)?))
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    user: AuthenticatedUser,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<SurveyResponse>> {
    let mut conn = state.db()?;
    let user = user.with_current_role(&mut conn)?;
    let updated = store::update_status(
        &mut conn,
        survey_id,
        payload.status,
        RowPolicy::for_user(&user),
    )?;
    if updated.is_empty() {
        return Err(AppError::forbidden(
            "no rows were updated (permission denied)",
        ));
    }

    tracing::info!(survey_id, status = %payload.status, "survey status set");
    let (survey, contract) = load_survey(&mut conn, survey_id)?;
    Ok(Json(to_survey_response(survey, contract, &user)?))
}

pub async fn schedule_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    user: AuthenticatedUser,
    Json(payload): Json<ScheduleRequest>,
) -> AppResult<Json<SurveyResponse>> {
    let mut conn = state.db()?;
    let user = user.with_current_role(&mut conn)?;
    let now = Utc::now().naive_utc();
    let changes = (
        surveys::needed_date.eq(payload.needed_date),
        surveys::status.eq(SurveyStatus::Scheduled.as_str()),
        surveys::updated_at.eq(now),
    );

    let updated: Vec<Survey> = match RowPolicy::for_user(&user) {
        RowPolicy::Any => diesel::update(surveys::table.find(survey_id))
            .set(changes)
            .get_results(&mut conn)?,
        RowPolicy::CreatedBy(owner) => diesel::update(
            surveys::table
                .filter(surveys::id.eq(survey_id))
                .filter(surveys::created_by.eq(owner)),
        )
        .set(changes)
        .get_results(&mut conn)?,
    };
    let Some(survey) = updated.into_iter().next() else {
        return Err(AppError::forbidden(
            "no rows were updated (permission denied)",
        ));
    };

    let contract: Contract = contracts::table
        .find(survey.contract_id)
        .first(&mut conn)?;
    Ok(Json(to_survey_response(survey, contract, &user)?))
}

pub async fn list_deadlines(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<DeadlineOverview>> {
    let mut conn = state.db()?;
    let rows: Vec<(Survey, Contract)> = surveys::table
        .inner_join(contracts::table)
        .select((surveys::all_columns, contracts::all_columns))
        .order((
            surveys::needed_date.asc().nulls_last(),
            surveys::created_at.desc(),
        ))
        .load(&mut conn)?;

    let mut overview = DeadlineOverview {
        pending: Vec::new(),
        scheduled: Vec::new(),
    };
    for (survey, contract) in rows {
        let row = to_survey_response(survey, contract, &admin)?;
        if row.admin_deadline.is_some() {
            overview.scheduled.push(row);
        } else {
            overview.pending.push(row);
        }
    }
    Ok(Json(overview))
}

pub async fn update_deadline(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    AdminUser(admin): AdminUser,
    Json(body): Json<Value>,
) -> AppResult<Json<SurveyResponse>> {
    let deadline = match classify_nullable_date(body.get("admin_deadline"))
        .map_err(AppError::bad_request)?
    {
        NullableValue::Omitted => {
            return Err(AppError::bad_request("admin_deadline is required"));
        }
        NullableValue::Null => None,
        NullableValue::Value(date) => Some(date),
    };
    let schedule = match body.get("schedule") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "schedule must be a boolean, got {other}"
            )));
        }
    };

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let target = surveys::table.find(survey_id);
    let updated: Vec<Survey> = if schedule && deadline.is_some() {
        diesel::update(target)
            .set((
                surveys::admin_deadline.eq(deadline),
                surveys::status.eq(SurveyStatus::Scheduled.as_str()),
                surveys::updated_at.eq(now),
            ))
            .get_results(&mut conn)?
    } else {
        diesel::update(target)
            .set((
                surveys::admin_deadline.eq(deadline),
                surveys::updated_at.eq(now),
            ))
            .get_results(&mut conn)?
    };
    let survey = updated.into_iter().next().ok_or_else(AppError::not_found)?;

    tracing::info!(
        survey_id,
        admin_deadline = ?survey.admin_deadline,
        scheduled = schedule,
        "admin deadline updated"
    );
    let contract: Contract = contracts::table
        .find(survey.contract_id)
        .first(&mut conn)?;
    Ok(Json(to_survey_response(survey, contract, &admin)?))
}

fn required_text(value: Option<&str>, field: &str) -> AppResult<String> {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(AppError::bad_request(format!("{field} must not be empty"))),
    }
}

fn load_survey(conn: &mut PgConnection, survey_id: i64) -> AppResult<(Survey, Contract)> {
    Ok(surveys::table
        .inner_join(contracts::table)
        .filter(surveys::id.eq(survey_id))
        .select((surveys::all_columns, contracts::all_columns))
        .first(conn)?)
}

pub(crate) fn to_survey_response(
    survey: Survey,
    contract: Contract,
    viewer: &AuthenticatedUser,
) -> AppResult<SurveyResponse> {
    let status = survey.status()?;
    Ok(SurveyResponse {
        id: survey.id,
        contract: ContractRef {
            id: contract.id,
            code: contract.code,
            title: contract.title,
        },
        status,
        column: Column::of(status),
        badge: status.badge(survey.urgent),
        urgent: survey.urgent,
        requester: survey.requester,
        request_text: survey.request_text,
        needed_date: survey.needed_date,
        admin_deadline: survey.admin_deadline,
        completed_at: survey.completed_at.map(to_iso),
        created_at: to_iso(survey.created_at),
        updated_at: to_iso(survey.updated_at),
        mine: survey.created_by == viewer.user_id,
    })
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
