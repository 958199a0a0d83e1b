use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::{prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    error::{AppError, AppResult},
    kanban::Column,
    models::{Contract, NewContract},
    schema::{contracts, surveys},
    state::AppState,
    status::SurveyStatus,
};

use super::surveys::to_iso;

const SEARCH_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct ContractQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateContractRequest {
    pub code: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct ContractResponse {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Serialize, Default, Debug, PartialEq, Eq)]
pub struct DashboardCounts {
    pub open: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub mine: i64,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub contract: ContractResponse,
    pub counts: DashboardCounts,
}

pub async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<ContractQuery>,
) -> AppResult<Json<Vec<ContractResponse>>> {
    let mut conn = state.db()?;
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();

    let rows: Vec<Contract> = if term.is_empty() {
        contracts::table
            .order(contracts::code.asc())
            .load(&mut conn)?
    } else {
        let pattern = format!("%{}%", escape_like(term));
        contracts::table
            .filter(
                contracts::code
                    .ilike(pattern.clone())
                    .or(contracts::title.ilike(pattern)),
            )
            .order(contracts::id.desc())
            .limit(SEARCH_LIMIT)
            .load(&mut conn)?
    };

    Ok(Json(rows.into_iter().map(to_contract_response).collect()))
}

pub async fn create_contract(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateContractRequest>,
) -> AppResult<(StatusCode, Json<ContractResponse>)> {
    let code = payload.code.trim();
    let title = payload.title.trim();
    if code.is_empty() || title.is_empty() {
        return Err(AppError::bad_request("code and title must not be empty"));
    }

    let mut conn = state.db()?;
    let new_contract = NewContract {
        code: code.to_string(),
        title: title.to_string(),
        created_by: Some(admin.user_id),
    };

    let contract: Contract = match diesel::insert_into(contracts::table)
        .values(&new_contract)
        .get_result(&mut conn)
    {
        Ok(contract) => contract,
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request("contract code already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    tracing::info!(contract_id = contract.id, code = %contract.code, "contract created");
    Ok((StatusCode::CREATED, Json(to_contract_response(contract))))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<i64>,
) -> AppResult<Json<ContractResponse>> {
    let mut conn = state.db()?;
    let contract: Contract = contracts::table.find(contract_id).first(&mut conn)?;
    Ok(Json(to_contract_response(contract)))
}

pub async fn contract_dashboard(
    State(state): State<AppState>,
    Path(contract_id): Path<i64>,
    user: AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    let mut conn = state.db()?;
    let contract: Contract = contracts::table.find(contract_id).first(&mut conn)?;

    let rows: Vec<(String, Uuid)> = surveys::table
        .filter(surveys::contract_id.eq(contract_id))
        .select((surveys::status, surveys::created_by))
        .load(&mut conn)?;

    let mut statuses = Vec::with_capacity(rows.len());
    for (raw_status, created_by) in rows {
        statuses.push((raw_status.parse::<SurveyStatus>()?, created_by));
    }

    Ok(Json(DashboardResponse {
        contract: to_contract_response(contract),
        counts: count_by_column(&statuses, user.user_id),
    }))
}

fn count_by_column(statuses: &[(SurveyStatus, Uuid)], viewer: Uuid) -> DashboardCounts {
    let mut counts = DashboardCounts::default();
    for (status, created_by) in statuses {
        match Column::of(*status) {
            Column::Open => counts.open += 1,
            Column::InProgress => counts.in_progress += 1,
            Column::Done => counts.completed += 1,
            Column::Cancelled => counts.cancelled += 1,
        }
        if *created_by == viewer {
            counts.mine += 1;
        }
    }
    counts
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn to_contract_response(contract: Contract) -> ContractResponse {
    ContractResponse {
        id: contract.id,
        code: contract.code,
        title: contract.title,
        created_at: to_iso(contract.created_at),
    }
}
