use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::application::{AppError, MetricsFilter, RecordFilter, RecordView};
use crate::domain::{
    AssetType, AssetTypeId, AuditEntry, Base, BaseId, DashboardMetrics, MovementKind,
    MovementRecord, Quantity,
};

use super::{ApiError, AppState};

type ApiResult<T> = Result<T, ApiError>;
type Created = (StatusCode, Json<RecordView>);

// ========================
// Query parameters
// ========================

/// Filters arrive as strings: the UI sends `?base=` for "all bases".
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    base: Option<String>,
    asset_type: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordParams {
    base: Option<String>,
    from_base: Option<String>,
    to_base: Option<String>,
    asset_type: Option<String>,
    #[serde(rename = "date__gte")]
    date_gte: Option<String>,
    #[serde(rename = "date__lte")]
    date_lte: Option<String>,
    limit: Option<String>,
}

impl RecordParams {
    fn into_filter(self, kind: MovementKind) -> ApiResult<RecordFilter> {
        let (from_base, to_base) = match kind {
            MovementKind::Transfer => (
                parse_id("from_base", self.from_base)?,
                parse_id("to_base", self.to_base)?,
            ),
            _ => (None, None),
        };

        Ok(RecordFilter {
            base: parse_id("base", self.base)?,
            from_base,
            to_base,
            asset_type: parse_id("asset_type", self.asset_type)?,
            date_from: parse_date("date__gte", self.date_gte)?,
            date_to: parse_date("date__lte", self.date_lte)?,
            limit: parse_limit(self.limit)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    limit: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_id(name: &str, value: Option<String>) -> ApiResult<Option<i64>> {
    non_empty(value)
        .map(|raw| {
            raw.parse()
                .map_err(|_| ApiError::BadRequest(format!("Invalid {}: '{}' is not an id", name, raw)))
        })
        .transpose()
}

fn parse_date(name: &str, value: Option<String>) -> ApiResult<Option<NaiveDate>> {
    non_empty(value)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("Invalid {}: '{}' is not a YYYY-MM-DD date", name, raw))
            })
        })
        .transpose()
}

/// Limits are capped at `u32::MAX` so the SQL `LIMIT` always fits SQLite's integer range.
fn parse_limit(value: Option<String>) -> ApiResult<Option<usize>> {
    non_empty(value)
        .map(|raw| {
            raw.parse::<u32>()
                .map(|limit| limit as usize)
                .map_err(|_| ApiError::BadRequest(format!("Invalid limit: '{}'", raw)))
        })
        .transpose()
}

// ========================
// Request bodies
// ========================

#[derive(Debug, Deserialize)]
pub struct PurchaseInput {
    base: BaseId,
    asset_type: AssetTypeId,
    quantity: Quantity,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct TransferInput {
    from_base: BaseId,
    to_base: BaseId,
    asset_type: AssetTypeId,
    quantity: Quantity,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentInput {
    personnel_name: String,
    base: BaseId,
    asset_type: AssetTypeId,
    quantity: Quantity,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ExpenditureInput {
    base: BaseId,
    asset_type: AssetTypeId,
    quantity: Quantity,
    date: NaiveDate,
    #[serde(default)]
    reason: Option<String>,
}

// ========================
// Handlers
// ========================

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /bases/
pub async fn list_bases(State(state): State<AppState>) -> ApiResult<Json<Vec<Base>>> {
    Ok(Json(state.service.list_bases().await?))
}

/// GET /asset-types/
pub async fn list_asset_types(State(state): State<AppState>) -> ApiResult<Json<Vec<AssetType>>> {
    Ok(Json(state.service.list_asset_types().await?))
}

/// GET /dashboard/
pub async fn dashboard(
    State(state): State<AppState>,
    query: Result<Query<DashboardParams>, QueryRejection>,
) -> ApiResult<Json<DashboardMetrics>> {
    let Query(params) = query?;
    let filter = MetricsFilter {
        base: parse_id("base", params.base)?,
        asset_type: parse_id("asset_type", params.asset_type)?,
        date_from: parse_date("date_from", params.date_from)?,
        date_to: parse_date("date_to", params.date_to)?,
    };
    Ok(Json(state.service.compute_metrics(filter).await?))
}

/// GET /audit-log/
pub async fn audit_log(
    State(state): State<AppState>,
    query: Result<Query<AuditParams>, QueryRejection>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let Query(params) = query?;
    let limit = parse_limit(params.limit)?;
    Ok(Json(state.service.list_audit_log(limit).await?))
}

async fn list_kind(
    state: &AppState,
    kind: MovementKind,
    params: RecordParams,
) -> ApiResult<Json<Vec<RecordView>>> {
    let filter = params.into_filter(kind)?;
    Ok(Json(state.service.list_records(kind, filter).await?))
}

async fn get_kind(state: &AppState, kind: MovementKind, id: &str) -> ApiResult<Json<RecordView>> {
    let id = Uuid::parse_str(id)
        .map_err(|_| ApiError::NotFound(format!("Record not found: {}", id)))?;

    let record = state.service.get_record(id).await?;
    if record.kind() != kind {
        return Err(AppError::RecordNotFound(id).into());
    }
    Ok(Json(state.service.describe(&record).await?))
}

async fn created(state: &AppState, record: &MovementRecord) -> ApiResult<Created> {
    let view = state.service.describe(record).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    query: Result<Query<RecordParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let Query(params) = query?;
    list_kind(&state, MovementKind::Purchase, params).await
}

pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordView>> {
    get_kind(&state, MovementKind::Purchase, &id).await
}

pub async fn create_purchase(
    State(state): State<AppState>,
    payload: Result<Json<PurchaseInput>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(input) = payload?;
    let record = state
        .service
        .create_purchase(
            input.base,
            input.asset_type,
            input.quantity,
            input.date,
            state.operator.clone(),
        )
        .await?;
    created(&state, &record).await
}

pub async fn list_transfers(
    State(state): State<AppState>,
    query: Result<Query<RecordParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let Query(params) = query?;
    list_kind(&state, MovementKind::Transfer, params).await
}

pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordView>> {
    get_kind(&state, MovementKind::Transfer, &id).await
}

pub async fn create_transfer(
    State(state): State<AppState>,
    payload: Result<Json<TransferInput>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(input) = payload?;
    let record = state
        .service
        .create_transfer(
            input.from_base,
            input.to_base,
            input.asset_type,
            input.quantity,
            input.date,
            state.operator.clone(),
        )
        .await?;
    created(&state, &record).await
}

pub async fn list_assignments(
    State(state): State<AppState>,
    query: Result<Query<RecordParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let Query(params) = query?;
    list_kind(&state, MovementKind::Assignment, params).await
}

pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordView>> {
    get_kind(&state, MovementKind::Assignment, &id).await
}

pub async fn create_assignment(
    State(state): State<AppState>,
    payload: Result<Json<AssignmentInput>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(input) = payload?;
    let record = state
        .service
        .create_assignment(
            input.personnel_name,
            input.base,
            input.asset_type,
            input.quantity,
            input.date,
            state.operator.clone(),
        )
        .await?;
    created(&state, &record).await
}

pub async fn list_expenditures(
    State(state): State<AppState>,
    query: Result<Query<RecordParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let Query(params) = query?;
    list_kind(&state, MovementKind::Expenditure, params).await
}

pub async fn get_expenditure(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordView>> {
    get_kind(&state, MovementKind::Expenditure, &id).await
}

pub async fn create_expenditure(
    State(state): State<AppState>,
    payload: Result<Json<ExpenditureInput>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(input) = payload?;
    let record = state
        .service
        .create_expenditure(
            input.base,
            input.asset_type,
            input.quantity,
            input.date,
            input.reason,
            state.operator.clone(),
        )
        .await?;
    created(&state, &record).await
}
