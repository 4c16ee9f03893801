//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::{Value, json};

use super::AppState;
use super::auth::{Role, require_role};
use super::error::ApiError;
use super::types::{ListQuery, MonthQuery, QuoteRequest, QuoteResponse};
use crate::applicants::{self, RankRequest, RankedApplicant};
use crate::billing::{Coverage, RateTable};
use crate::domain::{
    Contract, ContractDraft, FieldError, Period, Pricing, RateDraft, ReadingDraft, UtilityBill,
    UtilityRate, UtilityReading, UtilityType,
};
use crate::io::export::{write_bills_csv, write_readings_csv};
use crate::listing::{self, Page, filter_search, sort_by};
use crate::reporting::MonthlySummary;
use crate::store::StoreError;

type ApiResult<T> = Result<T, ApiError>;

/// `GET /health` → 200 `{"status":"ok"}`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- rates ---

/// `GET /api/UtilityRates?type=&search=&$orderby=&page=&pageSize=`
pub async fn list_rates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<UtilityRate>>> {
    let utility_type = query.utility_type()?;
    let store = state.store.read().await;
    let rows = store
        .rates()
        .filter(|r| utility_type.is_none_or(|t| r.utility_type == t));
    let page = listing::list(rows, &query.list_request(), &state.config.listing)?;
    Ok(Json(page))
}

pub async fn get_rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<UtilityRate>> {
    let store = state.store.read().await;
    Ok(Json(store.rate(id)?.clone()))
}

/// `POST /api/UtilityRates` (Staff) → 201 + created rate
pub async fn create_rate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<RateDraft>,
) -> ApiResult<impl IntoResponse> {
    require_role(&state.config.auth, &headers, Role::Staff)?;
    let rate = state.store.write().await.create_rate(draft)?;
    tracing::info!(id = rate.id, utility_type = %rate.utility_type, tier = rate.tier, "rate created");
    Ok((StatusCode::CREATED, Json(rate)))
}

/// `PUT /api/UtilityRates/{id}` (Staff)
pub async fn update_rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(draft): Json<RateDraft>,
) -> ApiResult<Json<UtilityRate>> {
    require_role(&state.config.auth, &headers, Role::Staff)?;
    let rate = state.store.write().await.update_rate(id, draft)?;
    tracing::info!(id, "rate updated");
    Ok(Json(rate))
}

/// `DELETE /api/UtilityRates/{id}` (Staff) → 204
pub async fn delete_rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    require_role(&state.config.auth, &headers, Role::Staff)?;
    state.store.write().await.delete_rate(id)?;
    tracing::info!(id, "rate deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/UtilityRates/coverage` → billing readiness per utility type
pub async fn rate_coverage(State(state): State<Arc<AppState>>) -> Json<Vec<Coverage>> {
    let store = state.store.read().await;
    let report = UtilityType::ALL
        .iter()
        .map(|&t| RateTable::for_type(t, store.rates_of(t)).coverage())
        .collect();
    Json(report)
}

/// `POST /api/UtilityRates/quote` → tier breakdown for a consumption
///
/// 422 when the type's rate table is empty or malformed.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<QuoteResponse>> {
    if request.consumption < 0 {
        return Err(ApiError::Invalid(vec![FieldError::new(
            "consumption",
            "must be >= 0",
        )]));
    }
    let store = state.store.read().await;
    let rates = RateTable::for_type(request.utility_type, store.rates_of(request.utility_type));
    let priced = rates.ensure_billable().and_then(|table| {
        Ok((table.split(request.consumption)?, table.quote(request.consumption)?))
    });
    let (charges, amount) = priced.map_err(StoreError::from)?;
    Ok(Json(QuoteResponse {
        utility_type: request.utility_type,
        consumption: request.consumption,
        pricing: Pricing::Tiered,
        amount,
        charges,
        currency: state.config.billing.currency.clone(),
    }))
}

// --- contracts ---

pub async fn list_contracts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<Contract>>> {
    let store = state.store.read().await;
    let page = listing::list(store.contracts(), &query.list_request(), &state.config.listing)?;
    Ok(Json(page))
}

pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Contract>> {
    let store = state.store.read().await;
    Ok(Json(store.contract(id)?.clone()))
}

/// `POST /api/Contracts` (Owner) → 201 + created contract
pub async fn create_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<ContractDraft>,
) -> ApiResult<impl IntoResponse> {
    require_role(&state.config.auth, &headers, Role::Owner)?;
    let contract = state.store.write().await.create_contract(draft)?;
    tracing::info!(id = contract.id, room = %contract.room_name, "contract created");
    Ok((StatusCode::CREATED, Json(contract)))
}

// --- readings ---

/// Record filters taken from a list query, parsed once per request.
struct RecordFilter {
    utility_type: Option<UtilityType>,
    contract_id: Option<u64>,
    period: Option<Period>,
}

impl RecordFilter {
    fn from_query(query: &ListQuery) -> ApiResult<Self> {
        Ok(Self {
            utility_type: query.utility_type()?,
            contract_id: query.contract_id,
            period: query.period()?,
        })
    }

    fn reading(&self, r: &UtilityReading) -> bool {
        self.utility_type.is_none_or(|t| r.utility_type == t)
            && self.contract_id.is_none_or(|c| r.contract_id == c)
            && self.period.is_none_or(|p| p.contains(r.reading_date))
    }

    fn bill(&self, b: &UtilityBill) -> bool {
        self.contract_id.is_none_or(|c| b.contract_id == c)
            && self.period.is_none_or(|p| b.period == p)
    }
}

/// `GET /api/UtilityReadings?type=&contractId=&month=&search=&$orderby=&page=&pageSize=`
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<UtilityReading>>> {
    let filter = RecordFilter::from_query(&query)?;
    let store = state.store.read().await;
    let rows = store.readings().filter(|r| filter.reading(r));
    let page = listing::list(rows, &query.list_request(), &state.config.listing)?;
    Ok(Json(page))
}

pub async fn get_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<UtilityReading>> {
    let store = state.store.read().await;
    Ok(Json(store.reading(id)?.clone()))
}

/// `POST /api/UtilityReadings` (Owner) → 201 + stored reading
///
/// 404 when the contract does not exist, 400 with field errors when the form
/// is invalid.
pub async fn create_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<ReadingDraft>,
) -> ApiResult<impl IntoResponse> {
    require_role(&state.config.auth, &headers, Role::Owner)?;
    let policy = state.config.billing.index_policy();
    let reading = state.store.write().await.create_reading(draft, policy)?;
    tracing::info!(
        id = reading.id,
        contract_id = reading.contract_id,
        utility_type = %reading.utility_type,
        consumption = reading.consumption,
        "reading recorded"
    );
    Ok((StatusCode::CREATED, Json(reading)))
}

/// `PUT /api/UtilityReadings/{id}` (Owner)
pub async fn update_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(draft): Json<ReadingDraft>,
) -> ApiResult<Json<UtilityReading>> {
    require_role(&state.config.auth, &headers, Role::Owner)?;
    let policy = state.config.billing.index_policy();
    let reading = state.store.write().await.update_reading(id, draft, policy)?;
    tracing::info!(id, "reading updated");
    Ok(Json(reading))
}

/// `DELETE /api/UtilityReadings/{id}` (Owner) → 204
pub async fn delete_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    require_role(&state.config.auth, &headers, Role::Owner)?;
    state.store.write().await.delete_reading(id)?;
    tracing::info!(id, "reading deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn csv_response(filename: &str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

/// `GET /api/UtilityReadings/export` → CSV of every matching reading
///
/// Accepts the list filters; pagination parameters are ignored.
pub async fn export_readings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = RecordFilter::from_query(&query)?;
    let store = state.store.read().await;
    let mut rows = filter_search(
        store.readings().filter(|r| filter.reading(r)),
        query.search.as_deref(),
    );
    if let Some(order_by) = query.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
        sort_by(&mut rows, order_by)?;
    }
    let mut body = Vec::new();
    write_readings_csv(rows, &mut body)?;
    Ok(csv_response("utility-readings.csv", body))
}

// --- bills ---

/// `GET /api/UtilityBills?contractId=&month=&search=&$orderby=&page=&pageSize=`
pub async fn list_bills(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<UtilityBill>>> {
    let filter = RecordFilter::from_query(&query)?;
    let store = state.store.read().await;
    let rows = store.bills().filter(|b| filter.bill(b));
    let page = listing::list(rows, &query.list_request(), &state.config.listing)?;
    Ok(Json(page))
}

pub async fn get_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<UtilityBill>> {
    let store = state.store.read().await;
    Ok(Json(store.bill(id)?.clone()))
}

/// `GET /api/UtilityBills/export` → CSV, one row per bill line
pub async fn export_bills(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = RecordFilter::from_query(&query)?;
    let store = state.store.read().await;
    let mut rows = filter_search(
        store.bills().filter(|b| filter.bill(b)),
        query.search.as_deref(),
    );
    if let Some(order_by) = query.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
        sort_by(&mut rows, order_by)?;
    }
    let mut body = Vec::new();
    write_bills_csv(rows, &mut body)?;
    Ok(csv_response("utility-bills.csv", body))
}

/// `POST /api/UtilityBills/monthly/{contractId}?month=YYYY-MM` (Owner)
///
/// Generates (or regenerates) the contract's bill for the month; the month
/// defaults to the current one. 422 when the month has no readings or a
/// needed rate table is malformed.
pub async fn generate_monthly_bill(
    State(state): State<Arc<AppState>>,
    Path(contract_id): Path<u64>,
    Query(month): Query<MonthQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<UtilityBill>> {
    require_role(&state.config.auth, &headers, Role::Owner)?;
    let now = Utc::now();
    let period = month.period_or(now.date_naive())?;
    let bill = state
        .store
        .write()
        .await
        .generate_bill(contract_id, period, now)
        .inspect_err(|e| tracing::warn!(contract_id, %period, error = %e, "bill not generated"))?;
    tracing::info!(
        id = bill.id,
        contract_id,
        %period,
        total = %bill.total,
        "bill generated"
    );
    Ok(Json(bill))
}

// --- reports & applicants ---

/// `GET /api/Reports/monthly?month=YYYY-MM`
pub async fn monthly_report(
    State(state): State<Arc<AppState>>,
    Query(month): Query<MonthQuery>,
) -> ApiResult<Json<MonthlySummary>> {
    let period = month.period_or(Utc::now().date_naive())?;
    let store = state.store.read().await;
    let summary =
        MonthlySummary::from_bills(period, store.bills_for(period)).map_err(StoreError::from)?;
    Ok(Json(summary))
}

/// `POST /api/Applicants/rank` → applicants ordered by priority score
pub async fn rank_applicants(Json(request): Json<RankRequest>) -> ApiResult<Json<Vec<RankedApplicant>>> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(ApiError::Invalid(errors));
    }
    let evaluated_on = request
        .evaluation_date
        .unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(applicants::rank(&request, evaluated_on)))
}
