use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use deductly_classify::{BulkClassifyReport, ExpenseInsights};
use deductly_core::{
    DateRange, Expense, ExpenseId, ExpensePatch, NewExpense, UnvalidatedExpense, ValidationError,
};
use deductly_sync::render_csv;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{server::AppState, ApiError};

/// Create body. `amount` may arrive as a JSON string or number.
#[derive(Debug, Deserialize)]
struct CreateExpense {
    date: String,
    vendor: String,
    amount: Value,
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    deductibility: Option<String>,
}

impl CreateExpense {
    fn into_unvalidated(self) -> Result<UnvalidatedExpense, ValidationError> {
        let amount = match self.amount {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => return Err(ValidationError::InvalidAmount(other.to_string())),
        };
        Ok(UnvalidatedExpense {
            date: self.date,
            vendor: self.vendor,
            amount,
            description: self.description,
            category: self.category,
            deductibility: self.deductibility,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategorizeAllResponse {
    message: String,
    #[serde(flatten)]
    report: BulkClassifyReport,
}

fn read_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(state.store.list()?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Expense>, ApiError> {
    let id = ExpenseId(id);
    state
        .store
        .get(id)?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

/// Validates, stores, then enriches unless the caller picked a category.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Expense>, ApiError> {
    let raw = read_body::<CreateExpense>(body)?.into_unvalidated()?;
    let new = NewExpense::validate(raw)?;
    let expense = state.pipeline.create_expense(new).await?;
    tracing::info!("Created expense {} ({})", expense.id, expense.vendor);
    Ok(Json(expense))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Expense>, ApiError> {
    let id = ExpenseId(id);
    let patch: ExpensePatch = read_body(body)?;
    patch.validate()?;
    state
        .store
        .update(id, patch)?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let id = ExpenseId(id);
    if !state.store.delete(id)? {
        return Err(ApiError::NotFound(id));
    }
    tracing::info!("Deleted expense {id}");
    Ok(Json(json!({ "message": "Expense deleted successfully" })))
}

pub async fn by_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let (Some(start), Some(end)) = (query.start, query.end) else {
        return Err(ApiError::BadRequest("start and end dates are required".to_string()));
    };
    let range = DateRange::parse(&start, &end)?;
    Ok(Json(state.store.by_date_range(range)?))
}

pub async fn categorize_all(
    State(state): State<AppState>,
) -> Result<Json<CategorizeAllResponse>, ApiError> {
    let report = state.pipeline.classify_all().await?;
    Ok(Json(CategorizeAllResponse {
        message: format!("Successfully categorized {} expenses", report.updated),
        report,
    }))
}

pub async fn insights(State(state): State<AppState>) -> Result<Json<ExpenseInsights>, ApiError> {
    Ok(Json(state.pipeline.insights().await?))
}

pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let csv = render_csv(&state.store.list()?)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"expenses.csv\"",
            ),
        ],
        csv,
    ))
}
