use axum::{
    extract::{Query, State},
    Json,
};
use deductly_core::{dashboard_stats, tax_summary, DashboardStats, DateRange, TaxSummary};
use serde::Deserialize;

use crate::{server::AppState, ApiError};

#[derive(Debug, Deserialize)]
pub struct TaxSummaryQuery {
    /// Restrict the summary to one calendar year.
    year: Option<i32>,
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    let expenses = state.store.list()?;
    Ok(Json(dashboard_stats(&expenses)))
}

pub async fn tax(
    State(state): State<AppState>,
    Query(query): Query<TaxSummaryQuery>,
) -> Result<Json<TaxSummary>, ApiError> {
    let expenses = match query.year {
        Some(year) => {
            let range = DateRange::tax_year(year)
                .ok_or_else(|| ApiError::BadRequest(format!("year {year} is out of range")))?;
            state.store.by_date_range(range)?
        }
        None => state.store.list()?,
    };
    Ok(Json(tax_summary(&expenses)))
}
