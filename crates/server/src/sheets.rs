use axum::{extract::State, Json};
use deductly_sync::{export_to_source, import_from_source, ImportReport};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{server::AppState, ApiError};

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    message: String,
    #[serde(flatten)]
    report: ImportReport,
}

pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    let report = import_from_source(state.source.as_ref(), state.store.as_ref()).await?;
    Ok(Json(SyncResponse {
        message: format!(
            "Successfully imported {} expenses from Google Sheets",
            report.imported
        ),
        report,
    }))
}

pub async fn export(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let exported = export_to_source(state.source.as_ref(), state.store.as_ref()).await?;
    Ok(Json(json!({
        "message": format!("Successfully exported {exported} expenses to Google Sheets"),
        "exported": exported,
    })))
}

/// Never fails: an unreachable or unconfigured sheet is just disconnected.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let connected = state.source.test_connection().await;
    Json(json!({ "connected": connected }))
}
