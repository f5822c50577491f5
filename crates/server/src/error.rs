use axum::{http::StatusCode, response::IntoResponse, Json};
use deductly_classify::{ClassifierError, PipelineError};
use deductly_core::{ExpenseId, ValidationError};
use deductly_storage::StoreError;
use deductly_sync::{CsvExportError, SourceError, SyncError};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    /// Body or query that could not be read at all.
    BadRequest(String),
    Validation(ValidationError),
    NotFound(ExpenseId),
    Store(StoreError),
    Classifier(ClassifierError),
    Source(SourceError),
    Csv(CsvExportError),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Classifier(ClassifierError::NotConfigured)
            | ApiError::Source(SourceError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Classifier(_) | ApiError::Source(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) | ApiError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(e) => format!("Invalid request: {e}"),
            ApiError::Validation(e) => format!("Invalid expense data: {e}"),
            ApiError::NotFound(_) => "Expense not found".to_string(),
            ApiError::Store(e) => {
                tracing::error!("store error: {e}");
                "internal server error".to_string()
            }
            ApiError::Csv(e) => {
                tracing::error!("csv export error: {e}");
                "Failed to export CSV".to_string()
            }
            ApiError::Classifier(e) => {
                tracing::error!("classifier error: {e}");
                e.to_string()
            }
            ApiError::Source(e) => {
                tracing::error!("record source error: {e}");
                e.to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = self.message();
        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl From<ClassifierError> for ApiError {
    fn from(e: ClassifierError) -> Self {
        ApiError::Classifier(e)
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        ApiError::Source(e)
    }
}

impl From<CsvExportError> for ApiError {
    fn from(e: CsvExportError) -> Self {
        ApiError::Csv(e)
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Store(e) => ApiError::Store(e),
            PipelineError::Classifier(e) => ApiError::Classifier(e),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) => ApiError::Store(e),
            SyncError::Source(e) => ApiError::Source(e),
        }
    }
}
