use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use deductly_classify::{ClassificationPipeline, Classifier};
use deductly_storage::ExpenseStore;
use deductly_sync::RecordSource;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{dashboard, expenses, sheets};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClassificationPipeline>,
    pub store: Arc<dyn ExpenseStore>,
    pub source: Arc<dyn RecordSource>,
}

impl AppState {
    /// The pipeline and the handlers share one store.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ExpenseStore>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        let pipeline = Arc::new(ClassificationPipeline::new(classifier, store.clone()));
        Self {
            pipeline,
            store,
            source,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/expenses", get(expenses::list).post(expenses::create))
        .route("/api/expenses/range", get(expenses::by_range))
        .route("/api/expenses/categorize-all", post(expenses::categorize_all))
        .route("/api/expenses/insights", get(expenses::insights))
        .route("/api/expenses/export/csv", get(expenses::export_csv))
        .route(
            "/api/expenses/{id}",
            get(expenses::get)
                .patch(expenses::update)
                .delete(expenses::delete),
        )
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/dashboard/tax-summary", get(dashboard::tax))
        .route("/api/sheets/sync", post(sheets::sync))
        .route("/api/sheets/export", post(sheets::export))
        .route("/api/sheets/status", get(sheets::status))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use chrono::NaiveDate;
    use deductly_classify::{MockClassifier, OpenAiClassifier, OpenAiConfig};
    use deductly_core::{Category, Deductibility, Expense, Money, NewExpense};
    use deductly_storage::MemStore;
    use deductly_sync::{CandidateExpense, SourceError};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeSource {
        rows: Vec<CandidateExpense>,
        written: Mutex<Vec<Expense>>,
        connected: bool,
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn read_all(&self) -> Result<Vec<CandidateExpense>, SourceError> {
            if !self.connected {
                return Err(SourceError::NotConfigured);
            }
            Ok(self.rows.clone())
        }

        async fn write_all(&self, expenses: &[Expense]) -> Result<(), SourceError> {
            if !self.connected {
                return Err(SourceError::NotConfigured);
            }
            *self.written.lock().unwrap() = expenses.to_vec();
            Ok(())
        }

        async fn test_connection(&self) -> bool {
            self.connected
        }
    }

    fn state_with(classifier: MockClassifier, source: FakeSource) -> AppState {
        AppState::new(
            Arc::new(classifier),
            Arc::new(MemStore::new()),
            Arc::new(source),
        )
    }

    fn test_state() -> AppState {
        state_with(
            MockClassifier::new(Category::Software, Deductibility::Fully),
            FakeSource::default(),
        )
    }

    fn seed(state: &AppState, date: &str, vendor: &str, cents: i64) -> Expense {
        state
            .store
            .create(NewExpense {
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                vendor: vendor.to_string(),
                amount: Money::from_cents(cents),
                description: format!("{vendor} purchase"),
                category: None,
                deductibility: None,
            })
            .unwrap()
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn create_without_category_is_enriched() {
        let state = test_state();
        let (status, body) = send(
            &state,
            "POST",
            "/api/expenses",
            Some(json!({
                "date": "2024-01-15",
                "vendor": "Adobe",
                "amount": "52.99",
                "description": "Creative Cloud"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
        assert_eq!(body["amount"], "52.99");
        assert_eq!(body["category"], "Software");
        assert_eq!(body["deductibility"], "Fully Deductible");
    }

    #[tokio::test]
    async fn create_with_category_skips_classifier() {
        let state = test_state();
        let (status, body) = send(
            &state,
            "POST",
            "/api/expenses",
            Some(json!({
                "date": "2024-02-01",
                "vendor": "Delta",
                "amount": 320,
                "description": "Flight",
                "category": "Travel"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "Travel");
        assert_eq!(body["deductibility"], Value::Null);
        assert_eq!(body["amount"], "320.00");
    }

    #[tokio::test]
    async fn classifier_failure_still_creates_expense() {
        let state = state_with(
            MockClassifier::new(Category::Software, Deductibility::Fully).failing_category_for("Adobe"),
            FakeSource::default(),
        );
        let (status, body) = send(
            &state,
            "POST",
            "/api/expenses",
            Some(json!({
                "date": "2024-01-15",
                "vendor": "Adobe",
                "amount": "52.99",
                "description": "Creative Cloud"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], Value::Null);
        assert_eq!(state.store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_create_bodies_are_rejected() {
        let state = test_state();
        let negative = json!({
            "date": "2024-01-15",
            "vendor": "Adobe",
            "amount": "-1.00",
            "description": "refund"
        });
        let (status, body) = send(&state, "POST", "/api/expenses", Some(negative)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid expense data"));

        let missing_date = json!({ "vendor": "Adobe", "amount": "1", "description": "x" });
        let (status, _) = send(&state, "POST", "/api/expenses", Some(missing_date)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(state.store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_update_delete_by_id() {
        let state = test_state();
        let expense = seed(&state, "2024-01-10", "Staples", 1999);
        let uri = format!("/api/expenses/{}", expense.id);

        let (status, body) = send(&state, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vendor"], "Staples");

        let (status, body) = send(
            &state,
            "PATCH",
            &uri,
            Some(json!({ "description": "Printer paper", "category": "Office Supplies" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Printer paper");
        assert_eq!(body["category"], "Office Supplies");
        assert_eq!(body["deductibility"], Value::Null);

        let (status, _) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Expense not found");
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let state = test_state();
        let (status, _) = send(&state, "GET", "/api/expenses/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &state,
            "PATCH",
            "/api/expenses/42",
            Some(json!({ "vendor": "Nobody" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn range_is_inclusive() {
        let state = test_state();
        seed(&state, "2024-01-01", "Jan", 100);
        seed(&state, "2024-02-15", "Feb", 100);
        seed(&state, "2024-03-31", "Mar", 100);
        seed(&state, "2024-04-01", "Apr", 100);

        let (status, body) = send(
            &state,
            "GET",
            "/api/expenses/range?start=2024-01-01&end=2024-03-31",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let vendors: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["vendor"].as_str().unwrap())
            .collect();
        assert_eq!(vendors, vec!["Mar", "Feb", "Jan"]);

        let (status, _) = send(&state, "GET", "/api/expenses/range?start=2024-01-01", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn categorize_all_reports_partial_success() {
        let state = state_with(
            MockClassifier::new(Category::Marketing, Deductibility::Partially)
                .failing_category_for("Flaky")
                .failing_deductibility_for("Broken"),
            FakeSource::default(),
        );
        seed(&state, "2024-01-01", "Meta", 10000);
        seed(&state, "2024-01-02", "Flaky", 500);
        seed(&state, "2024-01-03", "Broken", 700);

        let (status, body) = send(&state, "POST", "/api/expenses/categorize-all", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidates"], 3);
        assert_eq!(body["updated"], 1);
        assert_eq!(body["message"], "Successfully categorized 1 expenses");
    }

    #[tokio::test]
    async fn insights_come_from_classifier() {
        let state = test_state();
        seed(&state, "2024-01-01", "Meta", 10000);
        let (status, body) = send(&state, "GET", "/api/expenses/insights", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "1 expenses reviewed");
    }

    #[tokio::test]
    async fn insights_without_api_key_are_unavailable() {
        let classifier = OpenAiClassifier::new(OpenAiConfig::default()).unwrap();
        let state = AppState::new(
            Arc::new(classifier),
            Arc::new(MemStore::new()),
            Arc::new(FakeSource::default()),
        );
        let (status, _) = send(&state, "GET", "/api/expenses/insights", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn csv_export_is_an_attachment() {
        let state = test_state();
        seed(&state, "2024-01-15", "Smith, Jones", 4999);

        let request = Request::builder()
            .uri("/api/expenses/export/csv")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"expenses.csv\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(
            text,
            "Date,Vendor,Amount,Description,Category,Deductibility\n\
             2024-01-15,\"Smith, Jones\",49.99,\"Smith, Jones purchase\",,\n"
        );
    }

    #[tokio::test]
    async fn dashboard_stats_and_tax_summary() {
        let state = test_state();
        let a = seed(&state, "2024-01-01", "Adobe", 1550);
        let b = seed(&state, "2024-01-02", "Cafe", 450);
        seed(&state, "2023-12-31", "Old", 1000);
        state
            .store
            .update(
                a.id,
                deductly_core::ExpensePatch::classification(
                    Some(Category::Software),
                    Some(Deductibility::Fully),
                ),
            )
            .unwrap();
        state
            .store
            .update(
                b.id,
                deductly_core::ExpensePatch::classification(
                    Some(Category::Meals),
                    Some(Deductibility::Not),
                ),
            )
            .unwrap();

        let (status, body) = send(&state, "GET", "/api/dashboard/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalExpenses"], "30.00");
        assert_eq!(body["deductibleAmount"], "15.50");
        assert_eq!(body["categorizedCount"], 2);
        assert_eq!(body["aiAccuracy"], "67%");

        let (status, body) = send(&state, "GET", "/api/dashboard/tax-summary?year=2024", None).await;
        assert_eq!(status, StatusCode::OK);
        let buckets = body["buckets"].as_array().unwrap();
        assert_eq!(buckets.len(), 3);
        let fully = buckets
            .iter()
            .find(|b| b["deductibility"] == "Fully Deductible")
            .unwrap();
        assert_eq!(fully["total"], "15.50");
        assert_eq!(fully["count"], 1);
        let partial = buckets
            .iter()
            .find(|b| b["deductibility"] == "Partially Deductible")
            .unwrap();
        assert_eq!(partial["total"], "0.00");
        assert_eq!(partial["count"], 0);
    }

    #[tokio::test]
    async fn sheets_sync_imports_complete_rows() {
        let row = |vendor: Option<&str>| CandidateExpense {
            date: Some("2024-05-01".to_string()),
            vendor: vendor.map(str::to_string),
            amount: Some("12.00".to_string()),
            description: Some("lunch".to_string()),
            ..Default::default()
        };
        let source = FakeSource {
            rows: vec![row(Some("Cafe")), row(None), row(Some("Deli"))],
            connected: true,
            ..Default::default()
        };
        let state = state_with(
            MockClassifier::new(Category::Meals, Deductibility::Partially),
            source,
        );

        let (status, body) = send(&state, "POST", "/api/sheets/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);
        assert_eq!(body["droppedIncomplete"], 1);
        assert_eq!(
            body["message"],
            "Successfully imported 2 expenses from Google Sheets"
        );
        assert!(state
            .store
            .list()
            .unwrap()
            .iter()
            .all(Expense::is_pending_classification));
    }

    #[tokio::test]
    async fn sheets_export_and_status() {
        let state = state_with(
            MockClassifier::new(Category::Meals, Deductibility::Partially),
            FakeSource {
                connected: true,
                ..Default::default()
            },
        );
        seed(&state, "2024-05-01", "Cafe", 1200);

        let (status, body) = send(&state, "POST", "/api/sheets/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exported"], 1);

        let (status, body) = send(&state, "GET", "/api/sheets/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connected"], true);
    }

    #[tokio::test]
    async fn disconnected_sheet_is_unavailable_not_fatal() {
        let state = test_state();
        let (status, body) = send(&state, "GET", "/api/sheets/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connected"], false);

        let (status, _) = send(&state, "POST", "/api/sheets/sync", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
