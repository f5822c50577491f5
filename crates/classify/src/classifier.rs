use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use deductly_core::{Category, Deductibility, InsightInput};
use thiserror::Error;

use crate::types::{
    CategorySuggestion, ClassificationRequest, DeductibilitySuggestion, ExpenseInsights,
};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier API key not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Classifier returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed classifier response: {0}")]
    Malformed(String),
    #[error("Classifier rejected the request: {0}")]
    Rejected(String),
}

/// Abstraction over the external service that suggests how to book an expense.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify_category(
        &self,
        request: &ClassificationRequest,
    ) -> Result<CategorySuggestion, ClassifierError>;

    async fn classify_deductibility(
        &self,
        request: &ClassificationRequest,
        category: Category,
    ) -> Result<DeductibilitySuggestion, ClassifierError>;

    async fn summarize(&self, expenses: &[InsightInput]) -> Result<ExpenseInsights, ClassifierError>;
}

// ── Mock classifier (always available, used for tests) ────────────────────────

/// Returns fixed answers, with failures injected per vendor.
pub struct MockClassifier {
    pub category: Category,
    pub deductibility: Deductibility,
    pub confidence: f32,
    fail_category: HashSet<String>,
    fail_deductibility: HashSet<String>,
    category_calls: AtomicUsize,
    deductibility_calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new(category: Category, deductibility: Deductibility) -> Self {
        Self {
            category,
            deductibility,
            confidence: 0.9,
            fail_category: HashSet::new(),
            fail_deductibility: HashSet::new(),
            category_calls: AtomicUsize::new(0),
            deductibility_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Category requests for `vendor` fail.
    pub fn failing_category_for(mut self, vendor: impl Into<String>) -> Self {
        self.fail_category.insert(vendor.into());
        self
    }

    /// Deductibility requests for `vendor` fail.
    pub fn failing_deductibility_for(mut self, vendor: impl Into<String>) -> Self {
        self.fail_deductibility.insert(vendor.into());
        self
    }

    pub fn category_calls(&self) -> usize {
        self.category_calls.load(Ordering::SeqCst)
    }

    pub fn deductibility_calls(&self) -> usize {
        self.deductibility_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify_category(
        &self,
        request: &ClassificationRequest,
    ) -> Result<CategorySuggestion, ClassifierError> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_category.contains(&request.vendor) {
            return Err(ClassifierError::Rejected(format!("category for {}", request.vendor)));
        }
        Ok(CategorySuggestion::new(self.category, self.confidence))
    }

    async fn classify_deductibility(
        &self,
        request: &ClassificationRequest,
        _category: Category,
    ) -> Result<DeductibilitySuggestion, ClassifierError> {
        self.deductibility_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deductibility.contains(&request.vendor) {
            return Err(ClassifierError::Rejected(format!(
                "deductibility for {}",
                request.vendor
            )));
        }
        Ok(DeductibilitySuggestion::new(
            self.deductibility,
            "mock reasoning",
            self.confidence,
        ))
    }

    async fn summarize(&self, expenses: &[InsightInput]) -> Result<ExpenseInsights, ClassifierError> {
        Ok(ExpenseInsights {
            summary: format!("{} expenses reviewed", expenses.len()),
            ..Default::default()
        })
    }
}
