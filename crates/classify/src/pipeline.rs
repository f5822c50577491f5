use std::sync::Arc;

use deductly_core::{insight_inputs, Expense, ExpensePatch, NewExpense};
use deductly_storage::{ExpenseStore, StoreError};
use serde::Serialize;
use thiserror::Error;

use crate::classifier::{Classifier, ClassifierError};
use crate::types::{ClassificationRequest, ExpenseInsights};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Summary of a bulk classification run: `updated` of `candidates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkClassifyReport {
    pub candidates: usize,
    pub updated: usize,
}

/// Orchestrates: persist → classify category → classify deductibility → update.
///
/// The store is only touched before and after the classifier calls, never
/// while one is in flight.
pub struct ClassificationPipeline {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn ExpenseStore>,
}

impl ClassificationPipeline {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn ExpenseStore>) -> Self {
        Self { classifier, store }
    }

    /// Create an expense and, unless the caller already chose a category,
    /// enrich it. Only a store failure can make this fail.
    pub async fn create_expense(&self, new: NewExpense) -> Result<Expense, StoreError> {
        let user_categorized = new.category.is_some();
        let expense = self.store.create(new)?;
        if user_categorized {
            return Ok(expense);
        }
        Ok(self.enrich(expense).await)
    }

    /// Best-effort enrichment. On any failure the expense comes back exactly
    /// as it was passed in.
    pub async fn enrich(&self, expense: Expense) -> Expense {
        match self.try_enrich(&expense).await {
            Ok(Some(updated)) => updated,
            Ok(None) => expense,
            Err(e) => {
                tracing::warn!("Classification failed for expense {}: {e}", expense.id);
                expense
            }
        }
    }

    /// Classify every expense still missing a category or deductibility.
    /// Failures are isolated per expense.
    pub async fn classify_all(&self) -> Result<BulkClassifyReport, StoreError> {
        let candidates: Vec<Expense> = self
            .store
            .list()?
            .into_iter()
            .filter(Expense::needs_classification)
            .collect();

        let mut updated = 0;
        for expense in &candidates {
            match self.try_enrich(expense).await {
                Ok(Some(_)) => updated += 1,
                Ok(None) => {
                    tracing::debug!("Expense {} was removed before classification finished", expense.id)
                }
                Err(e) => {
                    tracing::warn!("Classification failed for expense {}: {e}", expense.id)
                }
            }
        }

        tracing::info!("Classified {updated} of {} expenses", candidates.len());
        Ok(BulkClassifyReport {
            candidates: candidates.len(),
            updated,
        })
    }

    /// Narrative insights over the whole expense set. Unlike enrichment this
    /// is a user-invoked action, so a classifier failure is returned.
    pub async fn insights(&self) -> Result<ExpenseInsights, PipelineError> {
        let expenses = self.store.list()?;
        let inputs = insight_inputs(&expenses);
        Ok(self.classifier.summarize(&inputs).await?)
    }

    /// `Ok(None)` when the record vanished before the update landed.
    async fn try_enrich(&self, expense: &Expense) -> Result<Option<Expense>, PipelineError> {
        let patch = self.suggest(expense).await?;
        if patch.is_empty() {
            return Ok(Some(expense.clone()));
        }
        Ok(self.store.update(expense.id, patch)?)
    }

    /// Ask the classifier for whatever is missing. An existing category is
    /// fed to the deductibility call; existing values are never replaced.
    async fn suggest(&self, expense: &Expense) -> Result<ExpensePatch, ClassifierError> {
        let request = ClassificationRequest::from(expense);

        let (category, new_category) = match expense.category {
            Some(category) => (category, None),
            None => {
                let suggestion = self.classifier.classify_category(&request).await?;
                tracing::debug!(
                    "Expense {}: category {} ({:.2})",
                    expense.id,
                    suggestion.category,
                    suggestion.confidence
                );
                (suggestion.category, Some(suggestion.category))
            }
        };

        let new_deductibility = match expense.deductibility {
            Some(_) => None,
            None => {
                let suggestion = self
                    .classifier
                    .classify_deductibility(&request, category)
                    .await?;
                tracing::debug!(
                    "Expense {}: {} ({:.2}): {}",
                    expense.id,
                    suggestion.deductibility,
                    suggestion.confidence,
                    suggestion.reasoning
                );
                Some(suggestion.deductibility)
            }
        };

        Ok(ExpensePatch::classification(new_category, new_deductibility))
    }
}
