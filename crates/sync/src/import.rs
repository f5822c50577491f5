use deductly_core::NewExpense;
use deductly_storage::{ExpenseStore, StoreError};
use serde::Serialize;
use thiserror::Error;

use crate::source::{CandidateExpense, RecordSource, SourceError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub received: usize,
    /// Rows without a date, vendor or amount.
    pub dropped_incomplete: usize,
    /// Complete rows whose values did not validate.
    pub rejected_invalid: usize,
    /// Rows the store refused.
    pub failed: usize,
    pub imported: usize,
}

/// Write external rows through the store's bulk create. Incomplete rows are
/// dropped silently; imported rows keep whatever classification they carry
/// and are not sent to the classifier.
pub fn import_candidates(store: &dyn ExpenseStore, candidates: Vec<CandidateExpense>) -> ImportReport {
    let mut report = ImportReport {
        received: candidates.len(),
        ..Default::default()
    };

    let mut accepted = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(raw) = candidate.into_unvalidated() else {
            report.dropped_incomplete += 1;
            continue;
        };
        match NewExpense::validate(raw) {
            Ok(new) => accepted.push(new),
            Err(e) => {
                tracing::warn!("Skipping imported row: {e}");
                report.rejected_invalid += 1;
            }
        }
    }

    let outcome = store.bulk_create(accepted);
    report.imported = outcome.created.len();
    report.failed = outcome.failed;
    report
}

/// Pull every row from `source` into the store.
pub async fn import_from_source(
    source: &dyn RecordSource,
    store: &dyn ExpenseStore,
) -> Result<ImportReport, SourceError> {
    let candidates = source.read_all().await?;
    let report = import_candidates(store, candidates);
    tracing::info!(
        "Imported {} of {} rows ({} incomplete, {} invalid)",
        report.imported,
        report.received,
        report.dropped_incomplete,
        report.rejected_invalid
    );
    Ok(report)
}

/// Overwrite `source` with the current listing. Returns how many expenses
/// were written.
pub async fn export_to_source(
    source: &dyn RecordSource,
    store: &dyn ExpenseStore,
) -> Result<usize, SyncError> {
    let expenses = store.list()?;
    source.write_all(&expenses).await?;
    tracing::info!("Exported {} expenses", expenses.len());
    Ok(expenses.len())
}
