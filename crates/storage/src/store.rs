use deductly_core::{DateRange, Expense, ExpenseId, ExpensePatch, NewExpense};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Expense id space exhausted")]
    IdSpaceExhausted,
    /// Fault reported by a persistent backend; `MemStore` never raises it.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result of a non-atomic batch insert.
#[derive(Debug, Default)]
pub struct BulkCreateOutcome {
    pub created: Vec<Expense>,
    pub failed: usize,
}

/// Sole authority over expense identity and persistence.
///
/// Every mutation is visible to the next `list`/`get` call. Implementations
/// serialize mutations internally, so a shared `&self` is enough.
pub trait ExpenseStore: Send + Sync {
    /// All records, most recently created first.
    fn list(&self) -> Result<Vec<Expense>, StoreError>;

    fn get(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError>;

    /// Assigns the next id and stamps `created_at == updated_at`.
    fn create(&self, new: NewExpense) -> Result<Expense, StoreError>;

    /// Merges `patch` onto the record and refreshes `updated_at`.
    /// `Ok(None)` when no record has `id`.
    fn update(&self, id: ExpenseId, patch: ExpensePatch) -> Result<Option<Expense>, StoreError>;

    /// `Ok(true)` if a record was removed.
    fn delete(&self, id: ExpenseId) -> Result<bool, StoreError>;

    /// Creates each element in order. Earlier successes are kept when a later
    /// element fails.
    fn bulk_create(&self, items: Vec<NewExpense>) -> BulkCreateOutcome {
        let mut outcome = BulkCreateOutcome::default();
        for item in items {
            match self.create(item) {
                Ok(expense) => outcome.created.push(expense),
                Err(e) => {
                    tracing::warn!("Bulk create skipped an expense: {e}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Records whose `date` lies within `range`, in listing order.
    fn by_date_range(&self, range: DateRange) -> Result<Vec<Expense>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| range.contains(e.date))
            .collect())
    }
}
