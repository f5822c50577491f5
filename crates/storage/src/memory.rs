use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use deductly_core::{Expense, ExpenseId, ExpensePatch, NewExpense};

use crate::store::{ExpenseStore, StoreError};

/// Volatile store: everything lives for the lifetime of the process.
pub struct MemStore {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    expenses: HashMap<ExpenseId, Expense>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Wall-clock time, bumped so that stamps handed out by this store are
    /// strictly increasing even when the clock resolution is coarse.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                expenses: HashMap::new(),
                last_stamp: None,
            }),
        }
    }

    #[cfg(test)]
    fn with_next_id(next_id: i64) -> Self {
        let store = Self::new();
        store.lock().next_id = next_id;
        store
    }

    // Every critical section leaves `Inner` consistent, so a poisoned lock
    // still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseStore for MemStore {
    fn list(&self) -> Result<Vec<Expense>, StoreError> {
        let inner = self.lock();
        let mut expenses: Vec<Expense> = inner.expenses.values().cloned().collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(expenses)
    }

    fn get(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError> {
        Ok(self.lock().expenses.get(&id).cloned())
    }

    fn create(&self, new: NewExpense) -> Result<Expense, StoreError> {
        let mut inner = self.lock();
        let id = ExpenseId(inner.next_id);
        inner.next_id = inner
            .next_id
            .checked_add(1)
            .ok_or(StoreError::IdSpaceExhausted)?;

        let now = inner.stamp();
        let expense = Expense {
            id,
            date: new.date,
            vendor: new.vendor,
            amount: new.amount,
            description: new.description,
            category: new.category,
            deductibility: new.deductibility,
            created_at: now,
            updated_at: now,
        };
        inner.expenses.insert(id, expense.clone());
        tracing::debug!("Created expense {id}");
        Ok(expense)
    }

    fn update(&self, id: ExpenseId, patch: ExpensePatch) -> Result<Option<Expense>, StoreError> {
        let mut inner = self.lock();
        let now = inner.stamp();
        let Some(expense) = inner.expenses.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(expense);
        expense.updated_at = now;
        Ok(Some(expense.clone()))
    }

    fn delete(&self, id: ExpenseId) -> Result<bool, StoreError> {
        let removed = self.lock().expenses.remove(&id).is_some();
        if removed {
            tracing::debug!("Deleted expense {id}");
        }
        Ok(removed)
    }
}
