pub mod expense;
pub mod money;
pub mod period;
pub mod stats;

pub use expense::{
    Category, Deductibility, Expense, ExpenseId, ExpensePatch, NewExpense, UnvalidatedExpense,
    ValidationError,
};
pub use money::{Money, ParseMoneyError};
pub use period::DateRange;
pub use stats::{dashboard_stats, insight_inputs, tax_summary, DashboardStats, InsightInput, TaxBucket, TaxSummary};
