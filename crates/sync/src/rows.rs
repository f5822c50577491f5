use deductly_core::Expense;

use crate::source::CandidateExpense;

/// Column layout A-F; the first sheet row carries these labels.
pub const HEADER: [&str; 6] = [
    "Date",
    "Vendor",
    "Amount",
    "Description",
    "Category",
    "Deductibility",
];

/// Skips the header row. Short rows leave the trailing fields absent.
pub fn rows_to_candidates(rows: Vec<Vec<String>>) -> Vec<CandidateExpense> {
    rows.into_iter()
        .skip(1)
        .map(|row| {
            let mut cells = row.into_iter();
            let mut next = || cells.next().filter(|s| !s.is_empty());
            CandidateExpense {
                date: next(),
                vendor: next(),
                amount: next(),
                description: next(),
                category: next(),
                deductibility: next(),
            }
        })
        .collect()
}

pub fn expense_to_row(e: &Expense) -> Vec<String> {
    vec![
        e.date.to_string(),
        e.vendor.clone(),
        e.amount.to_string(),
        e.description.clone(),
        e.category.map(|c| c.to_string()).unwrap_or_default(),
        e.deductibility.map(|d| d.to_string()).unwrap_or_default(),
    ]
}

/// Header followed by one row per expense.
pub fn export_rows(expenses: &[Expense]) -> Vec<Vec<String>> {
    std::iter::once(HEADER.iter().map(|h| h.to_string()).collect())
        .chain(expenses.iter().map(expense_to_row))
        .collect()
}
