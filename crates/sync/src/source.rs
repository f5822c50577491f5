use async_trait::async_trait;
use deductly_core::{Expense, UnvalidatedExpense};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Record source credentials not configured")]
    NotConfigured,
    #[error("Invalid record source configuration: {0}")]
    Config(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Record source returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed record source response: {0}")]
    Malformed(String),
}

/// One externally held expense row. Any cell may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateExpense {
    pub date: Option<String>,
    pub vendor: Option<String>,
    pub amount: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub deductibility: Option<String>,
}

impl CandidateExpense {
    /// Raw fields for validation, or `None` when the date, vendor or amount
    /// cell is missing or blank.
    pub fn into_unvalidated(self) -> Option<UnvalidatedExpense> {
        let date = present(self.date)?;
        let vendor = present(self.vendor)?;
        let amount = present(self.amount)?;
        Some(UnvalidatedExpense {
            date,
            vendor,
            amount,
            description: self.description.unwrap_or_default(),
            category: self.category,
            deductibility: self.deductibility,
        })
    }
}

fn present(cell: Option<String>) -> Option<String> {
    cell.filter(|s| !s.trim().is_empty())
}

/// An external system holding an alternate copy of the expenses.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn read_all(&self) -> Result<Vec<CandidateExpense>, SourceError>;

    /// Replace the remote copy with `expenses`.
    async fn write_all(&self, expenses: &[Expense]) -> Result<(), SourceError>;

    /// Never errors: an unreachable or unconfigured source is `false`.
    async fn test_connection(&self) -> bool;
}
