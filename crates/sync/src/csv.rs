use deductly_core::Expense;
use thiserror::Error;

use crate::rows::{expense_to_row, HEADER};

#[derive(Error, Debug)]
pub enum CsvExportError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Failed to flush CSV output: {0}")]
    Flush(String),
}

/// Render expenses as CSV with the spreadsheet column layout.
pub fn render_csv(expenses: &[Expense]) -> Result<String, CsvExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for expense in expenses {
        writer.write_record(expense_to_row(expense))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvExportError::Flush(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvExportError::Flush(e.to_string()))
}
