pub mod csv;
pub mod import;
pub mod rows;
pub mod sheets;
pub mod source;

pub use csv::{render_csv, CsvExportError};
pub use import::{export_to_source, import_candidates, import_from_source, ImportReport, SyncError};
pub use sheets::{GoogleSheetsSource, SheetsConfig};
pub use source::{CandidateExpense, RecordSource, SourceError};
