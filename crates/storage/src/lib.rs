pub mod memory;
pub mod store;

pub use memory::MemStore;
pub use store::{BulkCreateOutcome, ExpenseStore, StoreError};
