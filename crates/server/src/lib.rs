pub mod config;
pub mod dashboard;
pub mod error;
pub mod expenses;
pub mod server;
pub mod sheets;

pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use server::{router, AppState};
