//! Library catalog server
//!
//! Books, authors and members, plus a loan ledger that keeps each book's
//! available copy count in step with its open loans. Exposed as a REST JSON
//! API over either PostgreSQL or an in-process store.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
