//! Velin Library Circulation Backend
//!
//! The circulation engine for a library system: loan lifecycle, a fair
//! position-tracked reservation queue, and late/lost fee assessment,
//! exposed over a REST JSON API.

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
