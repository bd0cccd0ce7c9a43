//! Rotonde Circulation Engine
//!
//! A Rust implementation of a circulation engine for a multi-structure
//! lending network: copy registration, loans, reservations, prolongations,
//! per-genre limits, notification connector resolution and barcode lot
//! allocation, exposed over a REST JSON API.

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
