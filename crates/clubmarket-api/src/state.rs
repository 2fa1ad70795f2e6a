//! Application state shared across handlers

use std::sync::Arc;

use clubmarket_core::FeeService;
use clubmarket_db::Database;

use crate::notify::Notifier;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connections
    pub db: Arc<Database>,
    /// Cached active fee configuration
    pub fees: Arc<FeeService>,
    /// Best-effort notification channel
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state
    pub fn new(db: Arc<Database>, fees: Arc<FeeService>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, fees, notifier }
    }
}
