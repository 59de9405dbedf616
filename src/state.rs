use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::billing::BillingProvider;
use crate::services::calendar::CalendarProvider;
use crate::services::email::EmailProvider;
use crate::services::voice::VoicePlatform;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub calendar: Box<dyn CalendarProvider>,
    pub voice: Box<dyn VoicePlatform>,
    pub billing: Box<dyn BillingProvider>,
    pub email: Box<dyn EmailProvider>,
}

impl AppState {
    /// Lock the shared connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Storage(anyhow::anyhow!("database lock poisoned")))
    }
}
