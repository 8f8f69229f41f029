use std::sync::Arc;

use chrono_tz::Tz;

use lumenstat_core::{parse_timezone, Calendar};

use crate::{config::Config, error::AppError};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Zone for requests that do not name one. Validated at startup.
    default_zone: Tz,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let default_zone = parse_timezone(&config.default_timezone)?;
        Ok(Self {
            config: Arc::new(config),
            default_zone,
        })
    }

    /// Calendar for a request: its own timezone when given, else the
    /// configured default, with the configured first day of week.
    pub fn calendar(&self, timezone: Option<&str>) -> Result<Calendar<Tz>, AppError> {
        let zone = match timezone {
            Some(raw) => parse_timezone(raw)?,
            None => self.default_zone,
        };
        Ok(Calendar::new(zone).with_week_start(self.config.week_start))
    }
}
