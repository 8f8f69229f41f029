use chrono::Weekday;

use crate::zone::parse_timezone;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// IANA zone used when a request does not name one.
    pub default_timezone: String,
    /// First day of `week` buckets.
    pub week_start: Weekday,
    /// Omitted dates resolve to `today - default_lookback_days ..= today`.
    pub default_lookback_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_origins: Vec::new(),
            default_timezone: "UTC".to_string(),
            week_start: Weekday::Mon,
            default_lookback_days: 6,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let default_timezone =
            std::env::var("LUMENSTAT_DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        parse_timezone(&default_timezone)
            .map_err(|e| format!("LUMENSTAT_DEFAULT_TIMEZONE: {e}"))?;

        Ok(Self {
            port: std::env::var("LUMENSTAT_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            cors_origins: std::env::var("LUMENSTAT_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            default_timezone: default_timezone.trim().to_string(),
            week_start: parse_week_start(
                &std::env::var("LUMENSTAT_WEEK_START").unwrap_or_else(|_| "monday".to_string()),
            )?,
            default_lookback_days: std::env::var("LUMENSTAT_DEFAULT_LOOKBACK_DAYS")
                .unwrap_or_else(|_| "6".to_string())
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=365).contains(days))
                .ok_or_else(|| "LUMENSTAT_DEFAULT_LOOKBACK_DAYS must be 0..=365".to_string())?,
        })
    }
}

/// Accepts full or abbreviated English day names, any case.
pub fn parse_week_start(raw: &str) -> Result<Weekday, String> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| format!("invalid LUMENSTAT_WEEK_START: {raw:?}"))
}
