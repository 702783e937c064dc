use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub calendar_base_url: String,
    pub calendar_api_token: String,
    pub calendar_id: String,
    pub clinic_timezone: String,
    pub storage_timeout_seconds: u64,
    pub sync_insert_timeout_seconds: u64,
    pub sync_retry_interval_minutes: i64,
    pub sync_max_attempts: i32,
    pub retry_worker_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            calendar_base_url: env::var("CALENDAR_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            calendar_api_token: env::var("CALENDAR_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CALENDAR_API_TOKEN not set, calendar sync will fail until configured");
                    String::new()
                }),
            calendar_id: env::var("CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
            clinic_timezone: env::var("CLINIC_TIMEZONE")
                .unwrap_or_else(|_| "America/Tijuana".to_string()),
            storage_timeout_seconds: parse_env("STORAGE_TIMEOUT_SECONDS", 5),
            sync_insert_timeout_seconds: parse_env("SYNC_INSERT_TIMEOUT_SECONDS", 10),
            sync_retry_interval_minutes: parse_env("SYNC_RETRY_INTERVAL_MINUTES", 15),
            sync_max_attempts: parse_env("SYNC_MAX_ATTEMPTS", 5),
            retry_worker_interval_seconds: parse_env("RETRY_WORKER_INTERVAL_SECONDS", 3600),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    pub fn is_calendar_configured(&self) -> bool {
        !self.calendar_base_url.is_empty() && !self.calendar_api_token.is_empty()
    }
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default", key);
            default
        }),
        Err(_) => default,
    }
}
