// libs/calendar-sync-cell/src/provider.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{CalendarEvent, SyncError};

/// External calendar insert seam. Stateless per call; one shared instance is
/// safe across concurrent synchronizer invocations.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<String, SyncError>;
}

pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.calendar_base_url.clone(),
            api_token: config.calendar_api_token.clone(),
        }
    }

    fn event_body(event: &CalendarEvent) -> Value {
        json!({
            "summary": event.summary,
            "description": event.description,
            "start": {
                "dateTime": event.start_time.to_rfc3339(),
                "timeZone": event.timezone,
            },
            "end": {
                "dateTime": event.end_time.to_rfc3339(),
                "timeZone": event.timezone,
            },
            "extendedProperties": {
                "private": event.private_properties,
            },
            "colorId": event.color_id,
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<String, SyncError> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        debug!("Inserting calendar event at {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&Self::event_body(event))
            .send()
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Calendar API error ({}): {}", status, error_text);
            return Err(SyncError::Provider(format!(
                "calendar API returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;

        body["id"]
            .as_str()
            .map(|id| id.to_string())
            .ok_or_else(|| SyncError::Provider("calendar response missing event id".to_string()))
    }
}
