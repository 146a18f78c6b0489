use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use monitor_core::{Event, ModelFilter, StatsSnapshot};
use reqwest::{Client, Response, Url};
use serde_json::Value;

use crate::error::{SourceError, SourceResult};
use crate::source::EventSource;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Live provider backed by the monitor API (`/events`, `/stats`).
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    base_url: String,
}

impl HttpEventSource {
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| SourceError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> SourceResult<Value> {
        debug!("GET {} {:?}", url, query);
        let response = self.client.get(url).query(query).send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: Response) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Transport(format!("HTTP {}: {}", status, body)))
}

/// Validates the events payload shape before decoding individual records.
pub fn decode_events(payload: Value) -> SourceResult<Vec<Event>> {
    match payload {
        Value::Array(_) => Ok(serde_json::from_value(payload)?),
        other => Err(SourceError::Validation(format!(
            "expected a list of events, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_events(&self, filter: &ModelFilter, limit: u32) -> SourceResult<Vec<Event>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(model) = filter.as_deref() {
            query.push(("model", model.to_string()));
        }

        let payload = self.get_json(&self.endpoint("events"), &query).await?;
        let events = decode_events(payload)?;
        debug!("Fetched {} events (filter: {})", events.len(), filter);
        Ok(events)
    }

    async fn fetch_stats(&self) -> SourceResult<StatsSnapshot> {
        let payload = self.get_json(&self.endpoint("stats"), &[]).await?;
        Ok(serde_json::from_value(payload)?)
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_base() {
        let source = HttpEventSource::new(HttpSourceConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            ..Default::default()
        })
        .expect("valid config");
        assert_eq!(source.endpoint("events"), "http://localhost:8000/api/events");
    }

    #[test]
    fn unparseable_base_url_is_rejected() {
        let result = HttpEventSource::new(HttpSourceConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SourceError::InvalidBaseUrl(_))));
    }

    #[test]
    fn non_list_payload_is_a_validation_error() {
        let payload = serde_json::json!({ "detail": "Failed to fetch events" });
        match decode_events(payload) {
            Err(SourceError::Validation(message)) => assert!(message.contains("an object")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            decode_events(Value::Null),
            Err(SourceError::Validation(_))
        ));
    }

    #[test]
    fn list_with_wrong_shape_is_a_decode_error() {
        let payload = serde_json::json!([{ "id": "seven" }]);
        assert!(matches!(decode_events(payload), Err(SourceError::Decode(_))));
    }

    #[test]
    fn empty_list_decodes_to_no_events() {
        let events = decode_events(serde_json::json!([])).expect("decode");
        assert!(events.is_empty());
    }
}
