use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Number of prompt characters shown before the preview is cut off.
pub const PROMPT_PREVIEW_CHARS: usize = 60;

/// One recorded LLM request/response observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: u64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub latency_ms: f64,
    pub tokens_used: u64,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl Event {
    /// Cost with a missing value treated as zero.
    pub fn cost(&self) -> f64 {
        self.estimated_cost.unwrap_or(0.0)
    }

    pub fn prompt_preview(&self) -> String {
        truncate_prompt(&self.prompt)
    }
}

/// Server-computed aggregate counters shown as top-line KPIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub unique_models: u64,
    #[serde(default)]
    pub avg_latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_tokens: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

/// Model selection applied to event queries. An empty name means "all models".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ModelFilter(Option<String>);

impl ModelFilter {
    pub fn all() -> Self {
        Self(None)
    }

    /// Filter on an exact model name. Whitespace is significant here;
    /// callers reading user input trim it first.
    pub fn model(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self(None)
        } else {
            Self(Some(name))
        }
    }

    pub fn from_option(name: Option<String>) -> Self {
        name.map(Self::model).unwrap_or_default()
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_all(&self) -> bool {
        self.0.is_none()
    }

    /// Exact, case-sensitive comparison against an event's model.
    pub fn matches(&self, model: &str) -> bool {
        match &self.0 {
            Some(name) => name == model,
            None => true,
        }
    }
}

impl fmt::Display for ModelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("All Models"),
        }
    }
}

/// Prompt preview for display. Counts characters, not bytes.
pub fn truncate_prompt(prompt: &str) -> String {
    match prompt.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}

/// Accepts RFC 3339 timestamps as well as the naive ISO-8601 form the backend
/// emits for `timestamp without time zone` columns. Naive values are UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognised timestamp: {raw}"))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn event_json(timestamp: &str) -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "timestamp": timestamp,
            "model": "gpt-4",
            "prompt": "hello",
            "response": "hi",
            "latency_ms": 1200,
            "tokens_used": 42,
            "estimated_cost": null
        })
    }

    #[test]
    fn event_decodes_naive_backend_timestamp_as_utc() {
        let event: Event =
            serde_json::from_value(event_json("2024-02-29T10:15:00.123456")).expect("decode");
        assert_eq!(event.timestamp.year(), 2024);
        assert_eq!(event.timestamp.hour(), 10);
        assert_eq!(event.latency_ms, 1200.0);
        assert_eq!(event.estimated_cost, None);
        assert_eq!(event.cost(), 0.0);
    }

    #[test]
    fn event_decodes_rfc3339_timestamp_with_offset() {
        let event: Event =
            serde_json::from_value(event_json("2024-02-29T12:15:00+02:00")).expect("decode");
        assert_eq!(event.timestamp.hour(), 10);
    }

    #[test]
    fn event_rejects_garbage_timestamp() {
        let result: Result<Event, _> = serde_json::from_value(event_json("yesterday"));
        assert!(result.is_err());
    }

    #[test]
    fn stats_tolerate_null_aggregates_from_empty_table() {
        let stats: StatsSnapshot = serde_json::from_value(serde_json::json!({
            "total_events": 0,
            "unique_models": 0,
            "avg_latency_ms": null,
            "avg_tokens": null,
            "total_cost": null
        }))
        .expect("decode");
        assert_eq!(stats, StatsSnapshot::default());
    }

    #[test]
    fn empty_model_name_means_unfiltered() {
        assert!(ModelFilter::model("").is_all());
        assert_eq!(ModelFilter::model(" gpt-4 ").as_deref(), Some(" gpt-4 "));
        assert_eq!(ModelFilter::from_option(None), ModelFilter::all());
    }

    #[test]
    fn filter_matching_is_case_sensitive() {
        let filter = ModelFilter::model("gpt-4");
        assert!(filter.matches("gpt-4"));
        assert!(!filter.matches("GPT-4"));
        assert!(ModelFilter::all().matches("anything"));
    }

    #[test]
    fn prompt_preview_truncates_on_characters() {
        let short = "Explain quantum computing in simple terms";
        assert_eq!(truncate_prompt(short), short);

        let long = "é".repeat(61);
        let preview = truncate_prompt(&long);
        assert_eq!(preview.chars().count(), PROMPT_PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));

        let exact = "a".repeat(PROMPT_PREVIEW_CHARS);
        assert_eq!(truncate_prompt(&exact), exact);
    }
}
