use serde::{Deserialize, Serialize};

use crate::types::Event;

/// Number of recent events plotted by the latency and token charts.
pub const DEFAULT_SERIES_LEN: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeriesField {
    Latency,
    Tokens,
    Cost,
}

impl SeriesField {
    pub fn value_of(self, event: &Event) -> f64 {
        match self {
            Self::Latency => event.latency_ms,
            Self::Tokens => event.tokens_used as f64,
            Self::Cost => event.cost(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Everything derived from one committed event list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DerivedMetrics {
    pub latency_series: Vec<ChartPoint>,
    pub token_series: Vec<ChartPoint>,
    pub avg_latency_ms: f64,
    pub p90_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub avg_tokens: f64,
    pub total_cost: f64,
    pub unique_models: Vec<String>,
}

impl DerivedMetrics {
    pub fn from_events(events: &[Event], series_len: usize) -> Self {
        let latencies: Vec<f64> = events.iter().map(|e| e.latency_ms).collect();
        let tokens: Vec<f64> = events.iter().map(|e| e.tokens_used as f64).collect();

        Self {
            latency_series: compute_series(events, series_len, SeriesField::Latency),
            token_series: compute_series(events, series_len, SeriesField::Tokens),
            avg_latency_ms: mean(&latencies),
            p90_latency_ms: percentile90(&latencies),
            p95_latency_ms: percentile(&latencies, 0.95),
            avg_tokens: mean(&tokens),
            total_cost: events.iter().map(Event::cost).sum(),
            unique_models: unique_models(events),
        }
    }
}

/// Takes the `n` newest events (input is newest-first) and returns them
/// oldest-first, labelled `Event 1..k`.
pub fn compute_series(events: &[Event], n: usize, field: SeriesField) -> Vec<ChartPoint> {
    events
        .iter()
        .take(n)
        .rev()
        .enumerate()
        .map(|(index, event)| ChartPoint {
            label: format!("Event {}", index + 1),
            value: field.value_of(event),
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile: element at `floor(q * (len - 1))` of the ascending
/// sort, no interpolation. `q` is clamped to `[0, 1]`.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q = q.clamp(0.0, 1.0);
    let index = (q * (sorted.len() - 1) as f64).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

pub fn percentile90(values: &[f64]) -> f64 {
    percentile(values, 0.9)
}

/// Distinct models in first-seen order, compared case-sensitively.
pub fn unique_models(events: &[Event]) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for event in events {
        if !models.iter().any(|model| model == &event.model) {
            models.push(event.model.clone());
        }
    }
    models
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    /// Builds a newest-first list where `latencies[0]` is the most recent.
    fn events_newest_first(latencies: &[f64]) -> Vec<Event> {
        let base = Utc.with_ymd_and_hms(2026, 2, 9, 12, 0, 0).unwrap();
        let count = latencies.len() as i64;
        latencies
            .iter()
            .enumerate()
            .map(|(index, latency)| Event {
                id: (count - index as i64) as u64,
                timestamp: base + Duration::seconds(count - index as i64),
                model: "gpt-4".to_string(),
                latency_ms: *latency,
                tokens_used: (*latency as u64) / 10,
                estimated_cost: Some(0.001),
                prompt: format!("prompt {index}"),
                response: None,
            })
            .collect()
    }

    fn with_model(model: &str) -> Event {
        let mut event = events_newest_first(&[1.0]).remove(0);
        event.model = model.to_string();
        event
    }

    #[test]
    fn compute_series_takes_newest_then_orders_chronologically() {
        let events = events_newest_first(&[500.0, 400.0, 300.0, 200.0, 100.0]);

        let series = compute_series(&events, 3, SeriesField::Latency);

        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![300.0, 400.0, 500.0]);
        assert_eq!(series[0].label, "Event 1");
        assert_eq!(series[2].label, "Event 3");
    }

    #[test]
    fn compute_series_length_is_min_of_n_and_input() {
        let events = events_newest_first(&[3.0, 2.0, 1.0]);
        for n in 0..6 {
            let series = compute_series(&events, n, SeriesField::Tokens);
            assert_eq!(series.len(), n.min(events.len()), "n = {n}");
        }
        assert!(compute_series(&[], 10, SeriesField::Latency).is_empty());
    }

    #[test]
    fn compute_series_is_ascending_in_time() {
        let events = events_newest_first(&[9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0, 11.0]);
        let series = compute_series(&events, DEFAULT_SERIES_LEN, SeriesField::Latency);

        let expected: Vec<f64> = events
            .iter()
            .take(DEFAULT_SERIES_LEN)
            .rev()
            .map(|e| e.latency_ms)
            .collect();
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn zero_latency_is_plotted_as_data() {
        let events = events_newest_first(&[0.0]);
        let series = compute_series(&events, 10, SeriesField::Latency);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 0.0);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);
    }

    #[test]
    fn percentile90_uses_floor_nearest_rank() {
        assert_eq!(percentile90(&[]), 0.0);

        let values: Vec<f64> = (1..=10).rev().map(|v| (v * 10) as f64).collect();
        // floor(0.9 * 9) = 8 -> 90
        assert_eq!(percentile90(&values), 90.0);
        assert_eq!(percentile90(&[42.0]), 42.0);
        // floor(0.9 * 3) = 2
        assert_eq!(percentile90(&[4.0, 1.0, 3.0, 2.0]), 3.0);
    }

    #[test]
    fn percentile_bounds() {
        let values = [5.0, 1.0, 3.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 5.0);
        assert_eq!(percentile(&values, 7.0), 5.0);
    }

    #[test]
    fn unique_models_keep_first_seen_order() {
        let events = vec![with_model("gpt-4"), with_model("gpt-4"), with_model("gemini")];
        assert_eq!(unique_models(&events), vec!["gpt-4", "gemini"]);

        let cased = vec![with_model("gpt-4"), with_model("GPT-4")];
        assert_eq!(unique_models(&cased), vec!["gpt-4", "GPT-4"]);
    }

    #[test]
    fn derived_metrics_of_empty_list_equal_default() {
        assert_eq!(
            DerivedMetrics::from_events(&[], DEFAULT_SERIES_LEN),
            DerivedMetrics::default()
        );
    }

    #[test]
    fn derived_metrics_bundle_series_and_kpis() {
        let events = events_newest_first(&[100.0, 300.0, 200.0]);
        let metrics = DerivedMetrics::from_events(&events, 2);

        assert_eq!(metrics.latency_series.len(), 2);
        assert_eq!(metrics.latency_series[0].value, 300.0);
        assert_eq!(metrics.token_series[1].value, 10.0);
        assert_eq!(metrics.avg_latency_ms, 200.0);
        assert_eq!(metrics.p90_latency_ms, 200.0);
        assert!((metrics.total_cost - 0.003).abs() < 1e-12);
        assert_eq!(metrics.unique_models, vec!["gpt-4"]);
    }
}
