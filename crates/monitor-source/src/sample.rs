use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use monitor_core::{unique_models, Event, ModelFilter, StatsSnapshot};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::SourceResult;
use crate::source::EventSource;

const SAMPLE_MODELS: &[&str] = &[
    "claude-3-sonnet-20240229",
    "claude-3-opus-20240229",
    "claude-3-haiku-20240307",
    "gpt-4-turbo-preview",
    "gpt-3.5-turbo",
    "gemini-pro",
];

const SAMPLE_PROMPTS: &[&str] = &[
    "Explain quantum computing in simple terms",
    "What is the difference between machine learning and deep learning?",
    "How does TCP/IP networking work?",
    "Describe the SOLID principles in software engineering",
    "What is recursion and when should I use it?",
    "Explain REST API design best practices",
    "How do database indexes improve performance?",
    "What is the difference between authentication and authorization?",
    "Explain the CAP theorem in distributed systems",
    "How does garbage collection work in Python?",
    "What are the benefits of using Docker?",
    "Explain the difference between SQL and NoSQL databases",
    "How does HTTPS encryption work?",
    "What is the time complexity of quicksort?",
    "Explain what a closure is in JavaScript",
];

/// Dollars per 1000 tokens when a row carries no explicit cost.
const COST_PER_1K_TOKENS: f64 = 0.001;

/// Fixed in-memory provider with the same contract as the live API.
#[derive(Debug, Clone, Default)]
pub struct SampleEventSource {
    events: Vec<Event>,
}

impl SampleEventSource {
    pub fn new(mut events: Vec<Event>) -> Self {
        for event in &mut events {
            if event.estimated_cost.is_none() {
                event.estimated_cost = Some(estimate_cost(event.tokens_used));
            }
        }
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Self { events }
    }

    /// Deterministic synthetic traffic ending at the current time.
    pub fn generated(count: usize, seed: u64) -> Self {
        Self::generated_at(count, seed, Utc::now())
    }

    pub fn generated_at(count: usize, seed: u64, newest: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut timestamp = newest;
        let mut events = Vec::with_capacity(count);

        for index in 0..count {
            let model = SAMPLE_MODELS.choose(&mut rng).copied().unwrap_or("gpt-3.5-turbo");
            let prompt = SAMPLE_PROMPTS.choose(&mut rng).copied().unwrap_or_default();
            let filler_repeats: u64 = rng.gen_range(5..=15);
            let tokens_used = prompt.split_whitespace().count() as u64 + 8 * filler_repeats + 7;

            events.push(Event {
                id: (count - index) as u64,
                timestamp,
                model: model.to_string(),
                latency_ms: sample_latency(&mut rng, model) as f64,
                tokens_used,
                estimated_cost: None,
                prompt: prompt.to_string(),
                response: None,
            });
            timestamp -= Duration::seconds(rng.gen_range(2..=30));
        }

        Self::new(events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn stats(&self) -> StatsSnapshot {
        let count = self.events.len();
        if count == 0 {
            return StatsSnapshot::default();
        }

        let latency: f64 = self.events.iter().map(|e| e.latency_ms).sum();
        let tokens: f64 = self.events.iter().map(|e| e.tokens_used as f64).sum();
        StatsSnapshot {
            total_events: count as u64,
            unique_models: unique_models(&self.events).len() as u64,
            avg_latency_ms: Some(latency / count as f64),
            avg_tokens: Some(tokens / count as f64),
            total_cost: Some(self.events.iter().map(Event::cost).sum()),
        }
    }
}

fn sample_latency(rng: &mut StdRng, model: &str) -> u64 {
    if model.contains("opus") {
        rng.gen_range(2000..=5000)
    } else if model.contains("haiku") {
        rng.gen_range(300..=800)
    } else if model.contains("gpt-4") {
        rng.gen_range(1500..=4000)
    } else {
        rng.gen_range(800..=2500)
    }
}

fn estimate_cost(tokens_used: u64) -> f64 {
    tokens_used as f64 / 1000.0 * COST_PER_1K_TOKENS
}

#[async_trait]
impl EventSource for SampleEventSource {
    async fn fetch_events(&self, filter: &ModelFilter, limit: u32) -> SourceResult<Vec<Event>> {
        Ok(self
            .events
            .iter()
            .filter(|event| filter.matches(&event.model))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_stats(&self) -> SourceResult<StatsSnapshot> {
        Ok(self.stats())
    }

    fn name(&self) -> &str {
        "sample"
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn sample_source_returns_newest_first_within_limit() {
        let source = SampleEventSource::generated_at(30, 42, anchor());
        let events = source
            .fetch_events(&ModelFilter::all(), 20)
            .await
            .expect("sample fetch");

        assert_eq!(events.len(), 20);
        assert_eq!(events[0].timestamp, anchor());
        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn sample_source_applies_model_filter() {
        let source = SampleEventSource::generated_at(60, 1, anchor());
        let model = source.events()[0].model.clone();

        let events = source
            .fetch_events(&ModelFilter::model(model.clone()), 100)
            .await
            .expect("sample fetch");

        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.model == model));
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = SampleEventSource::generated_at(25, 9, anchor());
        let b = SampleEventSource::generated_at(25, 9, anchor());
        assert_eq!(a.events(), b.events());
    }

    #[test]
    fn generated_latency_follows_model_bands() {
        let source = SampleEventSource::generated_at(200, 3, anchor());
        for event in source.events() {
            let latency = event.latency_ms;
            if event.model.contains("opus") {
                assert!((2000.0..=5000.0).contains(&latency));
            } else if event.model.contains("haiku") {
                assert!((300.0..=800.0).contains(&latency));
            }
            assert_eq!(event.cost(), estimate_cost(event.tokens_used));
        }
    }

    #[tokio::test]
    async fn stats_cover_all_rows() {
        let source = SampleEventSource::generated_at(12, 5, anchor());
        let stats = source.fetch_stats().await.expect("stats");

        assert_eq!(stats.total_events, 12);
        assert_eq!(
            stats.unique_models,
            unique_models(source.events()).len() as u64
        );
        assert!(stats.avg_latency_ms.unwrap_or_default() > 0.0);
    }

    #[tokio::test]
    async fn empty_sample_has_empty_stats() {
        let source = SampleEventSource::default();
        assert_eq!(source.fetch_stats().await.expect("stats"), StatsSnapshot::default());
    }
}
