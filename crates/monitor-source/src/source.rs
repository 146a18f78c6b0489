use async_trait::async_trait;
use monitor_core::{Event, ModelFilter, StatsSnapshot};

use crate::error::SourceResult;

/// Read side of the monitoring backend.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Most recent events, newest first, at most `limit` of them.
    ///
    /// # Arguments
    /// * `filter` - Restricts results to one model when set
    /// * `limit` - Maximum number of events to return
    async fn fetch_events(&self, filter: &ModelFilter, limit: u32) -> SourceResult<Vec<Event>>;

    /// Aggregate counters over all recorded events.
    async fn fetch_stats(&self) -> SourceResult<StatsSnapshot>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "event-source"
    }
}
