pub mod aggregator;
pub mod store;
pub mod types;

pub use aggregator::{
    compute_series, mean, percentile, percentile90, unique_models, ChartPoint, DerivedMetrics,
    SeriesField, DEFAULT_SERIES_LEN,
};
pub use store::{CommitResult, CycleOutcome, CycleTicket, ViewState, ViewStateStore};
pub use types::{truncate_prompt, Event, ModelFilter, StatsSnapshot, PROMPT_PREVIEW_CHARS};
