use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::aggregator::DerivedMetrics;
use crate::types::{Event, ModelFilter, StatsSnapshot};

/// The committed dashboard state read by presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewState {
    pub events: Vec<Event>,
    pub stats: Option<StatsSnapshot>,
    pub loading: bool,
    /// Filter chosen by the user; may be ahead of `events_filter` while a
    /// cycle for the new filter is in flight.
    pub selected_filter: ModelFilter,
    /// Filter the currently displayed events were fetched with.
    pub events_filter: ModelFilter,
    pub metrics: DerivedMetrics,
    pub last_error: Option<String>,
    /// Sequence number of the cycle that produced the current data, 0 before
    /// the first commit.
    pub committed_seq: u64,
}

impl ViewState {
    fn initial() -> Self {
        Self {
            events: Vec::new(),
            stats: None,
            loading: true,
            selected_filter: ModelFilter::all(),
            events_filter: ModelFilter::all(),
            metrics: DerivedMetrics::default(),
            last_error: None,
            committed_seq: 0,
        }
    }
}

/// Issued when a poll cycle starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTicket {
    pub seq: u64,
    pub filter: ModelFilter,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Success {
        events: Vec<Event>,
        stats: StatsSnapshot,
        metrics: DerivedMetrics,
    },
    Failure {
        error: String,
    },
}

impl CycleOutcome {
    /// Runs the aggregator over `events` and packages the result.
    pub fn success(events: Vec<Event>, stats: StatsSnapshot, series_len: usize) -> Self {
        let metrics = DerivedMetrics::from_events(&events, series_len);
        Self::Success {
            events,
            stats,
            metrics,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self::Failure {
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    Applied,
    /// A cycle with an equal or newer sequence number already committed.
    Stale { committed_seq: u64 },
    Closed,
}

/// Single-writer holder of the dashboard view state.
///
/// State changes only through [`commit`](Self::commit) for completed cycles
/// and [`set_filter`](Self::set_filter) for user filter changes. Commits are
/// ordered by cycle start: once a cycle has committed, results from cycles
/// that started before it are discarded.
pub struct ViewStateStore {
    state: watch::Sender<ViewState>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::with_filter(ModelFilter::all())
    }

    pub fn with_filter(filter: ModelFilter) -> Self {
        let mut initial = ViewState::initial();
        initial.selected_filter = filter;
        let (state, _) = watch::channel(initial);
        Self {
            state,
            next_seq: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified after every accepted change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn selected_filter(&self) -> ModelFilter {
        self.state.borrow().selected_filter.clone()
    }

    /// Allocates the next sequence number and captures the active filter.
    pub fn begin_cycle(&self) -> CycleTicket {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        CycleTicket {
            seq,
            filter: self.selected_filter(),
        }
    }

    /// Records an explicit user filter change. Displayed events are left in
    /// place until the next cycle commits.
    pub fn set_filter(&self, filter: ModelFilter) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state.send_if_modified(|state| {
            if state.selected_filter == filter {
                return false;
            }
            info!("Filter changed: {} -> {}", state.selected_filter, filter);
            state.selected_filter = filter;
            true
        })
    }

    pub fn commit(&self, ticket: &CycleTicket, outcome: CycleOutcome) -> CommitResult {
        if self.is_closed() {
            debug!("Dropping commit for cycle {} after close", ticket.seq);
            return CommitResult::Closed;
        }

        let mut result = CommitResult::Applied;
        self.state.send_if_modified(|state| {
            if ticket.seq <= state.committed_seq {
                result = CommitResult::Stale {
                    committed_seq: state.committed_seq,
                };
                return false;
            }

            match outcome {
                CycleOutcome::Success {
                    events,
                    stats,
                    metrics,
                } => {
                    state.events = events;
                    state.stats = Some(stats);
                    state.metrics = metrics;
                    state.last_error = None;
                }
                CycleOutcome::Failure { error } => {
                    state.events = Vec::new();
                    state.metrics = DerivedMetrics::default();
                    state.last_error = Some(error);
                }
            }
            state.events_filter = ticket.filter.clone();
            state.loading = false;
            state.committed_seq = ticket.seq;
            true
        });

        if let CommitResult::Stale { committed_seq } = result {
            debug!(
                "Rejected stale commit from cycle {} (cycle {} already committed)",
                ticket.seq, committed_seq
            );
        }
        result
    }

    /// Tears the store down; later commits and filter changes are ignored.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new()
    }
}
