use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use monitor_core::{
    CommitResult, CycleOutcome, CycleTicket, ModelFilter, ViewStateStore, DEFAULT_SERIES_LEN,
};
use monitor_source::EventSource;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_EVENTS_LIMIT: u32 = 20;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub events_limit: u32,
    pub series_len: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            events_limit: DEFAULT_EVENTS_LIMIT,
            series_len: DEFAULT_SERIES_LEN,
        }
    }
}

#[derive(Debug)]
enum PollerCommand {
    /// Start a cycle now and restart the interval timer.
    Rearm { reason: &'static str },
}

/// Fixed-interval refresh loop feeding a [`ViewStateStore`].
///
/// A cycle starts immediately on spawn, then every `interval`, and again
/// whenever the filter changes. Cycles run as independent tasks, so a slow
/// cycle may still be in flight when the next one starts; the store discards
/// whichever result turns out to be stale.
pub struct Poller {
    source: Arc<dyn EventSource>,
    store: Arc<ViewStateStore>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        source: Arc<dyn EventSource>,
        store: Arc<ViewStateStore>,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn store(&self) -> Arc<ViewStateStore> {
        Arc::clone(&self.store)
    }

    /// Runs one cycle on the current task and commits its result.
    pub async fn run_once(&self) -> CommitResult {
        let ticket = self.store.begin_cycle();
        execute_cycle(
            self.source.as_ref(),
            &self.store,
            ticket,
            self.config.events_limit,
            self.config.series_len,
        )
        .await
    }

    /// Spawn the refresh loop
    ///
    /// Returns a handle to change the filter and to stop the loop
    pub fn spawn(self) -> PollerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let store = Arc::clone(&self.store);

        let task = tokio::spawn(self.run(rx, cancel.clone()));

        PollerHandle {
            tx,
            cancel,
            store,
            task: Some(task),
        }
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<PollerCommand>, cancel: CancellationToken) {
        info!(
            "Poller started (source: {}, interval: {:?}, limit: {})",
            self.source.name(),
            self.config.interval,
            self.config.events_limit
        );

        loop {
            self.spawn_cycle();

            // Dropping the sleep on a command is what cancels the pending timer.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = rx.recv() => match command {
                    Some(PollerCommand::Rearm { reason }) => {
                        debug!("Poller re-armed: {}", reason);
                    }
                    None => {
                        info!("Poller handle dropped");
                        break;
                    }
                },
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Poller stopped");
    }

    fn spawn_cycle(&self) {
        let ticket = self.store.begin_cycle();
        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        let limit = self.config.events_limit;
        let series_len = self.config.series_len;

        tokio::spawn(async move {
            execute_cycle(source.as_ref(), &store, ticket, limit, series_len).await;
        });
    }
}

async fn execute_cycle(
    source: &dyn EventSource,
    store: &ViewStateStore,
    ticket: CycleTicket,
    limit: u32,
    series_len: usize,
) -> CommitResult {
    debug!("Cycle {} started (filter: {})", ticket.seq, ticket.filter);

    let outcome = match tokio::try_join!(
        source.fetch_events(&ticket.filter, limit),
        source.fetch_stats()
    ) {
        Ok((events, stats)) => {
            debug!("Cycle {} fetched {} events", ticket.seq, events.len());
            CycleOutcome::success(events, stats, series_len)
        }
        Err(error) => {
            warn!("Failed to fetch dashboard data: {}", error);
            CycleOutcome::failure(error)
        }
    };

    let result = store.commit(&ticket, outcome);
    if result == CommitResult::Applied {
        debug!("Cycle {} committed", ticket.seq);
    }
    result
}

/// Control side of a spawned [`Poller`]. Dropping it has the same effect as
/// [`PollerHandle::stop`].
pub struct PollerHandle {
    tx: mpsc::UnboundedSender<PollerCommand>,
    cancel: CancellationToken,
    store: Arc<ViewStateStore>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn store(&self) -> Arc<ViewStateStore> {
        Arc::clone(&self.store)
    }

    /// Applies a user filter change and starts a cycle for it right away.
    ///
    /// Returns `false` when the filter is unchanged, in which case nothing is
    /// scheduled. In-flight cycles are not awaited.
    pub fn set_filter(&self, filter: ModelFilter) -> bool {
        if !self.store.set_filter(filter) {
            return false;
        }
        self.send(PollerCommand::Rearm {
            reason: "filter changed",
        });
        true
    }

    /// Starts a cycle now without changing the filter.
    pub fn refresh(&self) {
        self.send(PollerCommand::Rearm {
            reason: "manual refresh",
        });
    }

    /// Cancels the timer and closes the store. Requests already in flight
    /// still complete, but their results are discarded.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.store.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Poller task ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: PollerCommand) {
        if self.tx.send(command).is_err() {
            debug!("Poller loop already exited");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if !self.store.is_closed() {
            debug!("Poller handle dropped; closing view state");
        }
        self.stop();
    }
}
