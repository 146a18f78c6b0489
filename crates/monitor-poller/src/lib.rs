pub mod poller;

pub use poller::{Poller, PollerConfig, PollerHandle, DEFAULT_EVENTS_LIMIT, DEFAULT_POLL_INTERVAL};
