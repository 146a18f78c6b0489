pub mod error;
pub mod http;
pub mod sample;
pub mod source;

pub use error::{SourceError, SourceResult};
pub use http::{HttpEventSource, HttpSourceConfig};
pub use sample::SampleEventSource;
pub use source::EventSource;
