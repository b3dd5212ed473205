//! Clients for the fetch service and the broker

pub mod http;
pub mod mock;
pub mod traits;

// Re-export key types for convenience
pub use http::{BrokerClient, BrokerClientFactory, FetchClient};
pub use mock::{Delivery, MockFetcher, MockSinkFactory, RecordingSink};
pub use traits::{ResultSink, SinkFactory, SourceFetcher};
