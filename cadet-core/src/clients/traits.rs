//! Seams to the two downstream services
//!
//! Workers never talk to the network directly: content comes in through a
//! [`SourceFetcher`] and rankings go out through a [`ResultSink`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{AnnotationUnitIdentifier, Communication, ContactInfo, SessionId};

/// Retrieves communication content by ID
///
/// Implementations must not retry internally; the worker decides what a
/// failure means.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, communication_ids: &[String]) -> Result<Vec<Communication>, ClientError>;
}

/// Receives the ordered units of a session
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(
        &self,
        session_id: &SessionId,
        ranking: &[AnnotationUnitIdentifier],
    ) -> Result<(), ClientError>;
}

/// Builds the sink bound to one session's result target
pub trait SinkFactory: Send + Sync {
    fn create(&self, contact: &ContactInfo) -> Arc<dyn ResultSink>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_fetcher_object_safe(_: Arc<dyn SourceFetcher>) {}
    fn _assert_sink_object_safe(_: Arc<dyn ResultSink>) {}
    fn _assert_sink_factory_object_safe(_: Arc<dyn SinkFactory>) {}
}
