//! In-memory fetcher and sink for tests and local runs
//!
//! [`MockFetcher`] answers every fetch from memory and [`RecordingSink`]
//! keeps every delivered ranking so tests can assert on what a session
//! published and when.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::traits::{ResultSink, SinkFactory, SourceFetcher};
use crate::error::ClientError;
use crate::types::{AnnotationUnitIdentifier, Communication, ContactInfo, Ranking, SessionId};

/// Fetcher that serves communications from memory
///
/// Unknown IDs get a synthesized, text-less communication unless
/// [`MockFetcher::strict`] is used.
#[derive(Debug, Default)]
pub struct MockFetcher {
    communications: HashMap<String, Communication>,
    strict: bool,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only return communications that were registered with `with_communication`
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Fail every fetch with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_communication(mut self, communication: Communication) -> Self {
        self.communications
            .insert(communication.id.clone(), communication);
        self
    }

    /// Number of fetch calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch(&self, communication_ids: &[String]) -> Result<Vec<Communication>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(ClientError::Unavailable(message.clone()));
        }

        Ok(communication_ids
            .iter()
            .filter_map(|id| match self.communications.get(id) {
                Some(communication) => Some(communication.clone()),
                None if self.strict => None,
                None => Some(Communication::new(id.clone())),
            })
            .collect())
    }
}

/// A ranking captured by [`RecordingSink`]
#[derive(Debug, Clone)]
pub struct Delivery {
    pub session_id: SessionId,
    pub ranking: Ranking,
    pub at: Instant,
}

/// Sink that records every delivered ranking
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Delivery>>,
    failures_remaining: AtomicUsize,
    delivered: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `count` deliveries, then record normally
    pub fn failing_first(count: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn delivery_count(&self) -> usize {
        self.deliveries.lock().await.len()
    }

    /// Wait until at least `count` rankings have been recorded
    pub async fn wait_for_deliveries(&self, count: usize) -> Vec<Delivery> {
        loop {
            let notified = self.delivered.notified();
            {
                let deliveries = self.deliveries.lock().await;
                if deliveries.len() >= count {
                    return deliveries.clone();
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn deliver(
        &self,
        session_id: &SessionId,
        ranking: &[AnnotationUnitIdentifier],
    ) -> Result<(), ClientError> {
        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ClientError::Unavailable("broker unreachable".to_string()));
        }

        self.deliveries.lock().await.push(Delivery {
            session_id: session_id.clone(),
            ranking: ranking.to_vec(),
            at: Instant::now(),
        });
        self.delivered.notify_waiters();
        Ok(())
    }
}

/// Hands the same [`RecordingSink`] to every session
#[derive(Debug, Clone, Default)]
pub struct MockSinkFactory {
    sink: Arc<RecordingSink>,
}

impl MockSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Arc<RecordingSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> Arc<RecordingSink> {
        Arc::clone(&self.sink)
    }
}

impl SinkFactory for MockSinkFactory {
    fn create(&self, _contact: &ContactInfo) -> Arc<dyn ResultSink> {
        self.sink.clone()
    }
}
