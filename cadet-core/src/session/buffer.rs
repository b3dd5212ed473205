//! Feedback buffer shared between request handlers and a session worker
//!
//! Handlers append annotations as they arrive; the worker drains the whole
//! buffer once it holds at least `threshold` items. Both sides go through the
//! same mutex, so a drain and a concurrent append never lose or duplicate an
//! annotation.

use tokio::sync::{Mutex, Notify};

use crate::types::Annotation;

#[derive(Debug)]
pub struct FeedbackBuffer {
    pending: Mutex<Vec<Annotation>>,
    threshold: usize,
    ready: Notify,
}

impl FeedbackBuffer {
    /// Create a buffer that is ready once it holds `threshold` annotations
    ///
    /// A threshold of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            threshold: threshold.max(1),
            ready: Notify::new(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Append a batch in arrival order, returning the new buffer length
    pub async fn append(&self, annotations: Vec<Annotation>) -> usize {
        let len = {
            let mut pending = self.pending.lock().await;
            pending.extend(annotations);
            pending.len()
        };

        if len >= self.threshold {
            self.ready.notify_one();
        }
        len
    }

    /// Drain every buffered annotation if the threshold has been reached
    pub async fn take_if_ready(&self) -> Option<Vec<Annotation>> {
        let mut pending = self.pending.lock().await;
        if pending.len() < self.threshold {
            return None;
        }
        Some(std::mem::take(&mut *pending))
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Resolve after an append has brought the buffer to its threshold
    ///
    /// A notification sent while nobody is waiting is kept for the next
    /// caller, so this may also resolve for a buffer that was drained since.
    pub async fn threshold_reached(&self) {
        self.ready.notified().await;
    }
}
