//! Session lifecycle: registry, per-session workers and feedback buffering

pub mod buffer;
pub mod registry;
pub mod state;
pub mod worker;

// Re-export key types for convenience
pub use buffer::FeedbackBuffer;
pub use registry::SessionRegistry;
pub use state::{SessionInfo, WorkerState};
pub use worker::{WakeStrategy, WorkerHandle, WorkerSettings};
