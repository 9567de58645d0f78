//! Error types for construction and lifecycle failures.
//!
//! Runtime anomalies that the synchronizer tolerates by design — late
//! primaries, stale evictions, buffer overflow — are never represented here.
//! Those are reported to listeners (see [`crate::syncer`]) or logged; this
//! enum only covers the unrecoverable cases named in the error handling
//! design: bad construction arguments and an illegal `start()` call.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncerError {
    #[error("invalid capacity {capacity} for stream '{stream}': capacity must be >= 1")]
    InvalidArgument { stream: &'static str, capacity: usize },

    #[error("invalid state for '{action}': syncer is already running")]
    InvalidState { action: &'static str },
}

pub type Result<T> = std::result::Result<T, SyncerError>;
