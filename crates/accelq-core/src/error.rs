//! Error types for accelq

use thiserror::Error;

/// Main error type for accelq
///
/// Submissions fail with exactly one of these kinds; the dispatcher never
/// re-wraps a kind it recognizes.
#[derive(Error, Debug)]
pub enum AccelqError {
    /// No device satisfied the selection policy
    #[error("device selection failed: {enabled} device(s) enabled, requested id {requested_id:?}")]
    Selection {
        /// Device id the caller asked for, if any
        requested_id: Option<u32>,
        /// Number of enabled devices at selection time
        enabled: usize,
    },

    /// Device discovery failed
    #[error("device probe failed: {0}")]
    Probe(String),

    /// Memory reservation denied
    #[error("memory budget exceeded on device {device_id}: requested {requested} bytes, {available} available")]
    BudgetExceeded {
        /// Device whose budget denied the reservation
        device_id: u32,
        /// Bytes the work item asked for
        requested: u64,
        /// Bytes still reservable at the time of denial
        available: u64,
    },

    /// Scope cancelled or timed out before a concurrency slot was granted
    #[error("submission cancelled while waiting for device admission")]
    Cancelled,

    /// Job raised an error the dispatcher does not recognize
    #[error("job failed: {0}")]
    Job(anyhow::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for accelq operations
pub type AccelqResult<T> = Result<T, AccelqError>;
