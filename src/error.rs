//! ==============================================================================
//! error.rs - failure taxonomy
//! ==============================================================================
//!
//! purpose:
//!     typed failure enums for the two external channels the controller
//!     talks to: the dial sensor (serial) and the playback backend (http).
//!
//!     the split the rest of the code relies on:
//!     - "no new data this tick" is NOT an error; it is Ok(None) at the
//!       call sites that read the sensor.
//!     - malformed sensor frames are sensor noise, represented as None by
//!       the conditioner, never as an error value.
//!     - only a missing media library is fatal; everything here is absorbed
//!       locally and logged.
//!
//! relationships:
//!     - used by: sensor.rs (SensorError), backend.rs / controller.rs
//!       (BackendError)
//!
//! ==============================================================================

use thiserror::Error;

/// Failure modes of the dial sensor channel
#[derive(Debug, Error)]
pub enum SensorError {
    /// Port could not be opened; the system keeps running headless
    #[error("sensor port unavailable: {0}")]
    Unavailable(String),

    /// Device disappeared mid-run (e.g. USB unplug); the loop degrades to
    /// auto-advance until the reconnect policy recovers the port
    #[error("sensor device lost: {0}")]
    DeviceLost(String),

    /// Transient I/O error on an open port
    #[error("sensor I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes of the playback control channel
#[derive(Debug, Error)]
pub enum BackendError {
    /// Control channel could not be reached at all
    #[error("player control channel unreachable: {0}")]
    Unreachable(String),

    /// The player answered with a non-success status
    #[error("player request failed: {0}")]
    RequestFailed(String),

    /// The player answered 200 with an empty or unparseable body; counts
    /// as a failed attempt eligible for retry
    #[error("player returned an empty or malformed response")]
    EmptyResponse,

    /// A switch request failed every attempt; prior selection is kept
    #[error("switch to item {index} failed after {attempts} attempts")]
    Exhausted { index: usize, attempts: u32 },
}
