//! ==============================================================================
//! controller.rs - idempotent selection switching
//! ==============================================================================
//!
//! purpose:
//!     tracks which playlist item is current and turns "the dial landed on
//!     index N" into at most one switch command. re-selecting the current
//!     index costs nothing. a switch that fails is retried a bounded
//!     number of times; if every attempt fails the prior selection is
//!     kept and the caller may try again on the next dial movement.
//!
//! relationships:
//!     - uses: backend.rs (PlaybackBackend trait), error.rs (BackendError)
//!     - used by: runloop.rs (dial switches and auto-advance)
//!
//! ==============================================================================

use std::time::Duration;

use crate::backend::PlaybackBackend;
use crate::error::BackendError;

/// Pause between a successful switch and the interface-hide keypress, so
/// the player has started rendering the new item
const OSD_HIDE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The backend was told to play a new item
    Switched,
    /// The requested index is already playing; nothing was sent
    AlreadyCurrent,
}

pub struct PlaybackController<B: PlaybackBackend> {
    backend: B,
    current: Option<usize>,
    retry_attempts: u32,
    retry_spacing: Duration,
}

impl<B: PlaybackBackend> PlaybackController<B> {
    pub fn new(backend: B, retry_attempts: u32, retry_spacing: Duration) -> Self {
        Self {
            backend,
            current: None,
            retry_attempts: retry_attempts.max(1),
            retry_spacing,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Index the idle auto-advance should move to next
    pub fn next_index(&self, count: usize) -> usize {
        match self.current {
            Some(current) => (current + 1) % count.max(1),
            None => 0,
        }
    }

    /// Make `index` the playing item
    ///
    /// On exhaustion the current selection is left untouched, so the same
    /// index stays eligible for another full round of attempts later.
    pub async fn select(&mut self, index: usize) -> Result<SwitchOutcome, BackendError> {
        if self.current == Some(index) {
            return Ok(SwitchOutcome::AlreadyCurrent);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.switch_to(index).await {
                Ok(()) => {
                    self.current = Some(index);
                    tokio::time::sleep(OSD_HIDE_DELAY).await;
                    if let Err(e) = self.backend.hide_interface().await {
                        log::debug!("could not hide player interface: {}", e);
                    }
                    return Ok(SwitchOutcome::Switched);
                }
                Err(e) if attempt < self.retry_attempts => {
                    log::warn!(
                        "switch to item {} failed (attempt {}/{}): {}",
                        index,
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    tokio::time::sleep(self.retry_spacing).await;
                }
                Err(e) => {
                    log::error!(
                        "switch to item {} abandoned after {} attempts: {}",
                        index,
                        attempt,
                        e
                    );
                    return Err(BackendError::Exhausted {
                        index,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
