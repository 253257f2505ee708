//! ==============================================================================
//! runloop.rs - control loop
//! ==============================================================================
//!
//! purpose:
//!     the tick cycle that ties the pipeline together. every tick drains
//!     pending sensor events, pushes frames through the conditioner and
//!     the mapper, and hands resulting indices to the controller. while
//!     the sensor is absent the loop degrades to a timer that advances
//!     the playlist on its own, so the installation never freezes on one
//!     item because a cable fell out.
//!
//! auto-advance rules:
//!     - armed only while no sensor is connected (never connected, or Lost)
//!     - rearmed by sensor recovery and by every successful switch
//!
//! relationships:
//!     - uses: sensor.rs (event drain), conditioner.rs, mapper.rs,
//!       controller.rs
//!     - used by: main.rs
//!
//! ==============================================================================

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::PlaybackBackend;
use crate::conditioner::SignalConditioner;
use crate::config::KioskConfig;
use crate::controller::{PlaybackController, SwitchOutcome};
use crate::mapper::map_to_index;
use crate::sensor::{DialEvent, SensorSource};

pub struct RunLoop<B: PlaybackBackend> {
    conditioner: SignalConditioner,
    controller: PlaybackController<B>,
    item_count: usize,
    range_max: u32,
    tick_interval: Duration,
    auto_advance: Duration,
    connected: bool,
    last_advance: tokio::time::Instant,
}

impl<B: PlaybackBackend> RunLoop<B> {
    pub fn new(
        config: &KioskConfig,
        item_count: usize,
        controller: PlaybackController<B>,
    ) -> Self {
        let conditioner = SignalConditioner::new(
            config.dial.buffer_size,
            config.dial.change_threshold,
            Duration::from_millis(config.dial.debounce_interval_ms),
        );
        Self {
            conditioner,
            controller,
            item_count,
            range_max: config.dial.range_max,
            tick_interval: Duration::from_millis(config.timing.tick_interval_ms),
            auto_advance: Duration::from_secs(config.timing.auto_advance_interval_s),
            connected: false,
            last_advance: tokio::time::Instant::now(),
        }
    }

    /// Run until cancellation; the initial selection is item 0
    pub async fn run(mut self, mut source: SensorSource, cancel: CancellationToken) {
        self.apply_selection(0).await;
        self.last_advance = tokio::time::Instant::now();

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("control loop stopping");
                    return;
                }
                now = ticker.tick() => {
                    while let Some(event) = source.try_next() {
                        self.handle_event(event).await;
                    }
                    self.maybe_auto_advance(now).await;
                }
            }
        }
    }

    async fn handle_event(&mut self, event: DialEvent) {
        match event {
            DialEvent::Connected => {
                self.connected = true;
                self.last_advance = tokio::time::Instant::now();
                log::info!("dial sensor connected");
            }
            DialEvent::Lost { reason } => {
                self.connected = false;
                self.last_advance = tokio::time::Instant::now();
                log::warn!("dial sensor lost ({}), auto-advance active", reason);
            }
            DialEvent::Frame { line, at } => {
                if let Some(emitted) = self.conditioner.condition(&line, at) {
                    let index = map_to_index(emitted.value, self.range_max, self.item_count);
                    log::info!("dial: {} -> item {}", emitted.value, index);
                    self.apply_selection(index).await;
                }
            }
        }
    }

    async fn maybe_auto_advance(&mut self, now: tokio::time::Instant) {
        if self.connected {
            self.last_advance = now;
            return;
        }
        if now.duration_since(self.last_advance) >= self.auto_advance {
            let next = self.controller.next_index(self.item_count);
            log::info!("auto-advance to item {}", next);
            self.apply_selection(next).await;
            self.last_advance = now;
        }
    }

    async fn apply_selection(&mut self, index: usize) {
        match self.controller.select(index).await {
            Ok(SwitchOutcome::Switched) => {
                self.last_advance = tokio::time::Instant::now();
                log::info!("now playing item {}", index);
            }
            Ok(SwitchOutcome::AlreadyCurrent) => {}
            Err(e) => {
                // prior selection kept; the next emission or advance retries
                log::error!("{}", e);
            }
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::cell::RefCell;
    use std::time::Instant as StdInstant;

    struct CountingBackend {
        switches: RefCell<Vec<usize>>,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                switches: RefCell::new(Vec::new()),
            }
        }
    }

    impl PlaybackBackend for &CountingBackend {
        async fn switch_to(&self, index: usize) -> Result<(), BackendError> {
            self.switches.borrow_mut().push(index);
            Ok(())
        }

        async fn hide_interface(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn runloop<'a>(backend: &'a CountingBackend, items: usize) -> RunLoop<&'a CountingBackend> {
        let config = KioskConfig::default();
        let controller =
            PlaybackController::new(backend, 3, Duration::from_millis(200));
        RunLoop::new(&config, items, controller)
    }

    fn frame(line: &str, at: StdInstant) -> DialEvent {
        DialEvent::Frame {
            line: line.to_string(),
            at,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stable_frames_drive_a_switch() {
        let backend = CountingBackend::new();
        let mut rl = runloop(&backend, 4);
        let at = StdInstant::now();

        // default buffer size is 2: first frame fills, second emits
        rl.handle_event(frame("900", at)).await;
        rl.handle_event(frame("900", at)).await;

        // 900 / (1024 / 4) = 3
        assert_eq!(*backend.switches.borrow(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_produces_no_extra_switches() {
        let backend = CountingBackend::new();
        let mut rl = runloop(&backend, 4);
        let at = StdInstant::now();

        rl.handle_event(frame("512", at)).await;
        rl.handle_event(frame("512", at)).await;
        for delta in ["513", "511", "514", "510"] {
            rl.handle_event(frame(delta, at + Duration::from_secs(1))).await;
        }

        assert_eq!(backend.switches.borrow().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_zone_movement_never_reaches_the_backend() {
        let backend = CountingBackend::new();
        let mut rl = runloop(&backend, 4);
        let at = StdInstant::now();

        rl.handle_event(frame("10", at)).await;
        rl.handle_event(frame("10", at)).await;
        // big enough to clear the conditioner, still zone 0
        rl.handle_event(frame("100", at + Duration::from_secs(1))).await;

        assert_eq!(*backend.switches.borrow(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advance_fires_only_while_disconnected() {
        let backend = CountingBackend::new();
        let mut rl = runloop(&backend, 3);

        rl.handle_event(DialEvent::Connected).await;
        tokio::time::advance(Duration::from_secs(30)).await;
        rl.maybe_auto_advance(tokio::time::Instant::now()).await;
        assert!(backend.switches.borrow().is_empty());

        rl.handle_event(DialEvent::Lost {
            reason: "unplugged".to_string(),
        })
        .await;
        tokio::time::advance(Duration::from_secs(10)).await;
        rl.maybe_auto_advance(tokio::time::Instant::now()).await;
        assert_eq!(*backend.switches.borrow(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advance_wraps_around_the_playlist() {
        let backend = CountingBackend::new();
        let mut rl = runloop(&backend, 3);

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(10)).await;
            rl.maybe_auto_advance(tokio::time::Instant::now()).await;
        }

        assert_eq!(*backend.switches.borrow(), vec![0, 1, 2, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_timer_rearms_after_a_dial_switch() {
        let backend = CountingBackend::new();
        let mut rl = runloop(&backend, 4);
        let at = StdInstant::now();

        tokio::time::advance(Duration::from_secs(9)).await;
        rl.handle_event(frame("900", at)).await;
        rl.handle_event(frame("900", at)).await;
        assert_eq!(*backend.switches.borrow(), vec![3]);

        // only 1s of the old countdown remains but the switch rearmed it
        tokio::time::advance(Duration::from_secs(2)).await;
        rl.maybe_auto_advance(tokio::time::Instant::now()).await;
        assert_eq!(backend.switches.borrow().len(), 1);
    }
}
