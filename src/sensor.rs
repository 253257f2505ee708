//! ==============================================================================
//! sensor.rs - dial serial source
//! ==============================================================================
//!
//! purpose:
//!     reads newline-terminated decimal frames from the dial microcontroller
//!     over a serial port. a dedicated reader thread owns the blocking port
//!     and forwards events to the async side over an unbounded channel, so
//!     the tick loop never blocks on hardware.
//!
//! design philosophy:
//!     - "Compile Anywhere": default builds use a mock port that sweeps the
//!       dial range, so development machines run the full pipeline.
//!     - the absence of a port is not fatal. the worker keeps retrying on
//!       the reconnect interval and the rest of the system runs headless.
//!
//! relationships:
//!     - uses: error.rs (SensorError), config.rs (SensorConfig)
//!     - used by: runloop.rs (event drain per tick), bin/dial-probe.rs
//!     - uses: rppal (on feature="hardware")
//!
//! ==============================================================================

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::SensorConfig;
use crate::error::SensorError;

/// One newline-terminated reading, or nothing new this poll
///
/// `Ok(None)` means the port is healthy but has no complete frame yet.
/// Errors mean the port itself failed; malformed frame CONTENT is not an
/// error here, the conditioner drops it downstream.
pub trait DialPort: Send {
    fn read_frame(&mut self) -> Result<Option<String>, SensorError>;
}

/// What the reader thread tells the tick loop
#[derive(Debug)]
pub enum DialEvent {
    /// A complete frame arrived
    Frame { line: String, at: Instant },
    /// A port was (re)opened
    Connected,
    /// The port failed; the worker is backing off before reopening
    Lost { reason: String },
}

// ==============================================================================
// reader worker
// ==============================================================================

/// Handle to the background reader thread
pub struct SensorSource {
    rx: mpsc::UnboundedReceiver<DialEvent>,
}

impl SensorSource {
    /// Spawn the reader thread against the configured port
    pub fn spawn(sensor: SensorConfig, range_max: u32, cancel: CancellationToken) -> Self {
        let reconnect = Duration::from_secs(sensor.reconnect_interval_s);
        let port_config = sensor.clone();
        Self::spawn_with(
            move || open_port(&port_config, range_max),
            reconnect,
            cancel,
        )
    }

    /// Spawn the reader thread with an explicit port factory
    fn spawn_with<F>(mut factory: F, reconnect: Duration, cancel: CancellationToken) -> Self
    where
        F: FnMut() -> Result<Box<dyn DialPort>, SensorError> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let builder = std::thread::Builder::new().name("dial-sensor".to_string());
        let spawned = builder.spawn(move || {
            reader_worker(&mut factory, reconnect, &tx, &cancel);
        });
        if let Err(e) = spawned {
            log::error!("failed to spawn sensor reader thread: {}", e);
        }

        Self { rx }
    }

    /// Non-blocking drain step; the tick loop calls this until it returns None
    pub fn try_next(&mut self) -> Option<DialEvent> {
        self.rx.try_recv().ok()
    }
}

fn reader_worker<F>(
    factory: &mut F,
    reconnect: Duration,
    tx: &mpsc::UnboundedSender<DialEvent>,
    cancel: &CancellationToken,
) where
    F: FnMut() -> Result<Box<dyn DialPort>, SensorError>,
{
    while !cancel.is_cancelled() {
        let mut port = match factory() {
            Ok(port) => {
                if tx.send(DialEvent::Connected).is_err() {
                    return;
                }
                port
            }
            Err(e) => {
                log::warn!("dial port unavailable, retrying in {:?}: {}", reconnect, e);
                if wait_cancellable(cancel, reconnect) {
                    return;
                }
                continue;
            }
        };

        loop {
            if cancel.is_cancelled() {
                return;
            }
            match port.read_frame() {
                Ok(Some(line)) => {
                    let event = DialEvent::Frame {
                        line,
                        at: Instant::now(),
                    };
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    // idle poll spacing; frames arrive at human dial speed
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(SensorError::Io(e)) => {
                    // transient; the port's own strike counter escalates
                    // repeats to DeviceLost
                    log::debug!("dial port read error: {}", e);
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(e) => {
                    log::warn!("dial port failed: {}", e);
                    let _ = tx.send(DialEvent::Lost {
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        if wait_cancellable(cancel, reconnect) {
            return;
        }
    }
}

/// Sleep in short slices so shutdown is not held up by the reconnect delay.
/// Returns true when cancellation fired.
fn wait_cancellable(cancel: &CancellationToken, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        std::thread::sleep(remaining.min(Duration::from_millis(20)));
    }
}

// ==============================================================================
// REAL IMPLEMENTATION (Raspberry Pi UART)
// ==============================================================================
#[cfg(feature = "hardware")]
pub fn open_port(
    sensor: &SensorConfig,
    _range_max: u32,
) -> Result<Box<dyn DialPort>, SensorError> {
    let port = uart::UartPort::open(&sensor.port, sensor.baud_rate)?;
    log::info!("Using REAL dial port (rppal uart on {})", sensor.port);
    Ok(Box::new(port))
}

#[cfg(feature = "hardware")]
mod uart {
    use super::*;
    use rppal::uart::{Parity, Uart};

    /// I/O errors tolerated before the port is declared lost
    const MAX_STRIKES: u32 = 3;

    pub struct UartPort {
        uart: Uart,
        pending: Vec<u8>,
        strikes: u32,
    }

    impl UartPort {
        pub fn open(path: &str, baud_rate: u32) -> Result<Self, SensorError> {
            let mut uart = Uart::with_path(path, baud_rate, Parity::None, 8, 1)
                .map_err(|e| SensorError::Unavailable(format!("{}: {}", path, e)))?;
            // fully non-blocking reads; the worker supplies its own pacing
            uart.set_read_mode(0, Duration::ZERO)
                .map_err(|e| SensorError::Unavailable(format!("{}: {}", path, e)))?;
            Ok(Self {
                uart,
                pending: Vec::new(),
                strikes: 0,
            })
        }
    }

    impl DialPort for UartPort {
        fn read_frame(&mut self) -> Result<Option<String>, SensorError> {
            let mut buf = [0u8; 64];
            let n = match self.uart.read(&mut buf) {
                Ok(n) => {
                    self.strikes = 0;
                    n
                }
                Err(rppal::uart::Error::Io(e)) => {
                    self.strikes += 1;
                    if self.strikes >= MAX_STRIKES {
                        return Err(SensorError::DeviceLost(e.to_string()));
                    }
                    return Err(SensorError::Io(e));
                }
                Err(e) => {
                    return Err(SensorError::DeviceLost(e.to_string()));
                }
            };

            self.pending.extend_from_slice(&buf[..n]);

            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line));
            }

            // a frame is at most 4 digits plus CRLF; anything this long means
            // the firmware stopped terminating lines
            if self.pending.len() > 256 {
                self.pending.clear();
            }
            Ok(None)
        }
    }
}

// ==============================================================================
// MOCK IMPLEMENTATION (For Non-Hardware Build)
// ==============================================================================
#[cfg(not(feature = "hardware"))]
pub fn open_port(
    _sensor: &SensorConfig,
    range_max: u32,
) -> Result<Box<dyn DialPort>, SensorError> {
    log::info!("Using MOCK dial port (no hardware access)");
    Ok(Box::new(MockPort::new(range_max)))
}

/// Sweeps the dial range up and down so the full pipeline runs on a
/// development machine
#[cfg(not(feature = "hardware"))]
pub struct MockPort {
    value: u32,
    rising: bool,
    range_max: u32,
    last_emit: Option<Instant>,
}

#[cfg(not(feature = "hardware"))]
impl MockPort {
    const STEP: u32 = 8;
    const FRAME_SPACING: Duration = Duration::from_millis(100);

    pub fn new(range_max: u32) -> Self {
        Self {
            value: 0,
            rising: true,
            range_max: range_max.max(1),
            last_emit: None,
        }
    }
}

#[cfg(not(feature = "hardware"))]
impl DialPort for MockPort {
    fn read_frame(&mut self) -> Result<Option<String>, SensorError> {
        if let Some(last) = self.last_emit {
            if last.elapsed() < Self::FRAME_SPACING {
                return Ok(None);
            }
        }
        self.last_emit = Some(Instant::now());

        if self.rising {
            self.value = (self.value + Self::STEP).min(self.range_max - 1);
            if self.value == self.range_max - 1 {
                self.rising = false;
            }
        } else {
            self.value = self.value.saturating_sub(Self::STEP);
            if self.value == 0 {
                self.rising = true;
            }
        }
        Ok(Some(format!("{}\r\n", self.value)))
    }
}
