//! ==============================================================================
//! dial-probe.rs - serial diagnostics probe
//! ==============================================================================
//!
//! purpose:
//!     answers "is the dial actually sending anything?" without starting
//!     the player. opens the configured port through the same reader
//!     machinery as the daemon, prints every frame with a running count
//!     for a fixed window, then reports the total.
//!
//! usage:
//!     dial-probe            # listens for 30 seconds
//!
//! ==============================================================================

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use dial_kiosk::config::KioskConfig;
use dial_kiosk::sensor::{DialEvent, SensorSource};

const LISTEN_WINDOW: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let config = KioskConfig::load_or_default();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    println!(
        "Listening on {} for {} seconds...",
        config.sensor.port,
        LISTEN_WINDOW.as_secs()
    );

    let cancel = CancellationToken::new();
    let mut source = SensorSource::spawn(
        config.sensor.clone(),
        config.dial.range_max,
        cancel.clone(),
    );

    let started = Instant::now();
    let mut count: u64 = 0;

    while started.elapsed() < LISTEN_WINDOW {
        while let Some(event) = source.try_next() {
            match event {
                DialEvent::Frame { line, .. } => {
                    count += 1;
                    println!("Data [{}]: '{}'", count, line.trim());
                }
                DialEvent::Connected => println!("Port connected"),
                DialEvent::Lost { reason } => println!("Port lost: {}", reason),
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    cancel.cancel();
    println!(
        "Done. Received {} frame(s) in {} seconds.",
        count,
        LISTEN_WINDOW.as_secs()
    );
}
