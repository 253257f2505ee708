//! ==============================================================================
//! main.rs - daemon entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the whole kiosk together and owns process lifetime.
//!
//! responsibilities:
//!     - load configuration (dial.toml or defaults)
//!     - scan the media library (empty library is the one fatal startup error)
//!     - spawn the media player and load its playlist
//!     - spawn the serial reader for the dial
//!     - run the control loop until SIGINT/SIGTERM
//!     - tear the player process down on exit
//!
//! relationships:
//!     - uses: every module in the crate root, via lib.rs
//!
//! ==============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use dial_kiosk::backend::PlaybackSession;
use dial_kiosk::config::KioskConfig;
use dial_kiosk::controller::PlaybackController;
use dial_kiosk::library::MediaLibrary;
use dial_kiosk::runloop::RunLoop;
use dial_kiosk::sensor::SensorSource;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  dial-kiosk - rotary selection controller");
    println!("===========================================================");

    // step 1: load configuration
    let config = KioskConfig::load_or_default();
    init_logging(&config.logging.level);
    config.print_summary();

    // step 2: build the selection space
    let library = MediaLibrary::scan(&config.library.path, &config.library.extensions)
        .context("media library scan failed")?;
    println!("[STARTUP] Found {} playable item(s):", library.len());
    for (index, item) in library.items().iter().enumerate() {
        let name = item
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<non-utf8 name>");
        println!("  [{}] {}", index, name);
    }

    // step 3: spawn the player and load the playlist
    println!("\n[STARTUP] Starting media player...");
    let session = PlaybackSession::start(&config.backend, &library)
        .await
        .context("failed to start the media player")?;
    let PlaybackSession { backend, process } = session;
    println!("[STARTUP] ✓ Player session up");

    // step 4: spawn the dial reader
    let cancel = CancellationToken::new();
    let source = SensorSource::spawn(
        config.sensor.clone(),
        config.dial.range_max,
        cancel.clone(),
    );

    // step 5: signal handler cancels the loop; a second signal is absorbed
    // by the already-cancelled token
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        println!("\n[SHUTDOWN] Signal received, stopping...");
        signal_cancel.cancel();
    });

    // step 6: control loop until cancellation
    let controller = PlaybackController::new(
        backend,
        config.backend.retry_attempts,
        Duration::from_millis(config.backend.retry_spacing_ms),
    );
    let runloop = RunLoop::new(&config, library.len(), controller);
    println!(
        "\n[RUNTIME] Entering control loop ({}ms tick)",
        config.timing.tick_interval_ms
    );
    println!("────────────────────────────────────────────────────────────");
    runloop.run(source, cancel.clone()).await;

    // step 7: teardown
    process.shutdown().await;
    println!("[SHUTDOWN] Player stopped. Bye.");
    Ok(())
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install ctrl-c handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
