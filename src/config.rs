//! ==============================================================================
//! config.rs - runtime configuration loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dial.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - SensorConfig: serial port for the dial and the reconnect policy.
//!     - DialConfig: raw value range plus the conditioning knobs.
//!     - LibraryConfig: media directory and extension allow-list.
//!     - BackendConfig: player binary, HTTP endpoint and retry policy.
//!     - TimingConfig: tick cadence and the idle auto-advance interval.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct KioskConfig {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub dial: DialConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    /// Serial device the dial microcontroller enumerates as
    pub port: String,
    pub baud_rate: u32,
    /// How long to wait before retrying a lost or absent port
    pub reconnect_interval_s: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DialConfig {
    /// Exclusive upper bound of raw readings (10-bit ADC gives 1024)
    pub range_max: u32,
    /// Smoothing window length in frames
    pub buffer_size: usize,
    /// Minimum change in raw units before a new value counts
    pub change_threshold: u32,
    /// Minimum time between accepted changes
    pub debounce_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LibraryConfig {
    pub path: PathBuf,
    /// Case-insensitive extension allow-list
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    /// Player executable to spawn; must expose the VLC-style HTTP interface
    pub player_binary: String,
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
    /// Attempts per switch before giving up and keeping the prior selection
    pub retry_attempts: u32,
    pub retry_spacing_ms: u64,
    /// Readiness polls while the player process boots
    pub startup_attempts: u32,
    pub startup_spacing_s: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    /// While no sensor is connected, advance to the next item this often
    pub auto_advance_interval_s: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl KioskConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: KioskConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("dial.toml"),
            PathBuf::from("dial.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│          KIOSK CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Sensor Port: {}              │", self.sensor.port);
        println!("│ Media Dir: {}               │", self.library.path.display());
        println!("│ Player: {}:{}                  │", self.backend.host, self.backend.port);
        println!("│ Tick: {}ms / Auto-advance: {}s         │",
            self.timing.tick_interval_ms, self.timing.auto_advance_interval_s);
        println!("│ Log Level: {}                        │", self.logging.level);
        println!("├─────────────────────────────────────────┤");
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            dial: DialConfig::default(),
            library: LibraryConfig::default(),
            backend: BackendConfig::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            reconnect_interval_s: 5,
        }
    }
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            range_max: 1024,
            buffer_size: 2,
            change_threshold: 3,
            debounce_interval_ms: 50,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/home/pi/videos"),
            extensions: vec!["mov".to_string(), "mp4".to_string()],
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            player_binary: "vlc".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_ms: 1000,
            retry_attempts: 3,
            retry_spacing_ms: 200,
            startup_attempts: 10,
            startup_spacing_s: 2,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
            auto_advance_interval_s: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
