//! ==============================================================================
//! backend.rs - player process and HTTP control channel
//! ==============================================================================
//!
//! purpose:
//!     owns the fullscreen media player: spawns it with its HTTP remote
//!     control interface enabled, waits for that interface to come up,
//!     loads the playlist, and exposes the two commands the controller
//!     needs (switch, hide interface).
//!
//!     every HTTP method here is SINGLE attempt. the bounded retry policy
//!     lives in controller.rs so the backend stays a thin wire layer.
//!
//! relationships:
//!     - uses: config.rs (BackendConfig), error.rs (BackendError),
//!       library.rs (playlist load)
//!     - used by: controller.rs (via the PlaybackBackend trait), main.rs
//!       (session bootstrap and shutdown)
//!
//! ==============================================================================

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::library::MediaLibrary;

/// The commands the selection controller issues
///
/// Implementations are single-attempt; callers own retries.
#[allow(async_fn_in_trait)]
pub trait PlaybackBackend {
    /// Start playing the playlist entry at `index` (zero-based)
    async fn switch_to(&self, index: usize) -> Result<(), BackendError>;
    /// Dismiss the player's on-screen interface
    async fn hide_interface(&self) -> Result<(), BackendError>;
}

/// Subset of the player's status.json we care about
#[derive(Debug, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "currentplid")]
    pub current_plid: i64,
}

/// Per-session numeric password for the player's HTTP interface
pub fn generate_password() -> String {
    rand::thread_rng().gen_range(10_000..=99_999).to_string()
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

// ==============================================================================
// HTTP control channel
// ==============================================================================

pub struct HttpBackend {
    client: reqwest::Client,
    status_url: String,
    password: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, password: String) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            status_url: status_url(config),
            password,
        })
    }

    /// One GET against status.json, with or without a command
    async fn request(&self, query: &[(&str, &str)]) -> Result<PlayerStatus, BackendError> {
        let response = self
            .client
            .get(&self.status_url)
            .basic_auth("", Some(&self.password))
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::RequestFailed(format!(
                "HTTP {} from player",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        serde_json::from_str(&body).map_err(|_| BackendError::EmptyResponse)
    }

    /// Probe the interface without side effects
    pub async fn status(&self) -> Result<PlayerStatus, BackendError> {
        self.request(&[]).await
    }

    /// Append one file to the player's playlist
    pub async fn enqueue(&self, path: &Path) -> Result<(), BackendError> {
        let input = file_url(path);
        self.request(&[("command", "in_enqueue"), ("input", input.as_str())])
            .await?;
        Ok(())
    }

    /// Poll status.json until the interface answers
    pub async fn wait_ready(&self, attempts: u32, spacing: Duration) -> Result<(), BackendError> {
        for attempt in 1..=attempts {
            match self.status().await {
                Ok(_) => {
                    log::info!("player HTTP interface is ready");
                    return Ok(());
                }
                Err(e) => {
                    log::info!(
                        "player HTTP not ready yet (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        e
                    );
                }
            }
            tokio::time::sleep(spacing).await;
        }
        Err(BackendError::Unreachable(format!(
            "player HTTP interface not ready after {} attempts",
            attempts
        )))
    }
}

impl PlaybackBackend for HttpBackend {
    async fn switch_to(&self, index: usize) -> Result<(), BackendError> {
        let id = index.to_string();
        self.request(&[("command", "pl_play"), ("id", id.as_str())])
            .await?;
        Ok(())
    }

    async fn hide_interface(&self) -> Result<(), BackendError> {
        self.request(&[("command", "key"), ("key", "h")]).await?;
        Ok(())
    }
}

fn status_url(config: &BackendConfig) -> String {
    format!(
        "http://{}:{}/requests/status.json",
        config.host, config.port
    )
}

// ==============================================================================
// player process
// ==============================================================================

pub struct PlayerProcess {
    child: tokio::process::Child,
}

impl PlayerProcess {
    /// Spawn the player in kiosk form with the HTTP interface enabled
    pub fn spawn(config: &BackendConfig, password: &str) -> Result<Self, BackendError> {
        let child = tokio::process::Command::new(&config.player_binary)
            .args([
                "--fullscreen",
                "--no-video-title-show",
                "--no-osd",
                "--no-video-deco",
                "--quiet",
                "--playlist-autostart",
                "--extraintf",
                "http",
            ])
            .arg("--http-host")
            .arg(&config.host)
            .arg("--http-port")
            .arg(config.port.to_string())
            .arg("--http-password")
            .arg(password)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BackendError::Unreachable(format!(
                    "failed to spawn {}: {}",
                    config.player_binary, e
                ))
            })?;

        log::info!("spawned player process ({})", config.player_binary);
        Ok(Self { child })
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            log::warn!("failed to kill player process: {}", e);
        }
    }
}

// ==============================================================================
// session bootstrap
// ==============================================================================

/// A running player plus the channel that controls it
///
/// The two halves separate at the call site: the backend moves into the
/// controller, the process handle stays behind for teardown.
pub struct PlaybackSession {
    pub backend: HttpBackend,
    pub process: PlayerProcess,
}

impl PlaybackSession {
    /// Spawn the player, wait for its HTTP interface, load the playlist.
    ///
    /// A player that never answers is NOT fatal: the session is returned
    /// anyway and per-switch retries pick the interface up once it
    /// appears. Only a spawn failure (missing binary) is an error.
    pub async fn start(
        config: &BackendConfig,
        library: &MediaLibrary,
    ) -> Result<Self, BackendError> {
        let password = generate_password();
        let process = PlayerProcess::spawn(config, &password)?;
        let backend = HttpBackend::new(config, password)?;

        let ready = backend
            .wait_ready(
                config.startup_attempts,
                Duration::from_secs(config.startup_spacing_s),
            )
            .await;
        if let Err(e) = ready {
            log::error!("continuing without a confirmed player interface: {}", e);
        }

        for item in library.items() {
            match backend.enqueue(item).await {
                Ok(()) => log::info!("added to playlist: {}", item.display()),
                Err(e) => log::warn!("failed to enqueue {}: {}", item.display(), e),
            }
        }

        Ok(Self { backend, process })
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn password_is_five_digits() {
        for _ in 0..100 {
            let password = generate_password();
            assert_eq!(password.len(), 5);
            let value: u32 = password.parse().unwrap();
            assert!((10_000..=99_999).contains(&value));
        }
    }

    #[test]
    fn status_url_targets_the_json_endpoint() {
        let config = BackendConfig::default();
        assert_eq!(
            status_url(&config),
            "http://127.0.0.1:8080/requests/status.json"
        );
    }

    #[test]
    fn file_url_keeps_the_absolute_path() {
        let path = PathBuf::from("/home/pi/videos/clip one.mp4");
        assert_eq!(file_url(&path), "file:///home/pi/videos/clip one.mp4");
    }

    #[test]
    fn status_payload_parses_with_extra_fields() {
        let body = r#"{
            "state": "playing",
            "currentplid": 4,
            "position": 0.25,
            "fullscreen": true,
            "information": {"category": {}}
        }"#;
        let status: PlayerStatus = serde_json::from_str(body).unwrap();
        assert_eq!(status.state, "playing");
        assert_eq!(status.current_plid, 4);
    }

    #[test]
    fn status_payload_tolerates_missing_fields() {
        let status: PlayerStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status.state, "");
        assert_eq!(status.current_plid, 0);
    }
}
