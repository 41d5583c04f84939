#![forbid(unsafe_code)]

//! `sitefx-web` embeds the reveal and rotation engine in a browser page.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding page (JS) pushes observer entries and
//!   replays observer commands; the engine never calls DOM APIs.
//! - **Deterministic time**: the host advances a monotonic clock explicitly.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.

pub mod capability;
pub mod observer;
pub mod session;

use core::time::Duration;
use std::fmt;

use sitefx_core::{ConfigError, EngineConfig};

pub use capability::{CapabilityGate, GateState, HostCapabilities};
pub use observer::{HostObserverBackend, ObserverCommand};
pub use session::{
    ComponentId, PageSession, RotationUpdate, SessionError, SessionOutputs, StepResult,
    StyleUpdate,
};

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl Clock for DeterministicClock {
    fn now(&self) -> Duration {
        self.now
    }
}

/// Wall-clock time since construction, via `performance.now()` on wasm.
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    origin: web_time::Instant,
}

impl InstantClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Failure to load an [`EngineConfig`].
#[derive(Debug)]
pub enum LoadConfigError {
    Json(serde_json::Error),
    Invalid(ConfigError),
}

impl fmt::Display for LoadConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed engine config: {err}"),
            Self::Invalid(err) => write!(f, "invalid engine config: {err}"),
        }
    }
}

impl std::error::Error for LoadConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

/// Parse and validate an [`EngineConfig`] from JSON. Missing keys take
/// their defaults.
pub fn load_config(json: &str) -> Result<EngineConfig, LoadConfigError> {
    let config: EngineConfig = serde_json::from_str(json).map_err(LoadConfigError::Json)?;
    config.validate().map_err(LoadConfigError::Invalid)?;
    tracing::debug!(
        page_size = config.page_size,
        interval = ?config.rotator.interval,
        "engine config loaded"
    );
    Ok(config)
}

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"sitefx_core=debug"`).
#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deterministic_clock_saturates() {
        let mut clock = DeterministicClock::new();
        clock.advance(Duration::from_millis(16));
        assert_eq!(clock.now(), Duration::from_millis(16));
        clock.set(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::MAX);
    }

    #[test]
    fn instant_clock_is_monotonic() {
        let clock = InstantClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn load_config_applies_defaults_and_validates() {
        let config = load_config(r#"{ "page_size": 6 }"#).unwrap();
        assert_eq!(config.page_size, 6);
        assert_eq!(config.mount_delay, Duration::from_millis(50));

        assert!(matches!(
            load_config(r#"{ "page_size": 0 }"#),
            Err(LoadConfigError::Invalid(ConfigError::ZeroPageSize))
        ));
        assert!(matches!(
            load_config("not json"),
            Err(LoadConfigError::Json(_))
        ));
    }
}
