#![forbid(unsafe_code)]

//! Error types for the reveal and rotation engine.
//!
//! Every error here is raised synchronously at the call boundary. Nothing is
//! deferred into a running timer, and nothing propagates into the host page:
//! setup mistakes surface as [`ConfigError`], bad user input as
//! [`RotatorError::InvalidIndex`], and a missing observation primitive is a
//! logged [`ObservationUnavailable`] that the tracker recovers from itself.

use std::fmt;

use crate::visibility::RegionId;

/// Invalid engine configuration, detected at setup time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A reveal step declared a delay below zero.
    NegativeDelay {
        /// Identifier of the offending step.
        step: String,
        /// The delay as declared, in milliseconds.
        delay_ms: i64,
    },
    /// Two steps in one sequence share an identifier.
    DuplicateStep(String),
    /// A rotation set was declared with no items.
    EmptyRotationSet,
    /// The rotation interval is zero.
    ZeroInterval,
    /// The crossfade would not finish before the next interval tick.
    CrossfadeTooLong {
        /// Configured crossfade duration in milliseconds.
        crossfade_ms: u128,
        /// Configured interval in milliseconds.
        interval_ms: u128,
    },
    /// A page size of zero.
    ZeroPageSize,
    /// A visibility threshold outside `[0, 1]` or not finite.
    InvalidThreshold(f32),
    /// A root margin string that is not 1–4 CSS lengths.
    InvalidRootMargin(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDelay { step, delay_ms } => {
                write!(f, "reveal step `{step}` has negative delay {delay_ms}ms")
            }
            Self::DuplicateStep(step) => write!(f, "reveal step `{step}` declared twice"),
            Self::EmptyRotationSet => write!(f, "rotation set must contain at least one item"),
            Self::ZeroInterval => write!(f, "rotation interval must be non-zero"),
            Self::CrossfadeTooLong {
                crossfade_ms,
                interval_ms,
            } => write!(
                f,
                "crossfade of {crossfade_ms}ms must be shorter than the {interval_ms}ms interval"
            ),
            Self::ZeroPageSize => write!(f, "page size must be positive"),
            Self::InvalidThreshold(t) => write!(f, "visibility threshold {t} outside [0, 1]"),
            Self::InvalidRootMargin(raw) => write!(f, "invalid root margin `{raw}`"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from arming or disarming a reveal sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealError {
    /// The step list or observer configuration is invalid.
    Config(ConfigError),
    /// The region already has a sequence armed.
    AlreadyArmed(RegionId),
    /// The region has no sequence armed.
    UnknownRegion(RegionId),
}

impl fmt::Display for RevealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid reveal configuration: {err}"),
            Self::AlreadyArmed(region) => write!(f, "region {region} is already armed"),
            Self::UnknownRegion(region) => write!(f, "region {region} is not armed"),
        }
    }
}

impl std::error::Error for RevealError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for RevealError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Errors from driving an auto-rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatorError {
    /// `jump_to` target outside `[0, len)`. State is unchanged.
    InvalidIndex {
        /// Requested index.
        index: usize,
        /// Size of the rotation set.
        len: usize,
    },
    /// `start` called while the repeating timer is already armed.
    AlreadyRunning,
    /// The rotator was torn down and accepts no further commands.
    TornDown,
}

impl fmt::Display for RotatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIndex { index, len } => {
                write!(f, "index {index} out of range for rotation set of {len}")
            }
            Self::AlreadyRunning => write!(f, "rotator already started"),
            Self::TornDown => write!(f, "rotator has been torn down"),
        }
    }
}

impl std::error::Error for RotatorError {}

/// Why the tracker fell back to reporting regions as always visible.
///
/// Never returned to callers; the tracker logs it and degrades gracefully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationUnavailable {
    /// The host has no intersection-observation primitive.
    Unsupported,
    /// The primitive exists but refused to create an observer.
    CreateFailed(String),
}

impl fmt::Display for ObservationUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "intersection observation not supported by host"),
            Self::CreateFailed(msg) => write!(f, "observer creation failed: {msg}"),
        }
    }
}

impl std::error::Error for ObservationUnavailable {}
