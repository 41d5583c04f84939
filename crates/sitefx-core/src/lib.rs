#![forbid(unsafe_code)]

//! Core: visibility tracking, staggered reveals, auto-rotation, and
//! filtered pagination for animated marketing pages.
//!
//! Nothing here owns a thread or a clock. The host feeds intersection
//! reports and a monotonic `now`, and the components call back into
//! caller-supplied sinks.

pub mod animation;
pub mod config;
pub mod error;
pub mod logging;
pub mod paginate;
pub mod reveal;
pub mod rotator;
pub mod timer;
pub mod visibility;
pub mod visual;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, warn};

pub use config::{EngineConfig, ObserverConfig, RootMargin, RotatorConfig};
pub use error::{ConfigError, ObservationUnavailable, RevealError, RotatorError};
pub use paginate::{CategoryFilter, Categorized, FilterState, PageSlice, paginate};
pub use reveal::{
    RearmPolicy, RevealSink, RevealStep, StaggeredRevealSequencer, stagger_steps, validate_steps,
};
pub use rotator::{AutoRotator, RotationEvent, RotationFrame, RotationSink, RotatorPhase};
pub use visibility::{
    IntersectionEntry, ObserverBackend, RegionId, Subscription, VisibilityChange,
    VisibilityTracker,
};
pub use visual::VisualState;
