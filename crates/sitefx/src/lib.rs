#![forbid(unsafe_code)]

//! sitefx public facade crate.
//!
//! Re-exports the engine components, the project catalog, and (with the
//! `web` feature) the browser page session, plus a prelude for page code.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use sitefx_core::animation::Easing;
pub use sitefx_core::animation::stagger::StaggerMode;
pub use sitefx_core::{
    AutoRotator, CategoryFilter, Categorized, ConfigError, EngineConfig, FilterState,
    IntersectionEntry, ObservationUnavailable, ObserverBackend, ObserverConfig, PageSlice,
    RearmPolicy, RegionId, RevealError, RevealSink, RevealStep, RootMargin, RotationEvent,
    RotationFrame, RotationSink, RotatorConfig, RotatorError, RotatorPhase,
    StaggeredRevealSequencer, VisibilityChange, VisibilityTracker, VisualState, paginate,
    stagger_steps,
};

// --- Content re-exports ----------------------------------------------------

pub use sitefx_content::{Catalog, CatalogError, Project, ProjectCategory, ProjectStatus};

// --- Web re-exports --------------------------------------------------------

#[cfg(feature = "web")]
pub use sitefx_web::{
    ComponentId, HostCapabilities, PageSession, SessionError, SessionOutputs, load_config,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for sitefx pages.
#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    Reveal(RevealError),
    Rotator(RotatorError),
    Catalog(CatalogError),
    #[cfg(feature = "web")]
    Session(SessionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Reveal(err) => write!(f, "{err}"),
            Self::Rotator(err) => write!(f, "{err}"),
            Self::Catalog(err) => write!(f, "{err}"),
            #[cfg(feature = "web")]
            Self::Session(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Reveal(err) => Some(err),
            Self::Rotator(err) => Some(err),
            Self::Catalog(err) => Some(err),
            #[cfg(feature = "web")]
            Self::Session(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<RevealError> for Error {
    fn from(err: RevealError) -> Self {
        Self::Reveal(err)
    }
}

impl From<RotatorError> for Error {
    fn from(err: RotatorError) -> Self {
        Self::Rotator(err)
    }
}

impl From<CatalogError> for Error {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

#[cfg(feature = "web")]
impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

/// Standard result type for sitefx APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AutoRotator, Catalog, CategoryFilter, EngineConfig, Error, FilterState, ProjectCategory,
        RearmPolicy, RegionId, Result, RevealStep, StaggeredRevealSequencer, VisibilityTracker,
        VisualState,
    };

    #[cfg(feature = "web")]
    pub use crate::{ComponentId, HostCapabilities, PageSession};

    pub use crate::{content, core};

    #[cfg(feature = "web")]
    pub use crate::web;
}

pub use sitefx_content as content;
pub use sitefx_core as core;
#[cfg(feature = "web")]
pub use sitefx_web as web;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn featured_slides() -> Result<Vec<String>> {
        let catalog = Catalog::builtin()?;
        Ok(catalog
            .featured(content::FEATURED_COUNT)
            .into_iter()
            .map(|p| p.hero_image.clone())
            .collect())
    }

    #[test]
    fn errors_convert_with_question_mark() {
        assert!(!featured_slides().unwrap().is_empty());

        fn bad_rotator() -> Result<()> {
            RotatorConfig::default()
                .crossfade(Duration::from_secs(20))
                .validate()?;
            Ok(())
        }
        let err = bad_rotator().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::CrossfadeTooLong { .. })));
        assert!(std::error::Error::source(&err).is_some());
    }
}
