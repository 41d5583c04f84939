#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! The site this engine was extracted from hardcoded its timing constants
//! per component (150, 200, 300 ms ... with no common rule). Here they are
//! plain configuration with defaults taken from the site's most common
//! values. Nothing in the engine infers timing on its own.
//!
//! With the `serde` feature every type deserializes; durations are written
//! in milliseconds and the root margin as a CSS string:
//!
//! ```json
//! {
//!   "observer": { "thresholds": [0.1, 0.3, 0.5], "root_margin": "-50px 0px" },
//!   "rotator": { "interval_ms": 9000, "crossfade_ms": 700, "easing": "ease-in-out" },
//!   "page_size": 3
//! }
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::animation::Easing;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Root margin
// ---------------------------------------------------------------------------

/// Grow (positive) or shrink (negative) the observation root, in pixels.
///
/// Parsed from the CSS shorthand accepted by intersection observers:
/// one to four lengths in top/right/bottom/left order, `px` or unitless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RootMargin {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl RootMargin {
    /// No margin.
    pub const ZERO: Self = Self::uniform(0);

    /// Same margin on all four sides.
    #[must_use]
    pub const fn uniform(px: i32) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }

    /// Vertical and horizontal margins.
    #[must_use]
    pub const fn symmetric(vertical: i32, horizontal: i32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Parse a CSS margin shorthand such as `"-50px 0px -50px 0px"`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRootMargin(raw.to_string());
        let mut values = [0i32; 4];
        let mut count = 0;
        for token in raw.split_whitespace() {
            if count == 4 {
                return Err(invalid());
            }
            let number = token.strip_suffix("px").unwrap_or(token);
            values[count] = number.parse::<i32>().map_err(|_| invalid())?;
            count += 1;
        }
        let [a, b, c, d] = values;
        match count {
            1 => Ok(Self::uniform(a)),
            2 => Ok(Self::symmetric(a, b)),
            3 => Ok(Self {
                top: a,
                right: b,
                bottom: c,
                left: b,
            }),
            4 => Ok(Self {
                top: a,
                right: b,
                bottom: c,
                left: d,
            }),
            _ => Err(invalid()),
        }
    }
}

impl FromStr for RootMargin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RootMargin {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Observer configuration
// ---------------------------------------------------------------------------

/// Thresholds and root margin for one intersection observer.
///
/// Thresholds are normalized on construction (sorted, deduplicated), so two
/// configurations that observe identically compare equal and share a
/// [`ObserverKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverConfig {
    thresholds: Vec<f32>,
    root_margin: RootMargin,
}

/// Hashable identity of an [`ObserverConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObserverKey {
    threshold_bits: Vec<u32>,
    root_margin: RootMargin,
}

impl ObserverConfig {
    /// Build a configuration, validating every threshold.
    ///
    /// An empty threshold list means `[0.0]`, matching the browser default.
    pub fn new(
        thresholds: impl IntoIterator<Item = f32>,
        root_margin: RootMargin,
    ) -> Result<Self, ConfigError> {
        let mut normalized = Vec::new();
        for t in thresholds {
            if !t.is_finite() || !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::InvalidThreshold(t));
            }
            // -0.0 and 0.0 must share a key.
            normalized.push(if t == 0.0 { 0.0 } else { t });
        }
        if normalized.is_empty() {
            normalized.push(0.0);
        }
        normalized.sort_by(f32::total_cmp);
        normalized.dedup();
        Ok(Self {
            thresholds: normalized,
            root_margin,
        })
    }

    /// Sorted, deduplicated thresholds.
    #[must_use]
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    #[must_use]
    pub fn root_margin(&self) -> RootMargin {
        self.root_margin
    }

    /// Key used to share one observer between identical configurations.
    #[must_use]
    pub fn key(&self) -> ObserverKey {
        ObserverKey {
            threshold_bits: self.thresholds.iter().map(|t| t.to_bits()).collect(),
            root_margin: self.root_margin,
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.1, 0.3, 0.5],
            root_margin: RootMargin::symmetric(-50, 0),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ObserverConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            #[serde(default)]
            thresholds: Option<Vec<f32>>,
            #[serde(default)]
            root_margin: Option<RootMargin>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let defaults = Self::default();
        Self::new(
            raw.thresholds.unwrap_or(defaults.thresholds),
            raw.root_margin.unwrap_or(defaults.root_margin),
        )
        .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Rotator configuration
// ---------------------------------------------------------------------------

/// Timing for an auto-rotating carousel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RotatorConfig {
    /// Time between automatic advances.
    #[cfg_attr(feature = "serde", serde(rename = "interval_ms", with = "millis"))]
    pub interval: Duration,
    /// Length of the crossfade between two items.
    #[cfg_attr(feature = "serde", serde(rename = "crossfade_ms", with = "millis"))]
    pub crossfade: Duration,
    /// Opacity curve of the incoming item during a crossfade.
    pub easing: Easing,
}

impl RotatorConfig {
    /// Check the invariants the rotator relies on.
    ///
    /// The crossfade must end strictly before the next tick so that at most
    /// one transition timer is ever live.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.crossfade >= self.interval {
            return Err(ConfigError::CrossfadeTooLong {
                crossfade_ms: self.crossfade.as_millis(),
                interval_ms: self.interval.as_millis(),
            });
        }
        Ok(())
    }

    /// Set the interval (builder).
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the crossfade duration (builder).
    #[must_use]
    pub fn crossfade(mut self, crossfade: Duration) -> Self {
        self.crossfade = crossfade;
        self
    }

    /// Set the crossfade easing (builder).
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            crossfade: Duration::from_secs(1),
            easing: Easing::EaseInOut,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Page-wide defaults shared by every mounted component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Observer used by reveal sections that don't bring their own.
    pub observer: ObserverConfig,
    /// Delay between capability confirmation and arming observers.
    #[cfg_attr(feature = "serde", serde(rename = "mount_delay_ms", with = "millis"))]
    pub mount_delay: Duration,
    pub rotator: RotatorConfig,
    /// Items per page in filtered grids.
    pub page_size: usize,
    /// Gap between consecutive steps of a generated reveal ladder.
    #[cfg_attr(feature = "serde", serde(rename = "reveal_spacing_ms", with = "millis"))]
    pub reveal_spacing: Duration,
}

impl EngineConfig {
    /// Validate every nested configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rotator.validate()?;
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            observer: ObserverConfig::default(),
            mount_delay: Duration::from_millis(50),
            rotator: RotatorConfig::default(),
            page_size: 3,
            reveal_spacing: Duration::from_millis(200),
        }
    }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_margin_four_values() {
        let m = RootMargin::parse("-50px 0px -50px 0px").unwrap();
        assert_eq!(m, RootMargin::symmetric(-50, 0));
    }

    #[test]
    fn root_margin_shorthands() {
        assert_eq!(RootMargin::parse("10px").unwrap(), RootMargin::uniform(10));
        assert_eq!(
            RootMargin::parse("10px 20px").unwrap(),
            RootMargin::symmetric(10, 20)
        );
        let three = RootMargin::parse("1 2 3").unwrap();
        assert_eq!((three.top, three.right, three.bottom, three.left), (1, 2, 3, 2));
    }

    #[test]
    fn root_margin_rejects_garbage() {
        for raw in ["", "10%", "1px 2px 3px 4px 5px", "abc"] {
            assert!(
                matches!(RootMargin::parse(raw), Err(ConfigError::InvalidRootMargin(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn root_margin_display_round_trips() {
        let m = RootMargin::parse("-50px 0px -50px 0px").unwrap();
        assert_eq!(m.to_string(), "-50px 0px -50px 0px");
        assert_eq!(m.to_string().parse::<RootMargin>().unwrap(), m);
    }

    #[test]
    fn thresholds_normalized() {
        let cfg = ObserverConfig::new([0.5, 0.1, 0.5, 0.3], RootMargin::ZERO).unwrap();
        assert_eq!(cfg.thresholds(), &[0.1, 0.3, 0.5]);
    }

    #[test]
    fn empty_thresholds_default_to_zero() {
        let cfg = ObserverConfig::new([], RootMargin::ZERO).unwrap();
        assert_eq!(cfg.thresholds(), &[0.0]);
    }

    #[test]
    fn invalid_thresholds_rejected() {
        for t in [-0.1, 1.5, f32::NAN, f32::INFINITY] {
            assert!(ObserverConfig::new([t], RootMargin::ZERO).is_err());
        }
    }

    #[test]
    fn equivalent_configs_share_key() {
        let a = ObserverConfig::new([0.3, 0.1], RootMargin::uniform(5)).unwrap();
        let b = ObserverConfig::new([0.1, 0.3, 0.1], RootMargin::uniform(5)).unwrap();
        let c = ObserverConfig::new([0.1, 0.3], RootMargin::uniform(6)).unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn rotator_validation() {
        assert!(RotatorConfig::default().validate().is_ok());
        assert_eq!(
            RotatorConfig::default()
                .interval(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroInterval)
        );
        assert!(matches!(
            RotatorConfig::default()
                .interval(Duration::from_millis(500))
                .crossfade(Duration::from_millis(500))
                .validate(),
            Err(ConfigError::CrossfadeTooLong { .. })
        ));
    }

    #[test]
    fn engine_defaults_match_site() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.mount_delay, Duration::from_millis(50));
        assert_eq!(cfg.page_size, 3);
        assert_eq!(cfg.observer.root_margin().top, -50);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn engine_rejects_zero_page_size() {
        let cfg = EngineConfig {
            page_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPageSize));
    }
}
