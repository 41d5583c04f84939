#![forbid(unsafe_code)]

//! Easing curves and timed fades.
//!
//! The engine never renders anything itself. What it does compute is *how
//! far along* a timed transition is, so that a host can draw a crossfade
//! frame or interpolate a reveal. Values are normalized `f32` in `[0, 1]`.

pub mod stagger;

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out (slower end than quadratic).
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Named easing curve, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
    EaseOutCubic,
}

impl Easing {
    /// The curve as a plain function.
    #[must_use]
    pub fn as_fn(self) -> EasingFn {
        match self {
            Self::Linear => linear,
            Self::EaseIn => ease_in,
            Self::EaseOut => ease_out,
            Self::EaseInOut => ease_in_out,
            Self::EaseOutCubic => ease_out_cubic,
        }
    }

    /// Evaluate the curve at `t`.
    #[inline]
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        (self.as_fn())(t)
    }
}

// ---------------------------------------------------------------------------
// Fade
// ---------------------------------------------------------------------------

/// A fade anchored at an absolute start time.
///
/// Unlike a tick-accumulating animation, a `Fade` is evaluated against the
/// host clock directly, so sampling it any number of times per frame has no
/// effect on its state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    start: Duration,
    duration: Duration,
    easing: Easing,
}

impl Fade {
    /// A fade beginning at `start` that lasts `duration`.
    ///
    /// A zero duration completes instantly.
    #[must_use]
    pub fn new(start: Duration, duration: Duration) -> Self {
        Self {
            start,
            duration,
            easing: Easing::Linear,
        }
    }

    /// Set the easing curve (builder).
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    #[must_use]
    pub fn start(&self) -> Duration {
        self.start
    }

    /// Absolute time at which the fade is complete.
    #[must_use]
    pub fn end(&self) -> Duration {
        self.start.saturating_add(self.duration)
    }

    /// Linear progress at `now`, before easing.
    #[must_use]
    pub fn raw_progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start);
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }

    /// Eased progress at `now`.
    #[must_use]
    pub fn value(&self, now: Duration) -> f32 {
        self.easing.apply(self.raw_progress(now))
    }

    #[must_use]
    pub fn is_complete(&self, now: Duration) -> bool {
        now >= self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);
    const SEC_1: Duration = Duration::from_secs(1);

    #[test]
    fn easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::EaseOutCubic,
        ] {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
    }

    #[test]
    fn easing_clamps_input() {
        assert_eq!(linear(-1.0), 0.0);
        assert_eq!(linear(2.0), 1.0);
    }

    #[test]
    fn fade_progress_is_relative_to_start() {
        let fade = Fade::new(SEC_1, SEC_1);
        assert_eq!(fade.raw_progress(Duration::ZERO), 0.0);
        assert_eq!(fade.raw_progress(SEC_1), 0.0);
        assert!((fade.raw_progress(Duration::from_millis(1500)) - 0.5).abs() < 1e-6);
        assert_eq!(fade.raw_progress(Duration::from_secs(5)), 1.0);
    }

    #[test]
    fn fade_completion() {
        let fade = Fade::new(MS_100, MS_100);
        assert!(!fade.is_complete(Duration::from_millis(199)));
        assert!(fade.is_complete(Duration::from_millis(200)));
        assert_eq!(fade.end(), Duration::from_millis(200));
    }

    #[test]
    fn zero_duration_fade_is_done() {
        let fade = Fade::new(SEC_1, Duration::ZERO);
        assert_eq!(fade.value(SEC_1), 1.0);
        assert!(fade.is_complete(SEC_1));
    }

    #[test]
    fn eased_fade_differs_from_linear_midway() {
        let fade = Fade::new(Duration::ZERO, SEC_1).easing(Easing::EaseIn);
        assert!((fade.value(Duration::from_millis(500)) - 0.25).abs() < 1e-6);
    }
}
