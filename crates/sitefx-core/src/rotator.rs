#![forbid(unsafe_code)]

//! Auto-rotating crossfade carousel.
//!
//! [`AutoRotator`] cycles a [`RotationSet`] on a repeating interval. Each
//! tick starts a crossfade towards the next item; when the crossfade
//! duration has elapsed the incoming item becomes current. Manual jumps
//! snap immediately and postpone the next automatic advance by a full
//! interval.
//!
//! # State machine
//!
//! ```text
//!            start()              tick
//!   Idle ─────────────▶ Rotating ─────────▶ Transitioning
//!    ▲                    ▲  ▲                   │
//!    │ stop()             │  └───── crossfade ───┘
//!    └────────────────────┘         elapsed
//! ```
//!
//! `jump_to` from `Transitioning` cancels the crossfade and lands in
//! `Rotating`; from `Idle` it only moves the index.
//!
//! # Invariants
//!
//! 1. At most one interval timer and one transition timer are live.
//! 2. `current` and `pending` are always in `[0, len)`.
//! 3. For `len >= 2`, `current != pending` at all times. Outside a
//!    crossfade `pending` is derived as `(current + 1) % len`.
//! 4. A jump at time `T` means no automatic advance before `T + interval`.
//! 5. After [`teardown`](AutoRotator::teardown) the sink is never called.
//!
//! # Failure Modes
//!
//! - Empty item list or invalid timing: [`ConfigError`] from `new`.
//! - `jump_to` out of range: [`RotatorError::InvalidIndex`], state unchanged.
//! - Second `start`: [`RotatorError::AlreadyRunning`].

use std::fmt;
use std::time::Duration;

use crate::animation::Fade;
use crate::config::RotatorConfig;
use crate::error::{ConfigError, RotatorError};
use crate::timer::{Interval, Timeout};

// ---------------------------------------------------------------------------
// RotationSet
// ---------------------------------------------------------------------------

/// A fixed, non-empty, ordered collection with a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSet<T> {
    items: Vec<T>,
    current: usize,
    in_flight: Option<usize>,
}

impl<T> RotationSet<T> {
    /// A set positioned at index 0.
    pub fn new(items: Vec<T>) -> Result<Self, ConfigError> {
        if items.is_empty() {
            return Err(ConfigError::EmptyRotationSet);
        }
        Ok(Self {
            items,
            current: 0,
            in_flight: None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    /// The crossfade target while transitioning, else the next index.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight
            .unwrap_or_else(|| (self.current + 1) % self.items.len())
    }

    #[must_use]
    pub fn current_item(&self) -> &T {
        &self.items[self.current]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

// ---------------------------------------------------------------------------
// Events and frames
// ---------------------------------------------------------------------------

/// Lifecycle phase of an [`AutoRotator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatorPhase {
    Idle,
    Rotating,
    Transitioning,
}

/// Notification delivered to a [`RotationSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum RotationEvent {
    /// A crossfade from `from` to `to` began.
    CrossfadeStarted { from: usize, to: usize },
    /// A crossfade finished; `index` is now current.
    Settled { index: usize },
    /// The carousel jumped to `index` without a crossfade.
    Snapped { index: usize },
}

/// Receives rotation events.
pub trait RotationSink {
    fn on_rotation(&mut self, event: RotationEvent);
}

impl<F> RotationSink for F
where
    F: FnMut(RotationEvent),
{
    fn on_rotation(&mut self, event: RotationEvent) {
        self(event);
    }
}

/// What to draw at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationFrame {
    /// One item, fully opaque.
    Still(usize),
    /// Two items with complementary opacity.
    Crossfade {
        outgoing: usize,
        incoming: usize,
        incoming_opacity: f32,
    },
}

impl RotationFrame {
    /// Opacity of the item being replaced (1.0 for a still frame).
    #[must_use]
    pub fn outgoing_opacity(&self) -> f32 {
        match self {
            Self::Still(_) => 1.0,
            Self::Crossfade {
                incoming_opacity, ..
            } => 1.0 - incoming_opacity,
        }
    }
}

// ---------------------------------------------------------------------------
// AutoRotator
// ---------------------------------------------------------------------------

/// Timer-driven carousel. See the module docs.
pub struct AutoRotator<T, R: RotationSink> {
    set: RotationSet<T>,
    config: RotatorConfig,
    phase: RotatorPhase,
    interval: Interval,
    transition: Timeout,
    crossfade: Option<Fade>,
    sink: R,
    torn_down: bool,
}

impl<T, R: RotationSink> fmt::Debug for AutoRotator<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoRotator")
            .field("len", &self.set.len())
            .field("current", &self.set.current())
            .field("pending", &self.set.pending())
            .field("phase", &self.phase)
            .field("next_tick", &self.interval.next_deadline())
            .field("transition_end", &self.transition.deadline())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl<T, R: RotationSink> AutoRotator<T, R> {
    /// An idle rotator over `items`, showing index 0.
    pub fn new(items: Vec<T>, config: RotatorConfig, sink: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let set = RotationSet::new(items)?;
        Ok(Self {
            set,
            interval: Interval::new(config.interval),
            config,
            phase: RotatorPhase::Idle,
            transition: Timeout::new(),
            crossfade: None,
            sink,
            torn_down: false,
        })
    }

    /// Arm the repeating interval.
    pub fn start(&mut self, now: Duration) -> Result<(), RotatorError> {
        self.ensure_live()?;
        if self.phase != RotatorPhase::Idle {
            return Err(RotatorError::AlreadyRunning);
        }
        self.interval.arm(now);
        self.phase = RotatorPhase::Rotating;
        crate::debug!(len = self.set.len(), interval = ?self.config.interval, "rotator started");
        Ok(())
    }

    /// Process every timer due at or before `now`, in time order.
    pub fn advance(&mut self, now: Duration) {
        if self.torn_down {
            return;
        }
        loop {
            let tick = self.interval.next_deadline().filter(|d| *d <= now);
            let end = self.transition.deadline().filter(|d| *d <= now);
            match (tick, end) {
                (tick, Some(end)) if tick.is_none_or(|t| end <= t) => self.settle(now),
                (Some(_), _) => self.on_tick(now),
                _ => break,
            }
        }
    }

    /// Jump to `index`, cancelling any crossfade and restarting the interval.
    pub fn jump_to(&mut self, index: usize, now: Duration) -> Result<(), RotatorError> {
        self.ensure_live()?;
        let len = self.set.len();
        if index >= len {
            crate::debug!(index, len, "rejected out-of-range jump");
            return Err(RotatorError::InvalidIndex { index, len });
        }

        if self.phase != RotatorPhase::Idle {
            self.interval.arm(now);
        }
        if len == 1 {
            return Ok(());
        }

        let was_transitioning = self.cancel_transition();
        let moved = index != self.set.current;
        self.set.current = index;
        if self.phase == RotatorPhase::Transitioning {
            self.phase = RotatorPhase::Rotating;
        }
        if moved || was_transitioning {
            crate::debug!(index, "rotator jumped");
            self.sink.on_rotation(RotationEvent::Snapped { index });
        }
        Ok(())
    }

    /// Jump one item forward, wrapping.
    pub fn next(&mut self, now: Duration) -> Result<(), RotatorError> {
        let target = (self.set.current + 1) % self.set.len();
        self.jump_to(target, now)
    }

    /// Jump one item back, wrapping.
    pub fn previous(&mut self, now: Duration) -> Result<(), RotatorError> {
        let len = self.set.len();
        let target = (self.set.current + len - 1) % len;
        self.jump_to(target, now)
    }

    /// Cancel both timers and snap back to the current item. Idempotent.
    pub fn stop(&mut self) {
        if self.torn_down {
            return;
        }
        self.interval.disarm();
        if self.cancel_transition() {
            self.sink.on_rotation(RotationEvent::Snapped {
                index: self.set.current,
            });
        }
        if self.phase != RotatorPhase::Idle {
            crate::debug!(current = self.set.current, "rotator stopped");
        }
        self.phase = RotatorPhase::Idle;
    }

    /// Stop silently and refuse every later command.
    pub fn teardown(&mut self) {
        self.interval.disarm();
        self.cancel_transition();
        self.phase = RotatorPhase::Idle;
        self.torn_down = true;
    }

    /// What to draw at `now`.
    #[must_use]
    pub fn frame(&self, now: Duration) -> RotationFrame {
        match (self.crossfade, self.set.in_flight) {
            (Some(fade), Some(incoming)) => RotationFrame::Crossfade {
                outgoing: self.set.current,
                incoming,
                incoming_opacity: fade.value(now),
            },
            _ => RotationFrame::Still(self.set.current),
        }
    }

    #[must_use]
    pub fn phase(&self) -> RotatorPhase {
        self.phase
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.set.current()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.set.pending()
    }

    #[must_use]
    pub fn set(&self) -> &RotationSet<T> {
        &self.set
    }

    #[must_use]
    pub fn config(&self) -> &RotatorConfig {
        &self.config
    }

    /// Earliest live timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.interval.next_deadline(), self.transition.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Number of live timers (interval plus transition).
    #[must_use]
    pub fn live_timers(&self) -> usize {
        usize::from(self.interval.is_armed()) + usize::from(self.transition.is_pending())
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[must_use]
    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    fn ensure_live(&self) -> Result<(), RotatorError> {
        if self.torn_down {
            Err(RotatorError::TornDown)
        } else {
            Ok(())
        }
    }

    fn on_tick(&mut self, now: Duration) {
        let Some(at) = self.interval.fire(now) else {
            return;
        };
        if self.set.len() == 1 {
            return;
        }
        let from = self.set.current;
        let to = (from + 1) % self.set.len();
        self.set.in_flight = Some(to);
        self.phase = RotatorPhase::Transitioning;
        self.transition.set(at.saturating_add(self.config.crossfade));
        self.crossfade = Some(Fade::new(at, self.config.crossfade).easing(self.config.easing));
        crate::trace!(from, to, "crossfade started");
        self.sink.on_rotation(RotationEvent::CrossfadeStarted { from, to });
    }

    fn settle(&mut self, now: Duration) {
        self.transition.fire(now);
        self.crossfade = None;
        if let Some(index) = self.set.in_flight.take() {
            self.set.current = index;
            crate::trace!(index, "crossfade settled");
            self.sink.on_rotation(RotationEvent::Settled { index });
        }
        if self.phase == RotatorPhase::Transitioning {
            self.phase = RotatorPhase::Rotating;
        }
    }

    /// Drop any in-flight crossfade without applying it.
    fn cancel_transition(&mut self) -> bool {
        self.transition.cancel();
        self.crossfade = None;
        self.set.in_flight.take().is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
