#![forbid(unsafe_code)]

//! Staggered reveal sequencing.
//!
//! A [`StaggeredRevealSequencer`] arms page regions with an ordered list of
//! [`RevealStep`]s. When its [`VisibilityTracker`] reports a region visible,
//! every step is scheduled at `trigger + delay` and handed to the caller's
//! [`RevealSink`] as the host clock passes each deadline.
//!
//! # Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use sitefx_core::reveal::{RearmPolicy, RevealStep, StaggeredRevealSequencer};
//! use sitefx_core::visual::VisualState;
//!
//! let mut seq = StaggeredRevealSequencer::new(backend, |region, step: &str, state: &VisualState| {
//!     host.set_style(region, step, state.to_css());
//! });
//! seq.arm(
//!     section,
//!     vec![
//!         RevealStep::new("heading", 200, VisualState::SHOWN),
//!         RevealStep::new("description", 400, VisualState::SHOWN),
//!         RevealStep::new("buttons", 600, VisualState::SHOWN),
//!     ],
//!     RearmPolicy::Once,
//!     &config.observer,
//! )?;
//!
//! seq.deliver(&entries_from_host);
//! seq.advance(clock.now());
//! ```
//!
//! # Invariants
//!
//! 1. Steps fire in ascending delay; equal delays fire in declaration order.
//! 2. `Once`: the first visible report triggers; later entries are ignored.
//! 3. `Always`: an exit cancels every unfired step of that region; the next
//!    entry resets all steps to unfired and schedules from the new trigger.
//! 4. Negative delays and duplicate step ids are rejected by `arm`.
//! 5. After `disarm`/`teardown` the sink is never called for the region.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::animation::stagger::{StaggerMode, stagger_offsets};
use crate::config::ObserverConfig;
use crate::error::{ConfigError, RevealError};
use crate::timer::TimerQueue;
use crate::visibility::{
    IntersectionEntry, ObserverBackend, RegionId, Subscription, VisibilityChange,
    VisibilityTracker,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether a region may reveal more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RearmPolicy {
    /// Reveal on first entry, never again.
    #[default]
    Once,
    /// Replay on every entry; exits cancel the unfired remainder.
    Always,
}

/// One named transition within a reveal sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealStep<S> {
    id: String,
    delay_ms: i64,
    target: S,
}

impl<S> RevealStep<S> {
    /// A step firing `delay_ms` after the trigger.
    ///
    /// The delay is signed so that configuration mistakes are representable
    /// and rejected by [`StaggeredRevealSequencer::arm`].
    #[must_use]
    pub fn new(id: impl Into<String>, delay_ms: i64, target: S) -> Self {
        Self {
            id: id.into(),
            delay_ms,
            target,
        }
    }

    /// A step firing `delay` after the trigger.
    #[must_use]
    pub fn after(id: impl Into<String>, delay: Duration, target: S) -> Self {
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        Self::new(id, delay_ms, target)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }

    #[must_use]
    pub fn target(&self) -> &S {
        &self.target
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.max(0).unsigned_abs())
    }
}

/// Build a ladder of steps sharing one target, spaced by [`stagger_offsets`].
#[must_use]
pub fn stagger_steps<S: Clone, I>(
    ids: I,
    base: Duration,
    spacing: Duration,
    mode: StaggerMode,
    target: S,
) -> Vec<RevealStep<S>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
    let offsets = stagger_offsets(ids.len(), base, spacing, mode);
    ids.into_iter()
        .zip(offsets)
        .map(|(id, offset)| RevealStep::after(id, offset, target.clone()))
        .collect()
}

/// Receives each step as it fires.
pub trait RevealSink<S> {
    /// Apply `target` to the element `step` of `region`.
    fn apply(&mut self, region: RegionId, step: &str, target: &S);
}

impl<S, F> RevealSink<S> for F
where
    F: FnMut(RegionId, &str, &S),
{
    fn apply(&mut self, region: RegionId, step: &str, target: &S) {
        self(region, step, target);
    }
}

/// Per-region sequence state.
#[derive(Debug)]
struct Armed<S> {
    /// Declaration order.
    steps: Vec<RevealStep<S>>,
    /// Indices into `steps` sorted by (delay, declaration index).
    firing_order: Vec<usize>,
    fired: Vec<bool>,
    policy: RearmPolicy,
    subscription: Option<Subscription>,
    triggered: bool,
}

impl<S> Armed<S> {
    fn new(
        steps: Vec<RevealStep<S>>,
        policy: RearmPolicy,
        subscription: Subscription,
    ) -> Self {
        let mut firing_order: Vec<usize> = (0..steps.len()).collect();
        // Stable sort keeps declaration order for equal delays.
        firing_order.sort_by_key(|&i| steps[i].delay_ms);
        let fired = vec![false; steps.len()];
        Self {
            steps,
            firing_order,
            fired,
            policy,
            subscription: Some(subscription),
            triggered: false,
        }
    }
}

/// Reject negative delays and duplicate step ids.
///
/// [`StaggeredRevealSequencer::arm`] runs this itself; hosts that defer
/// arming call it up front so mistakes surface at declaration time.
pub fn validate_steps<S>(steps: &[RevealStep<S>]) -> Result<(), ConfigError> {
    for (i, step) in steps.iter().enumerate() {
        if step.delay_ms < 0 {
            return Err(ConfigError::NegativeDelay {
                step: step.id.clone(),
                delay_ms: step.delay_ms,
            });
        }
        if steps[..i].iter().any(|earlier| earlier.id == step.id) {
            return Err(ConfigError::DuplicateStep(step.id.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// StaggeredRevealSequencer
// ---------------------------------------------------------------------------

/// Fires reveal steps for visible regions. See the module docs.
pub struct StaggeredRevealSequencer<B, S, R>
where
    B: ObserverBackend,
    R: RevealSink<S>,
{
    tracker: VisibilityTracker<B>,
    regions: BTreeMap<RegionId, Armed<S>>,
    timers: TimerQueue<(RegionId, usize)>,
    sink: R,
}

impl<B, S, R> fmt::Debug for StaggeredRevealSequencer<B, S, R>
where
    B: ObserverBackend,
    R: RevealSink<S>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaggeredRevealSequencer")
            .field("regions", &self.regions.len())
            .field("pending_steps", &self.timers.len())
            .field("next_deadline", &self.timers.next_deadline())
            .finish()
    }
}

impl<B, S, R> StaggeredRevealSequencer<B, S, R>
where
    B: ObserverBackend,
    R: RevealSink<S>,
{
    /// A sequencer observing through `backend` and rendering through `sink`.
    pub fn new(backend: B, sink: R) -> Self {
        Self {
            tracker: VisibilityTracker::new(backend),
            regions: BTreeMap::new(),
            timers: TimerQueue::new(),
            sink,
        }
    }

    /// Arm `region` with `steps` and start observing it.
    pub fn arm(
        &mut self,
        region: RegionId,
        steps: Vec<RevealStep<S>>,
        policy: RearmPolicy,
        config: &ObserverConfig,
    ) -> Result<(), RevealError> {
        if self.regions.contains_key(&region) {
            return Err(RevealError::AlreadyArmed(region));
        }
        validate_steps(&steps)?;
        let subscription = self.tracker.register(region, config);
        crate::debug!(%region, steps = steps.len(), ?policy, "armed reveal sequence");
        self.regions
            .insert(region, Armed::new(steps, policy, subscription));
        Ok(())
    }

    /// Stop observing `region` and cancel its unfired steps.
    pub fn disarm(&mut self, region: RegionId) -> Result<(), RevealError> {
        let mut armed = self
            .regions
            .remove(&region)
            .ok_or(RevealError::UnknownRegion(region))?;
        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let cancelled = self.timers.cancel_where(|(r, _)| *r == region);
        if let Some(subscription) = armed.subscription.take() {
            self.tracker.unregister(subscription);
        }
        crate::debug!(%region, cancelled, "disarmed reveal sequence");
        Ok(())
    }

    /// Forward raw observer entries to the tracker.
    pub fn deliver(&mut self, entries: &[IntersectionEntry]) {
        self.tracker.deliver(entries);
    }

    /// Process visibility changes, then fire every step due at `now`.
    pub fn advance(&mut self, now: Duration) {
        let _span = crate::debug_span!(
            "reveal_advance",
            now_ms = u64::try_from(now.as_millis()).unwrap_or(u64::MAX)
        )
        .entered();
        for change in self.tracker.drain_changes() {
            self.on_change(change, now);
        }

        while let Some((_, (region, index))) = self.timers.pop_due(now) {
            let Some(armed) = self.regions.get_mut(&region) else {
                continue;
            };
            armed.fired[index] = true;
            let step = &armed.steps[index];
            crate::trace!(%region, step = step.id(), "reveal step fired");
            self.sink.apply(region, &step.id, &step.target);
        }
    }

    /// Cancel all timers, disarm every region, and release every observer.
    pub fn teardown(&mut self) {
        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let cancelled = self.timers.clear();
        for (_, mut armed) in std::mem::take(&mut self.regions) {
            if let Some(subscription) = armed.subscription.take() {
                self.tracker.unregister(subscription);
            }
        }
        self.tracker.teardown();
        crate::debug!(cancelled, "reveal sequencer torn down");
    }

    #[must_use]
    pub fn is_armed(&self, region: RegionId) -> bool {
        self.regions.contains_key(&region)
    }

    /// Whether `region` has been triggered at least once.
    #[must_use]
    pub fn is_triggered(&self, region: RegionId) -> bool {
        self.regions.get(&region).is_some_and(|a| a.triggered)
    }

    /// Whether `step` of `region` has fired since its last trigger.
    #[must_use]
    pub fn has_fired(&self, region: RegionId, step: &str) -> bool {
        self.regions.get(&region).is_some_and(|armed| {
            armed
                .steps
                .iter()
                .zip(&armed.fired)
                .any(|(s, fired)| *fired && s.id == step)
        })
    }

    /// Ids of the fired steps of `region`, in declaration order.
    #[must_use]
    pub fn fired_steps(&self, region: RegionId) -> Vec<&str> {
        self.regions
            .get(&region)
            .map(|armed| {
                armed
                    .steps
                    .iter()
                    .zip(&armed.fired)
                    .filter(|(_, fired)| **fired)
                    .map(|(s, _)| s.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of scheduled, unfired steps across all regions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    /// When the next step is due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    #[must_use]
    pub fn tracker(&self) -> &VisibilityTracker<B> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut VisibilityTracker<B> {
        &mut self.tracker
    }

    #[must_use]
    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    fn on_change(&mut self, change: VisibilityChange, now: Duration) {
        let region = change.region;
        let Some(armed) = self.regions.get_mut(&region) else {
            return;
        };

        if !change.visible {
            if armed.policy == RearmPolicy::Always {
                #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
                let cancelled = self.timers.cancel_where(|(r, _)| *r == region);
                crate::debug!(%region, cancelled, "region left view; cancelled pending steps");
            }
            return;
        }

        if armed.triggered && armed.policy == RearmPolicy::Once {
            crate::trace!(%region, "re-entry ignored for one-shot region");
            return;
        }

        // Re-entry under `Always`: start over from a clean slate.
        self.timers.cancel_where(|(r, _)| *r == region);
        armed.fired.iter_mut().for_each(|f| *f = false);
        armed.triggered = true;

        for &index in &armed.firing_order {
            let deadline = now.saturating_add(armed.steps[index].delay());
            self.timers.schedule(deadline, (region, index));
        }
        crate::debug!(%region, at = ?now, "reveal sequence triggered");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
