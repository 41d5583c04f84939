#![forbid(unsafe_code)]

//! Visibility tracking over a host intersection-observation primitive.
//!
//! A [`VisibilityTracker`] registers regions with an [`ObserverBackend`],
//! ingests the raw entries the host's observers produce, and reports each
//! region's enter/exit transitions exactly once per crossing.
//!
//! # Invariants
//!
//! 1. One backend observer per distinct [`ObserverKey`]; it is created on
//!    first use and disconnected when its last region leaves.
//! 2. A [`VisibilityChange`] is queued only when a region's visibility
//!    differs from its last known state. Regions start out not visible.
//! 3. [`drain_changes`](VisibilityTracker::drain_changes) yields changes in
//!    registration order; changes of one region keep their arrival order.
//! 4. After [`unregister`](VisibilityTracker::unregister) or
//!    [`teardown`](VisibilityTracker::teardown) nothing is reported for the
//!    affected regions, including changes queued but not yet drained.
//!
//! # Failure Modes
//!
//! - Backend unavailable, or observer creation fails: the region is
//!   reported visible immediately and never observed. Content shows
//!   instead of staying hidden. The reason is logged at `warn`.
//! - Entries for unknown regions are ignored.

use std::collections::HashMap;
use std::fmt;

use crate::config::{ObserverConfig, ObserverKey};
use crate::error::ObservationUnavailable;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity of an observed page region, unique per mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Backend handle to one observer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ObserverHandle(pub u64);

/// One raw observation delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IntersectionEntry {
    pub region: RegionId,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    #[must_use]
    pub const fn new(region: RegionId, is_intersecting: bool) -> Self {
        Self {
            region,
            is_intersecting,
        }
    }
}

/// A region crossed into or out of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub region: RegionId,
    pub visible: bool,
}

/// The host's intersection-observation primitive.
pub trait ObserverBackend {
    /// Whether the primitive exists in this environment at all.
    fn is_available(&self) -> bool;

    /// Create an observer for `config`.
    fn create(&mut self, config: &ObserverConfig)
    -> Result<ObserverHandle, ObservationUnavailable>;

    /// Start observing `region` with `observer`.
    fn observe(&mut self, observer: ObserverHandle, region: RegionId);

    /// Stop observing `region` with `observer`.
    fn unobserve(&mut self, observer: ObserverHandle, region: RegionId);

    /// Release `observer` entirely.
    fn disconnect(&mut self, observer: ObserverHandle);
}

/// Proof of a registration, consumed by [`VisibilityTracker::unregister`].
#[must_use = "dropping a subscription leaves the region observed until teardown"]
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    region: RegionId,
    seq: u64,
}

impl Subscription {
    #[must_use]
    pub fn region(&self) -> RegionId {
        self.region
    }
}

#[derive(Debug)]
struct Context {
    handle: ObserverHandle,
    regions: usize,
}

#[derive(Debug)]
struct Tracked {
    seq: u64,
    /// `None` when the region fell back to always-visible.
    key: Option<ObserverKey>,
    visible: bool,
}

// ---------------------------------------------------------------------------
// VisibilityTracker
// ---------------------------------------------------------------------------

/// Deduplicating visibility reporter. See the module docs for invariants.
pub struct VisibilityTracker<B: ObserverBackend> {
    backend: B,
    contexts: HashMap<ObserverKey, Context>,
    regions: HashMap<RegionId, Tracked>,
    pending: Vec<(u64, VisibilityChange)>,
    next_seq: u64,
}

impl<B: ObserverBackend + fmt::Debug> fmt::Debug for VisibilityTracker<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityTracker")
            .field("backend", &self.backend)
            .field("contexts", &self.contexts.len())
            .field("regions", &self.regions.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<B: ObserverBackend> VisibilityTracker<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            contexts: HashMap::new(),
            regions: HashMap::new(),
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    /// Start tracking `region` under `config`.
    ///
    /// Registering a region that is already tracked replaces the previous
    /// registration; the old [`Subscription`] becomes inert.
    pub fn register(&mut self, region: RegionId, config: &ObserverConfig) -> Subscription {
        if self.regions.contains_key(&region) {
            crate::debug!(%region, "re-registering tracked region");
            self.release(region);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        match self.context_for(config) {
            Ok(key) => {
                let context = self
                    .contexts
                    .get_mut(&key)
                    .map(|ctx| {
                        ctx.regions += 1;
                        ctx.handle
                    });
                if let Some(handle) = context {
                    self.backend.observe(handle, region);
                }
                self.regions.insert(
                    region,
                    Tracked {
                        seq,
                        key: Some(key),
                        visible: false,
                    },
                );
            }
            #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
            Err(reason) => {
                crate::warn!(%region, %reason, "observation unavailable; showing region");
                self.regions.insert(
                    region,
                    Tracked {
                        seq,
                        key: None,
                        visible: true,
                    },
                );
                self.pending.push((
                    seq,
                    VisibilityChange {
                        region,
                        visible: true,
                    },
                ));
            }
        }

        Subscription { region, seq }
    }

    /// Stop tracking the region behind `subscription`.
    ///
    /// A stale subscription (its region was re-registered or already
    /// removed) is ignored.
    pub fn unregister(&mut self, subscription: Subscription) {
        let current = self
            .regions
            .get(&subscription.region)
            .is_some_and(|t| t.seq == subscription.seq);
        if current {
            self.release(subscription.region);
        }
    }

    /// Ingest raw entries from the host's observers.
    pub fn deliver(&mut self, entries: &[IntersectionEntry]) {
        for entry in entries {
            let Some(tracked) = self.regions.get_mut(&entry.region) else {
                continue;
            };
            if tracked.key.is_none() || tracked.visible == entry.is_intersecting {
                continue;
            }
            tracked.visible = entry.is_intersecting;
            self.pending.push((
                tracked.seq,
                VisibilityChange {
                    region: entry.region,
                    visible: entry.is_intersecting,
                },
            ));
        }
    }

    /// Take every queued change, in registration order.
    pub fn drain_changes(&mut self) -> Vec<VisibilityChange> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(|(seq, _)| *seq);
        pending.into_iter().map(|(_, change)| change).collect()
    }

    /// Unregister everything and disconnect every observer.
    pub fn teardown(&mut self) {
        for (region, tracked) in self.regions.drain() {
            if let Some(ctx) = tracked.key.and_then(|key| self.contexts.get(&key)) {
                self.backend.unobserve(ctx.handle, region);
            }
        }
        for (_, ctx) in self.contexts.drain() {
            crate::debug!(observer = ctx.handle.0, "disconnecting observer");
            self.backend.disconnect(ctx.handle);
        }
        self.pending.clear();
    }

    /// Last known visibility of `region`, if tracked.
    #[must_use]
    pub fn is_visible(&self, region: RegionId) -> Option<bool> {
        self.regions.get(&region).map(|t| t.visible)
    }

    /// Whether `region` fell back to always-visible.
    #[must_use]
    pub fn is_degraded(&self, region: RegionId) -> bool {
        self.regions.get(&region).is_some_and(|t| t.key.is_none())
    }

    #[must_use]
    pub fn is_tracking(&self, region: RegionId) -> bool {
        self.regions.contains_key(&region)
    }

    /// Number of tracked regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of live backend observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn context_for(&mut self, config: &ObserverConfig) -> Result<ObserverKey, ObservationUnavailable> {
        if !self.backend.is_available() {
            return Err(ObservationUnavailable::Unsupported);
        }
        let key = config.key();
        if !self.contexts.contains_key(&key) {
            let handle = self.backend.create(config)?;
            crate::debug!(
                observer = handle.0,
                root_margin = %config.root_margin(),
                "created shared observer"
            );
            self.contexts.insert(
                key.clone(),
                Context {
                    handle,
                    regions: 0,
                },
            );
        }
        Ok(key)
    }

    fn release(&mut self, region: RegionId) {
        let Some(tracked) = self.regions.remove(&region) else {
            return;
        };
        self.pending.retain(|(_, change)| change.region != region);
        let Some(key) = tracked.key else {
            return;
        };
        let Some(ctx) = self.contexts.get_mut(&key) else {
            return;
        };
        self.backend.unobserve(ctx.handle, region);
        ctx.regions = ctx.regions.saturating_sub(1);
        if ctx.regions == 0 {
            let handle = ctx.handle;
            self.contexts.remove(&key);
            crate::debug!(observer = handle.0, "last region left; disconnecting observer");
            self.backend.disconnect(handle);
        }
    }
}

impl<B: ObserverBackend> Drop for VisibilityTracker<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::RootMargin;

    /// Backend that records every call.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBackend {
        pub(crate) unavailable: bool,
        pub(crate) fail_create: bool,
        pub(crate) next: u64,
        pub(crate) created: Vec<ObserverHandle>,
        pub(crate) observed: Vec<(ObserverHandle, RegionId)>,
        pub(crate) unobserved: Vec<(ObserverHandle, RegionId)>,
        pub(crate) disconnected: Vec<ObserverHandle>,
    }

    impl ObserverBackend for RecordingBackend {
        fn is_available(&self) -> bool {
            !self.unavailable
        }

        fn create(
            &mut self,
            _config: &ObserverConfig,
        ) -> Result<ObserverHandle, ObservationUnavailable> {
            if self.fail_create {
                return Err(ObservationUnavailable::CreateFailed("boom".into()));
            }
            let handle = ObserverHandle(self.next);
            self.next += 1;
            self.created.push(handle);
            Ok(handle)
        }

        fn observe(&mut self, observer: ObserverHandle, region: RegionId) {
            self.observed.push((observer, region));
        }

        fn unobserve(&mut self, observer: ObserverHandle, region: RegionId) {
            self.unobserved.push((observer, region));
        }

        fn disconnect(&mut self, observer: ObserverHandle) {
            self.disconnected.push(observer);
        }
    }

    const A: RegionId = RegionId(1);
    const B: RegionId = RegionId(2);

    fn cfg() -> ObserverConfig {
        ObserverConfig::default()
    }

    #[test]
    fn same_state_twice_reports_once() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let _sub = t.register(A, &cfg());
        t.deliver(&[IntersectionEntry::new(A, true)]);
        t.deliver(&[IntersectionEntry::new(A, true)]);
        assert_eq!(
            t.drain_changes(),
            vec![VisibilityChange {
                region: A,
                visible: true
            }]
        );
    }

    #[test]
    fn initial_not_visible_is_not_a_crossing() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let _sub = t.register(A, &cfg());
        t.deliver(&[IntersectionEntry::new(A, false)]);
        assert!(t.drain_changes().is_empty());
        assert_eq!(t.is_visible(A), Some(false));
    }

    #[test]
    fn shared_observer_per_configuration() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let _a = t.register(A, &cfg());
        let _b = t.register(B, &cfg());
        let other = ObserverConfig::new([0.0], RootMargin::ZERO).unwrap();
        let _c = t.register(RegionId(3), &other);
        assert_eq!(t.backend().created.len(), 2);
        assert_eq!(t.observer_count(), 2);
    }

    #[test]
    fn last_unregister_disconnects() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let a = t.register(A, &cfg());
        let b = t.register(B, &cfg());
        t.unregister(a);
        assert!(t.backend().disconnected.is_empty());
        t.unregister(b);
        assert_eq!(t.backend().disconnected, vec![ObserverHandle(0)]);
        assert_eq!(t.observer_count(), 0);
    }

    #[test]
    fn changes_drain_in_registration_order() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let _a = t.register(A, &cfg());
        let _b = t.register(B, &cfg());
        t.deliver(&[IntersectionEntry::new(B, true), IntersectionEntry::new(A, true)]);
        let order: Vec<_> = t.drain_changes().into_iter().map(|c| c.region).collect();
        assert_eq!(order, vec![A, B]);
    }

    #[test]
    fn unavailable_backend_reports_visible() {
        let backend = RecordingBackend {
            unavailable: true,
            ..RecordingBackend::default()
        };
        let mut t = VisibilityTracker::new(backend);
        let _a = t.register(A, &cfg());
        assert!(t.is_degraded(A));
        assert!(t.backend().observed.is_empty());
        assert_eq!(
            t.drain_changes(),
            vec![VisibilityChange {
                region: A,
                visible: true
            }]
        );
        // Host entries cannot hide a degraded region.
        t.deliver(&[IntersectionEntry::new(A, false)]);
        assert!(t.drain_changes().is_empty());
    }

    #[test]
    fn create_failure_degrades_to_visible() {
        let backend = RecordingBackend {
            fail_create: true,
            ..RecordingBackend::default()
        };
        let mut t = VisibilityTracker::new(backend);
        let _a = t.register(A, &cfg());
        assert_eq!(t.is_visible(A), Some(true));
        assert_eq!(t.drain_changes().len(), 1);
    }

    #[test]
    fn unregister_drops_queued_changes() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let a = t.register(A, &cfg());
        t.deliver(&[IntersectionEntry::new(A, true)]);
        t.unregister(a);
        assert!(t.drain_changes().is_empty());
        t.deliver(&[IntersectionEntry::new(A, false)]);
        assert!(t.drain_changes().is_empty());
    }

    #[test]
    fn stale_subscription_is_ignored() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let old = t.register(A, &cfg());
        let _new = t.register(A, &cfg());
        t.unregister(old);
        assert!(t.is_tracking(A));
    }

    #[test]
    fn teardown_releases_everything() {
        let mut t = VisibilityTracker::new(RecordingBackend::default());
        let _a = t.register(A, &cfg());
        let _b = t.register(B, &cfg());
        t.deliver(&[IntersectionEntry::new(A, true)]);
        t.teardown();
        assert!(t.is_empty());
        assert_eq!(t.backend().unobserved.len(), 2);
        assert_eq!(t.backend().disconnected.len(), 1);
        assert!(t.drain_changes().is_empty());
    }
}
