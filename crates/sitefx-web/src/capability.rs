#![forbid(unsafe_code)]

//! Host capability confirmation and deferred mounting.
//!
//! A page renders its skeleton before the host has said what it supports.
//! Components requested in that window are parked in a [`CapabilityGate`]
//! and released together once the host confirms its capabilities and the
//! configured mount delay has passed.

use core::time::Duration;

use bitflags::bitflags;

bitflags! {
    /// What the embedding page can do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCapabilities: u8 {
        /// `IntersectionObserver` exists.
        const INTERSECTION_OBSERVER = 0b01;
        /// The host will pump `step` from a timer or animation frame.
        const TIMERS                = 0b10;
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::empty()
    }
}

/// Where a [`CapabilityGate`] is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// The host has not confirmed anything yet.
    Waiting,
    /// Confirmed; opens at `ready_at`.
    Delaying {
        ready_at: Duration,
        capabilities: HostCapabilities,
    },
    /// Parked items have been released; new ones pass straight through.
    Open(HostCapabilities),
}

/// Holds items until the host is ready for them.
#[derive(Debug, Clone)]
pub struct CapabilityGate<T> {
    mount_delay: Duration,
    state: GateState,
    parked: Vec<T>,
}

impl<T> CapabilityGate<T> {
    #[must_use]
    pub fn new(mount_delay: Duration) -> Self {
        Self {
            mount_delay,
            state: GateState::Waiting,
            parked: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, GateState::Open(_))
    }

    /// Confirmed capabilities, once the gate is open.
    #[must_use]
    pub fn capabilities(&self) -> Option<HostCapabilities> {
        match self.state {
            GateState::Open(caps) => Some(caps),
            _ => None,
        }
    }

    /// Record the host's capabilities at `now`. Only the first call counts.
    pub fn confirm(&mut self, capabilities: HostCapabilities, now: Duration) {
        if self.state != GateState::Waiting {
            tracing::debug!(?capabilities, "capabilities already confirmed; ignoring");
            return;
        }
        let ready_at = now.saturating_add(self.mount_delay);
        tracing::debug!(?capabilities, ?ready_at, "host capabilities confirmed");
        self.state = GateState::Delaying {
            ready_at,
            capabilities,
        };
    }

    /// Hold `item` until the gate opens.
    pub fn park(&mut self, item: T) {
        self.parked.push(item);
    }

    /// Remove parked items matching `pred`, returning them in park order.
    pub fn unpark_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let (taken, kept) = std::mem::take(&mut self.parked)
            .into_iter()
            .partition(|item| pred(item));
        self.parked = kept;
        taken
    }

    #[must_use]
    pub fn is_parked(&self, pred: impl FnMut(&T) -> bool) -> bool {
        self.parked.iter().any(pred)
    }

    #[must_use]
    pub fn parked_len(&self) -> usize {
        self.parked.len()
    }

    /// Drop everything parked.
    pub fn clear(&mut self) {
        self.parked.clear();
    }

    /// When the gate will open, while it is delaying.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match self.state {
            GateState::Delaying { ready_at, .. } => Some(ready_at),
            _ => None,
        }
    }

    /// Open the gate if its delay has passed, releasing everything parked
    /// in park order. Returns an empty list otherwise.
    pub fn poll(&mut self, now: Duration) -> Vec<T> {
        match self.state {
            GateState::Delaying {
                ready_at,
                capabilities,
            } if ready_at <= now => {
                self.state = GateState::Open(capabilities);
                tracing::debug!(released = self.parked.len(), "capability gate opened");
                std::mem::take(&mut self.parked)
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn releases_after_confirm_plus_delay() {
        let mut gate = CapabilityGate::new(ms(50));
        gate.park("hero");
        gate.park("about");
        assert!(gate.poll(ms(1_000)).is_empty());

        gate.confirm(HostCapabilities::all(), ms(1_000));
        assert_eq!(gate.next_deadline(), Some(ms(1_050)));
        assert!(gate.poll(ms(1_049)).is_empty());
        assert_eq!(gate.poll(ms(1_050)), vec!["hero", "about"]);
        assert_eq!(gate.capabilities(), Some(HostCapabilities::all()));
        assert!(gate.poll(ms(2_000)).is_empty());
    }

    #[test]
    fn second_confirm_is_ignored() {
        let mut gate: CapabilityGate<()> = CapabilityGate::new(ms(50));
        gate.confirm(HostCapabilities::TIMERS, ms(0));
        gate.confirm(HostCapabilities::all(), ms(10));
        gate.poll(ms(50));
        assert_eq!(gate.state(), GateState::Open(HostCapabilities::TIMERS));
    }

    #[test]
    fn unpark_keeps_the_rest_in_order() {
        let mut gate = CapabilityGate::new(Duration::ZERO);
        for n in 1..=5 {
            gate.park(n);
        }
        assert_eq!(gate.unpark_where(|n| n % 2 == 0), vec![2, 4]);
        assert!(!gate.is_parked(|n| *n == 2));
        gate.confirm(HostCapabilities::empty(), ms(0));
        assert_eq!(gate.poll(ms(0)), vec![1, 3, 5]);
    }

    #[test]
    fn capability_bits() {
        let caps = HostCapabilities::from_bits_truncate(0xFF);
        assert_eq!(caps, HostCapabilities::all());
        assert!(!HostCapabilities::default().contains(HostCapabilities::TIMERS));
    }
}
