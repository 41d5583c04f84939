#![forbid(unsafe_code)]

//! Observer backend that defers to the JS host.
//!
//! The engine never touches `IntersectionObserver` itself. Every backend
//! call becomes an [`ObserverCommand`] queued for the host glue, which
//! replays them against the real browser API and reports entries back
//! through [`PageSession::deliver_entries`](crate::session::PageSession::deliver_entries).

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use sitefx_core::visibility::ObserverHandle;
use sitefx_core::{ObservationUnavailable, ObserverBackend, ObserverConfig, RegionId};

/// One instruction for the host's observer glue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ObserverCommand {
    /// `new IntersectionObserver(cb, { threshold, rootMargin })`.
    Create {
        observer: ObserverHandle,
        thresholds: Vec<f32>,
        root_margin: String,
    },
    Observe {
        observer: ObserverHandle,
        region: RegionId,
    },
    Unobserve {
        observer: ObserverHandle,
        region: RegionId,
    },
    Disconnect {
        observer: ObserverHandle,
    },
}

/// Command-queue [`ObserverBackend`].
#[derive(Debug, Clone)]
pub struct HostObserverBackend {
    available: bool,
    fail_next: Option<String>,
    next_handle: u64,
    live: HashMap<ObserverHandle, BTreeSet<RegionId>>,
    commands: VecDeque<ObserverCommand>,
}

impl Default for HostObserverBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostObserverBackend {
    /// A backend that assumes the primitive exists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: true,
            fail_next: None,
            next_handle: 0,
            live: HashMap::new(),
            commands: VecDeque::new(),
        }
    }

    /// A backend for hosts without `IntersectionObserver`.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Make the next `create` fail, as when the browser constructor throws.
    pub fn fail_next_create(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    /// Drain all pending commands.
    pub fn drain_commands(&mut self) -> impl Iterator<Item = ObserverCommand> + '_ {
        self.commands.drain(..)
    }

    /// Drain all pending commands as a JSON array.
    pub fn drain_commands_json(&mut self) -> Result<String, serde_json::Error> {
        let commands: Vec<ObserverCommand> = self.drain_commands().collect();
        serde_json::to_string(&commands)
    }

    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Observers created and not yet disconnected.
    #[must_use]
    pub fn live_observers(&self) -> usize {
        self.live.len()
    }

    /// Whether any live observer is watching `region`.
    #[must_use]
    pub fn is_observed(&self, region: RegionId) -> bool {
        self.live.values().any(|regions| regions.contains(&region))
    }
}

impl ObserverBackend for HostObserverBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn create(
        &mut self,
        config: &ObserverConfig,
    ) -> Result<ObserverHandle, ObservationUnavailable> {
        if !self.available {
            return Err(ObservationUnavailable::Unsupported);
        }
        if let Some(reason) = self.fail_next.take() {
            return Err(ObservationUnavailable::CreateFailed(reason));
        }
        self.next_handle += 1;
        let observer = ObserverHandle(self.next_handle);
        self.live.insert(observer, BTreeSet::new());
        self.commands.push_back(ObserverCommand::Create {
            observer,
            thresholds: config.thresholds().to_vec(),
            root_margin: config.root_margin().to_string(),
        });
        Ok(observer)
    }

    fn observe(&mut self, observer: ObserverHandle, region: RegionId) {
        if let Some(regions) = self.live.get_mut(&observer) {
            regions.insert(region);
            self.commands
                .push_back(ObserverCommand::Observe { observer, region });
        }
    }

    fn unobserve(&mut self, observer: ObserverHandle, region: RegionId) {
        let removed = self
            .live
            .get_mut(&observer)
            .is_some_and(|regions| regions.remove(&region));
        if removed {
            self.commands
                .push_back(ObserverCommand::Unobserve { observer, region });
        }
    }

    fn disconnect(&mut self, observer: ObserverHandle) {
        if self.live.remove(&observer).is_some() {
            self.commands
                .push_back(ObserverCommand::Disconnect { observer });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sitefx_core::RootMargin;

    #[test]
    fn records_lifecycle_commands() {
        let mut backend = HostObserverBackend::new();
        let config = ObserverConfig::new([0.5, 0.1], RootMargin::symmetric(-50, 0)).unwrap();
        let observer = backend.create(&config).unwrap();
        backend.observe(observer, RegionId(4));
        assert!(backend.is_observed(RegionId(4)));
        backend.unobserve(observer, RegionId(4));
        backend.unobserve(observer, RegionId(4));
        backend.disconnect(observer);
        backend.disconnect(observer);

        let commands: Vec<_> = backend.drain_commands().collect();
        assert_eq!(
            commands,
            vec![
                ObserverCommand::Create {
                    observer,
                    thresholds: vec![0.1, 0.5],
                    root_margin: "-50px 0px -50px 0px".into(),
                },
                ObserverCommand::Observe {
                    observer,
                    region: RegionId(4)
                },
                ObserverCommand::Unobserve {
                    observer,
                    region: RegionId(4)
                },
                ObserverCommand::Disconnect { observer },
            ]
        );
        assert_eq!(backend.live_observers(), 0);
    }

    #[test]
    fn unavailable_and_failing_create() {
        let mut backend = HostObserverBackend::unavailable();
        let config = ObserverConfig::default();
        assert_eq!(
            backend.create(&config),
            Err(ObservationUnavailable::Unsupported)
        );

        backend.set_available(true);
        backend.fail_next_create("SecurityError");
        assert_eq!(
            backend.create(&config),
            Err(ObservationUnavailable::CreateFailed("SecurityError".into()))
        );
        assert!(backend.create(&config).is_ok());
    }

    #[test]
    fn commands_serialize_for_the_host() {
        let mut backend = HostObserverBackend::new();
        let config = ObserverConfig::new([0.0], RootMargin::ZERO).unwrap();
        let observer = backend.create(&config).unwrap();
        backend.observe(observer, RegionId(9));
        let json = backend.drain_commands_json().unwrap();
        assert_eq!(
            json,
            r#"[{"op":"create","observer":1,"thresholds":[0.0],"root_margin":"0px 0px 0px 0px"},{"op":"observe","observer":1,"region":9}]"#
        );
        assert_eq!(backend.pending_commands(), 0);
    }
}
