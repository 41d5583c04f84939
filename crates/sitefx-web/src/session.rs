#![forbid(unsafe_code)]

//! Host-driven page session.
//!
//! [`PageSession`] owns every animated component on one page and drives
//! them from the host's frame loop without threads or blocking:
//!
//! 1. Mount components as the page renders ([`PageSession::mount_reveal`],
//!    [`PageSession::mount_rotator`], [`PageSession::mount_filter`]).
//! 2. Confirm host capabilities once hydrated via
//!    [`PageSession::confirm_capabilities`].
//! 3. Forward observer callbacks via [`PageSession::deliver_entries`].
//! 4. Call [`PageSession::step`] from `requestAnimationFrame`.
//! 5. Apply [`PageSession::take_outputs`] to the DOM.
//!
//! # Example
//!
//! ```ignore
//! use sitefx_web::session::{ComponentId, PageSession};
//! use sitefx_web::capability::HostCapabilities;
//!
//! let mut page = PageSession::new(EngineConfig::default())?;
//! page.mount_rotator(ComponentId(1), hero_images)?;
//! page.mount_reveal(ComponentId(2), about_region, about_steps, RearmPolicy::Once)?;
//! page.confirm_capabilities(HostCapabilities::all());
//!
//! // Host frame loop
//! page.step(Duration::from_millis(16));
//! let outputs = page.take_outputs();
//! ```

use core::time::Duration;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sitefx_content::ProjectCategory;
use sitefx_core::{
    AutoRotator, ConfigError, EngineConfig, FilterState, IntersectionEntry, RearmPolicy, RegionId,
    RevealError, RevealSink, RevealStep, RotationEvent, RotationFrame, RotationSink, RotatorError,
    StaggeredRevealSequencer, VisualState, validate_steps,
};

use crate::capability::{CapabilityGate, GateState, HostCapabilities};
use crate::observer::{HostObserverBackend, ObserverCommand};
use crate::{Clock, DeterministicClock};

/// Host-assigned identity of a mounted component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Page session error type.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Reveal(RevealError),
    Rotator(RotatorError),
    /// The id is already mounted or waiting to mount.
    DuplicateComponent(ComponentId),
    /// No mounted component of the expected kind has this id.
    UnknownComponent(ComponentId),
    /// Malformed host payload.
    Json(serde_json::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Reveal(err) => write!(f, "{err}"),
            Self::Rotator(err) => write!(f, "{err}"),
            Self::DuplicateComponent(id) => write!(f, "{id} is already mounted"),
            Self::UnknownComponent(id) => write!(f, "no mounted component {id}"),
            Self::Json(err) => write!(f, "invalid host payload: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Reveal(err) => Some(err),
            Self::Rotator(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::DuplicateComponent(_) | Self::UnknownComponent(_) => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<RevealError> for SessionError {
    fn from(err: RevealError) -> Self {
        Self::Reveal(err)
    }
}

impl From<RotatorError> for SessionError {
    fn from(err: RotatorError) -> Self {
        Self::Rotator(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// A style to apply to one element of a revealed region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleUpdate {
    pub region: RegionId,
    pub step: String,
    pub css: String,
}

/// A carousel event, tagged with its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RotationUpdate {
    pub component: ComponentId,
    pub event: RotationEvent,
}

/// Everything the host must apply after a step.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SessionOutputs {
    pub styles: Vec<StyleUpdate>,
    pub rotations: Vec<RotationUpdate>,
    pub observer_commands: Vec<ObserverCommand>,
}

impl SessionOutputs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.rotations.is_empty() && self.observer_commands.is_empty()
    }

    /// Serialize for the JS bridge.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Result of a single [`PageSession::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Clock value the step ran at.
    pub now: Duration,
    /// Parked components mounted during this step.
    pub mounted: usize,
    /// Reveal steps applied during this step.
    pub steps_fired: usize,
    /// Carousel events emitted during this step.
    pub rotation_events: usize,
    /// Earliest time anything is due; `None` when fully idle.
    pub next_deadline: Option<Duration>,
}

#[derive(Debug, Default)]
struct StyleQueue(Vec<StyleUpdate>);

impl RevealSink<VisualState> for StyleQueue {
    fn apply(&mut self, region: RegionId, step: &str, target: &VisualState) {
        self.0.push(StyleUpdate {
            region,
            step: step.to_owned(),
            css: target.to_css(),
        });
    }
}

#[derive(Debug, Default)]
struct EventQueue(Vec<RotationEvent>);

impl RotationSink for EventQueue {
    fn on_rotation(&mut self, event: RotationEvent) {
        self.0.push(event);
    }
}

type Carousel = AutoRotator<String, EventQueue>;

#[derive(Debug)]
enum Mount {
    Reveal {
        component: ComponentId,
        region: RegionId,
        steps: Vec<RevealStep<VisualState>>,
        policy: RearmPolicy,
    },
    Rotator {
        component: ComponentId,
        items: Vec<String>,
    },
}

impl Mount {
    fn component(&self) -> ComponentId {
        match self {
            Self::Reveal { component, .. } | Self::Rotator { component, .. } => *component,
        }
    }
}

#[derive(Debug)]
enum Component {
    Reveal(RegionId),
    Rotator(Carousel),
    Filter(FilterState<ProjectCategory>),
}

/// All animated components of one page.
#[derive(Debug)]
pub struct PageSession {
    config: EngineConfig,
    clock: DeterministicClock,
    gate: CapabilityGate<Mount>,
    reveals: StaggeredRevealSequencer<HostObserverBackend, VisualState, StyleQueue>,
    components: BTreeMap<ComponentId, Component>,
    rotations: Vec<RotationUpdate>,
}

impl PageSession {
    /// A session whose observers are created by the JS host.
    pub fn new(config: EngineConfig) -> Result<Self, SessionError> {
        Self::with_backend(config, HostObserverBackend::new())
    }

    /// A session with an existing [`HostObserverBackend`].
    pub fn with_backend(
        config: EngineConfig,
        backend: HostObserverBackend,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            clock: DeterministicClock::new(),
            gate: CapabilityGate::new(config.mount_delay),
            reveals: StaggeredRevealSequencer::new(backend, StyleQueue::default()),
            components: BTreeMap::new(),
            rotations: Vec::new(),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    #[must_use]
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    #[must_use]
    pub fn backend(&self) -> &HostObserverBackend {
        self.reveals.tracker().backend()
    }

    /// The host has hydrated. Parked components mount once the configured
    /// mount delay has passed.
    pub fn confirm_capabilities(&mut self, capabilities: HostCapabilities) {
        if self.gate.state() == GateState::Waiting {
            self.reveals
                .tracker_mut()
                .backend_mut()
                .set_available(capabilities.contains(HostCapabilities::INTERSECTION_OBSERVER));
        }
        self.gate.confirm(capabilities, self.clock.now());
    }

    /// Declare a scroll-triggered reveal over `region`.
    pub fn mount_reveal(
        &mut self,
        component: ComponentId,
        region: RegionId,
        steps: Vec<RevealStep<VisualState>>,
        policy: RearmPolicy,
    ) -> Result<(), SessionError> {
        self.ensure_vacant(component)?;
        validate_steps(&steps)?;
        let parked_region = self.gate.is_parked(|mount| {
            matches!(mount, Mount::Reveal { region: r, .. } if *r == region)
        });
        if parked_region || self.reveals.is_armed(region) {
            return Err(RevealError::AlreadyArmed(region).into());
        }
        self.admit(Mount::Reveal {
            component,
            region,
            steps,
            policy,
        })
    }

    /// Declare an auto-rotating carousel over `items`.
    pub fn mount_rotator(
        &mut self,
        component: ComponentId,
        items: Vec<String>,
    ) -> Result<(), SessionError> {
        self.ensure_vacant(component)?;
        if items.is_empty() {
            return Err(ConfigError::EmptyRotationSet.into());
        }
        self.admit(Mount::Rotator { component, items })
    }

    /// Declare a filterable project grid. Grids need no host capability and
    /// mount immediately.
    pub fn mount_filter(&mut self, component: ComponentId) -> Result<(), SessionError> {
        self.ensure_vacant(component)?;
        let state = FilterState::new(self.config.page_size)?;
        self.components.insert(component, Component::Filter(state));
        Ok(())
    }

    #[must_use]
    pub fn filter(&self, component: ComponentId) -> Option<&FilterState<ProjectCategory>> {
        match self.components.get(&component) {
            Some(Component::Filter(state)) => Some(state),
            _ => None,
        }
    }

    pub fn filter_mut(
        &mut self,
        component: ComponentId,
    ) -> Option<&mut FilterState<ProjectCategory>> {
        match self.components.get_mut(&component) {
            Some(Component::Filter(state)) => Some(state),
            _ => None,
        }
    }

    /// Forward entries from the host's observer callbacks.
    pub fn deliver_entries(&mut self, entries: &[IntersectionEntry]) {
        self.reveals.deliver(entries);
    }

    /// Forward a JSON array of `{ "region": n, "isIntersecting": bool }`.
    pub fn deliver_entries_json(&mut self, json: &str) -> Result<usize, SessionError> {
        let entries: Vec<IntersectionEntry> = serde_json::from_str(json)?;
        self.deliver_entries(&entries);
        Ok(entries.len())
    }

    /// Advance the clock by `dt` and run everything that came due.
    pub fn step(&mut self, dt: Duration) -> StepResult {
        self.clock.advance(dt);
        let now = self.clock.now();
        let now_ms = u64::try_from(now.as_millis()).unwrap_or(u64::MAX);
        let _span = tracing::debug_span!("page_step", now_ms).entered();

        let mut mounted = 0;
        for mount in self.gate.poll(now) {
            let component = mount.component();
            match self.activate(mount) {
                Ok(()) => mounted += 1,
                Err(err) => tracing::warn!(%component, error = %err, "deferred mount failed"),
            }
        }

        let styles_before = self.reveals.sink().0.len();
        self.reveals.advance(now);
        let steps_fired = self.reveals.sink().0.len() - styles_before;

        let rotations_before = self.rotations.len();
        for (&component, entry) in &mut self.components {
            if let Component::Rotator(rotator) = entry {
                rotator.advance(now);
                self.rotations.extend(
                    rotator
                        .sink_mut()
                        .0
                        .drain(..)
                        .map(|event| RotationUpdate { component, event }),
                );
            }
        }

        StepResult {
            now,
            mounted,
            steps_fired,
            rotation_events: self.rotations.len() - rotations_before,
            next_deadline: self.next_deadline(),
        }
    }

    /// Take everything produced since the last call.
    pub fn take_outputs(&mut self) -> SessionOutputs {
        SessionOutputs {
            styles: std::mem::take(&mut self.reveals.sink_mut().0),
            rotations: std::mem::take(&mut self.rotations),
            observer_commands: self
                .reveals
                .tracker_mut()
                .backend_mut()
                .drain_commands()
                .collect(),
        }
    }

    /// Show item `index` of a carousel now.
    pub fn jump_to(&mut self, component: ComponentId, index: usize) -> Result<(), SessionError> {
        self.drive_rotator(component, |rotator, now| rotator.jump_to(index, now))
    }

    pub fn next_slide(&mut self, component: ComponentId) -> Result<(), SessionError> {
        self.drive_rotator(component, |rotator, now| rotator.next(now))
    }

    pub fn previous_slide(&mut self, component: ComponentId) -> Result<(), SessionError> {
        self.drive_rotator(component, |rotator, now| rotator.previous(now))
    }

    /// What a carousel should draw right now.
    #[must_use]
    pub fn rotation_frame(&self, component: ComponentId) -> Option<RotationFrame> {
        match self.components.get(&component) {
            Some(Component::Rotator(rotator)) => Some(rotator.frame(self.clock.now())),
            _ => None,
        }
    }

    /// The item a carousel currently shows.
    #[must_use]
    pub fn current_slide(&self, component: ComponentId) -> Option<&str> {
        match self.components.get(&component) {
            Some(Component::Rotator(rotator)) => Some(rotator.set().current_item().as_str()),
            _ => None,
        }
    }

    /// Remove one component, cancelling its timers and observers.
    pub fn unmount(&mut self, component: ComponentId) -> Result<(), SessionError> {
        if !self
            .gate
            .unpark_where(|mount| mount.component() == component)
            .is_empty()
        {
            tracing::debug!(%component, "unmounted before capabilities confirmed");
            return Ok(());
        }
        match self.components.remove(&component) {
            None => Err(SessionError::UnknownComponent(component)),
            Some(Component::Reveal(region)) => {
                self.reveals.disarm(region)?;
                Ok(())
            }
            Some(Component::Rotator(mut rotator)) => {
                rotator.teardown();
                Ok(())
            }
            Some(Component::Filter(_)) => Ok(()),
        }
    }

    /// Remove every component; the page is being torn down.
    pub fn unmount_all(&mut self) {
        self.gate.clear();
        self.reveals.teardown();
        for (_, component) in std::mem::take(&mut self.components) {
            if let Component::Rotator(mut rotator) = component {
                rotator.teardown();
            }
        }
        tracing::debug!("page session unmounted");
    }

    #[must_use]
    pub fn is_mounted(&self, component: ComponentId) -> bool {
        self.components.contains_key(&component)
    }

    #[must_use]
    pub fn is_parked(&self, component: ComponentId) -> bool {
        self.gate.is_parked(|mount| mount.component() == component)
    }

    /// Earliest time anything in the session is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.components
            .values()
            .filter_map(|entry| match entry {
                Component::Rotator(rotator) => rotator.next_deadline(),
                _ => None,
            })
            .chain(self.reveals.next_deadline())
            .chain(self.gate.next_deadline())
            .min()
    }

    fn ensure_vacant(&self, component: ComponentId) -> Result<(), SessionError> {
        if self.is_mounted(component) || self.is_parked(component) {
            return Err(SessionError::DuplicateComponent(component));
        }
        Ok(())
    }

    fn admit(&mut self, mount: Mount) -> Result<(), SessionError> {
        if self.gate.is_open() {
            return self.activate(mount);
        }
        tracing::debug!(component = %mount.component(), "parked until capabilities confirmed");
        self.gate.park(mount);
        Ok(())
    }

    fn activate(&mut self, mount: Mount) -> Result<(), SessionError> {
        match mount {
            Mount::Reveal {
                component,
                region,
                steps,
                policy,
            } => {
                self.reveals
                    .arm(region, steps, policy, &self.config.observer)?;
                self.components
                    .insert(component, Component::Reveal(region));
            }
            Mount::Rotator { component, items } => {
                let mut rotator = AutoRotator::new(items, self.config.rotator, EventQueue::default())?;
                let timers = self
                    .gate
                    .capabilities()
                    .is_some_and(|caps| caps.contains(HostCapabilities::TIMERS));
                if timers {
                    rotator.start(self.clock.now())?;
                }
                self.components
                    .insert(component, Component::Rotator(rotator));
            }
        }
        Ok(())
    }

    fn drive_rotator(
        &mut self,
        component: ComponentId,
        op: impl FnOnce(&mut Carousel, Duration) -> Result<(), RotatorError>,
    ) -> Result<(), SessionError> {
        let now = self.clock.now();
        let Some(Component::Rotator(rotator)) = self.components.get_mut(&component) else {
            return Err(SessionError::UnknownComponent(component));
        };
        let result = op(rotator, now);
        self.rotations.extend(
            rotator
                .sink_mut()
                .0
                .drain(..)
                .map(|event| RotationUpdate { component, event }),
        );
        result.map_err(SessionError::from)
    }
}
