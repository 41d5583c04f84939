//! Mount/unmount lifecycle tests across components.
//!
//! Teardown must cancel every timer and release every observer, and nothing
//! may reach a sink afterwards. When the observation primitive is missing,
//! regions are shown rather than left hidden.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use sitefx_core::visibility::ObserverHandle;
use sitefx_core::{
    AutoRotator, IntersectionEntry, ObserverBackend, ObserverConfig, ObservationUnavailable,
    RearmPolicy, RegionId, RevealError, RevealStep, RootMargin, RotationEvent, RotatorConfig,
    RotatorError, RotatorPhase, StaggeredRevealSequencer, VisibilityTracker, VisualState,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[derive(Debug, Default)]
struct Backend {
    missing: bool,
    next: u64,
    live: Vec<ObserverHandle>,
    observed: Vec<RegionId>,
}

impl ObserverBackend for Backend {
    fn is_available(&self) -> bool {
        !self.missing
    }

    fn create(&mut self, _: &ObserverConfig) -> Result<ObserverHandle, ObservationUnavailable> {
        self.next += 1;
        let handle = ObserverHandle(self.next);
        self.live.push(handle);
        Ok(handle)
    }

    fn observe(&mut self, _: ObserverHandle, region: RegionId) {
        self.observed.push(region);
    }

    fn unobserve(&mut self, _: ObserverHandle, region: RegionId) {
        self.observed.retain(|r| *r != region);
    }

    fn disconnect(&mut self, observer: ObserverHandle) {
        self.live.retain(|h| *h != observer);
    }
}

type Applied = Rc<RefCell<Vec<(RegionId, String, VisualState)>>>;

fn sequencer(
    backend: Backend,
) -> (
    StaggeredRevealSequencer<Backend, VisualState, impl FnMut(RegionId, &str, &VisualState)>,
    Applied,
) {
    let applied: Applied = Rc::default();
    let log = Rc::clone(&applied);
    let seq = StaggeredRevealSequencer::new(
        backend,
        move |region: RegionId, step: &str, state: &VisualState| {
            log.borrow_mut().push((region, step.to_owned(), *state));
        },
    );
    (seq, applied)
}

fn hero_steps() -> Vec<RevealStep<VisualState>> {
    vec![
        RevealStep::new("heading", 200, VisualState::SHOWN),
        RevealStep::new("description", 400, VisualState::SHOWN),
        RevealStep::new("buttons", 600, VisualState::SHOWN),
    ]
}

#[test]
fn sequencer_teardown_silences_sink() {
    let (mut seq, applied) = sequencer(Backend::default());
    let hero = RegionId(1);
    seq.arm(hero, hero_steps(), RearmPolicy::Once, &ObserverConfig::default())
        .unwrap();
    seq.deliver(&[IntersectionEntry::new(hero, true)]);
    seq.advance(ms(1_000));
    seq.advance(ms(1_250));
    assert_eq!(applied.borrow().len(), 1);

    seq.teardown();
    assert_eq!(seq.pending_count(), 0);
    assert!(!seq.is_armed(hero));
    assert!(seq.tracker().backend().live.is_empty());
    assert!(seq.tracker().backend().observed.is_empty());

    seq.deliver(&[IntersectionEntry::new(hero, true)]);
    seq.advance(ms(10_000));
    assert_eq!(applied.borrow().len(), 1);
}

#[test]
fn disarm_one_region_keeps_the_other() {
    let (mut seq, applied) = sequencer(Backend::default());
    let (about, contact) = (RegionId(1), RegionId(2));
    let config = ObserverConfig::default();
    seq.arm(about, hero_steps(), RearmPolicy::Once, &config)
        .unwrap();
    seq.arm(contact, hero_steps(), RearmPolicy::Once, &config)
        .unwrap();
    assert_eq!(seq.tracker().observer_count(), 1);

    seq.deliver(&[
        IntersectionEntry::new(about, true),
        IntersectionEntry::new(contact, true),
    ]);
    seq.advance(ms(0));
    seq.disarm(about).unwrap();
    seq.advance(ms(600));

    let regions: Vec<RegionId> = applied.borrow().iter().map(|(r, _, _)| *r).collect();
    assert_eq!(regions, vec![contact, contact, contact]);
    assert_eq!(seq.disarm(about), Err(RevealError::UnknownRegion(about)));
}

#[test]
fn missing_observer_shows_immediately() {
    let backend = Backend {
        missing: true,
        ..Backend::default()
    };
    let (mut seq, applied) = sequencer(backend);
    let region = RegionId(7);
    seq.arm(region, hero_steps(), RearmPolicy::Once, &ObserverConfig::default())
        .unwrap();

    assert!(seq.tracker().is_degraded(region));
    assert_eq!(seq.tracker().observer_count(), 0);

    // No host entry ever arrives; the sequence still plays.
    seq.advance(ms(100));
    seq.advance(ms(700));
    let steps: Vec<String> = applied.borrow().iter().map(|(_, s, _)| s.clone()).collect();
    assert_eq!(steps, vec!["heading", "description", "buttons"]);
}

#[test]
fn distinct_configs_get_distinct_observers() {
    let mut tracker = VisibilityTracker::new(Backend::default());
    let a = ObserverConfig::default();
    let b = ObserverConfig::new([0.2], RootMargin::ZERO).unwrap();
    let s1 = tracker.register(RegionId(1), &a);
    let s2 = tracker.register(RegionId(2), &b);
    let s3 = tracker.register(RegionId(3), &a);
    assert_eq!(tracker.observer_count(), 2);

    tracker.unregister(s2);
    assert_eq!(tracker.observer_count(), 1);
    tracker.unregister(s1);
    tracker.unregister(s3);
    assert_eq!(tracker.observer_count(), 0);
    assert!(tracker.backend().live.is_empty());
}

#[test]
fn rotator_teardown_is_terminal() {
    let events: Rc<RefCell<Vec<RotationEvent>>> = Rc::default();
    let sink = Rc::clone(&events);
    let config = RotatorConfig::default()
        .interval(ms(15_000))
        .crossfade(ms(1_000));
    let mut hero = AutoRotator::new(
        vec!["/hero1.jpg", "/hero2.jpg", "/hero3.jpg"],
        config,
        move |event: RotationEvent| sink.borrow_mut().push(event),
    )
    .unwrap();

    hero.start(ms(0)).unwrap();
    hero.advance(ms(15_500));
    assert_eq!(hero.phase(), RotatorPhase::Transitioning);

    hero.teardown();
    assert_eq!(hero.live_timers(), 0);
    hero.advance(ms(60_000));
    assert_eq!(
        *events.borrow(),
        vec![RotationEvent::CrossfadeStarted { from: 0, to: 1 }]
    );
    assert_eq!(hero.start(ms(60_000)), Err(RotatorError::TornDown));
    assert_eq!(hero.jump_to(2, ms(60_000)), Err(RotatorError::TornDown));
}
