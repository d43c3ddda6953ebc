// Trigger bindings evaluated inside the scheduler cycle
use cadence_core::scheduling::{EventKind, Scheduler, SchedulerConfig};
use cadence_core::testing::{Probe, ProbeLog};
use cadence_core::{CommandExt, InterruptionBehavior, Trigger};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

fn scheduler() -> Scheduler {
    Scheduler::new().with_config(SchedulerConfig::deterministic())
}

/// Record `<name>:<event>@<cycle>` for initialize and end transitions
fn record_transitions(scheduler: &mut Scheduler, tick: Arc<AtomicU64>) -> ProbeLog {
    let events = ProbeLog::new();
    let sink = events.clone();
    scheduler.on_event(move |event| {
        let label = match event.kind {
            EventKind::Initialized => "scheduled",
            EventKind::Interrupted => "cancelled",
            EventKind::Finished => "finished",
            _ => return,
        };
        sink.push(format!("{}:{}@{}", event.name, label, tick.load(Ordering::SeqCst)));
    });
    events
}

#[test]
fn test_while_true_and_on_true_edges() {
    let log = ProbeLog::new();
    let tick = Arc::new(AtomicU64::new(0));
    let mut scheduler = scheduler();
    let events = record_transitions(&mut scheduler, tick.clone());

    let held = scheduler.register(Probe::new("held", &log).boxed());
    let pressed = scheduler.register(Probe::new("pressed", &log).boxed());

    let now = tick.clone();
    scheduler.bind(
        Trigger::new(move || (2..=4).contains(&now.load(Ordering::SeqCst)))
            .while_true(held)
            .on_true(pressed),
    );

    for t in 0..8 {
        tick.store(t, Ordering::SeqCst);
        scheduler.run();
    }

    assert_eq!(
        events.take(),
        vec!["held:scheduled@2", "pressed:scheduled@2", "held:cancelled@5"]
    );
    // on_true does not cancel when the condition drops
    assert!(scheduler.is_scheduled(pressed));
}

#[test]
fn test_on_true_fires_once_per_press() {
    let log = ProbeLog::new();
    let pressed = Arc::new(AtomicBool::new(false));
    let mut scheduler = scheduler();
    let shot = scheduler.register(Probe::new("shot", &log).finish_after(1).boxed());

    let button = pressed.clone();
    scheduler.bind(Trigger::new(move || button.load(Ordering::SeqCst)).on_true(shot));

    scheduler.run();
    for held in [true, true, true, false, true] {
        pressed.store(held, Ordering::SeqCst);
        scheduler.run();
    }
    assert_eq!(log.count("shot:init"), 2);
}

#[test]
fn test_on_false_schedules_on_release() {
    let log = ProbeLog::new();
    let pressed = Arc::new(AtomicBool::new(false));
    let mut scheduler = scheduler();
    let stow = scheduler.register(Probe::new("stow", &log).finish_after(1).boxed());

    let button = pressed.clone();
    scheduler.bind(Trigger::new(move || button.load(Ordering::SeqCst)).on_false(stow));

    scheduler.run();
    pressed.store(true, Ordering::SeqCst);
    scheduler.run();
    assert_eq!(log.count("stow:init"), 0);
    pressed.store(false, Ordering::SeqCst);
    scheduler.run();
    assert_eq!(log.take(), vec!["stow:init", "stow:execute", "stow:end(false)"]);
}

#[test]
fn test_toggle_on_true() {
    let log = ProbeLog::new();
    let pressed = Arc::new(AtomicBool::new(false));
    let mut scheduler = scheduler();
    let lights = scheduler.register(Probe::new("lights", &log).boxed());

    let button = pressed.clone();
    scheduler.bind(Trigger::new(move || button.load(Ordering::SeqCst)).toggle_on_true(lights));

    scheduler.run();
    for (held, expected) in [(true, true), (false, true), (true, false), (false, false), (true, true)] {
        pressed.store(held, Ordering::SeqCst);
        scheduler.run();
        assert_eq!(scheduler.is_scheduled(lights), expected);
    }
}

#[test]
fn test_cancel_actions_apply_before_schedules() {
    let log = ProbeLog::new();
    let mode = Arc::new(AtomicBool::new(true));
    let mut scheduler = scheduler();
    let r1 = scheduler.add_resource("r1");
    let teleop = scheduler.register(
        Probe::new("teleop", &log)
            .requiring(&[r1])
            .with_behavior(InterruptionBehavior::CancelIncoming)
            .boxed(),
    );
    let auto = scheduler.register(Probe::new("auto", &log).requiring(&[r1]).boxed());

    let a = mode.clone();
    let b = mode.clone();
    // teleop refuses interruption, so auto only wins if the cancel from
    // the second trigger is applied before the schedule from the first
    scheduler.bind(Trigger::new(move || !a.load(Ordering::SeqCst)).while_true(auto));
    scheduler.bind(Trigger::new(move || b.load(Ordering::SeqCst)).while_true(teleop));

    scheduler.run();
    assert_eq!(scheduler.owner_of(r1), Some(teleop));
    log.take();

    mode.store(false, Ordering::SeqCst);
    scheduler.run();
    assert_eq!(
        log.take(),
        vec!["teleop:end(true)", "auto:init", "auto:execute"]
    );
}

#[test]
fn test_triggers_are_sampled_while_disabled() {
    let log = ProbeLog::new();
    let pressed = Arc::new(AtomicBool::new(false));
    let mut scheduler = scheduler();
    let shot = scheduler.register(Probe::new("shot", &log).finish_after(1).boxed());

    let button = pressed.clone();
    scheduler.bind(Trigger::new(move || button.load(Ordering::SeqCst)).on_true(shot));

    scheduler.run();
    scheduler.disable();
    pressed.store(true, Ordering::SeqCst);
    scheduler.run();
    scheduler.enable();
    scheduler.run();

    // The press happened while disabled and is not replayed
    assert_eq!(log.count("shot:init"), 0);
}

#[test]
fn test_while_true_retries_after_losing_arbitration() {
    let log = ProbeLog::new();
    let holding = Arc::new(AtomicBool::new(false));
    let mut scheduler = scheduler();
    let r1 = scheduler.add_resource("r1");
    let blocker = scheduler.register(
        Probe::new("blocker", &log)
            .requiring(&[r1])
            .with_behavior(InterruptionBehavior::CancelIncoming)
            .finish_after(2)
            .boxed(),
    );
    let held = scheduler.register(Probe::new("held", &log).requiring(&[r1]).boxed());

    let flag = holding.clone();
    scheduler.bind(Trigger::new(move || flag.load(Ordering::SeqCst)).while_true(held));

    scheduler.schedule(blocker);
    holding.store(true, Ordering::SeqCst);
    scheduler.run();
    assert_eq!(scheduler.owner_of(r1), Some(blocker));
    assert!(!scheduler.is_scheduled(held));

    for _ in 0..6 {
        scheduler.run();
    }

    // Picked up once the blocker finished, while the button was still held
    assert!(scheduler.is_scheduled(held));
    assert_eq!(scheduler.owner_of(r1), Some(held));
    assert_eq!(log.count("held:init"), 1);

    holding.store(false, Ordering::SeqCst);
    scheduler.run();
    assert!(!scheduler.is_scheduled(held));
    assert_eq!(log.count("held:end(true)"), 1);
}

#[test]
fn test_while_true_release_leaves_foreign_schedule_alone() {
    let log = ProbeLog::new();
    let holding = Arc::new(AtomicBool::new(false));
    let mut scheduler = scheduler();
    let r1 = scheduler.add_resource("r1");
    let blocker = scheduler.register(
        Probe::new("blocker", &log)
            .requiring(&[r1])
            .with_behavior(InterruptionBehavior::CancelIncoming)
            .boxed(),
    );
    let held = scheduler.register(Probe::new("held", &log).requiring(&[r1]).boxed());

    let flag = holding.clone();
    scheduler.bind(Trigger::new(move || flag.load(Ordering::SeqCst)).while_true(held));

    scheduler.schedule(blocker);
    holding.store(true, Ordering::SeqCst);
    scheduler.run();
    assert!(!scheduler.is_scheduled(held));

    // Someone else starts the command while the button is still held
    scheduler.cancel(blocker);
    scheduler.schedule(held);
    scheduler.run();
    assert!(scheduler.is_scheduled(held));

    holding.store(false, Ordering::SeqCst);
    scheduler.run();
    scheduler.run();
    assert!(scheduler.is_scheduled(held));
    assert_eq!(log.count("held:end(true)"), 0);
}
