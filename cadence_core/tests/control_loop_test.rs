// Cooperative driver: periodic callbacks, fault containment and wall-clock runs
use cadence_core::scheduling::{ControlLoop, Scheduler, SchedulerConfig};
use cadence_core::testing::{Probe, ProbeLog};
use cadence_core::{CadenceError, CommandExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn control() -> ControlLoop {
    ControlLoop::new(Scheduler::new(), SchedulerConfig::deterministic()).unwrap()
}

#[test]
fn test_failing_callbacks_do_not_stop_the_loop() {
    let log = ProbeLog::new();
    let mut control = control();
    let id = control
        .scheduler_mut()
        .register(Probe::new("worker", &log).boxed());
    control.scheduler_mut().schedule(id);

    control
        .add_periodic("flaky", Duration::from_millis(20), |_| {
            anyhow::bail!("sensor timeout")
        })
        .unwrap()
        .add_periodic("broken", Duration::from_millis(40), |_| -> anyhow::Result<()> {
            panic!("driver crashed")
        })
        .unwrap();

    control.run_cycles(4);

    assert_eq!(control.scheduler().cycle(), 4);
    assert_eq!(log.count("worker:execute"), 4);
    assert_eq!(control.callback_stats("flaky"), Some((4, 4)));
    assert_eq!(control.callback_stats("broken"), Some((2, 2)));

    let total = control.scheduler().fault_log().total();
    assert!(total.keys().any(|f| f.source == "flaky" && f.description.contains("sensor timeout")));
    assert!(total.keys().any(|f| f.source == "broken" && f.description.contains("driver crashed")));
    assert_eq!(total[total.keys().find(|f| f.source == "flaky").unwrap()].count, 4);
}

#[test]
fn test_fault_log_is_updated_by_the_loop() {
    let mut control = control();
    let faults = control.scheduler().fault_log().clone();

    faults.report_error("drive", "brownout");
    assert!(!faults.has_active_failures());
    control.step();
    assert!(faults.has_active_failures());
    control.step();
    assert!(!faults.has_active_failures());
}

#[test]
fn test_callbacks_see_the_scheduler() {
    let mut control = control();
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = seen.clone();
    control
        .add_periodic("observer", Duration::from_millis(20), move |scheduler| {
            sink.store(scheduler.cycle() as usize, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    control.run_cycles(3);
    // The scheduler pass was registered first and runs before the observer
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_snapshot_callback_is_registered_from_config() {
    let config = SchedulerConfig {
        snapshot_period_ms: Some(100),
        ..SchedulerConfig::deterministic()
    };
    let mut control = ControlLoop::new(Scheduler::new(), config).unwrap();
    control.run_cycles(10);
    assert_eq!(control.callback_stats("snapshot"), Some((2, 0)));
}

#[test]
fn test_run_for_uses_wall_clock() {
    let mut control = ControlLoop::new(
        Scheduler::new(),
        SchedulerConfig {
            period_ms: 5,
            ..SchedulerConfig::deterministic()
        },
    )
    .unwrap();
    control.run_for(Duration::from_millis(60)).unwrap();

    let cycles = control.scheduler().cycle();
    assert!(cycles >= 2, "only {} cycles ran", cycles);
    assert!(!control.is_running());
}

#[test]
fn test_stop_handle_ends_run() {
    let mut control = ControlLoop::new(
        Scheduler::new(),
        SchedulerConfig {
            period_ms: 5,
            ..SchedulerConfig::deterministic()
        },
    )
    .unwrap();
    control
        .add_periodic("stopper", Duration::from_millis(5), {
            let handle = control.stop_handle();
            move |scheduler: &mut Scheduler| {
                if scheduler.cycle() >= 3 {
                    handle.stop();
                }
                Ok(())
            }
        })
        .unwrap();

    control.run().unwrap();
    assert!(control.scheduler().cycle() >= 3);
}

#[test]
fn test_zero_period_config_is_refused() {
    let result = ControlLoop::new(
        Scheduler::new(),
        SchedulerConfig {
            period_ms: 0,
            ..SchedulerConfig::deterministic()
        },
    );
    assert!(matches!(result, Err(CadenceError::Config(_))));

    let result = ControlLoop::new(
        Scheduler::new(),
        SchedulerConfig {
            snapshot_period_ms: Some(0),
            ..SchedulerConfig::deterministic()
        },
    );
    assert!(matches!(result, Err(CadenceError::Config(_))));
}
