//! Host driver loop
//!
//! The [`ControlLoop`] owns the [`Scheduler`] and calls its `run()` once per
//! configured period. Other periodic callbacks (fault log updates,
//! telemetry) share the same cooperative loop at their own periods. A
//! callback that fails or panics is logged, reported to the fault log and
//! skipped for that invocation only.
//!
//! ```rust,ignore
//! let mut control = ControlLoop::new(scheduler, SchedulerConfig::standard())?;
//! control.add_periodic("telemetry", Duration::from_millis(100), |s| {
//!     publish(&s.snapshot())
//! })?;
//! control.run()?;
//! ```

use super::config::SchedulerConfig;
use super::scheduler::{panic_message, Scheduler};
use crate::core::Fault;
use crate::error::{CadenceError, CadenceResult};
use colored::Colorize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type PeriodicFn = Box<dyn FnMut(&mut Scheduler) -> anyhow::Result<()> + Send>;

enum CallbackKind {
    /// The scheduler's own pass
    Scheduler,
    User(PeriodicFn),
}

struct PeriodicCallback {
    name: String,
    period: Duration,
    next_due: Duration,
    kind: CallbackKind,
    runs: u64,
    failures: u64,
}

/// Cloneable handle that stops a running loop from another thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Cooperative driver for the scheduler and independent periodic callbacks
pub struct ControlLoop {
    scheduler: Scheduler,
    callbacks: Vec<PeriodicCallback>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    // Logical time since the loop started
    now: Duration,
}

impl ControlLoop {
    /// Wrap `scheduler`, applying `config` to it. Registers the scheduler
    /// pass, the fault log update and, when configured, a telemetry
    /// snapshot callback. Fails if `config` does not validate.
    pub fn new(mut scheduler: Scheduler, config: SchedulerConfig) -> CadenceResult<Self> {
        config.validate()?;
        scheduler.set_config(config.clone());

        let mut control = Self {
            scheduler,
            callbacks: Vec::new(),
            config,
            running: Arc::new(AtomicBool::new(false)),
            now: Duration::ZERO,
        };

        control.push("scheduler", control.config.period(), CallbackKind::Scheduler);
        control.push(
            "faults",
            control.config.fault_update_period(),
            CallbackKind::User(Box::new(|scheduler| {
                scheduler.fault_log().update();
                Ok(())
            })),
        );
        if let Some(period) = control.config.snapshot_period() {
            control.push(
                "snapshot",
                period,
                CallbackKind::User(Box::new(|scheduler| {
                    let json = scheduler.snapshot().to_json()?;
                    tracing::debug!(target: "cadence::telemetry", "{}", json);
                    Ok(())
                })),
            );
        }
        Ok(control)
    }

    fn push(&mut self, name: &str, period: Duration, kind: CallbackKind) {
        self.callbacks.push(PeriodicCallback {
            name: name.to_string(),
            period,
            next_due: self.now,
            kind,
            runs: 0,
            failures: 0,
        });
    }

    /// Register an independent callback. The first invocation happens on
    /// the next step.
    pub fn add_periodic(
        &mut self,
        name: &str,
        period: Duration,
        callback: impl FnMut(&mut Scheduler) -> anyhow::Result<()> + Send + 'static,
    ) -> CadenceResult<&mut Self> {
        if period.is_zero() {
            return Err(CadenceError::config(format!(
                "periodic callback '{}' needs a non-zero period",
                name
            )));
        }
        self.push(name, period, CallbackKind::User(Box::new(callback)));
        Ok(self)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }

    /// Logical time reached by the last step
    pub fn now(&self) -> Duration {
        self.now
    }

    /// `(runs, failures)` of the named callback
    pub fn callback_stats(&self, name: &str) -> Option<(u64, u64)> {
        self.callbacks
            .iter()
            .find(|c| c.name == name)
            .map(|c| (c.runs, c.failures))
    }

    /// Run every callback due at or before `now`, earliest deadline first
    /// (registration order breaks ties). A callback that fell more than one
    /// period behind runs once and skips the missed periods.
    pub fn step_until(&mut self, now: Duration) -> usize {
        let mut ran = 0;
        loop {
            let due = self
                .callbacks
                .iter()
                .enumerate()
                .filter(|(_, c)| c.next_due <= now)
                .min_by_key(|(index, c)| (c.next_due, *index))
                .map(|(index, _)| index);
            let Some(index) = due else {
                break;
            };

            self.invoke(index);
            ran += 1;

            let callback = &mut self.callbacks[index];
            callback.next_due += callback.period;
            if callback.next_due <= now {
                let behind = (now - callback.next_due).as_nanos();
                let skipped = behind / callback.period.as_nanos() + 1;
                tracing::debug!(callback = %callback.name, skipped, "skipping missed periods");
                callback.next_due += Duration::from_nanos(
                    (callback.period.as_nanos() * skipped).min(u64::MAX as u128) as u64,
                );
            }
        }
        self.now = self.now.max(now);
        ran
    }

    /// Run what is due now, then advance logical time by one main period
    pub fn step(&mut self) -> usize {
        let ran = self.step_until(self.now);
        self.now += self.config.period();
        ran
    }

    /// Deterministic run of `cycles` main periods
    pub fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step();
        }
    }

    fn invoke(&mut self, index: usize) {
        let catch_panics = self.config.catch_panics;
        let warn_on_overrun = self.config.warn_on_overrun;
        let faults = self.scheduler.fault_log().clone();
        let scheduler = &mut self.scheduler;
        let callback = &mut self.callbacks[index];
        callback.runs += 1;

        match &mut callback.kind {
            CallbackKind::Scheduler => {
                let start = Instant::now();
                scheduler.run();
                let took = start.elapsed();
                if warn_on_overrun && took > callback.period {
                    tracing::warn!(
                        cycle = scheduler.cycle(),
                        took_us = took.as_micros() as u64,
                        period_us = callback.period.as_micros() as u64,
                        "scheduler pass overran its period"
                    );
                }
            }
            CallbackKind::User(func) => {
                let result = if catch_panics {
                    catch_unwind(AssertUnwindSafe(|| func(scheduler))).unwrap_or_else(|panic| {
                        Err(anyhow::anyhow!(
                            "panicked: {}",
                            panic_message(panic.as_ref())
                        ))
                    })
                } else {
                    func(scheduler)
                };
                if let Err(err) = result {
                    callback.failures += 1;
                    faults.report(Fault::error(
                        callback.name.clone(),
                        format!("periodic callback failed: {:#}", err),
                    ));
                }
            }
        }
    }

    fn next_deadline(&self) -> Duration {
        self.callbacks
            .iter()
            .map(|c| c.next_due)
            .min()
            .unwrap_or(self.now + self.config.period())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Run against the wall clock until stopped or Ctrl+C
    pub fn run(&mut self) -> CadenceResult<()> {
        self.run_with_limit(None)
    }

    /// Run against the wall clock for `duration`, then return
    pub fn run_for(&mut self, duration: Duration) -> CadenceResult<()> {
        self.run_with_limit(Some(duration))
    }

    fn run_with_limit(&mut self, limit: Option<Duration>) -> CadenceResult<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| CadenceError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("{}", "\nCtrl+C received! Stopping control loop...".red());
            running.store(false, Ordering::SeqCst);
        }) {
            tracing::debug!("signal handler not installed: {}", e);
        }

        tracing::info!(
            scheduler = %self.scheduler.name(),
            period_ms = self.config.period_ms,
            "control loop started"
        );

        rt.block_on(async {
            let start = tokio::time::Instant::now();
            let origin = self.now;

            while self.is_running() {
                let elapsed = start.elapsed();
                if limit.is_some_and(|l| elapsed >= l) {
                    break;
                }

                self.step_until(origin + elapsed);

                let mut wake = start + self.next_deadline().saturating_sub(origin);
                if let Some(limit) = limit {
                    wake = wake.min(start + limit);
                }
                tokio::time::sleep_until(wake).await;
            }
        });

        self.running.store(false, Ordering::SeqCst);
        tracing::info!(
            scheduler = %self.scheduler.name(),
            cycles = self.scheduler.cycle(),
            "control loop stopped"
        );
        Ok(())
    }
}
