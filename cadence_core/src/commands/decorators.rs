//! Wrappers that change one aspect of a command and forward the rest

use crate::core::{Command, CommandContext, InterruptionBehavior, Requirements};
use crate::error::CadenceResult;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Limit {
    Cycles(u64),
    Duration(Duration),
}

/// Ends the inner command once it has executed for a bounded number of
/// cycles.
///
/// If the bound is hit first the inner command is ended with
/// `interrupted == true`.
pub struct Timeout {
    inner: Box<dyn Command>,
    name: String,
    limit: Limit,
    cycles: u64,
    elapsed: u64,
    inner_done: bool,
}

impl Timeout {
    pub fn cycles(inner: Box<dyn Command>, cycles: u64) -> Self {
        Self::with_limit(inner, Limit::Cycles(cycles))
    }

    /// Bound converted to whole cycles of the scheduler period, rounding up
    pub fn duration(inner: Box<dyn Command>, duration: Duration) -> Self {
        Self::with_limit(inner, Limit::Duration(duration))
    }

    fn with_limit(inner: Box<dyn Command>, limit: Limit) -> Self {
        let name = format!("Timeout({})", inner.name());
        Self {
            inner,
            name,
            limit,
            cycles: 0,
            elapsed: 0,
            inner_done: false,
        }
    }

    pub fn timed_out(&self) -> bool {
        !self.inner_done && self.elapsed >= self.cycles
    }
}

impl Command for Timeout {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.inner.interruption_behavior()
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.elapsed = 0;
        self.inner_done = false;
        self.cycles = match self.limit {
            Limit::Cycles(n) => n,
            Limit::Duration(duration) => {
                let period = ctx.period().as_nanos().max(1);
                duration.as_nanos().div_ceil(period) as u64
            }
        };
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner.execute(ctx)?;
        self.elapsed += 1;
        self.inner_done = self.inner.is_finished(ctx);
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        self.inner_done || self.elapsed >= self.cycles
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        self.inner.end(interrupted || !self.inner_done, ctx);
    }
}

/// Ends the inner command as soon as a condition holds
pub struct Until {
    inner: Box<dyn Command>,
    name: String,
    condition: Box<dyn FnMut() -> bool + Send>,
    inner_done: bool,
}

impl Until {
    pub fn new(inner: Box<dyn Command>, condition: impl FnMut() -> bool + Send + 'static) -> Self {
        let name = format!("Until({})", inner.name());
        Self {
            inner,
            name,
            condition: Box::new(condition),
            inner_done: false,
        }
    }
}

impl Command for Until {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.inner.interruption_behavior()
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner_done = false;
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner.execute(ctx)?;
        self.inner_done = self.inner.is_finished(ctx);
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        self.inner_done || (self.condition)()
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        self.inner.end(interrupted || !self.inner_done, ctx);
    }
}

/// Overrides the reported name
pub struct Named {
    inner: Box<dyn Command>,
    name: String,
}

impl Named {
    pub fn new(inner: Box<dyn Command>, name: &str) -> Self {
        Self {
            inner,
            name: name.to_string(),
        }
    }
}

impl Command for Named {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.inner.interruption_behavior()
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner.execute(ctx)
    }

    fn is_finished(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        self.inner.is_finished(ctx)
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        self.inner.end(interrupted, ctx)
    }
}

/// Overrides the interruption behavior
pub struct WithBehavior {
    inner: Box<dyn Command>,
    behavior: InterruptionBehavior,
}

impl WithBehavior {
    pub fn new(inner: Box<dyn Command>, behavior: InterruptionBehavior) -> Self {
        Self { inner, behavior }
    }
}

impl Command for WithBehavior {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.behavior
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner.initialize(ctx)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.inner.execute(ctx)
    }

    fn is_finished(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        self.inner.is_finished(ctx)
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        self.inner.end(interrupted, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::TestContext;
    use crate::testing::{Probe, ProbeLog};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn drive(command: &mut dyn Command, harness: &mut TestContext, max: usize) -> usize {
        harness.with(|ctx| {
            command.initialize(ctx).unwrap();
            for pass in 1..=max {
                command.execute(ctx).unwrap();
                if command.is_finished(ctx) {
                    command.end(false, ctx);
                    return pass;
                }
            }
            max
        })
    }

    #[test]
    fn test_timeout_interrupts_slow_command() {
        let log = ProbeLog::new();
        let mut timeout = Timeout::cycles(Box::new(Probe::new("slow", &log)), 3);

        let passes = drive(&mut timeout, &mut TestContext::new(), 10);
        assert_eq!(passes, 3);
        assert!(timeout.timed_out());
        assert_eq!(log.count("slow:execute"), 3);
        assert_eq!(log.entries().last().map(String::as_str), Some("slow:end(true)"));
    }

    #[test]
    fn test_timeout_lets_fast_command_finish() {
        let log = ProbeLog::new();
        let mut timeout = Timeout::cycles(Box::new(Probe::new("fast", &log).finish_after(2)), 5);

        let passes = drive(&mut timeout, &mut TestContext::new(), 10);
        assert_eq!(passes, 2);
        assert!(!timeout.timed_out());
        assert_eq!(log.entries().last().map(String::as_str), Some("fast:end(false)"));
    }

    #[test]
    fn test_timeout_duration_uses_period() {
        let log = ProbeLog::new();
        let mut timeout =
            Timeout::duration(Box::new(Probe::new("slow", &log)), Duration::from_millis(100));
        assert_eq!(drive(&mut timeout, &mut TestContext::new(), 50), 5);
    }

    #[test]
    fn test_until_stops_on_condition() {
        let log = ProbeLog::new();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let mut until = Until::new(Box::new(Probe::new("spin", &log)), move || {
            flag.load(Ordering::SeqCst)
        });

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            until.initialize(ctx).unwrap();
            until.execute(ctx).unwrap();
            assert!(!until.is_finished(ctx));
            stop.store(true, Ordering::SeqCst);
            until.execute(ctx).unwrap();
            assert!(until.is_finished(ctx));
            until.end(false, ctx);
        });
        assert_eq!(log.entries().last().map(String::as_str), Some("spin:end(true)"));
    }

    #[test]
    fn test_overrides() {
        let log = ProbeLog::new();
        let named = Named::new(Box::new(Probe::new("inner", &log)), "outer");
        assert_eq!(named.name(), "outer");

        let guarded = WithBehavior::new(
            Box::new(Probe::new("inner", &log)),
            InterruptionBehavior::CancelIncoming,
        );
        assert_eq!(guarded.name(), "inner");
        assert_eq!(guarded.interruption_behavior(), InterruptionBehavior::CancelIncoming);
    }
}
