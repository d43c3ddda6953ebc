use crate::core::{
    requirements, Command, CommandContext, InterruptionBehavior, Requirements, ResourceId,
};
use crate::error::CadenceResult;
use std::time::Duration;

type Hook = Box<dyn FnMut() -> CadenceResult<()> + Send>;
type EndHook = Box<dyn FnMut(bool) + Send>;
type FinishedHook = Box<dyn FnMut() -> bool + Send>;

/// Leaf command assembled from closures.
///
/// Every hook is optional; a command with no `finished_when` runs until it
/// is cancelled.
pub struct FunctionalCommand {
    name: String,
    requirements: Requirements,
    behavior: InterruptionBehavior,
    on_initialize: Option<Hook>,
    on_execute: Option<Hook>,
    is_finished: Option<FinishedHook>,
    on_end: Option<EndHook>,
}

impl FunctionalCommand {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requirements: Requirements::new(),
            behavior: InterruptionBehavior::CancelSelf,
            on_initialize: None,
            on_execute: None,
            is_finished: None,
            on_end: None,
        }
    }

    pub fn requiring(mut self, resources: &[ResourceId]) -> Self {
        self.requirements.extend(requirements(resources));
        self
    }

    pub fn with_behavior(mut self, behavior: InterruptionBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn on_initialize(mut self, mut action: impl FnMut() + Send + 'static) -> Self {
        self.on_initialize = Some(Box::new(move || {
            action();
            Ok(())
        }));
        self
    }

    pub fn on_execute(mut self, mut action: impl FnMut() + Send + 'static) -> Self {
        self.on_execute = Some(Box::new(move || {
            action();
            Ok(())
        }));
        self
    }

    /// Fallible per-cycle action; an `Err` is reported as a fault and the
    /// command is cancelled.
    pub fn try_execute(
        mut self,
        action: impl FnMut() -> CadenceResult<()> + Send + 'static,
    ) -> Self {
        self.on_execute = Some(Box::new(action));
        self
    }

    pub fn finished_when(mut self, condition: impl FnMut() -> bool + Send + 'static) -> Self {
        self.is_finished = Some(Box::new(condition));
        self
    }

    pub fn on_end(mut self, action: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_end = Some(Box::new(action));
        self
    }
}

impl Command for FunctionalCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.behavior
    }

    fn initialize(&mut self, _ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        match self.on_initialize.as_mut() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    fn execute(&mut self, _ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        match self.on_execute.as_mut() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        self.is_finished.as_mut().is_some_and(|condition| condition())
    }

    fn end(&mut self, interrupted: bool, _ctx: &mut CommandContext<'_>) {
        if let Some(hook) = self.on_end.as_mut() {
            hook(interrupted);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum WaitTarget {
    Cycles(u64),
    Duration(Duration),
}

/// Requirement-free command that finishes after a number of cycles.
///
/// Duration waits are converted to cycles using the scheduler period when
/// the command initializes, so they stay deterministic under test.
#[derive(Debug, Clone)]
pub struct WaitCommand {
    target: WaitTarget,
    cycles: u64,
    elapsed: u64,
}

impl WaitCommand {
    pub fn cycles(cycles: u64) -> Self {
        Self {
            target: WaitTarget::Cycles(cycles),
            cycles,
            elapsed: 0,
        }
    }

    pub fn duration(duration: Duration) -> Self {
        Self {
            target: WaitTarget::Duration(duration),
            cycles: 0,
            elapsed: 0,
        }
    }
}

impl Command for WaitCommand {
    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.elapsed = 0;
        self.cycles = match self.target {
            WaitTarget::Cycles(n) => n,
            WaitTarget::Duration(duration) => {
                let period = ctx.period().as_nanos().max(1);
                duration.as_nanos().div_ceil(period) as u64
            }
        };
        Ok(())
    }

    fn execute(&mut self, _ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.elapsed += 1;
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        self.elapsed >= self.cycles
    }
}

/// Requirement-free command whose finish condition is the predicate
pub struct WaitUntilCommand {
    condition: FinishedHook,
}

impl WaitUntilCommand {
    pub fn new(condition: impl FnMut() -> bool + Send + 'static) -> Self {
        Self {
            condition: Box::new(condition),
        }
    }
}

impl Command for WaitUntilCommand {
    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        (self.condition)()
    }
}

/// Logs a message once and finishes
#[derive(Debug, Clone)]
pub struct PrintCommand {
    message: String,
}

impl PrintCommand {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Command for PrintCommand {
    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        tracing::info!(source = ctx.source(), "{}", self.message);
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::TestContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_functional_hooks_run_in_order() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let mut command = FunctionalCommand::new("probe")
            .on_initialize(move || a.lock().push("init".to_string()))
            .on_execute(move || b.lock().push("execute".to_string()))
            .finished_when(|| true)
            .on_end(move |interrupted| c.lock().push(format!("end({})", interrupted)));

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            command.initialize(ctx).unwrap();
            command.execute(ctx).unwrap();
            assert!(command.is_finished(ctx));
            command.end(false, ctx);
        });

        assert_eq!(*log.lock(), vec!["init", "execute", "end(false)"]);
    }

    #[test]
    fn test_functional_without_condition_never_finishes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let mut command = FunctionalCommand::new("run").on_execute(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            for _ in 0..5 {
                command.execute(ctx).unwrap();
                assert!(!command.is_finished(ctx));
            }
        });
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_wait_cycles() {
        let mut wait = WaitCommand::cycles(3);
        let mut harness = TestContext::new();
        harness.with(|ctx| {
            wait.initialize(ctx).unwrap();
            for _ in 0..2 {
                wait.execute(ctx).unwrap();
                assert!(!wait.is_finished(ctx));
            }
            wait.execute(ctx).unwrap();
            assert!(wait.is_finished(ctx));

            // Rescheduling starts the count over
            wait.initialize(ctx).unwrap();
            assert!(!wait.is_finished(ctx));
        });
    }

    #[test]
    fn test_wait_duration_rounds_up_to_whole_cycles() {
        // 50ms at a 20ms period needs three passes
        let mut wait = WaitCommand::duration(Duration::from_millis(50));
        let mut harness = TestContext::new();
        harness.with(|ctx| {
            wait.initialize(ctx).unwrap();
            let mut passes = 0;
            while !wait.is_finished(ctx) {
                wait.execute(ctx).unwrap();
                passes += 1;
            }
            assert_eq!(passes, 3);
        });
    }

    #[test]
    fn test_wait_until_follows_predicate() {
        let flag = Arc::new(AtomicUsize::new(0));
        let reader = flag.clone();
        let mut wait = WaitUntilCommand::new(move || reader.load(Ordering::SeqCst) > 1);
        assert!(wait.requirements().is_empty());

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            assert!(!wait.is_finished(ctx));
            flag.store(2, Ordering::SeqCst);
            assert!(wait.is_finished(ctx));
        });
    }
}
