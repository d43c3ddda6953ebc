//! Test support: a scriptable probe command that records its lifecycle.
//!
//! ```rust,ignore
//! let log = ProbeLog::new();
//! let id = scheduler.register(Probe::new("a", &log).finish_after(2).boxed());
//! scheduler.schedule(id);
//! scheduler.run();
//! assert_eq!(log.take(), vec!["a:init", "a:execute"]);
//! ```

use crate::core::{
    requirements, Command, CommandContext, InterruptionBehavior, Requirements, ResourceId,
};
use crate::error::{CadenceError, CadenceResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared record of lifecycle calls, one `"<name>:<call>"` entry per call
#[derive(Debug, Clone, Default)]
pub struct ProbeLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ProbeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    /// Drain and return everything recorded so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of recorded entries equal to `entry`
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

/// Command that logs every lifecycle call and can be told to finish, fail
/// or panic after a number of executions.
#[derive(Debug, Clone)]
pub struct Probe {
    name: String,
    log: ProbeLog,
    requirements: Requirements,
    behavior: InterruptionBehavior,
    finish_after: Option<u64>,
    fail_after: Option<u64>,
    panic_after: Option<u64>,
    fail_on_init: bool,
    panic_on_end: bool,
    executed: u64,
}

impl Probe {
    pub fn new(name: &str, log: &ProbeLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            requirements: Requirements::new(),
            behavior: InterruptionBehavior::CancelSelf,
            finish_after: None,
            fail_after: None,
            panic_after: None,
            fail_on_init: false,
            panic_on_end: false,
            executed: 0,
        }
    }

    pub fn requiring(mut self, resources: &[ResourceId]) -> Self {
        self.requirements = requirements(resources);
        self
    }

    pub fn with_behavior(mut self, behavior: InterruptionBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Report finished once `executions` calls to `execute` have happened
    pub fn finish_after(mut self, executions: u64) -> Self {
        self.finish_after = Some(executions);
        self
    }

    /// Return an error from the `executions`-th call to `execute`
    pub fn fail_after(mut self, executions: u64) -> Self {
        self.fail_after = Some(executions);
        self
    }

    /// Panic inside the `executions`-th call to `execute`
    pub fn panic_after(mut self, executions: u64) -> Self {
        self.panic_after = Some(executions);
        self
    }

    pub fn fail_on_init(mut self) -> Self {
        self.fail_on_init = true;
        self
    }

    /// Panic inside `end`, after recording the call
    pub fn panic_on_end(mut self) -> Self {
        self.panic_on_end = true;
        self
    }

    fn record(&self, call: &str) {
        self.log.push(format!("{}:{}", self.name, call));
    }
}

impl Command for Probe {
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
        self.executed = 0;
        self.record("init");
        if self.fail_on_init {
            return Err(CadenceError::execution(format!("{} refused to start", self.name)));
        }
        Ok(())
    }

    fn execute(&mut self, _ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.executed += 1;
        self.record("execute");
        if self.panic_after == Some(self.executed) {
            panic!("{} blew up", self.name);
        }
        if self.fail_after == Some(self.executed) {
            return Err(CadenceError::execution(format!(
                "{} failed on execution {}",
                self.name, self.executed
            )));
        }
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        self.finish_after.is_some_and(|n| self.executed >= n)
    }

    fn end(&mut self, interrupted: bool, _ctx: &mut CommandContext<'_>) {
        self.record(&format!("end({})", interrupted));
        if self.panic_on_end {
            panic!("{} blew up while ending", self.name);
        }
    }
}
