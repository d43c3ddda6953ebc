use super::command::{Command, CommandId};
use super::fault::{Fault, FaultLog};
use std::collections::HashSet;
use std::time::Duration;

/// Work a command asks the scheduler to do once its lifecycle call returns
pub(crate) enum Request {
    Schedule(CommandId),
    Cancel(CommandId),
    Spawn(CommandId, Box<dyn Command>),
}

/// Context handed to every lifecycle call.
///
/// Commands never hold a reference to the scheduler. Anything that would
/// mutate scheduler state (scheduling or cancelling another command,
/// spawning a one-shot command) is queued here and applied by the
/// scheduler as soon as the current call returns.
pub struct CommandContext<'a> {
    cycle: u64,
    period: Duration,
    source: &'a str,
    active: &'a HashSet<CommandId>,
    next_id: &'a mut u64,
    faults: &'a FaultLog,
    requests: Vec<Request>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        cycle: u64,
        period: Duration,
        source: &'a str,
        active: &'a HashSet<CommandId>,
        next_id: &'a mut u64,
        faults: &'a FaultLog,
    ) -> Self {
        Self {
            cycle,
            period,
            source,
            active,
            next_id,
            faults,
            requests: Vec::new(),
        }
    }

    /// Index of the scheduler pass currently running (0 for the first)
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Fixed period between scheduler passes
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Name of the top-level command this call belongs to
    pub fn source(&self) -> &str {
        self.source
    }

    /// Whether `id` is active, counting spawns and schedules queued from
    /// this call that the scheduler has not applied yet.
    pub fn is_scheduled(&self, id: CommandId) -> bool {
        if self.active.contains(&id) {
            return !self
                .requests
                .iter()
                .any(|r| matches!(r, Request::Cancel(c) if *c == id));
        }
        self.requests.iter().any(|r| match r {
            Request::Spawn(c, _) | Request::Schedule(c) => *c == id,
            Request::Cancel(_) => false,
        })
    }

    /// Ask the scheduler to schedule a registered command
    pub fn schedule(&mut self, id: CommandId) {
        self.requests.push(Request::Schedule(id));
    }

    /// Ask the scheduler to cancel a command
    pub fn cancel(&mut self, id: CommandId) {
        self.requests.push(Request::Cancel(id));
    }

    /// Hand a fresh command to the scheduler as a one-shot top-level
    /// command. It goes through normal arbitration and is dropped from the
    /// registry once it ends.
    pub fn spawn(&mut self, command: Box<dyn Command>) -> CommandId {
        let id = CommandId(*self.next_id);
        *self.next_id += 1;
        self.requests.push(Request::Spawn(id, command));
        id
    }

    /// Report a fault on the shared fault channel
    pub fn report(&self, fault: Fault) {
        self.faults.report(fault);
    }

    pub fn faults(&self) -> &FaultLog {
        self.faults
    }

    pub(crate) fn into_requests(self) -> Vec<Request> {
        self.requests
    }
}

/// Standalone context owner for driving commands outside a scheduler
#[cfg(test)]
pub(crate) struct TestContext {
    pub cycle: u64,
    pub active: HashSet<CommandId>,
    pub next_id: u64,
    pub faults: FaultLog,
    pub spawned: Vec<(CommandId, Box<dyn Command>)>,
    pub cancelled: Vec<CommandId>,
}

#[cfg(test)]
impl TestContext {
    pub fn new() -> Self {
        Self {
            cycle: 0,
            active: HashSet::new(),
            next_id: 1000,
            faults: FaultLog::new(),
            spawned: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    /// Run `f` with a fresh context and collect what it queued
    pub fn with<T>(&mut self, f: impl FnOnce(&mut CommandContext<'_>) -> T) -> T {
        let mut ctx = CommandContext::new(
            self.cycle,
            Duration::from_millis(20),
            "test",
            &self.active,
            &mut self.next_id,
            &self.faults,
        );
        let out = f(&mut ctx);
        for request in ctx.into_requests() {
            match request {
                Request::Spawn(id, command) => {
                    self.active.insert(id);
                    self.spawned.push((id, command));
                }
                Request::Cancel(id) => {
                    self.active.remove(&id);
                    self.cancelled.push(id);
                }
                Request::Schedule(id) => {
                    self.active.insert(id);
                }
            }
        }
        out
    }
}
