use super::config::SchedulerConfig;
use crate::core::context::Request;
use crate::core::{
    Command, CommandContext, CommandId, CommandState, Fault, FaultLog, InterruptionBehavior,
    Requirements, ResourceEntry, ResourceId,
};
use crate::error::{CadenceError, CadenceResult};
use crate::trigger::{Trigger, TriggerAction};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// Per-command lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStats {
    pub initialized: u64,
    pub executed: u64,
    pub finished: u64,
    pub interrupted: u64,
    pub faults: u64,
}

/// Registry entry with lifecycle tracking
struct RegisteredCommand {
    // Taken out while one of its lifecycle calls is running
    command: Option<Box<dyn Command>>,
    name: String,
    requirements: Requirements,
    behavior: InterruptionBehavior,
    state: CommandState,
    one_shot: bool,
    stats: CommandStats,
}

/// Result of a schedule request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Won arbitration and was initialized
    Scheduled,
    /// Was already active; nothing changed
    AlreadyActive,
    /// Lost arbitration to an owner that cancels incoming requests
    Rejected { by: CommandId },
    /// Unknown command, or the scheduler is disabled
    Dropped,
    /// `initialize` failed; the command was ended and its resources released
    Faulted,
}

impl ScheduleOutcome {
    /// Whether the command is active after the request
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scheduled | Self::AlreadyActive)
    }
}

/// Lifecycle transition reported to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Initialized,
    Executed,
    Finished,
    Interrupted,
    Rejected { by: CommandId },
    Faulted { message: String },
}

#[derive(Debug, Clone)]
pub struct SchedulerEvent<'a> {
    pub id: CommandId,
    pub name: &'a str,
    pub kind: EventKind,
}

type Listener = Box<dyn FnMut(&SchedulerEvent<'_>) + Send>;

/// Serializable view of the scheduler for telemetry sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub name: String,
    pub cycle: u64,
    pub enabled: bool,
    pub taken_at: DateTime<Local>,
    pub resources: Vec<ResourceSnapshot>,
    pub commands: Vec<CommandSnapshot>,
    pub active: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,
    pub name: String,
    pub owner: Option<String>,
    pub default_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSnapshot {
    pub id: CommandId,
    pub name: String,
    pub state: CommandState,
    pub stats: CommandStats,
}

impl SchedulerSnapshot {
    pub fn to_json(&self) -> CadenceResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Arbitrates resource ownership between commands and drives their
/// lifecycle, one pass per call to [`run`](Self::run).
///
/// Construct one per process (or per test) and hand it to the control loop
/// and to binding code by reference.
pub struct Scheduler {
    commands: BTreeMap<CommandId, RegisteredCommand>,
    resources: BTreeMap<ResourceId, ResourceEntry>,
    owners: HashMap<ResourceId, CommandId>,
    // Scheduling order, plus a set for membership checks
    active: Vec<CommandId>,
    active_set: HashSet<CommandId>,
    triggers: Vec<Trigger>,
    listeners: Vec<Listener>,
    fault_log: FaultLog,
    config: SchedulerConfig,
    scheduler_name: String,
    cycle: u64,
    next_command_id: u64,
    next_resource_id: u32,
    enabled: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        let config = SchedulerConfig::standard();
        Self {
            commands: BTreeMap::new(),
            resources: BTreeMap::new(),
            owners: HashMap::new(),
            active: Vec::new(),
            active_set: HashSet::new(),
            triggers: Vec::new(),
            listeners: Vec::new(),
            fault_log: FaultLog::new(),
            scheduler_name: config.name.clone(),
            config,
            cycle: 0,
            next_command_id: 1,
            next_resource_id: 1,
            enabled: true,
        }
    }

    /// Apply a configuration (builder pattern)
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.set_config(config);
        self
    }

    /// Pre-allocate command capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.active.reserve(capacity);
        self.active_set.reserve(capacity);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.scheduler_name = name.to_string();
        self
    }

    /// Share an existing fault registry instead of a private one
    pub fn with_fault_log(mut self, fault_log: FaultLog) -> Self {
        self.fault_log = fault_log;
        self
    }

    pub fn set_config(&mut self, config: SchedulerConfig) -> &mut Self {
        self.scheduler_name = config.name.clone();
        self.config = config;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.scheduler_name
    }

    pub fn period(&self) -> Duration {
        self.config.period()
    }

    pub fn fault_log(&self) -> &FaultLog {
        &self.fault_log
    }

    /// Number of passes completed so far
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register an exclusively ownable resource
    pub fn add_resource(&mut self, name: &str) -> ResourceId {
        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        self.resources.insert(
            id,
            ResourceEntry {
                name: name.to_string(),
                default_command: None,
            },
        );
        tracing::debug!(resource = %id, name, "registered resource");
        id
    }

    pub fn resource_name(&self, resource: ResourceId) -> Option<&str> {
        self.resources.get(&resource).map(|r| r.name.as_str())
    }

    /// Hand a command to the registry. It stays registered and can be
    /// scheduled any number of times.
    pub fn register(&mut self, command: Box<dyn Command>) -> CommandId {
        let id = CommandId(self.next_command_id);
        self.next_command_id += 1;
        self.insert(id, command, false);
        id
    }

    /// Register a one-shot command and schedule it. It is dropped from the
    /// registry once it ends or if it never starts.
    pub fn spawn(&mut self, command: Box<dyn Command>) -> (CommandId, ScheduleOutcome) {
        let id = CommandId(self.next_command_id);
        self.next_command_id += 1;
        self.insert(id, command, true);
        let outcome = self.schedule_one_shot(id);
        (id, outcome)
    }

    fn insert(&mut self, id: CommandId, command: Box<dyn Command>, one_shot: bool) {
        let requirements = command.requirements();
        for resource in &requirements {
            if !self.resources.contains_key(resource) {
                tracing::warn!(
                    command = command.name(),
                    %resource,
                    "command requires a resource this scheduler does not know"
                );
            }
        }

        self.commands.insert(
            id,
            RegisteredCommand {
                name: command.name().to_string(),
                requirements,
                behavior: command.interruption_behavior(),
                state: CommandState::Idle,
                one_shot,
                stats: CommandStats::default(),
                command: Some(command),
            },
        );
    }

    fn schedule_one_shot(&mut self, id: CommandId) -> ScheduleOutcome {
        let outcome = self.schedule(id);
        if self.state_of(id) == Some(CommandState::Idle) {
            self.commands.remove(&id);
        }
        outcome
    }

    /// Make `command` the default for `resource`: it is scheduled whenever
    /// the resource has no owner.
    pub fn set_default_command(
        &mut self,
        resource: ResourceId,
        command: CommandId,
    ) -> CadenceResult<()> {
        if !self.resources.contains_key(&resource) {
            return Err(CadenceError::UnknownResource(resource));
        }
        let entry = self
            .commands
            .get(&command)
            .ok_or(CadenceError::UnknownCommand(command))?;
        if entry.one_shot {
            return Err(CadenceError::config(format!(
                "one-shot command '{}' cannot be a default command",
                entry.name
            )));
        }
        if !entry.requirements.contains(&resource) {
            return Err(CadenceError::NotRequired {
                command: entry.name.clone(),
                resource,
            });
        }
        if entry.behavior == InterruptionBehavior::CancelIncoming {
            tracing::warn!(
                command = %entry.name,
                "default command cancels incoming requests and will block its resource"
            );
        }

        let previous = self
            .resources
            .get_mut(&resource)
            .and_then(|r| r.default_command.replace(command));
        if let Some(previous) = previous.filter(|p| *p != command) {
            self.cancel(previous);
        }
        Ok(())
    }

    pub fn remove_default_command(&mut self, resource: ResourceId) -> Option<CommandId> {
        self.resources
            .get_mut(&resource)
            .and_then(|r| r.default_command.take())
    }

    pub fn default_command(&self, resource: ResourceId) -> Option<CommandId> {
        self.resources.get(&resource).and_then(|r| r.default_command)
    }

    /// Register a trigger. Triggers are evaluated in registration order.
    pub fn bind(&mut self, trigger: Trigger) -> &mut Self {
        for id in trigger.commands() {
            if !self.commands.contains_key(&id) {
                tracing::warn!(trigger = trigger.name(), command = %id, "trigger bound to unknown command");
            }
        }
        self.triggers.push(trigger);
        self
    }

    /// Observe lifecycle transitions
    pub fn on_event(&mut self, listener: impl FnMut(&SchedulerEvent<'_>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ------------------------------------------------------------------
    // Arbitration
    // ------------------------------------------------------------------

    /// Request that a registered command become active.
    ///
    /// Conflicting owners are cancelled unless any of them cancels incoming
    /// requests, in which case the request is rejected without side effects.
    pub fn schedule(&mut self, id: CommandId) -> ScheduleOutcome {
        let Some(entry) = self.commands.get(&id) else {
            self.fault_log.report(Fault::warning(
                self.scheduler_name.clone(),
                format!("schedule request for unknown {}", id),
            ));
            return ScheduleOutcome::Dropped;
        };
        if !self.enabled {
            tracing::debug!(command = %entry.name, "scheduler disabled, request dropped");
            return ScheduleOutcome::Dropped;
        }
        if entry.state != CommandState::Idle {
            return ScheduleOutcome::AlreadyActive;
        }

        let mut conflicts: Vec<CommandId> = Vec::new();
        for resource in &entry.requirements {
            if let Some(owner) = self.owners.get(resource) {
                if !conflicts.contains(owner) {
                    conflicts.push(*owner);
                }
            }
        }

        let blocker = conflicts.iter().copied().find(|owner| {
            self.commands
                .get(owner)
                .is_some_and(|e| e.behavior == InterruptionBehavior::CancelIncoming)
        });
        if let Some(by) = blocker {
            return self.reject(id, by);
        }

        for owner in conflicts {
            self.end_command(owner, true);
        }

        // Ending an owner may have queued requests that changed ownership
        let Some(entry) = self.commands.get(&id) else {
            return ScheduleOutcome::Dropped;
        };
        if entry.state != CommandState::Idle {
            return ScheduleOutcome::AlreadyActive;
        }
        let requirements = entry.requirements.clone();
        let still_owned = requirements
            .iter()
            .find_map(|r| self.owners.get(r).copied());
        if let Some(by) = still_owned {
            return self.reject(id, by);
        }

        for resource in requirements {
            self.owners.insert(resource, id);
        }
        if let Some(entry) = self.commands.get_mut(&id) {
            entry.state = CommandState::Initialized;
            entry.stats.initialized += 1;
        }
        self.active.push(id);
        self.active_set.insert(id);

        let (result, requests) = self.invoke(id, |command, ctx| command.initialize(ctx));
        match result.and_then(|r| r.map_err(|e| e.to_string())) {
            Ok(()) => {
                tracing::debug!(command = %id, cycle = self.cycle, "initialized");
                self.emit(id, EventKind::Initialized);
                self.apply_requests(requests);
                ScheduleOutcome::Scheduled
            }
            Err(message) => {
                self.report_command_fault(id, "initialize", message);
                self.apply_requests(requests);
                self.end_command(id, true);
                ScheduleOutcome::Faulted
            }
        }
    }

    fn reject(&mut self, id: CommandId, by: CommandId) -> ScheduleOutcome {
        tracing::debug!(command = %id, owner = %by, "schedule request rejected");
        self.emit(id, EventKind::Rejected { by });
        ScheduleOutcome::Rejected { by }
    }

    /// End an active command with `interrupted == true`. No-op otherwise.
    pub fn cancel(&mut self, id: CommandId) {
        self.end_command(id, true);
    }

    pub fn cancel_all(&mut self) {
        for id in self.active.clone() {
            self.cancel(id);
        }
    }

    fn end_command(&mut self, id: CommandId, interrupted: bool) {
        let Some(entry) = self.commands.get_mut(&id) else {
            return;
        };
        if entry.state != CommandState::Initialized {
            return;
        }
        entry.state = CommandState::Ending;
        self.active.retain(|c| *c != id);
        self.active_set.remove(&id);

        let (result, requests) = self.invoke(id, |command, ctx| command.end(interrupted, ctx));
        if let Err(message) = result {
            self.report_command_fault(id, "end", message);
        }

        self.owners.retain(|_, owner| *owner != id);
        let mut one_shot = false;
        if let Some(entry) = self.commands.get_mut(&id) {
            entry.state = CommandState::Idle;
            one_shot = entry.one_shot;
            if interrupted {
                entry.stats.interrupted += 1;
            } else {
                entry.stats.finished += 1;
            }
        }

        tracing::debug!(command = %id, interrupted, cycle = self.cycle, "ended");
        self.emit(
            id,
            if interrupted {
                EventKind::Interrupted
            } else {
                EventKind::Finished
            },
        );
        if one_shot {
            self.commands.remove(&id);
        }
        self.apply_requests(requests);
    }

    /// Run one lifecycle call with the command taken out of its slot.
    ///
    /// Panics are caught when `catch_panics` is set and returned as the
    /// error message. Requests queued through the context are returned for
    /// the caller to apply at the right point.
    fn invoke<T>(
        &mut self,
        id: CommandId,
        call: impl FnOnce(&mut dyn Command, &mut CommandContext<'_>) -> T,
    ) -> (Result<T, String>, Vec<Request>) {
        let Some(entry) = self.commands.get_mut(&id) else {
            return (Err(format!("{} is not registered", id)), Vec::new());
        };
        let Some(mut command) = entry.command.take() else {
            return (
                Err(format!("{} is already inside a lifecycle call", id)),
                Vec::new(),
            );
        };
        let source = entry.name.clone();

        let mut ctx = CommandContext::new(
            self.cycle,
            self.config.period(),
            &source,
            &self.active_set,
            &mut self.next_command_id,
            &self.fault_log,
        );
        let result = if self.config.catch_panics {
            catch_unwind(AssertUnwindSafe(|| call(command.as_mut(), &mut ctx)))
                .map_err(|panic| format!("panicked: {}", panic_message(panic.as_ref())))
        } else {
            Ok(call(command.as_mut(), &mut ctx))
        };
        let requests = ctx.into_requests();

        if let Some(entry) = self.commands.get_mut(&id) {
            entry.command = Some(command);
        }
        (result, requests)
    }

    fn apply_requests(&mut self, requests: Vec<Request>) {
        for request in requests {
            match request {
                Request::Schedule(id) => {
                    self.schedule(id);
                }
                Request::Cancel(id) => self.cancel(id),
                Request::Spawn(id, command) => {
                    self.insert(id, command, true);
                    self.schedule_one_shot(id);
                }
            }
        }
    }

    fn report_command_fault(&mut self, id: CommandId, phase: &str, message: String) {
        let name = match self.commands.get_mut(&id) {
            Some(entry) => {
                entry.stats.faults += 1;
                entry.name.clone()
            }
            None => id.to_string(),
        };
        self.fault_log
            .report(Fault::error(name, format!("{} failed: {}", phase, message)));
        self.emit(id, EventKind::Faulted { message });
    }

    fn emit(&mut self, id: CommandId, kind: EventKind) {
        if self.listeners.is_empty() {
            return;
        }
        let name = self
            .commands
            .get(&id)
            .map(|e| e.name.as_str())
            .unwrap_or("unknown");
        let event = SchedulerEvent { id, name, kind };
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    // ------------------------------------------------------------------
    // Per-cycle step
    // ------------------------------------------------------------------

    /// One scheduler pass:
    ///
    /// 1. poll every trigger in registration order
    /// 2. apply the cancel requests they produced
    /// 3. apply schedule and toggle requests in order
    /// 4. execute every active command, ending those that finish
    /// 5. schedule default commands of resources left without an owner
    pub fn run(&mut self) {
        if !self.enabled {
            for trigger in self.triggers.iter_mut() {
                trigger.sample();
            }
            self.cancel_all();
            self.cycle += 1;
            return;
        }

        let mut actions: Vec<(usize, TriggerAction)> = Vec::new();
        let mut polled = Vec::new();
        for (index, trigger) in self.triggers.iter_mut().enumerate() {
            trigger.poll(&mut polled);
            actions.extend(polled.drain(..).map(|action| (index, action)));
        }

        for (_, action) in &actions {
            if let TriggerAction::Cancel(id) = action {
                self.cancel(*id);
            }
        }
        for (index, action) in actions {
            match action {
                TriggerAction::Schedule(id) => {
                    self.schedule(id);
                }
                TriggerAction::Engage { command, binding } => {
                    let outcome = self.schedule(command);
                    // Lost arbitration, or someone else already runs it
                    if matches!(
                        outcome,
                        ScheduleOutcome::Rejected { .. } | ScheduleOutcome::AlreadyActive
                    ) {
                        if let Some(trigger) = self.triggers.get_mut(index) {
                            trigger.disengage(binding);
                        }
                    }
                }
                TriggerAction::Toggle(id) => {
                    if self.is_scheduled(id) {
                        self.cancel(id);
                    } else {
                        self.schedule(id);
                    }
                }
                TriggerAction::Cancel(_) => {}
            }
        }

        for id in self.active.clone() {
            // Ended earlier in this pass
            if !self.active_set.contains(&id) {
                continue;
            }
            self.execute_command(id);
        }

        let defaults: Vec<(ResourceId, CommandId)> = self
            .resources
            .iter()
            .filter_map(|(rid, r)| r.default_command.map(|d| (*rid, d)))
            .collect();
        for (resource, default) in defaults {
            if self.owners.contains_key(&resource) || self.is_scheduled(default) {
                continue;
            }
            self.schedule(default);
        }

        self.cycle += 1;
    }

    fn execute_command(&mut self, id: CommandId) {
        let (result, requests) = self.invoke(id, |command, ctx| -> CadenceResult<bool> {
            command.execute(ctx)?;
            Ok(command.is_finished(ctx))
        });

        match result.and_then(|r| r.map_err(|e| e.to_string())) {
            Ok(finished) => {
                if let Some(entry) = self.commands.get_mut(&id) {
                    entry.stats.executed += 1;
                }
                self.emit(id, EventKind::Executed);
                self.apply_requests(requests);
                if finished {
                    self.end_command(id, false);
                }
            }
            Err(message) => {
                self.report_command_fault(id, "execute", message);
                self.apply_requests(requests);
                self.end_command(id, true);
            }
        }
    }

    // ------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------

    /// Cancel everything and stop accepting requests. Triggers keep being
    /// sampled so edges seen while disabled are not replayed later.
    pub fn disable(&mut self) {
        if self.enabled {
            tracing::info!(scheduler = %self.scheduler_name, "disabled");
        }
        // Requests queued by end hooks are dropped from here on
        self.enabled = false;
        self.cancel_all();
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            tracing::info!(scheduler = %self.scheduler_name, "enabled");
        }
        self.enabled = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.enable();
        } else {
            self.disable();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_scheduled(&self, id: CommandId) -> bool {
        self.active_set.contains(&id)
    }

    pub fn owner_of(&self, resource: ResourceId) -> Option<CommandId> {
        self.owners.get(&resource).copied()
    }

    /// `None` for unknown commands, including one-shots that have ended
    pub fn state_of(&self, id: CommandId) -> Option<CommandState> {
        self.commands.get(&id).map(|e| e.state)
    }

    /// Active commands in the order they were scheduled
    pub fn active_commands(&self) -> Vec<CommandId> {
        self.active.clone()
    }

    pub fn command_name(&self, id: CommandId) -> Option<&str> {
        self.commands.get(&id).map(|e| e.name.as_str())
    }

    pub fn stats(&self, id: CommandId) -> Option<CommandStats> {
        self.commands.get(&id).map(|e| e.stats)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let name_of = |id: CommandId| {
            self.commands
                .get(&id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        SchedulerSnapshot {
            name: self.scheduler_name.clone(),
            cycle: self.cycle,
            enabled: self.enabled,
            taken_at: Local::now(),
            resources: self
                .resources
                .iter()
                .map(|(id, r)| ResourceSnapshot {
                    id: *id,
                    name: r.name.clone(),
                    owner: self.owner_of(*id).map(name_of),
                    default_command: r.default_command.map(name_of),
                })
                .collect(),
            commands: self
                .commands
                .iter()
                .map(|(id, e)| CommandSnapshot {
                    id: *id,
                    name: e.name.clone(),
                    state: e.state,
                    stats: e.stats,
                })
                .collect(),
            active: self.active.iter().map(|id| name_of(*id)).collect(),
        }
    }
}

pub(super) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Probe, ProbeLog};

    fn scheduler() -> Scheduler {
        Scheduler::new().with_config(SchedulerConfig::deterministic())
    }

    #[test]
    fn test_schedule_is_idempotent() {
        let log = ProbeLog::new();
        let mut scheduler = scheduler();
        let id = scheduler.register(Box::new(Probe::new("a", &log)));

        assert_eq!(scheduler.schedule(id), ScheduleOutcome::Scheduled);
        assert_eq!(scheduler.schedule(id), ScheduleOutcome::AlreadyActive);
        assert_eq!(log.count("a:init"), 1);
        assert_eq!(scheduler.state_of(id), Some(CommandState::Initialized));
    }

    #[test]
    fn test_unknown_command_is_dropped_with_fault() {
        let mut scheduler = scheduler();
        assert_eq!(scheduler.schedule(CommandId(42)), ScheduleOutcome::Dropped);
        assert_eq!(scheduler.fault_log().total().len(), 1);
    }

    #[test]
    fn test_cancel_is_noop_when_idle() {
        let log = ProbeLog::new();
        let mut scheduler = scheduler();
        let id = scheduler.register(Box::new(Probe::new("a", &log)));
        scheduler.cancel(id);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_spawned_command_leaves_registry_after_end() {
        let log = ProbeLog::new();
        let mut scheduler = scheduler();
        let (id, outcome) = scheduler.spawn(Box::new(Probe::new("once", &log).finish_after(1)));
        assert_eq!(outcome, ScheduleOutcome::Scheduled);

        scheduler.run();
        assert_eq!(scheduler.state_of(id), None);
        assert_eq!(log.take(), vec!["once:init", "once:execute", "once:end(false)"]);
    }

    #[test]
    fn test_default_command_validation() {
        let log = ProbeLog::new();
        let mut scheduler = scheduler();
        let drive = scheduler.add_resource("drive");
        let arm = scheduler.add_resource("arm");
        let id = scheduler.register(Box::new(Probe::new("drive", &log).requiring(&[drive])));

        assert!(matches!(
            scheduler.set_default_command(arm, id),
            Err(CadenceError::NotRequired { .. })
        ));
        assert!(matches!(
            scheduler.set_default_command(drive, CommandId(99)),
            Err(CadenceError::UnknownCommand(_))
        ));
        assert!(scheduler.set_default_command(drive, id).is_ok());
        assert_eq!(scheduler.default_command(drive), Some(id));
        assert_eq!(scheduler.remove_default_command(drive), Some(id));
    }

    #[test]
    fn test_listener_sees_lifecycle() {
        let log = ProbeLog::new();
        let events = ProbeLog::new();
        let sink = events.clone();
        let mut scheduler = scheduler();
        scheduler.on_event(move |event| sink.push(format!("{}:{:?}", event.name, event.kind)));

        let id = scheduler.register(Box::new(Probe::new("a", &log).finish_after(1)));
        scheduler.schedule(id);
        scheduler.run();

        assert_eq!(
            events.take(),
            vec!["a:Initialized", "a:Executed", "a:Finished"]
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let log = ProbeLog::new();
        let mut scheduler = scheduler().with_name("bot");
        let drive = scheduler.add_resource("drive");
        let id = scheduler.register(Box::new(Probe::new("tank", &log).requiring(&[drive])));
        scheduler.schedule(id);

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.name, "bot");
        assert_eq!(snapshot.resources[0].owner.as_deref(), Some("tank"));
        assert_eq!(snapshot.active, vec!["tank".to_string()]);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"tank\""));
    }
}
