//! # Triggers
//!
//! A [`Trigger`] turns a boolean condition sampled once per cycle into
//! schedule and cancel requests for registered commands.
//!
//! ```rust,ignore
//! let button = Trigger::new(move || pad.a())
//!     .while_true(shoot)
//!     .on_false(stow);
//! scheduler.bind(button);
//! ```

pub mod edge;

pub use edge::{Edge, EdgeDetector};

use crate::core::CommandId;

/// Boolean condition sampled once per cycle
pub type Condition = Box<dyn FnMut() -> bool + Send>;

/// How a binding reacts to the trigger's condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Schedule on the rising edge
    OnTrue,
    /// Schedule on the falling edge
    OnFalse,
    /// Schedule while the condition holds, cancel once it stops holding
    WhileTrue,
    /// Schedule while the condition is false, cancel once it holds
    WhileFalse,
    /// On the rising edge, cancel the command if active, otherwise schedule it
    ToggleOnTrue,
}

#[derive(Debug, Clone)]
struct Binding {
    kind: BindingKind,
    command: CommandId,
    engaged: bool,
}

/// Request produced while polling triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TriggerAction {
    Schedule(CommandId),
    /// Schedule on behalf of a `while_*` binding, which stays engaged only
    /// if the request takes effect
    Engage { command: CommandId, binding: usize },
    Cancel(CommandId),
    Toggle(CommandId),
}

/// Per-cycle boolean evaluator with edge-sensitive bindings
pub struct Trigger {
    name: String,
    condition: Condition,
    detector: EdgeDetector,
    bindings: Vec<Binding>,
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("previous", &self.detector.previous())
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl Trigger {
    pub fn new(condition: impl FnMut() -> bool + Send + 'static) -> Self {
        Self {
            name: "trigger".to_string(),
            condition: Box::new(condition),
            detector: EdgeDetector::new(),
            bindings: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn bind(mut self, kind: BindingKind, command: CommandId) -> Self {
        self.bindings.push(Binding {
            kind,
            command,
            engaged: false,
        });
        self
    }

    pub fn on_true(self, command: CommandId) -> Self {
        self.bind(BindingKind::OnTrue, command)
    }

    pub fn on_false(self, command: CommandId) -> Self {
        self.bind(BindingKind::OnFalse, command)
    }

    pub fn while_true(self, command: CommandId) -> Self {
        self.bind(BindingKind::WhileTrue, command)
    }

    pub fn while_false(self, command: CommandId) -> Self {
        self.bind(BindingKind::WhileFalse, command)
    }

    pub fn toggle_on_true(self, command: CommandId) -> Self {
        self.bind(BindingKind::ToggleOnTrue, command)
    }

    /// Holds only while both this condition and `other` hold
    pub fn and(mut self, mut other: impl FnMut() -> bool + Send + 'static) -> Self {
        let mut condition = std::mem::replace(&mut self.condition, Box::new(|| false));
        self.condition = Box::new(move || condition() && other());
        self
    }

    /// Holds while either condition holds
    pub fn or(mut self, mut other: impl FnMut() -> bool + Send + 'static) -> Self {
        let mut condition = std::mem::replace(&mut self.condition, Box::new(|| false));
        self.condition = Box::new(move || condition() || other());
        self
    }

    pub fn negate(mut self) -> Self {
        let mut condition = std::mem::replace(&mut self.condition, Box::new(|| false));
        self.condition = Box::new(move || !condition());
        self
    }

    /// Only let a change of the condition through once it has been stable
    /// for `cycles` consecutive samples.
    pub fn debounce(mut self, cycles: u32) -> Self {
        let mut condition = std::mem::replace(&mut self.condition, Box::new(|| false));
        let mut settled: Option<bool> = None;
        let mut streak = 0u32;
        self.condition = Box::new(move || {
            let raw = condition();
            match settled {
                None => {
                    settled = Some(raw);
                    raw
                }
                Some(value) if value == raw => {
                    streak = 0;
                    value
                }
                Some(value) => {
                    streak += 1;
                    if streak >= cycles {
                        streak = 0;
                        settled = Some(raw);
                        raw
                    } else {
                        value
                    }
                }
            }
        });
        self
    }

    /// Sample the condition and append the resulting requests, in binding
    /// order.
    pub(crate) fn poll(&mut self, actions: &mut Vec<TriggerAction>) {
        let now = (self.condition)();
        let edge = self.detector.evaluate(now);

        for (index, binding) in self.bindings.iter_mut().enumerate() {
            match binding.kind {
                BindingKind::OnTrue => {
                    if edge == Some(Edge::Rising) {
                        actions.push(TriggerAction::Schedule(binding.command));
                    }
                }
                BindingKind::OnFalse => {
                    if edge == Some(Edge::Falling) {
                        actions.push(TriggerAction::Schedule(binding.command));
                    }
                }
                BindingKind::WhileTrue | BindingKind::WhileFalse => {
                    let holds = if binding.kind == BindingKind::WhileTrue {
                        now
                    } else {
                        !now
                    };
                    if holds && !binding.engaged {
                        binding.engaged = true;
                        actions.push(TriggerAction::Engage {
                            command: binding.command,
                            binding: index,
                        });
                    } else if !holds && binding.engaged {
                        binding.engaged = false;
                        actions.push(TriggerAction::Cancel(binding.command));
                    }
                }
                BindingKind::ToggleOnTrue => {
                    if edge == Some(Edge::Rising) {
                        actions.push(TriggerAction::Toggle(binding.command));
                    }
                }
            }
        }
    }

    /// Forget that a `while_*` binding scheduled its command. It asks
    /// again on the next poll if the condition still holds, and never
    /// cancels a command it did not schedule.
    pub(crate) fn disengage(&mut self, binding: usize) {
        if let Some(binding) = self.bindings.get_mut(binding) {
            binding.engaged = false;
        }
    }

    /// Sample the condition without acting on it. Used while the scheduler
    /// is disabled so edges are not replayed when it comes back.
    pub(crate) fn sample(&mut self) {
        let now = (self.condition)();
        self.detector.evaluate(now);
        for binding in self.bindings.iter_mut() {
            binding.engaged = false;
        }
    }

    pub(crate) fn commands(&self) -> impl Iterator<Item = CommandId> + '_ {
        self.bindings.iter().map(|b| b.command)
    }
}
