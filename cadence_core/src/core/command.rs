use super::context::CommandContext;
use super::resource::Requirements;
use crate::error::CadenceResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a command held in a scheduler's registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandId(pub(crate) u64);

impl CommandId {
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command#{}", self.0)
    }
}

/// Lifecycle state of a registered command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandState {
    /// Not scheduled
    Idle,
    /// Won arbitration and owns its requirements
    Initialized,
    /// `end` is running; resources are released once it returns
    Ending,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandState::Idle => write!(f, "Idle"),
            CommandState::Initialized => write!(f, "Initialized"),
            CommandState::Ending => write!(f, "Ending"),
        }
    }
}

/// Which side loses when a new request overlaps a resource this command owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterruptionBehavior {
    /// The current owner is cancelled and the new request proceeds
    #[default]
    CancelSelf,
    /// The new request is rejected and the current owner keeps running
    CancelIncoming,
}

/// A unit of schedulable behavior.
///
/// The scheduler drives every command through the same lifecycle:
/// `initialize` once when it wins arbitration, then `execute` followed by
/// `is_finished` once per cycle, then `end` exactly once. `execute` must
/// never block; waiting is expressed by returning `false` from
/// `is_finished` across cycles.
pub trait Command: Send {
    /// Human readable name used in logs and telemetry
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.split('<').next().unwrap_or(full).rsplit("::").next().unwrap_or(full)
    }

    /// Resources this command needs exclusively.
    ///
    /// Read once when the command is registered or composed; it must not
    /// change for the command's lifetime.
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        InterruptionBehavior::CancelSelf
    }

    /// Called once when the command becomes active
    fn initialize(&mut self, _ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        Ok(())
    }

    /// Called once per cycle while active
    fn execute(&mut self, _ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        Ok(())
    }

    /// Checked every cycle right after `execute`
    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        false
    }

    /// Called exactly once when the command stops, either because it
    /// finished (`interrupted == false`) or because it was cancelled or lost
    /// a resource (`interrupted == true`).
    fn end(&mut self, _interrupted: bool, _ctx: &mut CommandContext<'_>) {}
}

impl Command for Box<dyn Command> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn requirements(&self) -> Requirements {
        (**self).requirements()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        (**self).interruption_behavior()
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        (**self).initialize(ctx)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        (**self).execute(ctx)
    }

    fn is_finished(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        (**self).is_finished(ctx)
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        (**self).end(interrupted, ctx)
    }
}
