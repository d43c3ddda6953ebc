//! # Commands
//!
//! Leaf commands, composition combinators and decorators. Every type here
//! implements [`Command`](crate::core::Command), so composites nest freely.
//!
//! The free functions below are the usual way to build commands in binding
//! code:
//!
//! ```rust,ignore
//! let spin_up = run("spin up", move || shooter.set_rpm(3000.0), &[shooter_id]);
//! let feed = sequence(vec![wait_until(at_speed).boxed(), hopper_forward.boxed()]);
//! let shoot = parallel(vec![spin_up.boxed(), feed.boxed()])?;
//! ```

pub mod basic;
pub mod decorators;
pub mod ext;
pub mod parallel;
pub mod proxy;
pub mod sequential;

pub use basic::{FunctionalCommand, PrintCommand, WaitCommand, WaitUntilCommand};
pub use decorators::{Named, Timeout, Until, WithBehavior};
pub use ext::CommandExt;
pub use parallel::{ParallelGroup, ParallelPolicy};
pub use proxy::ProxyCommand;
pub use sequential::SequentialGroup;

use crate::core::{Command, InterruptionBehavior, ResourceId};
use crate::error::CadenceResult;
use std::time::Duration;

/// Does nothing and finishes immediately
pub fn none() -> FunctionalCommand {
    FunctionalCommand::new("None").finished_when(|| true)
}

/// Runs `action` once on initialize and finishes
pub fn run_once(
    name: &str,
    action: impl FnMut() + Send + 'static,
    requirements: &[ResourceId],
) -> FunctionalCommand {
    FunctionalCommand::new(name)
        .requiring(requirements)
        .on_initialize(action)
        .finished_when(|| true)
}

/// Runs `action` every cycle until cancelled
pub fn run(
    name: &str,
    action: impl FnMut() + Send + 'static,
    requirements: &[ResourceId],
) -> FunctionalCommand {
    FunctionalCommand::new(name)
        .requiring(requirements)
        .on_execute(action)
}

/// Runs `start` on initialize and `stop` on end, whatever the reason
pub fn start_end(
    name: &str,
    start: impl FnMut() + Send + 'static,
    mut stop: impl FnMut() + Send + 'static,
    requirements: &[ResourceId],
) -> FunctionalCommand {
    FunctionalCommand::new(name)
        .requiring(requirements)
        .on_initialize(start)
        .on_end(move |_| stop())
}

pub fn wait_cycles(cycles: u64) -> WaitCommand {
    WaitCommand::cycles(cycles)
}

pub fn wait_for(duration: Duration) -> WaitCommand {
    WaitCommand::duration(duration)
}

pub fn wait_until(condition: impl FnMut() -> bool + Send + 'static) -> WaitUntilCommand {
    WaitUntilCommand::new(condition)
}

pub fn print(message: impl Into<String>) -> PrintCommand {
    PrintCommand::new(message)
}

pub fn sequence(children: Vec<Box<dyn Command>>) -> SequentialGroup {
    SequentialGroup::new(children)
}

/// Parallel group that finishes when every child has finished
pub fn parallel(children: Vec<Box<dyn Command>>) -> CadenceResult<ParallelGroup> {
    ParallelGroup::all(children)
}

/// Parallel group that finishes when any child finishes
pub fn race(children: Vec<Box<dyn Command>>) -> CadenceResult<ParallelGroup> {
    ParallelGroup::race(children)
}

pub fn deadline(
    deadline: Box<dyn Command>,
    others: Vec<Box<dyn Command>>,
) -> CadenceResult<ParallelGroup> {
    ParallelGroup::deadline(deadline, others)
}

pub fn proxy(factory: impl FnMut() -> Box<dyn Command> + Send + 'static) -> ProxyCommand {
    ProxyCommand::new(factory)
}

/// A composite refuses interruption if any child does
pub(crate) fn combined_behavior(children: &[Box<dyn Command>]) -> InterruptionBehavior {
    if children
        .iter()
        .any(|c| c.interruption_behavior() == InterruptionBehavior::CancelIncoming)
    {
        InterruptionBehavior::CancelIncoming
    } else {
        InterruptionBehavior::CancelSelf
    }
}
