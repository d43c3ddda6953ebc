//! # CADENCE Core
//!
//! The cooperative command scheduler for the CADENCE robot controller.
//!
//! Once per fixed control cycle the scheduler decides which command owns
//! which resource, advances every active command by one step, and resolves
//! conflicts when two commands claim the same resource. This crate provides:
//!
//! - **Commands**: units of behavior with a declared requirement set and a
//!   `initialize` / `execute` / `is_finished` / `end` lifecycle
//! - **Combinators**: sequential, parallel (all, race, deadline), proxy and
//!   decorators (timeout, until)
//! - **Triggers**: boolean conditions with edge-detected bindings
//! - **Scheduling**: resource arbitration, default commands and the host
//!   control loop
//! - **Faults**: a shared fault log commands and callbacks report into
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadence_core::commands::{run, CommandExt};
//! use cadence_core::{Scheduler, Trigger};
//!
//! let mut scheduler = Scheduler::new();
//! let intake = scheduler.add_resource("intake");
//! let collect = scheduler.register(run("collect", move || roller.spin(0.8), &[intake]).boxed());
//!
//! scheduler.bind(Trigger::new(move || pad.x()).while_true(collect));
//! loop {
//!     scheduler.run();
//! }
//! ```

pub mod commands;
pub mod core;
pub mod error;
pub mod scheduling;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod trigger;

// Re-export commonly used types for easy access
pub use self::core::{
    requirements, Command, CommandContext, CommandId, CommandState, Fault, FaultLog,
    InterruptionBehavior, Requirements, ResourceId, Severity,
};
pub use commands::CommandExt;
pub use error::{CadenceError, CadenceResult};
pub use scheduling::{ControlLoop, ScheduleOutcome, Scheduler, SchedulerConfig};
pub use trigger::Trigger;
