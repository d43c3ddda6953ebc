//! # Scheduling
//!
//! - **Scheduler**: resource arbitration and the per-cycle command step
//! - **ControlLoop**: cooperative driver calling the scheduler once per
//!   period, alongside independent periodic callbacks
//! - **SchedulerConfig**: periods and fault handling, loadable from TOML or
//!   YAML
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadence_core::scheduling::{ControlLoop, Scheduler, SchedulerConfig};
//!
//! let mut scheduler = Scheduler::new();
//! let drive = scheduler.add_resource("drive");
//! let tank = scheduler.register(tank_drive(drive).boxed());
//! scheduler.set_default_command(drive, tank)?;
//!
//! let mut control = ControlLoop::new(scheduler, SchedulerConfig::standard())?;
//! control.run()?; // Stops on Ctrl+C
//! ```
//!
//! ## Cycle order
//!
//! 1. Triggers are polled in registration order
//! 2. Cancel requests are applied
//! 3. Schedule requests are applied, each fully arbitrated before the next
//! 4. Every active command executes once; finished commands end
//! 5. Resources without an owner get their default command

pub mod config;
pub mod control_loop;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use control_loop::{ControlLoop, StopHandle};
pub use scheduler::{
    CommandSnapshot, CommandStats, EventKind, ResourceSnapshot, ScheduleOutcome, Scheduler,
    SchedulerEvent, SchedulerSnapshot,
};
