//! # Cadence - cooperative command scheduling
//!
//! Cadence runs robot behaviors as commands on a fixed-period control loop.
//! Commands declare the resources they need; the scheduler arbitrates
//! ownership, drives each command's lifecycle and reacts to triggers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cadence::prelude::*;
//!
//! let mut scheduler = Scheduler::new();
//! let drive = scheduler.add_resource("drive");
//!
//! let creep = commands::run("creep", || { /* set motor output */ }, &[drive]);
//! let id = scheduler.register(creep.with_timeout(50).boxed());
//! scheduler.schedule(id);
//!
//! let mut control = ControlLoop::new(scheduler, SchedulerConfig::standard())?;
//! control.run_cycles(100);
//! # Ok::<(), cadence::CadenceError>(())
//! ```
//!
//! ## Features
//!
//! - **Exclusive resource arbitration** with per-command interruption behavior
//! - **Composable commands**: sequences, parallel groups, races, deadlines, proxies
//! - **Edge-triggered bindings** evaluated inside the cycle
//! - **Fault log** with periodic publication and failure handlers

pub use cadence_core::{self, *};

/// The Cadence prelude - everything needed to write bindings
pub mod prelude {
    // Command model
    pub use cadence_core::commands::{self, CommandExt};
    pub use cadence_core::core::{
        requirements, Command, CommandContext, CommandId, CommandState, InterruptionBehavior,
        Requirements, ResourceId,
    };

    // Scheduling
    pub use cadence_core::scheduling::{
        ControlLoop, ScheduleOutcome, Scheduler, SchedulerConfig, StopHandle,
    };
    pub use cadence_core::trigger::Trigger;

    // Faults and errors
    pub use cadence_core::core::{Fault, FaultLog, Severity};
    pub use cadence_core::error::{CadenceError, CadenceResult};
    pub type Result<T> = CadenceResult<T>;

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
