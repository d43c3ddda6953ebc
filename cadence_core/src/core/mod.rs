pub mod command;
pub mod context;
pub mod fault;
pub mod resource;

pub use command::{Command, CommandId, CommandState, InterruptionBehavior};
pub use context::CommandContext;
pub use fault::{Fault, FaultLog, FaultRecord, Severity};
pub use resource::{requirements, Requirements, ResourceId};

pub(crate) use resource::ResourceEntry;
