use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of an exclusively ownable resource (drive train, shooter, ...).
///
/// Handles are issued by [`Scheduler::add_resource`](crate::Scheduler::add_resource)
/// and compared by identity, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Set of resources a command needs. Ordered so conflict checks and
/// telemetry are reproducible between runs.
pub type Requirements = BTreeSet<ResourceId>;

/// Build a requirement set from a slice of handles
pub fn requirements(ids: &[ResourceId]) -> Requirements {
    ids.iter().copied().collect()
}

/// Registry entry kept by the scheduler for every resource
#[derive(Debug, Clone)]
pub(crate) struct ResourceEntry {
    pub name: String,
    pub default_command: Option<super::CommandId>,
}
