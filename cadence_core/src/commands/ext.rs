use super::decorators::{Named, Timeout, Until, WithBehavior};
use super::parallel::ParallelGroup;
use super::sequential::SequentialGroup;
use crate::core::{Command, InterruptionBehavior};
use crate::error::CadenceResult;

/// Fluent composition for any command.
///
/// ```rust,ignore
/// let score = drive_to_goal()
///     .with_timeout(150)
///     .and_then(shoot())
///     .race_with(wait_cycles(500))?
///     .named("score");
/// ```
pub trait CommandExt: Command + Sized + 'static {
    fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }

    /// Run `next` once this command finishes
    fn and_then(self, next: impl Command + 'static) -> SequentialGroup {
        SequentialGroup::new(vec![self.boxed(), Box::new(next)])
    }

    /// Run alongside `other` until both finish
    fn along_with(self, other: impl Command + 'static) -> CadenceResult<ParallelGroup> {
        ParallelGroup::all(vec![self.boxed(), Box::new(other)])
    }

    /// Run alongside `other` until either finishes
    fn race_with(self, other: impl Command + 'static) -> CadenceResult<ParallelGroup> {
        ParallelGroup::race(vec![self.boxed(), Box::new(other)])
    }

    /// Run alongside `other`, stopping `other` when this command finishes
    fn deadline_with(self, other: impl Command + 'static) -> CadenceResult<ParallelGroup> {
        ParallelGroup::deadline(self.boxed(), vec![Box::new(other)])
    }

    fn with_timeout(self, cycles: u64) -> Timeout {
        Timeout::cycles(self.boxed(), cycles)
    }

    fn until(self, condition: impl FnMut() -> bool + Send + 'static) -> Until {
        Until::new(self.boxed(), condition)
    }

    fn named(self, name: &str) -> Named {
        Named::new(self.boxed(), name)
    }

    fn with_interruption_behavior(self, behavior: InterruptionBehavior) -> WithBehavior {
        WithBehavior::new(self.boxed(), behavior)
    }
}

impl<T: Command + 'static> CommandExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceId;
    use crate::testing::{Probe, ProbeLog};

    #[test]
    fn test_chained_composition() {
        let log = ProbeLog::new();
        let a = Probe::new("a", &log).requiring(&[ResourceId(1)]);
        let b = Probe::new("b", &log).requiring(&[ResourceId(2)]);
        let c = Probe::new("c", &log).with_behavior(InterruptionBehavior::CancelIncoming);

        let combined = a.and_then(b).race_with(c).unwrap().named("combo");
        assert_eq!(combined.name(), "combo");
        assert_eq!(combined.requirements().len(), 2);
        assert_eq!(
            combined.interruption_behavior(),
            InterruptionBehavior::CancelIncoming
        );
    }

    #[test]
    fn test_along_with_rejects_shared_resource() {
        let log = ProbeLog::new();
        let a = Probe::new("a", &log).requiring(&[ResourceId(1)]);
        let b = Probe::new("b", &log).requiring(&[ResourceId(1)]);
        assert!(a.along_with(b).is_err());
    }
}
