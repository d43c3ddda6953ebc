use crate::core::{
    requirements, Command, CommandContext, CommandId, Fault, Requirements, ResourceId,
};
use crate::error::{CadenceError, CadenceResult};

type Factory = Box<dyn FnMut() -> Box<dyn Command> + Send>;

/// What the proxy did with the instance its factory produced
enum Realized {
    None,
    /// Requirements fit the declared set; every call is forwarded
    Inline(Box<dyn Command>),
    /// Handed to the scheduler as a one-shot top-level command
    Deferred(CommandId),
    /// Produced instance needed resources outside the declared set
    Refused,
}

/// Command whose real behavior is produced lazily by a factory each time it
/// is scheduled.
///
/// The proxy declares its requirement set up front (empty by default). On
/// `initialize` the produced instance is checked against it:
///
/// - requirements inside the declared set: the instance runs inline
/// - declared set empty: the instance is spawned as its own top-level
///   command, so arbitration happens once its requirements are known, and
///   the proxy finishes when that command is no longer scheduled
/// - anything else: a [`CadenceError::ProxyRequirement`] fault is reported
///   and the proxy finishes without running the instance
///
/// The produced instance is discarded when the proxy ends and never reused.
pub struct ProxyCommand {
    name: String,
    factory: Factory,
    declared: Requirements,
    realized: Realized,
}

impl ProxyCommand {
    pub fn new(factory: impl FnMut() -> Box<dyn Command> + Send + 'static) -> Self {
        Self {
            name: "Proxy".to_string(),
            factory: Box::new(factory),
            declared: Requirements::new(),
            realized: Realized::None,
        }
    }

    /// Declare the resources any produced instance may use
    pub fn requiring(mut self, resources: &[ResourceId]) -> Self {
        self.declared = requirements(resources);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Id of the spawned top-level command while one is outstanding
    pub fn deferred(&self) -> Option<CommandId> {
        match self.realized {
            Realized::Deferred(id) => Some(id),
            _ => None,
        }
    }
}

impl Command for ProxyCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.declared.clone()
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        let produced = (self.factory)();
        let outside = produced
            .requirements()
            .difference(&self.declared)
            .next()
            .copied();

        match outside {
            None => {
                self.realized = Realized::Inline(produced);
                if let Realized::Inline(inner) = &mut self.realized {
                    inner.initialize(ctx)?;
                }
            }
            Some(_) if self.declared.is_empty() => {
                tracing::debug!(
                    proxy = %self.name,
                    produced = produced.name(),
                    "deferring arbitration to spawned command"
                );
                let id = ctx.spawn(produced);
                self.realized = Realized::Deferred(id);
            }
            Some(resource) => {
                let err = CadenceError::ProxyRequirement {
                    proxy: self.name.clone(),
                    produced: produced.name().to_string(),
                    resource,
                };
                ctx.report(Fault::error(self.name.clone(), err.to_string()));
                self.realized = Realized::Refused;
            }
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        match &mut self.realized {
            Realized::Inline(inner) => inner.execute(ctx),
            _ => Ok(()),
        }
    }

    fn is_finished(&mut self, ctx: &mut CommandContext<'_>) -> bool {
        match &mut self.realized {
            Realized::Inline(inner) => inner.is_finished(ctx),
            Realized::Deferred(id) => !ctx.is_scheduled(*id),
            Realized::None | Realized::Refused => true,
        }
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        match std::mem::replace(&mut self.realized, Realized::None) {
            Realized::Inline(mut inner) => inner.end(interrupted, ctx),
            Realized::Deferred(id) => {
                if interrupted && ctx.is_scheduled(id) {
                    ctx.cancel(id);
                }
            }
            Realized::None | Realized::Refused => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::TestContext;
    use crate::testing::{Probe, ProbeLog};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inline_instance_receives_every_call() {
        let log = ProbeLog::new();
        let factory_log = log.clone();
        let mut proxy = ProxyCommand::new(move || {
            Box::new(Probe::new("inner", &factory_log).finish_after(1).requiring(&[ResourceId(1)]))
        })
        .requiring(&[ResourceId(1), ResourceId(2)]);

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            proxy.initialize(ctx).unwrap();
            proxy.execute(ctx).unwrap();
            assert!(proxy.is_finished(ctx));
            proxy.end(false, ctx);
        });

        assert_eq!(log.take(), vec!["inner:init", "inner:execute", "inner:end(false)"]);
        assert!(harness.spawned.is_empty());
    }

    #[test]
    fn test_factory_runs_on_every_initialize() {
        let made = Arc::new(AtomicUsize::new(0));
        let counter = made.clone();
        let log = ProbeLog::new();
        let factory_log = log.clone();
        let mut proxy = ProxyCommand::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Box::new(Probe::new(&format!("instance{}", n), &factory_log))
        });

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            proxy.initialize(ctx).unwrap();
            proxy.end(true, ctx);
            proxy.initialize(ctx).unwrap();
            proxy.end(true, ctx);
        });

        assert_eq!(made.load(Ordering::SeqCst), 2);
        assert_eq!(
            log.take(),
            vec![
                "instance0:init",
                "instance0:end(true)",
                "instance1:init",
                "instance1:end(true)"
            ]
        );
    }

    #[test]
    fn test_undeclared_requirements_are_spawned() {
        let log = ProbeLog::new();
        let factory_log = log.clone();
        let mut proxy = ProxyCommand::new(move || {
            Box::new(Probe::new("auto", &factory_log).requiring(&[ResourceId(3)]))
        });
        assert!(proxy.requirements().is_empty());

        let mut harness = TestContext::new();
        harness.with(|ctx| proxy.initialize(ctx).unwrap());
        assert_eq!(harness.spawned.len(), 1);
        let spawned = harness.spawned[0].0;
        assert_eq!(proxy.deferred(), Some(spawned));

        // Running while the spawned command is active
        assert!(!harness.with(|ctx| proxy.is_finished(ctx)));

        // Interrupting the proxy cancels the spawned command
        harness.with(|ctx| proxy.end(true, ctx));
        assert_eq!(harness.cancelled, vec![spawned]);
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_deferred_proxy_finishes_with_spawned_command() {
        let mut proxy = ProxyCommand::new(|| {
            Box::new(Probe::new("auto", &ProbeLog::new()).requiring(&[ResourceId(3)]))
        });

        let mut harness = TestContext::new();
        harness.with(|ctx| proxy.initialize(ctx).unwrap());
        let spawned = harness.spawned[0].0;
        harness.active.remove(&spawned);

        assert!(harness.with(|ctx| proxy.is_finished(ctx)));
        harness.with(|ctx| proxy.end(false, ctx));
        assert!(harness.cancelled.is_empty());
    }

    #[test]
    fn test_requirement_outside_declared_set_is_refused() {
        let log = ProbeLog::new();
        let factory_log = log.clone();
        let mut proxy = ProxyCommand::new(move || {
            Box::new(Probe::new("greedy", &factory_log).requiring(&[ResourceId(1), ResourceId(9)]))
        })
        .requiring(&[ResourceId(1)])
        .with_name("auto");

        let mut harness = TestContext::new();
        harness.with(|ctx| {
            proxy.initialize(ctx).unwrap();
            assert!(proxy.is_finished(ctx));
            proxy.end(false, ctx);
        });

        assert!(log.take().is_empty());
        assert!(harness.spawned.is_empty());
        let total = harness.faults.total();
        let fault = total.keys().next().unwrap();
        assert_eq!(fault.source, "auto");
        assert!(fault.description.contains("resource#9"));
    }
}
