use crate::core::{Command, CommandContext, InterruptionBehavior, Requirements, ResourceId};
use crate::error::{CadenceError, CadenceResult};
use std::collections::BTreeMap;

/// When a parallel group counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Every child has finished
    All,
    /// Any child has finished; the rest are interrupted in the same cycle
    Race,
    /// The first child has finished; the rest are interrupted in the same cycle
    Deadline,
}

/// Runs children side by side.
///
/// Children are not executed simultaneously: every live child gets one
/// `execute` per cycle, in order. A child that finishes is ended once and
/// never executed again.
pub struct ParallelGroup {
    name: String,
    policy: ParallelPolicy,
    children: Vec<Box<dyn Command>>,
    running: Vec<bool>,
    decided: bool,
    requirements: Requirements,
    behavior: InterruptionBehavior,
}

impl ParallelGroup {
    /// Build a group. Children may not share a resource.
    pub fn new(policy: ParallelPolicy, children: Vec<Box<dyn Command>>) -> CadenceResult<Self> {
        let mut claimed: BTreeMap<ResourceId, &str> = BTreeMap::new();
        for child in &children {
            for resource in child.requirements() {
                if let Some(first) = claimed.insert(resource, child.name()) {
                    return Err(CadenceError::OverlappingRequirements {
                        first: first.to_string(),
                        second: child.name().to_string(),
                        resource,
                    });
                }
            }
        }
        let requirements = claimed.into_keys().collect();

        let label = match policy {
            ParallelPolicy::All => "Parallel",
            ParallelPolicy::Race => "Race",
            ParallelPolicy::Deadline => "Deadline",
        };
        let name = format!(
            "{}({})",
            label,
            children.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );
        let behavior = super::combined_behavior(&children);

        Ok(Self {
            name,
            policy,
            running: vec![false; children.len()],
            children,
            decided: false,
            requirements,
            behavior,
        })
    }

    pub fn all(children: Vec<Box<dyn Command>>) -> CadenceResult<Self> {
        Self::new(ParallelPolicy::All, children)
    }

    pub fn race(children: Vec<Box<dyn Command>>) -> CadenceResult<Self> {
        Self::new(ParallelPolicy::Race, children)
    }

    /// The group ends when `deadline` ends
    pub fn deadline(
        deadline: Box<dyn Command>,
        mut others: Vec<Box<dyn Command>>,
    ) -> CadenceResult<Self> {
        others.insert(0, deadline);
        Self::new(ParallelPolicy::Deadline, others)
    }

    pub fn policy(&self) -> ParallelPolicy {
        self.policy
    }

    /// Number of children that have not ended yet
    pub fn live_children(&self) -> usize {
        self.running.iter().filter(|r| **r).count()
    }

    fn interrupt_remaining(&mut self, ctx: &mut CommandContext<'_>) {
        for (child, running) in self.children.iter_mut().zip(self.running.iter_mut()) {
            if *running {
                *running = false;
                child.end(true, ctx);
            }
        }
    }
}

impl Command for ParallelGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.behavior
    }

    fn initialize(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        self.decided = false;
        for (child, running) in self.children.iter_mut().zip(self.running.iter_mut()) {
            child.initialize(ctx)?;
            *running = true;
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        for index in 0..self.children.len() {
            if !self.running[index] {
                continue;
            }
            let child = &mut self.children[index];
            child.execute(ctx)?;
            if child.is_finished(ctx) {
                child.end(false, ctx);
                self.running[index] = false;

                let decisive = match self.policy {
                    ParallelPolicy::All => false,
                    ParallelPolicy::Race => true,
                    ParallelPolicy::Deadline => index == 0,
                };
                if decisive {
                    self.decided = true;
                    self.interrupt_remaining(ctx);
                    break;
                }
            }
        }
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        match self.policy {
            ParallelPolicy::All => !self.running.iter().any(|r| *r),
            ParallelPolicy::Race | ParallelPolicy::Deadline => {
                self.decided || self.children.is_empty()
            }
        }
    }

    fn end(&mut self, _interrupted: bool, ctx: &mut CommandContext<'_>) {
        self.interrupt_remaining(ctx);
    }
}
