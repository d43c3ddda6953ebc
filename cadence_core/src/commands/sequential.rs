use crate::core::{Command, CommandContext, InterruptionBehavior, Requirements};
use crate::error::CadenceResult;

/// Runs children one after another.
///
/// When a child finishes, the next child is initialized in the same cycle,
/// so no idle cycle passes between children. The group requires the union
/// of its children's requirements for its whole lifetime.
pub struct SequentialGroup {
    name: String,
    children: Vec<Box<dyn Command>>,
    index: usize,
    requirements: Requirements,
    behavior: InterruptionBehavior,
}

impl SequentialGroup {
    pub fn new(children: Vec<Box<dyn Command>>) -> Self {
        let requirements = children
            .iter()
            .flat_map(|child| child.requirements())
            .collect();
        let behavior = super::combined_behavior(&children);
        let name = format!(
            "Sequence({})",
            children.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );

        Self {
            name,
            children,
            index: 0,
            requirements,
            behavior,
        }
    }

    /// Index of the child currently running; equals the number of children
    /// once the sequence is exhausted.
    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for SequentialGroup {
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
        self.index = 0;
        if let Some(first) = self.children.first_mut() {
            first.initialize(ctx)?;
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> CadenceResult<()> {
        let Some(current) = self.children.get_mut(self.index) else {
            return Ok(());
        };

        current.execute(ctx)?;
        if current.is_finished(ctx) {
            current.end(false, ctx);
            self.index += 1;
            if let Some(next) = self.children.get_mut(self.index) {
                next.initialize(ctx)?;
            }
        }
        Ok(())
    }

    fn is_finished(&mut self, _ctx: &mut CommandContext<'_>) -> bool {
        self.index >= self.children.len()
    }

    fn end(&mut self, interrupted: bool, ctx: &mut CommandContext<'_>) {
        if let Some(current) = self.children.get_mut(self.index) {
            current.end(interrupted, ctx);
        }
        self.index = self.children.len();
    }
}
