//! Operator input: a shared controller state and the scripted driver that
//! fills it in place of a real driver station.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Game mode reported by the driver station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    X,
}

/// One sample of everything the operator controls
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Inputs {
    pub mode: Mode,
    pub left_y: f64,
    pub right_y: f64,
    pub a: bool,
    pub b: bool,
    pub x: bool,
}

impl Inputs {
    pub fn mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn sticks(mut self, left_y: f64, right_y: f64) -> Self {
        self.left_y = left_y;
        self.right_y = right_y;
        self
    }

    pub fn holding(mut self, button: Button) -> Self {
        match button {
            Button::A => self.a = true,
            Button::B => self.b = true,
            Button::X => self.x = true,
        }
        self
    }

    pub fn pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::X => self.x,
        }
    }
}

/// Cloneable handle to the latest operator inputs
#[derive(Debug, Clone, Default)]
pub struct Controller {
    inputs: Arc<Mutex<Inputs>>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(&self) -> Inputs {
        *self.inputs.lock()
    }

    pub fn set(&self, inputs: Inputs) {
        *self.inputs.lock() = inputs;
    }

    pub fn left_y(&self) -> f64 {
        self.inputs.lock().left_y
    }

    pub fn right_y(&self) -> f64 {
        self.inputs.lock().right_y
    }

    /// Predicate for a trigger bound to `button`
    pub fn button(&self, button: Button) -> impl FnMut() -> bool + Send + 'static {
        let inputs = self.inputs.clone();
        move || inputs.lock().pressed(button)
    }

    /// Predicate for a trigger bound to a game mode
    pub fn in_mode(&self, mode: Mode) -> impl FnMut() -> bool + Send + 'static {
        let inputs = self.inputs.clone();
        move || inputs.lock().mode == mode
    }
}

/// Timeline of inputs keyed by the cycle each entry starts at
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    steps: Vec<(u64, Inputs)>,
}

impl ScriptedDriver {
    pub fn new(mut steps: Vec<(u64, Inputs)>) -> Self {
        steps.sort_by_key(|(start, _)| *start);
        Self { steps }
    }

    /// Inputs in effect at `cycle`. Before the first step the robot is
    /// disabled.
    pub fn inputs_at(&self, cycle: u64) -> Inputs {
        self.steps
            .iter()
            .take_while(|(start, _)| *start <= cycle)
            .last()
            .map(|(_, inputs)| *inputs)
            .unwrap_or_default()
    }

    /// Cycle after which the script has nothing left to change
    pub fn length(&self) -> u64 {
        self.steps.last().map(|(start, _)| *start).unwrap_or(0)
    }
}

impl Default for ScriptedDriver {
    /// A short match at 50Hz: autonomous, a pause, then teleop exercising
    /// every binding. The long intake at the end overfills the hopper.
    fn default() -> Self {
        let teleop = Inputs::mode(Mode::Teleop).sticks(0.5, 0.5);
        Self::new(vec![
            (0, Inputs::mode(Mode::Disabled)),
            (25, Inputs::mode(Mode::Autonomous)),
            (175, Inputs::mode(Mode::Disabled)),
            (200, teleop),
            (210, teleop.holding(Button::X)),
            (300, teleop),
            (320, teleop.sticks(0.0, 0.0).holding(Button::A)),
            (420, teleop),
            (430, teleop.holding(Button::B)),
            (460, teleop.sticks(-0.3, 0.3)),
            (470, teleop.holding(Button::X)),
            (600, teleop.sticks(0.0, 0.0)),
            (640, Inputs::mode(Mode::Disabled)),
        ])
    }
}
