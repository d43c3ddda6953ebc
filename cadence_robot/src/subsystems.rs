//! Simulated mechanisms. Each one owns a scheduler resource and hands out
//! commands that require it.

use crate::controller::Controller;
use cadence::commands::{self, FunctionalCommand};
use cadence::prelude::*;
use parking_lot::Mutex;

/// Mechanism that owns exactly one scheduler resource
pub trait Subsystem {
    fn resource(&self) -> ResourceId;

    /// Command scheduled whenever nothing else owns the resource
    fn default_command(&self) -> Option<Box<dyn Command>> {
        None
    }
}

#[derive(Debug, Default)]
struct DriveState {
    left: f64,
    right: f64,
    distance_m: f64,
}

/// Tank drive train
#[derive(Debug, Clone)]
pub struct Drive {
    id: ResourceId,
    controller: Controller,
    state: Arc<Mutex<DriveState>>,
}

impl Drive {
    /// Top speed at full output
    pub const MAX_SPEED_MPS: f64 = 3.0;

    pub fn new(scheduler: &mut Scheduler, controller: Controller) -> Self {
        Self {
            id: scheduler.add_resource("drive"),
            controller,
            state: Arc::default(),
        }
    }

    pub fn tank(&self, left: f64, right: f64) {
        let mut state = self.state.lock();
        state.left = left.clamp(-1.0, 1.0);
        state.right = right.clamp(-1.0, 1.0);
    }

    pub fn stop(&self) {
        self.tank(0.0, 0.0);
    }

    pub fn output(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.left, state.right)
    }

    /// Distance travelled by the robot's center since power on
    pub fn distance(&self) -> f64 {
        self.state.lock().distance_m
    }

    /// Drive straight for `meters`, then stop
    pub fn drive_distance(&self, meters: f64, speed: f64) -> FunctionalCommand {
        let start = Arc::new(Mutex::new(0.0));
        let (drive, origin) = (self.clone(), start.clone());
        let init = move || *origin.lock() = drive.distance();
        let drive = self.clone();
        let execute = move || drive.tank(speed, speed);
        let drive = self.clone();
        let done = move || (drive.distance() - *start.lock()).abs() >= meters;
        let drive = self.clone();

        FunctionalCommand::new("DriveDistance")
            .requiring(&[self.id])
            .on_initialize(init)
            .on_execute(execute)
            .finished_when(done)
            .on_end(move |_| drive.stop())
    }

    pub(crate) fn simulate(&self, dt: f64) {
        let mut state = self.state.lock();
        state.distance_m += (state.left + state.right) / 2.0 * Self::MAX_SPEED_MPS * dt;
    }
}

impl Subsystem for Drive {
    fn resource(&self) -> ResourceId {
        self.id
    }

    /// Tank drive from the two stick axes
    fn default_command(&self) -> Option<Box<dyn Command>> {
        let (drive, controller) = (self.clone(), self.controller.clone());
        Some(
            commands::run(
                "TankDrive",
                move || drive.tank(controller.left_y(), controller.right_y()),
                &[self.id],
            )
            .boxed(),
        )
    }
}

#[derive(Debug, Default)]
struct ShooterState {
    target_rpm: f64,
    rpm: f64,
}

/// Flywheel with a first-order spin-up
#[derive(Debug, Clone)]
pub struct Shooter {
    id: ResourceId,
    state: Arc<Mutex<ShooterState>>,
}

impl Shooter {
    pub const SHOT_RPM: f64 = 3000.0;
    const TOLERANCE_RPM: f64 = 100.0;
    const RESPONSE: f64 = 0.15;

    pub fn new(scheduler: &mut Scheduler) -> Self {
        Self {
            id: scheduler.add_resource("shooter"),
            state: Arc::default(),
        }
    }

    pub fn rpm(&self) -> f64 {
        self.state.lock().rpm
    }

    pub fn at_speed(&self) -> bool {
        let state = self.state.lock();
        state.target_rpm > 0.0 && (state.rpm - state.target_rpm).abs() < Self::TOLERANCE_RPM
    }

    /// Hold the flywheel at `rpm` until interrupted
    pub fn spin_up(&self, rpm: f64) -> FunctionalCommand {
        let (a, b) = (self.state.clone(), self.state.clone());
        commands::start_end(
            "SpinUp",
            move || a.lock().target_rpm = rpm,
            move || b.lock().target_rpm = 0.0,
            &[self.id],
        )
    }

    /// Predicate for `wait_until`
    pub fn at_speed_condition(&self) -> impl FnMut() -> bool + Send + 'static {
        let shooter = self.clone();
        move || shooter.at_speed()
    }

    pub(crate) fn simulate(&self) {
        let mut state = self.state.lock();
        state.rpm += (state.target_rpm - state.rpm) * Self::RESPONSE;
    }
}

impl Subsystem for Shooter {
    fn resource(&self) -> ResourceId {
        self.id
    }

    fn default_command(&self) -> Option<Box<dyn Command>> {
        let state = self.state.clone();
        Some(
            commands::run(
                "ShooterIdle",
                move || state.lock().target_rpm = 0.0,
                &[self.id],
            )
            .boxed(),
        )
    }
}

/// Motor output in [-1, 1] with a command that holds it while scheduled
fn roller(name: &str, output: &Arc<Mutex<f64>>, value: f64, id: ResourceId) -> FunctionalCommand {
    let (a, b) = (output.clone(), output.clone());
    commands::start_end(name, move || *a.lock() = value, move || *b.lock() = 0.0, &[id])
}

/// Ground intake rollers
#[derive(Debug, Clone)]
pub struct Intake {
    id: ResourceId,
    output: Arc<Mutex<f64>>,
}

impl Intake {
    pub fn new(scheduler: &mut Scheduler) -> Self {
        Self {
            id: scheduler.add_resource("intake"),
            output: Arc::default(),
        }
    }

    pub fn output(&self) -> f64 {
        *self.output.lock()
    }

    pub fn intake(&self) -> FunctionalCommand {
        roller("Intake", &self.output, 1.0, self.id)
    }

    pub fn outtake(&self) -> FunctionalCommand {
        roller("Outtake", &self.output, -1.0, self.id)
    }
}

impl Subsystem for Intake {
    fn resource(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Default)]
struct HopperState {
    output: f64,
    stored: u32,
}

/// Belt that carries balls from the intake to the shooter
#[derive(Debug, Clone)]
pub struct Hopper {
    id: ResourceId,
    state: Arc<Mutex<HopperState>>,
}

impl Hopper {
    pub const CAPACITY: u32 = 3;

    pub fn new(scheduler: &mut Scheduler, preload: u32) -> Self {
        Self {
            id: scheduler.add_resource("hopper"),
            state: Arc::new(Mutex::new(HopperState {
                output: 0.0,
                stored: preload.min(Self::CAPACITY),
            })),
        }
    }

    pub fn stored(&self) -> u32 {
        self.state.lock().stored
    }

    pub fn output(&self) -> f64 {
        self.state.lock().output
    }

    pub fn forward(&self) -> FunctionalCommand {
        let (a, b) = (self.state.clone(), self.state.clone());
        commands::start_end(
            "HopperForward",
            move || a.lock().output = 1.0,
            move || b.lock().output = 0.0,
            &[self.id],
        )
    }

    pub(crate) fn take(&self) -> bool {
        let mut state = self.state.lock();
        if state.stored == 0 {
            return false;
        }
        state.stored -= 1;
        true
    }

    /// Store one ball; `false` when the hopper is already full
    pub(crate) fn put(&self) -> bool {
        let mut state = self.state.lock();
        if state.stored >= Self::CAPACITY {
            return false;
        }
        state.stored += 1;
        true
    }
}

impl Subsystem for Hopper {
    fn resource(&self) -> ResourceId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_distance_stops_at_target() {
        let mut scheduler = Scheduler::new();
        let drive = Drive::new(&mut scheduler, Controller::new());
        let id = scheduler.register(drive.drive_distance(0.5, 1.0).boxed());

        scheduler.schedule(id);
        for _ in 0..20 {
            scheduler.run();
            drive.simulate(0.02);
        }
        assert!(!scheduler.is_scheduled(id));
        assert!(drive.distance() >= 0.5);
        assert_eq!(drive.output(), (0.0, 0.0));
    }

    #[test]
    fn test_shooter_reaches_speed() {
        let mut scheduler = Scheduler::new();
        let shooter = Shooter::new(&mut scheduler);
        let id = scheduler.register(shooter.spin_up(Shooter::SHOT_RPM).boxed());

        scheduler.schedule(id);
        assert!(!shooter.at_speed());
        for _ in 0..40 {
            shooter.simulate();
        }
        assert!(shooter.at_speed());

        scheduler.cancel(id);
        assert!(!shooter.at_speed());
    }

    #[test]
    fn test_hopper_capacity() {
        let mut scheduler = Scheduler::new();
        let hopper = Hopper::new(&mut scheduler, 10);
        assert_eq!(hopper.stored(), Hopper::CAPACITY);
        assert!(!hopper.put());
        assert!(hopper.take());
        assert!(hopper.put());
    }

    #[test]
    fn test_rollers_release_on_end() {
        let mut scheduler = Scheduler::new();
        let intake = Intake::new(&mut scheduler);
        let forward = scheduler.register(intake.intake().boxed());
        let reverse = scheduler.register(intake.outtake().boxed());

        scheduler.schedule(forward);
        assert_eq!(intake.output(), 1.0);
        scheduler.schedule(reverse);
        assert_eq!(intake.output(), -1.0);
        scheduler.cancel(reverse);
        assert_eq!(intake.output(), 0.0);
    }
}
