//! Robot container: builds the subsystems, registers default commands and
//! wires operator inputs to commands.

use crate::autos::{Auto, AutoChooser, AutoMechanisms};
use crate::controller::{Button, Controller, Mode, ScriptedDriver};
use crate::subsystems::{Drive, Hopper, Intake, Shooter, Subsystem};
use cadence::commands;
use cadence::prelude::*;
use parking_lot::Mutex;

/// Balls loaded before the match starts
const PRELOAD: u32 = 2;
/// Cycles of feeding per ball shot or picked up
const FEED_CYCLES: u32 = 10;
const PICKUP_CYCLES: u32 = 25;

#[derive(Debug, Default)]
struct BallPath {
    feed_ticks: u32,
    pickup_ticks: u32,
    shots: u32,
}

#[derive(Debug, Clone)]
pub struct Robot {
    pub controller: Controller,
    pub drive: Drive,
    pub shooter: Shooter,
    pub intake: Intake,
    pub hopper: Hopper,
    pub chooser: AutoChooser,
    autonomous: CommandId,
    balls: Arc<Mutex<BallPath>>,
}

impl Robot {
    pub fn new(scheduler: &mut Scheduler, auto: Auto) -> CadenceResult<Self> {
        let controller = Controller::new();
        let drive = Drive::new(scheduler, controller.clone());
        let shooter = Shooter::new(scheduler);
        let intake = Intake::new(scheduler);
        let hopper = Hopper::new(scheduler, PRELOAD);

        let subsystems: [&dyn Subsystem; 4] = [&drive, &shooter, &intake, &hopper];
        for subsystem in subsystems {
            if let Some(command) = subsystem.default_command() {
                let id = scheduler.register(command);
                scheduler.set_default_command(subsystem.resource(), id)?;
            }
        }

        let chooser = AutoChooser::new(auto);
        let autonomous = scheduler.register(chooser.command(AutoMechanisms {
            drive: drive.clone(),
            shooter: shooter.clone(),
            hopper: hopper.clone(),
        }));

        let robot = Self {
            controller,
            drive,
            shooter,
            intake,
            hopper,
            chooser,
            autonomous,
            balls: Arc::default(),
        };
        robot.configure_bindings(scheduler)?;
        Ok(robot)
    }

    fn configure_bindings(&self, scheduler: &mut Scheduler) -> CadenceResult<()> {
        let controller = &self.controller;

        let collect = self.intake.intake().along_with(self.hopper.forward())?;
        let collect = scheduler.register(collect.named("Collect").boxed());

        let feed_when_ready = commands::wait_until(self.shooter.at_speed_condition())
            .and_then(self.hopper.forward());
        let shoot = commands::parallel(vec![
            self.shooter.spin_up(Shooter::SHOT_RPM).boxed(),
            feed_when_ready.boxed(),
        ])?;
        let shoot = scheduler.register(shoot.named("Shoot").boxed());

        let outtake = scheduler.register(self.intake.outtake().boxed());

        scheduler
            .bind(
                Trigger::new(controller.button(Button::X))
                    .named("x")
                    .while_true(collect),
            )
            .bind(
                Trigger::new(controller.button(Button::A))
                    .named("a")
                    .while_true(shoot),
            )
            .bind(
                Trigger::new(controller.button(Button::B))
                    .named("b")
                    .while_true(outtake),
            )
            .bind(
                Trigger::new(controller.in_mode(Mode::Autonomous))
                    .named("autonomous")
                    .while_true(self.autonomous),
            );

        let faults = scheduler.fault_log().clone();
        faults.on_failing(scheduler, |fault| {
            commands::print(format!(
                "robot fault from {}: {}",
                fault.source, fault.description
            ))
            .boxed()
        });
        Ok(())
    }

    pub fn autonomous_command(&self) -> CommandId {
        self.autonomous
    }

    pub fn shots(&self) -> u32 {
        self.balls.lock().shots
    }

    /// Advance the mechanisms by one period. Fails while the intake pushes
    /// against a full hopper.
    pub fn simulate(&self, dt: f64) -> anyhow::Result<()> {
        self.drive.simulate(dt);
        self.shooter.simulate();

        let mut balls = self.balls.lock();
        if self.hopper.output() > 0.0 && self.shooter.at_speed() {
            balls.feed_ticks += 1;
            if balls.feed_ticks >= FEED_CYCLES {
                balls.feed_ticks = 0;
                if self.hopper.take() {
                    balls.shots += 1;
                    tracing::info!(shots = balls.shots, "ball shot");
                }
            }
        }

        let intake = self.intake.output();
        if intake == 0.0 {
            balls.pickup_ticks = 0;
            return Ok(());
        }
        balls.pickup_ticks += 1;
        if balls.pickup_ticks < PICKUP_CYCLES {
            return Ok(());
        }
        balls.pickup_ticks = 0;
        if intake < 0.0 {
            self.hopper.take();
            return Ok(());
        }
        if !self.hopper.put() {
            bail!(
                "intake stalled: hopper full with {} balls",
                self.hopper.stored()
            );
        }
        Ok(())
    }

    /// Attach the scripted driver station and the mechanism simulation to
    /// the control loop. The driver station also switches the scheduler
    /// between disabled and enabled.
    pub fn install(&self, control: &mut ControlLoop, script: ScriptedDriver) -> CadenceResult<()> {
        let period = control.scheduler().period();
        control.scheduler_mut().disable();

        let controller = self.controller.clone();
        control.add_periodic("driver_station", period, move |scheduler| {
            let inputs = script.inputs_at(scheduler.cycle());
            if inputs.mode != controller.inputs().mode {
                tracing::info!(mode = ?inputs.mode, cycle = scheduler.cycle(), "mode change");
            }
            controller.set(inputs);
            scheduler.set_enabled(inputs.mode != Mode::Disabled);
            Ok(())
        })?;

        let robot = self.clone();
        let dt = period.as_secs_f64();
        control.add_periodic("physics", period, move |_| robot.simulate(dt))?;
        Ok(())
    }
}
