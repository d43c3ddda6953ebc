//! Autonomous routines and the chooser that picks one at schedule time

use crate::subsystems::{Drive, Hopper, Shooter};
use cadence::commands::{self, CommandExt, Timeout};
use cadence::prelude::{Arc, CadenceResult, Command, Duration};
use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum Auto {
    /// Shoot the preloaded balls, then leave the starting zone
    #[default]
    ShootAndTaxi,
    /// Only leave the starting zone
    Taxi,
    /// Sit still
    Nothing,
}

/// Distance that counts as leaving the starting zone
const TAXI_METERS: f64 = 2.0;
const FEED_TIME: Duration = Duration::from_secs(1);

/// Mechanisms an autonomous routine may command
#[derive(Debug, Clone)]
pub struct AutoMechanisms {
    pub drive: Drive,
    pub shooter: Shooter,
    pub hopper: Hopper,
}

impl AutoMechanisms {
    pub fn build(&self, auto: Auto) -> CadenceResult<Box<dyn Command>> {
        let taxi = || self.drive.drive_distance(TAXI_METERS, 0.5).named("Taxi");
        let routine: Box<dyn Command> = match auto {
            Auto::ShootAndTaxi => {
                let feed = commands::wait_until(self.shooter.at_speed_condition())
                    .and_then(Timeout::duration(self.hopper.forward().boxed(), FEED_TIME));
                let shoot = feed.deadline_with(self.shooter.spin_up(Shooter::SHOT_RPM))?;
                shoot.and_then(taxi()).named("ShootAndTaxi").boxed()
            }
            Auto::Taxi => taxi().boxed(),
            Auto::Nothing => commands::none().boxed(),
        };
        Ok(routine)
    }
}

/// Shared selection, read when the autonomous proxy is scheduled
#[derive(Debug, Clone, Default)]
pub struct AutoChooser {
    selected: Arc<Mutex<Auto>>,
}

impl AutoChooser {
    pub fn new(initial: Auto) -> Self {
        Self {
            selected: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn select(&self, auto: Auto) {
        *self.selected.lock() = auto;
    }

    pub fn selected(&self) -> Auto {
        *self.selected.lock()
    }

    /// Command that builds the selected routine each time it is scheduled.
    /// A routine that fails to build is logged and replaced by nothing.
    pub fn command(&self, mechanisms: AutoMechanisms) -> Box<dyn Command> {
        let chooser = self.clone();
        commands::proxy(move || {
            let auto = chooser.selected();
            tracing::info!(?auto, "starting autonomous routine");
            mechanisms.build(auto).unwrap_or_else(|e| {
                tracing::error!(?auto, "autonomous routine rejected: {}", e);
                commands::none().boxed()
            })
        })
        .with_name("Autonomous")
        .boxed()
    }
}
