//! Background execution of cleaning runs.
//!
//! The [`Controller`] owns the robot while idle and hands it to a worker thread for the
//! duration of a run. Anything that mutates the robot (switching strategy, repopulating the
//! map) first cancels the active run and joins the worker to get the robot back, so two runs
//! can never touch the same grid at once.

use std::{
    sync::mpsc,
    thread::{Builder, JoinHandle},
};

use tracing::{debug, warn};

use crate::{
    agent::{Robot, RunReport},
    cancel::CancellationToken,
    environment::PopulateError,
    strategy::CleaningStrategy,
};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("a cleaning run is already active")]
    Busy,
    #[error("the cleaning worker panicked and took the robot with it")]
    WorkerPanicked,
    #[error("the robot was lost in an earlier worker failure")]
    RobotLost,
    #[error("failed to spawn cleaning worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Populate(#[from] PopulateError),
}

struct ActiveRun {
    cancel: CancellationToken,
    /// `None` when the worker never received the robot.
    handle: JoinHandle<Option<(Robot, RunReport)>>,
}

/// Starts, cancels and reaps cleaning runs for a single robot.
pub struct Controller {
    robot: Option<Robot>,
    run: Option<ActiveRun>,
    last_report: Option<RunReport>,
}

impl Controller {
    pub fn new(robot: Robot) -> Self {
        Controller {
            robot: Some(robot),
            run: None,
            last_report: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// The idle robot. `None` while a run holds it.
    pub fn robot(&self) -> Option<&Robot> {
        self.robot.as_ref()
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    fn robot_mut(&mut self) -> Result<&mut Robot, ControllerError> {
        if self.run.is_some() {
            return Err(ControllerError::Busy);
        }
        self.robot.as_mut().ok_or(ControllerError::RobotLost)
    }

    /// Starts the robot's current strategy on a worker thread.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        self.start_on(Builder::new().name("cleaning-run".to_string()))
    }

    /// The robot is only handed over once the worker exists, so a failed spawn keeps it here.
    fn start_on(&mut self, builder: Builder) -> Result<(), ControllerError> {
        if self.run.is_some() {
            return Err(ControllerError::Busy);
        }
        if self.robot.is_none() {
            return Err(ControllerError::RobotLost);
        }
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (hand_over, receive) = mpsc::channel::<Robot>();

        let handle = builder.spawn(move || {
            let mut robot = receive.recv().ok()?;
            let report = robot.start_cleaning(&token);
            Some((robot, report))
        })?;

        let robot = self.robot.take().ok_or(ControllerError::RobotLost)?;
        if let Err(mpsc::SendError(robot)) = hand_over.send(robot) {
            warn!("Cleaning worker exited before receiving the robot");
            self.robot = Some(robot);
            let _ = handle.join();
            return Err(ControllerError::WorkerPanicked);
        }

        self.run = Some(ActiveRun { cancel, handle });
        Ok(())
    }

    fn join(&mut self, run: ActiveRun) -> Result<RunReport, ControllerError> {
        match run.handle.join() {
            Ok(Some((robot, report))) => {
                self.robot = Some(robot);
                self.last_report = Some(report.clone());
                Ok(report)
            }
            Ok(None) => Err(ControllerError::RobotLost),
            Err(_) => {
                warn!("Cleaning worker panicked");
                Err(ControllerError::WorkerPanicked)
            }
        }
    }

    /// Cancels the active run, if any, and waits for the worker to hand the robot back.
    pub fn stop(&mut self) -> Result<Option<RunReport>, ControllerError> {
        let Some(run) = self.run.take() else {
            return Ok(None);
        };
        run.cancel.cancel();
        debug!("Cancellation requested, joining cleaning worker");
        self.join(run).map(Some)
    }

    /// Waits for the active run to finish on its own.
    pub fn wait(&mut self) -> Result<Option<RunReport>, ControllerError> {
        match self.run.take() {
            Some(run) => self.join(run).map(Some),
            None => Ok(None),
        }
    }

    /// Reaps the active run if the worker already finished. Never blocks.
    pub fn poll_finished(&mut self) -> Result<Option<RunReport>, ControllerError> {
        match &self.run {
            Some(run) if run.handle.is_finished() => self.wait(),
            _ => Ok(None),
        }
    }

    /// Stops any active run, swaps the strategy and starts a fresh run.
    pub fn switch_strategy(
        &mut self,
        strategy: Box<dyn CleaningStrategy>,
    ) -> Result<(), ControllerError> {
        self.stop()?;
        self.robot_mut()?.set_strategy(strategy);
        self.start()
    }

    /// Stops any active run, re-populates the map and starts a fresh run.
    ///
    /// Invalid ratios are reported before the map is touched; the robot then stays idle.
    pub fn repopulate(
        &mut self,
        obstacle_ratio: f64,
        dirt_ratio: f64,
        seed: Option<u64>,
    ) -> Result<(), ControllerError> {
        self.stop()?;
        self.robot_mut()?
            .repopulate(obstacle_ratio, dirt_ratio, seed)?;
        self.start()
    }

    /// Stops any active run and returns the robot.
    pub fn into_robot(mut self) -> Result<Robot, ControllerError> {
        self.stop()?;
        self.robot.take().ok_or(ControllerError::RobotLost)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
            let _ = run.handle.join();
        }
    }
}
