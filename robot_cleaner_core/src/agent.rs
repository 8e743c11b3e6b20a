use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Position,
    cancel::CancellationToken,
    environment::{Environment, PopulateError},
    strategy::CleaningStrategy,
};

/// Display hook invoked after every successful move and every dirt cell cleaned.
///
/// Renderers only get read access to the cell states and the robot's position. Any
/// `FnMut(&Environment, Position) + Send` closure is a renderer.
pub trait Renderer: Send {
    fn render(&mut self, environment: &Environment, robot: Position);
}

impl<F> Renderer for F
where
    F: FnMut(&Environment, Position) + Send,
{
    fn render(&mut self, environment: &Environment, robot: Position) {
        self(environment, robot)
    }
}

/// Errors raised when placing a robot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RobotError {
    #[error("start position {0} is out of bounds")]
    OutOfBounds(Position),
    #[error("start position {0} is an obstacle")]
    Blocked(Position),
}

/// Summary of one [`Robot::start_cleaning`] invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub strategy: String,
    /// Successful moves that changed the robot's cell.
    pub moves: usize,
    /// Dirt cells the robot cleaned by standing on them.
    pub cells_cleaned: usize,
    pub cancelled: bool,
}

/// The cleaning robot.
///
/// Owns the environment for its whole lifetime and lends it to the active strategy on each run.
/// `position` is always an in-bounds, passable cell: it is checked on construction and by every
/// move.
pub struct Robot {
    position: Position,
    environment: Environment,
    strategy: Arc<dyn CleaningStrategy>,
    renderer: Option<Box<dyn Renderer>>,
    moves: usize,
    cells_cleaned: usize,
}

impl fmt::Debug for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Robot")
            .field("position", &self.position)
            .field("strategy", &self.strategy)
            .field("has_renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl Robot {
    /// Places a robot at `start` in `environment`.
    pub fn new(
        environment: Environment,
        start: Position,
        strategy: Box<dyn CleaningStrategy>,
    ) -> Result<Self, RobotError> {
        if !environment.in_bounds(start) {
            return Err(RobotError::OutOfBounds(start));
        }
        if environment.is_obstacle(start) {
            return Err(RobotError::Blocked(start));
        }
        Ok(Robot {
            position: start,
            environment,
            strategy: Arc::from(strategy),
            renderer: None,
            moves: 0,
            cells_cleaned: 0,
        })
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Direct grid writes, for strategies that need to bypass travel.
    pub(crate) fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn strategy(&self) -> &dyn CleaningStrategy {
        self.strategy.as_ref()
    }

    /// Swaps the active strategy. Takes `&mut self`, so it can never happen mid-run.
    pub fn set_strategy(&mut self, strategy: Box<dyn CleaningStrategy>) {
        debug!(from = self.strategy.name(), to = strategy.name(), "Switching strategy");
        self.strategy = Arc::from(strategy);
    }

    pub fn set_renderer<R>(&mut self, renderer: R)
    where
        R: Renderer + 'static,
    {
        self.renderer = Some(Box::new(renderer));
    }

    fn render(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&self.environment, self.position);
        }
    }

    /// Moves to `target` if it is in bounds and not an obstacle.
    ///
    /// Returns `false` and leaves the position unchanged otherwise.
    pub fn move_to(&mut self, target: Position) -> bool {
        if !self.environment.is_passable(target) {
            return false;
        }
        if target != self.position {
            self.moves += 1;
        }
        self.position = target;
        self.render();
        true
    }

    /// Cleans the current cell if it holds dirt. Returns whether anything was cleaned.
    pub fn clean_current_spot(&mut self) -> bool {
        if !self.environment.is_dirt(self.position) {
            return false;
        }
        self.environment.clean(self.position);
        self.cells_cleaned += 1;
        self.render();
        true
    }

    /// Follows `path`, cleaning after every step.
    ///
    /// Waypoints equal to the current position are skipped. Stops at the first move that fails
    /// and returns `false`; returns `true` once every waypoint was reached.
    pub fn move_along_path(&mut self, path: &[Position]) -> bool {
        for &waypoint in path {
            if waypoint == self.position {
                continue;
            }
            if !self.move_to(waypoint) {
                debug!(at = %self.position, blocked = %waypoint, "Path step rejected, stopping");
                return false;
            }
            self.clean_current_spot();
        }
        true
    }

    /// Runs the active strategy until it runs out of reachable work or `cancel` fires.
    pub fn start_cleaning(&mut self, cancel: &CancellationToken) -> RunReport {
        self.moves = 0;
        self.cells_cleaned = 0;

        let strategy = Arc::clone(&self.strategy);
        info!(strategy = strategy.name(), start = %self.position, "Cleaning run started");
        strategy.clean(self, cancel);

        let report = RunReport {
            strategy: strategy.name().to_string(),
            moves: self.moves,
            cells_cleaned: self.cells_cleaned,
            cancelled: cancel.is_cancelled(),
        };
        info!(
            strategy = strategy.name(),
            moves = report.moves,
            cleaned = report.cells_cleaned,
            cancelled = report.cancelled,
            "Cleaning run finished"
        );
        report
    }

    /// Re-populates the owned environment.
    ///
    /// If the robot's cell became an obstacle it is returned to the origin, which population
    /// always leaves passable.
    pub fn repopulate(
        &mut self,
        obstacle_ratio: f64,
        dirt_ratio: f64,
        seed: Option<u64>,
    ) -> Result<(), PopulateError> {
        self.environment
            .populate_random(obstacle_ratio, dirt_ratio, seed)?;
        if !self.environment.is_passable(self.position) {
            debug!(from = %self.position, "Robot cell blocked after repopulation, returning home");
            self.position = Position::ORIGIN;
        }
        self.render();
        Ok(())
    }
}
