use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::debug;

use super::CleaningStrategy;
use crate::{
    Position,
    agent::Robot,
    cancel::CancellationToken,
    map::Grid,
    pathfinding::{find_nearest, neighbors, shortest_path},
};

/// Randomized full coverage.
///
/// Wanders to a random unvisited neighbor while one exists, otherwise jumps along a shortest
/// path to the nearest unvisited reachable cell. Once nothing is left it returns to the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPath {
    /// Fixed seed for reproducible runs; `None` draws a fresh one from OS entropy each run.
    pub seed: Option<u64>,
}

impl RandomPath {
    pub fn seeded(seed: u64) -> Self {
        RandomPath { seed: Some(seed) }
    }
}

/// Per-run scratch state.
struct Walk<'a> {
    robot: &'a mut Robot,
    cancel: &'a CancellationToken,
    visited: Grid<bool>,
}

impl Walk<'_> {
    fn visit_current(&mut self) {
        self.robot.clean_current_spot();
        let here = self.robot.position();
        self.visited[here] = true;
    }

    fn is_unvisited(&self, position: Position) -> bool {
        self.visited.get(position) == Some(&false)
    }

    /// Follows `path`, visiting every cell it enters. Stops on cancellation or a rejected step.
    fn follow(&mut self, path: &[Position]) {
        for &waypoint in path {
            if self.cancel.is_cancelled() {
                return;
            }
            if waypoint == self.robot.position() {
                continue;
            }
            if !self.robot.move_to(waypoint) {
                debug!(blocked = %waypoint, "Path step rejected, stopping");
                return;
            }
            self.visit_current();
        }
    }

    fn step_randomly(&mut self, rng: &mut StdRng) -> bool {
        let mut options: Vec<Position> =
            neighbors(self.robot.environment(), self.robot.position()).collect();
        options.shuffle(rng);

        for next in options {
            if self.is_unvisited(next) && self.robot.move_to(next) {
                self.visit_current();
                return true;
            }
        }
        false
    }
}

impl CleaningStrategy for RandomPath {
    fn name(&self) -> &'static str {
        "random-path"
    }

    fn clean(&self, robot: &mut Robot, cancel: &CancellationToken) {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let environment = robot.environment();
        let visited = Grid::new(environment.width(), environment.height());
        let mut walk = Walk {
            robot,
            cancel,
            visited,
        };

        walk.visit_current();

        while !cancel.is_cancelled() {
            if walk.step_randomly(&mut rng) {
                continue;
            }

            let start = walk.robot.position();
            let environment = walk.robot.environment();
            let Some(target) = find_nearest(environment, start, |p| {
                environment.is_passable(p) && walk.is_unvisited(p)
            }) else {
                debug!(at = %start, "Every reachable cell visited");
                break;
            };
            let Some(path) = shortest_path(environment, start, target) else {
                debug!(%target, "Nearest unvisited cell unreachable, giving up");
                break;
            };

            walk.follow(&path);
            if walk.is_unvisited(target) && !cancel.is_cancelled() {
                // Could not get there; never chase the same cell twice.
                walk.visited[target] = true;
            }
        }

        if cancel.is_cancelled() {
            return;
        }
        let here = walk.robot.position();
        if let Some(home) = shortest_path(walk.robot.environment(), here, Position::ORIGIN) {
            walk.follow(&home);
        } else {
            debug!(at = %here, "Origin unreachable, staying put");
        }
        walk.robot.clean_current_spot();
    }
}
