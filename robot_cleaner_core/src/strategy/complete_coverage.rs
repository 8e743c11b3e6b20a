use tracing::{debug, warn};

use super::CleaningStrategy;
use crate::{Direction, Position, agent::Robot, cancel::CancellationToken, map::Grid};

/// Depth-first coverage with explicit backtracking.
///
/// Visits every cell of the robot's reachable component exactly once without any map
/// foreknowledge, retracing its own steps out of dead ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteCoverage;

impl CleaningStrategy for CompleteCoverage {
    fn name(&self) -> &'static str {
        "complete-coverage"
    }

    fn clean(&self, robot: &mut Robot, cancel: &CancellationToken) {
        let environment = robot.environment();
        let mut visited: Grid<bool> = Grid::new(environment.width(), environment.height());
        let mut stack: Vec<Position> = Vec::new();

        visited[robot.position()] = true;
        robot.clean_current_spot();

        'scan: while !cancel.is_cancelled() {
            let current = robot.position();
            for direction in Direction::COVERAGE_ORDER {
                if cancel.is_cancelled() {
                    return;
                }
                let Some(next) = current.step(direction) else {
                    continue;
                };
                if !robot.environment().is_passable(next) || visited[next] {
                    continue;
                }

                // Marked before moving so a rejected move cannot be retried forever.
                visited[next] = true;
                if robot.move_to(next) {
                    stack.push(current);
                    robot.clean_current_spot();
                } else {
                    warn!(from = %current, to = %next, "Coverage step rejected");
                }
                continue 'scan;
            }

            let Some(back) = stack.pop() else {
                debug!(visited = visited.iter().filter(|v| **v).count(), "Coverage complete");
                break;
            };
            // Backtracking neither re-marks nor re-cleans.
            if !robot.move_to(back) {
                warn!(from = %current, to = %back, "Backtrack step rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, load_environment_from_string};

    #[test]
    fn snakes_right_then_down_first() {
        let (environment, start) = load_environment_from_string("R .\n. .").unwrap();
        let mut robot = Robot::new(environment, start, Box::new(CompleteCoverage)).unwrap();

        let trail = std::sync::Arc::new(std::sync::Mutex::new(vec![start]));
        let sink = trail.clone();
        robot.set_renderer(move |_: &Environment, at: Position| {
            let mut trail = sink.lock().unwrap();
            if trail.last() != Some(&at) {
                trail.push(at);
            }
        });
        robot.start_cleaning(&CancellationToken::new());

        // Right, Down, Left, then backtrack the way it came.
        assert_eq!(
            *trail.lock().unwrap(),
            vec![
                Position::new(0, 0),
                Position::new(1, 0),
                Position::new(1, 1),
                Position::new(0, 1),
                Position::new(1, 1),
                Position::new(1, 0),
                Position::new(0, 0),
            ]
        );
    }
}
