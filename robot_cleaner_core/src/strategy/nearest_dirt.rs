use tracing::{debug, warn};

use super::CleaningStrategy;
use crate::{
    Position,
    agent::Robot,
    cancel::CancellationToken,
    environment::CellType,
    pathfinding::{find_nearest, shortest_path},
};

/// Repeatedly routes to the closest remaining dirt until none is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestDirt;

impl CleaningStrategy for NearestDirt {
    fn name(&self) -> &'static str {
        "nearest-dirt"
    }

    fn clean(&self, robot: &mut Robot, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            // Starting on dirt would otherwise make the start its own nearest target forever.
            robot.clean_current_spot();

            let from = robot.position();
            let environment = robot.environment();
            let Some(target) = find_nearest(environment, from, |p| environment.is_dirt(p)) else {
                write_off_unreachable_dirt(robot);
                break;
            };

            let Some(path) = shortest_path(environment, from, target) else {
                // Forward progress: never pick the same unreachable target twice.
                debug!(%target, "Dirt unreachable, marking it cleaned");
                robot.environment_mut().clean(target);
                continue;
            };

            if !robot.move_along_path(&path) {
                warn!(%target, "Route to dirt interrupted, marking it cleaned");
                robot.environment_mut().clean(target);
            }
            robot.clean_current_spot();
        }
    }
}

/// Marks every dirt cell left after the search ran dry as cleaned. None of them is reachable
/// from the robot, so it never visits them.
fn write_off_unreachable_dirt(robot: &mut Robot) {
    let stranded: Vec<Position> = robot
        .environment()
        .cells()
        .enumerate()
        .filter(|(_, cell)| **cell == CellType::Dirt)
        .map(|(position, _)| position)
        .collect();
    debug!(at = %robot.position(), stranded = stranded.len(), "No reachable dirt left");
    for position in stranded {
        robot.environment_mut().clean(position);
    }
}
