use tracing::{debug, warn};

use super::CleaningStrategy;
use crate::{
    Position, agent::Robot, cancel::CancellationToken, environment::Environment,
    pathfinding::shortest_path,
};

/// Boustrophedon ("S"/lawnmower) sweep.
///
/// Rows are swept top to bottom, left to right first and then alternating. Each row is cut into
/// maximal runs of passable cells; the robot routes to the entry of each run and sweeps it with
/// adjacent moves. Runs whose entry is unreachable at that moment are skipped, so layouts with
/// disconnected pockets can leave cells unswept.
#[derive(Debug, Clone, Copy, Default)]
pub struct SPattern;

/// Maximal runs of passable cells in row `y`, each listed in traversal order.
fn row_segments(environment: &Environment, y: usize, rightward: bool) -> Vec<Vec<Position>> {
    let mut row: Vec<Position> = (0..environment.width())
        .map(|x| Position::new(x, y))
        .collect();
    if !rightward {
        row.reverse();
    }
    row.split(|cell| !environment.is_passable(*cell))
        .filter(|segment| !segment.is_empty())
        .map(<[Position]>::to_vec)
        .collect()
}

impl CleaningStrategy for SPattern {
    fn name(&self) -> &'static str {
        "s-pattern"
    }

    fn clean(&self, robot: &mut Robot, cancel: &CancellationToken) {
        robot.clean_current_spot();

        let mut rightward = true;
        for y in 0..robot.environment().height() {
            if cancel.is_cancelled() {
                return;
            }
            for segment in row_segments(robot.environment(), y, rightward) {
                if cancel.is_cancelled() {
                    return;
                }
                let entry = segment[0];
                let Some(route) = shortest_path(robot.environment(), robot.position(), entry)
                else {
                    debug!(%entry, "Segment entry unreachable, skipping");
                    continue;
                };
                if !robot.move_along_path(&route) {
                    debug!(%entry, "Route to segment interrupted, skipping");
                    continue;
                }

                for cell in segment {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if cell != robot.position() && !robot.move_to(cell) {
                        warn!(at = %robot.position(), blocked = %cell, "Sweep step rejected, abandoning segment");
                        break;
                    }
                    robot.clean_current_spot();
                }
            }
            rightward = !rightward;
        }
    }
}
