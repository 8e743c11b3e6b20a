//! Breadth-first search over the passable cells of an [`Environment`].
//!
//! Edges are exactly what [`neighbors`] yields, in its fixed Right/Left/Down/Up order, so both
//! searches are deterministic: equal-distance ties go to whichever cell was enqueued first.
//! The start cell is always visitable, even if it is an obstacle. Only expansion checks
//! passability.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{Direction, Position, environment::Environment};

/// Lazily yields the in-bounds, non-obstacle cardinal neighbors of `position`,
/// in Right, Left, Down, Up order.
pub fn neighbors(
    environment: &Environment,
    position: Position,
) -> impl Iterator<Item = Position> + '_ {
    Direction::NEIGHBOR_ORDER
        .into_iter()
        .filter_map(move |direction| position.step(direction))
        .filter(move |neighbor| environment.is_passable(*neighbor))
}

/// Returns the reachable cell closest to `start` (by BFS distance) that satisfies `predicate`.
///
/// The predicate is evaluated as cells are dequeued, starting with `start` itself, so a matching
/// start is returned immediately. Returns `None` when no reachable cell matches.
pub fn find_nearest<P>(
    environment: &Environment,
    start: Position,
    mut predicate: P,
) -> Option<Position>
where
    P: FnMut(Position) -> bool,
{
    let mut frontier = VecDeque::from([start]);
    let mut visited = HashSet::from([start]);

    while let Some(current) = frontier.pop_front() {
        if predicate(current) {
            return Some(current);
        }
        for neighbor in neighbors(environment, current) {
            if visited.insert(neighbor) {
                frontier.push_back(neighbor);
            }
        }
    }

    None
}

/// Computes a shortest path from `start` to `goal`, both inclusive.
///
/// Returns `Some(vec![start])` when `start == goal` and `None` when `goal` is unreachable.
pub fn shortest_path(
    environment: &Environment,
    start: Position,
    goal: Position,
) -> Option<Vec<Position>> {
    let mut frontier = VecDeque::from([start]);
    let mut visited = HashSet::from([start]);
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut goal_reached = false;

    while let Some(current) = frontier.pop_front() {
        if current == goal {
            goal_reached = true;
            break;
        }
        for neighbor in neighbors(environment, current) {
            if visited.insert(neighbor) {
                came_from.insert(neighbor, current);
                frontier.push_back(neighbor);
            }
        }
    }

    if !goal_reached {
        return None;
    }

    // Reconstruct path
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = *came_from.get(&current)?;
        path.push(current);
    }

    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::load_environment_from_string;

    fn env(text: &str) -> Environment {
        load_environment_from_string(text).unwrap().0
    }

    #[test]
    fn neighbors_follow_right_left_down_up() {
        let open = Environment::new(3, 3);
        let around: Vec<Position> = neighbors(&open, Position::new(1, 1)).collect();
        assert_eq!(
            around,
            vec![
                Position::new(2, 1),
                Position::new(0, 1),
                Position::new(1, 2),
                Position::new(1, 0),
            ]
        );
    }

    #[test]
    fn neighbors_skip_edges_and_obstacles() {
        let walled = env("
            . #
            . .
        ");
        let around: Vec<Position> = neighbors(&walled, Position::ORIGIN).collect();
        assert_eq!(around, vec![Position::new(0, 1)]);
    }

    #[test]
    fn path_to_self_is_single_cell() {
        let open = Environment::new(2, 2);
        assert_eq!(
            shortest_path(&open, Position::new(1, 1), Position::new(1, 1)),
            Some(vec![Position::new(1, 1)])
        );
    }

    #[test]
    fn path_routes_around_a_wall() {
        let walled = env("
            . # .
            . # .
            . . .
        ");
        let path = shortest_path(&walled, Position::ORIGIN, Position::new(2, 0)).unwrap();
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), Some(&Position::ORIGIN));
        assert_eq!(path.last(), Some(&Position::new(2, 0)));
        assert!(path.iter().all(|p| walled.is_passable(*p)));
    }

    #[test]
    fn sealed_goal_is_unreachable() {
        let sealed = env("
            . # .
            # . .
        ");
        assert_eq!(shortest_path(&sealed, Position::ORIGIN, Position::new(2, 1)), None);
        assert_eq!(
            find_nearest(&sealed, Position::ORIGIN, |p| p == Position::new(1, 1)),
            None
        );
    }

    #[test]
    fn start_on_obstacle_is_still_expanded() {
        let mut open = Environment::new(3, 1);
        open.add_obstacle(Position::ORIGIN).unwrap();
        assert_eq!(
            shortest_path(&open, Position::ORIGIN, Position::new(2, 0)),
            Some(vec![
                Position::ORIGIN,
                Position::new(1, 0),
                Position::new(2, 0)
            ])
        );
    }

    #[test]
    fn nearest_returns_matching_start() {
        let dirty = env("D D");
        assert_eq!(
            find_nearest(&dirty, Position::ORIGIN, |p| dirty.is_dirt(p)),
            Some(Position::ORIGIN)
        );
    }

    #[test]
    fn nearest_breaks_ties_by_neighbor_order() {
        // Both targets are two steps away; (2,1) is enqueued first because Right precedes Left.
        let open = Environment::new(3, 3);
        let targets = [Position::new(0, 1), Position::new(2, 1)];
        assert_eq!(
            find_nearest(&open, Position::new(1, 0), |p| targets.contains(&p)),
            Some(Position::new(2, 1))
        );
    }
}
