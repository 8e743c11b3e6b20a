use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod environment;
pub mod map;
pub mod pathfinding;
pub mod strategy;

/// Represents a 2D coordinate on the cleaning grid.
///
/// `x` is the column, `y` the row. Coordinates are unsigned, so stepping off the top or left edge
/// is caught by [`Position::offset`]; stepping off the bottom or right edge is caught by the
/// grid's bounds checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    /// The home cell every populated map keeps passable.
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if either coordinate would go
    /// negative.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// The four cardinal movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    /// Order in which passable neighbors are enumerated. BFS tie-breaks depend on it.
    pub const NEIGHBOR_ORDER: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    /// Order in which the depth-first coverage tries to advance.
    pub const COVERAGE_ORDER: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    /// Returns the `(dx, dy)` step. `y` grows downwards.
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
            Direction::Up => (0, -1),
        }
    }
}
