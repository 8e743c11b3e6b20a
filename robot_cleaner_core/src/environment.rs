use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Position,
    map::{Grid, GridError},
};

/// Combined obstacle + dirt ratio above which a random map is rejected.
pub const MAX_COMBINED_RATIO: f64 = 0.8;

/// Represents the state of a single cell in the environment grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Empty,
    Dirt,
    Obstacle,
    Cleaned,
}

impl CellType {
    /// The one-character token used by the text map format.
    pub fn symbol(self) -> char {
        match self {
            CellType::Empty => '.',
            CellType::Dirt => 'D',
            CellType::Obstacle => '#',
            CellType::Cleaned => 'C',
        }
    }
}

/// Errors raised by [`Environment::populate_random`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PopulateError {
    #[error(
        "invalid ratios (obstacle {obstacle_ratio}, dirt {dirt_ratio}): both must be non-negative and sum to at most 0.8"
    )]
    InvalidRatios {
        obstacle_ratio: f64,
        dirt_ratio: f64,
    },
}

/// Errors raised while parsing a text map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapParseError {
    #[error("map string is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown map token '{token}' at {position}")]
    UnknownToken { token: String, position: Position },
    #[error("multiple robot start positions ('R') found")]
    MultipleStarts,
    #[error("robot start {0} is on an obstacle")]
    BlockedStart(Position),
}

/// Checks the population ratios without touching any grid.
pub fn validate_ratios(obstacle_ratio: f64, dirt_ratio: f64) -> Result<(), PopulateError> {
    // Written so that NaN fails every comparison and is rejected.
    let valid = obstacle_ratio >= 0.0
        && dirt_ratio >= 0.0
        && obstacle_ratio + dirt_ratio <= MAX_COMBINED_RATIO;
    if valid {
        Ok(())
    } else {
        Err(PopulateError::InvalidRatios {
            obstacle_ratio,
            dirt_ratio,
        })
    }
}

/// The floor the robot cleans: a fixed-size matrix of [`CellType`]s.
///
/// Read predicates never fail; out-of-bounds positions simply answer `false`. The environment
/// has no notion of where the robot is. That is the robot's own state, overlaid only when
/// rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    cells: Grid<CellType>,
}

impl Environment {
    /// Creates a new environment where every cell is [`CellType::Empty`].
    pub fn new(width: usize, height: usize) -> Self {
        Environment {
            cells: Grid::new(width, height),
        }
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    /// Read-only view of the cell matrix, e.g. for renderers.
    pub fn cells(&self) -> &Grid<CellType> {
        &self.cells
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        self.cells.contains(position)
    }

    pub fn cell(&self, position: Position) -> Option<CellType> {
        self.cells.get(position).copied()
    }

    /// `false` when out of bounds.
    pub fn is_obstacle(&self, position: Position) -> bool {
        self.cell(position) == Some(CellType::Obstacle)
    }

    /// `false` when out of bounds.
    pub fn is_dirt(&self, position: Position) -> bool {
        self.cell(position) == Some(CellType::Dirt)
    }

    /// In bounds and not an obstacle.
    pub fn is_passable(&self, position: Position) -> bool {
        matches!(self.cell(position), Some(cell) if cell != CellType::Obstacle)
    }

    pub fn add_obstacle(&mut self, position: Position) -> Result<(), GridError> {
        self.cells.set(position, CellType::Obstacle)
    }

    pub fn add_dirt(&mut self, position: Position) -> Result<(), GridError> {
        self.cells.set(position, CellType::Dirt)
    }

    /// Marks a cell as cleaned regardless of its prior state.
    ///
    /// Out-of-bounds positions are ignored. Cleaning is idempotent.
    pub fn clean(&mut self, position: Position) {
        if let Some(cell) = self.cells.get_mut(position) {
            *cell = CellType::Cleaned;
        }
    }

    /// Counts cells in the given state.
    pub fn count(&self, state: CellType) -> usize {
        self.cells.iter().filter(|cell| **cell == state).count()
    }

    /// Rewrites every cell with random obstacles and dirt.
    ///
    /// Each column keeps one randomly chosen empty row, and the origin is always empty, so no
    /// column is ever fully blocked. Other cells draw once from `[0, 1)`: below
    /// `obstacle_ratio` they become obstacles, below `obstacle_ratio + dirt_ratio` dirt, else
    /// empty. `seed = None` draws from OS entropy.
    ///
    /// Fails before any mutation if the ratios are negative or sum above
    /// [`MAX_COMBINED_RATIO`].
    pub fn populate_random(
        &mut self,
        obstacle_ratio: f64,
        dirt_ratio: f64,
        seed: Option<u64>,
    ) -> Result<(), PopulateError> {
        validate_ratios(obstacle_ratio, dirt_ratio)?;

        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        for x in 0..width {
            let guaranteed_empty_y = rng.random_range(0..height);
            for y in 0..height {
                let position = Position::new(x, y);
                let cell = if position == Position::ORIGIN || y == guaranteed_empty_y {
                    CellType::Empty
                } else {
                    let r: f64 = rng.random();
                    if r < obstacle_ratio {
                        CellType::Obstacle
                    } else if r < obstacle_ratio + dirt_ratio {
                        CellType::Dirt
                    } else {
                        CellType::Empty
                    }
                };
                self.cells[position] = cell;
            }
        }

        debug!(
            width,
            height,
            obstacles = self.count(CellType::Obstacle),
            dirt = self.count(CellType::Dirt),
            "Populated random map"
        );
        Ok(())
    }

    /// Renders the map in the text map format, marking `robot` with `R`.
    pub fn render(&self, robot: Option<Position>) -> String {
        let mut out = String::with_capacity(self.width() * self.height() * 2);
        for y in 0..self.height() {
            for x in 0..self.width() {
                let position = Position::new(x, y);
                if x > 0 {
                    out.push(' ');
                }
                if robot == Some(position) {
                    out.push('R');
                } else {
                    out.push(self.cells[position].symbol());
                }
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

/// Loads an environment from the text map format.
///
/// One row per line, cells separated by whitespace: `.` empty, `D` dirt, `#` obstacle,
/// `C` cleaned, `R` robot start (an empty cell). Returns the environment together with the
/// robot start, which defaults to the origin when no `R` is present.
pub fn load_environment_from_string(
    map_string: &str,
) -> Result<(Environment, Position), MapParseError> {
    let lines: Vec<&str> = map_string.trim().lines().collect();
    if lines.is_empty() {
        return Err(MapParseError::Empty);
    }

    let height = lines.len();
    let mut width = 0;
    let mut parsed_rows: Vec<Vec<&str>> = Vec::with_capacity(height);

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if y == 0 {
            width = tokens.len();
        } else if tokens.len() != width {
            return Err(MapParseError::RaggedRow {
                row: y,
                expected: width,
                found: tokens.len(),
            });
        }
        parsed_rows.push(tokens);
    }

    let mut environment = Environment::new(width, height);
    let mut start_position: Option<Position> = None;

    for (y, row_tokens) in parsed_rows.iter().enumerate() {
        for (x, token) in row_tokens.iter().enumerate() {
            let position = Position::new(x, y);
            let cell = match *token {
                "." => CellType::Empty,
                "D" => CellType::Dirt,
                "#" => CellType::Obstacle,
                "C" => CellType::Cleaned,
                "R" => {
                    if start_position.is_some() {
                        return Err(MapParseError::MultipleStarts);
                    }
                    start_position = Some(position);
                    CellType::Empty
                }
                unknown => {
                    return Err(MapParseError::UnknownToken {
                        token: unknown.to_string(),
                        position,
                    });
                }
            };
            environment.cells[position] = cell;
        }
    }

    let start = start_position.unwrap_or(Position::ORIGIN);
    if environment.is_obstacle(start) {
        return Err(MapParseError::BlockedStart(start));
    }
    Ok((environment, start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_predicates_are_false_out_of_bounds() {
        let env = Environment::new(2, 2);
        let outside = Position::new(5, 0);
        assert!(!env.in_bounds(outside));
        assert!(!env.is_obstacle(outside));
        assert!(!env.is_dirt(outside));
        assert!(!env.is_passable(outside));
        assert_eq!(env.cell(outside), None);
    }

    #[test]
    fn clean_is_idempotent_and_ignores_out_of_bounds() {
        let mut env = Environment::new(3, 1);
        env.add_dirt(Position::new(1, 0)).unwrap();

        env.clean(Position::new(1, 0));
        let once = env.clone();
        env.clean(Position::new(1, 0));
        assert_eq!(env, once);
        assert_eq!(env.cell(Position::new(1, 0)), Some(CellType::Cleaned));

        env.clean(Position::new(0, 0));
        assert_eq!(env.cell(Position::new(0, 0)), Some(CellType::Cleaned));

        env.clean(Position::new(9, 9));
        assert_eq!(env.count(CellType::Cleaned), 2);
    }

    #[test]
    fn writes_out_of_bounds_fail_loudly() {
        let mut env = Environment::new(2, 2);
        assert!(env.add_obstacle(Position::new(2, 0)).is_err());
        assert!(env.add_dirt(Position::new(0, 2)).is_err());
        assert_eq!(env.count(CellType::Empty), 4);
    }

    #[test]
    fn populate_rejects_bad_ratios_without_mutation() {
        let mut env = Environment::new(3, 3);
        env.add_dirt(Position::new(1, 1)).unwrap();
        let before = env.clone();

        for (obstacle, dirt) in [(-0.1, 0.2), (0.2, -0.1), (0.5, 0.31), (f64::NAN, 0.1)] {
            let result = env.populate_random(obstacle, dirt, Some(1));
            assert!(
                matches!(result, Err(PopulateError::InvalidRatios { .. })),
                "{obstacle} {dirt}"
            );
            assert_eq!(env, before);
        }
        assert!(env.populate_random(0.4, 0.4, Some(1)).is_ok());
    }

    #[test]
    fn populate_keeps_origin_and_one_cell_per_column_open() {
        for seed in 0..50 {
            let mut env = Environment::new(8, 6);
            env.populate_random(0.7, 0.1, Some(seed)).unwrap();
            assert_eq!(env.cell(Position::ORIGIN), Some(CellType::Empty));
            for x in 0..env.width() {
                assert!(
                    (0..env.height()).any(|y| env.is_passable(Position::new(x, y))),
                    "column {x} fully blocked for seed {seed}"
                );
            }
        }
    }

    #[test]
    fn populate_is_deterministic_for_a_seed() {
        let mut a = Environment::new(10, 5);
        let mut b = Environment::new(10, 5);
        a.populate_random(0.12, 0.25, Some(42)).unwrap();
        b.populate_random(0.12, 0.25, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn populate_with_zero_ratios_is_all_empty() {
        let mut env = Environment::new(4, 4);
        env.add_obstacle(Position::new(3, 3)).unwrap();
        env.clean(Position::new(2, 2));
        env.populate_random(0.0, 0.0, None).unwrap();
        assert_eq!(env.count(CellType::Empty), 16);
    }

    #[test]
    fn loads_and_renders_text_maps() {
        let text = "
            . D #
            C R .
        ";
        let (env, start) = load_environment_from_string(text).unwrap();
        assert_eq!(start, Position::new(1, 1));
        assert_eq!((env.width(), env.height()), (3, 2));
        assert!(env.is_dirt(Position::new(1, 0)));
        assert!(env.is_obstacle(Position::new(2, 0)));
        assert_eq!(env.cell(Position::new(0, 1)), Some(CellType::Cleaned));
        assert_eq!(env.render(Some(start)), ". D #\nC R .\n");
        assert_eq!(env.to_string(), ". D #\nC . .\n");
    }

    #[test]
    fn load_reports_malformed_maps() {
        assert_eq!(load_environment_from_string("  \n "), Err(MapParseError::Empty));
        assert_eq!(
            load_environment_from_string(". .\n."),
            Err(MapParseError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            load_environment_from_string("R R"),
            Err(MapParseError::MultipleStarts)
        );
        assert_eq!(
            load_environment_from_string("# ."),
            Err(MapParseError::BlockedStart(Position::ORIGIN))
        );
        assert!(matches!(
            load_environment_from_string(". x"),
            Err(MapParseError::UnknownToken { .. })
        ));
    }
}
