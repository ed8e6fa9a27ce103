use serde::{Deserialize, Serialize};
use std::ops::Add;

/// A cell on the playfield (column, row)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const ORIGIN: Cell = Cell { x: 0, y: 0 };

    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wrap into `[0, width) x [0, height)`
    #[inline]
    pub fn wrapped(self, width: u32, height: u32) -> Self {
        Self {
            x: self.x.rem_euclid(width as i32),
            y: self.y.rem_euclid(height as i32),
        }
    }

    /// The neighbouring cell one step in `dir`, wrapping across edges
    #[inline]
    pub fn step(self, dir: Direction, width: u32, height: u32) -> Self {
        (self + dir.step()).wrapped(width, height)
    }

    /// Squared distance along the shortest wraparound path on each axis
    pub fn toroidal_distance_sq(self, other: Cell, width: u32, height: u32) -> i64 {
        let dx = wrap_delta(self.x - other.x, width);
        let dy = wrap_delta(self.y - other.y, height);
        dx * dx + dy * dy
    }
}

fn wrap_delta(delta: i32, dimension: u32) -> i64 {
    let d = delta.rem_euclid(dimension as i32) as i64;
    d.min(dimension as i64 - d)
}

/// Raw unit step as it travels on the wire: `{ "x": 1, "y": 0 }`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub x: i32,
    pub y: i32,
}

impl Add<Step> for Cell {
    type Output = Cell;

    #[inline]
    fn add(self, step: Step) -> Cell {
        Cell::new(self.x + step.x, self.y + step.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Not a cardinal unit step: ({0}, {1})")]
pub struct InvalidDirection(pub i32, pub i32);

/// One of the four cardinal moves. Diagonals and zero steps are unrepresentable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "Step", into = "Step")]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    #[inline]
    pub fn step(self) -> Step {
        match self {
            Direction::Right => Step { x: 1, y: 0 },
            Direction::Left => Step { x: -1, y: 0 },
            Direction::Down => Step { x: 0, y: 1 },
            Direction::Up => Step { x: 0, y: -1 },
        }
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
        }
    }

    #[inline]
    pub fn is_reverse_of(self, other: Direction) -> bool {
        self.opposite() == other
    }
}

impl TryFrom<Step> for Direction {
    type Error = InvalidDirection;

    fn try_from(step: Step) -> Result<Self, Self::Error> {
        match (step.x, step.y) {
            (1, 0) => Ok(Direction::Right),
            (-1, 0) => Ok(Direction::Left),
            (0, 1) => Ok(Direction::Down),
            (0, -1) => Ok(Direction::Up),
            (x, y) => Err(InvalidDirection(x, y)),
        }
    }
}

impl From<Direction> for Step {
    fn from(dir: Direction) -> Step {
        dir.step()
    }
}
