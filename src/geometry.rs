//! Grid coordinates and cardinal headings.
//!
//! `y` grows downward: row 0 is the surface, the last row is the deepest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell coordinate on the grid. Signed so that neighbor arithmetic can
/// step off the edge and be rejected by a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighboring cell one step in `direction`
    #[inline]
    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Squared Euclidean distance
    #[inline]
    pub fn distance_sq(self, other: Position) -> i64 {
        let dx = (other.x - self.x) as i64;
        let dy = (other.y - self.y) as i64;
        dx * dx + dy * dy
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Cardinal heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    North,
    #[default]
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit step `(dx, dy)` for this heading
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Heading along the dominant axis of `(dx, dy)`.
    ///
    /// The horizontal axis wins ties. Returns `None` for a zero offset.
    pub fn toward(dx: i32, dy: i32) -> Option<Direction> {
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx != 0 && dx.abs() >= dy.abs() {
            Some(if dx > 0 { Direction::East } else { Direction::West })
        } else {
            Some(if dy > 0 { Direction::South } else { Direction::North })
        }
    }

    /// Parse a heading name (`n`, `north`, `up`, ...), case-insensitive
    pub fn parse(name: &str) -> Option<Direction> {
        match name.trim().to_ascii_lowercase().as_str() {
            "n" | "north" | "up" => Some(Direction::North),
            "e" | "east" | "right" => Some(Direction::East),
            "s" | "south" | "down" => Some(Direction::South),
            "w" | "west" | "left" => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}
