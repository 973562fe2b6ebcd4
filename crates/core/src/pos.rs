//! Block positions and facing directions.
//!
//! Positions are integer voxel coordinates; directions are the six axis
//! aligned faces. Devices store a facing and derive their input/output
//! neighbours from it.

use serde::{Deserialize, Serialize};

/// One of the six axis-aligned block faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    /// Negative Y.
    Down = 0,
    /// Positive Y.
    Up = 1,
    /// Negative Z.
    North = 2,
    /// Positive Z.
    South = 3,
    /// Negative X.
    West = 4,
    /// Positive X.
    East = 5,
}

impl Direction {
    /// All directions in stable index order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Unit step `(dx, dy, dz)` for this direction.
    pub const fn step(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    /// Stable numeric representation (used in persisted block state).
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert from the stable numeric representation.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Direction::Down),
            1 => Some(Direction::Up),
            2 => Some(Direction::North),
            3 => Some(Direction::South),
            4 => Some(Direction::West),
            5 => Some(Direction::East),
            _ => None,
        }
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a new position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Neighbouring position one step towards `dir`.
    pub const fn relative(self, dir: Direction) -> Self {
        self.relative_n(dir, 1)
    }

    /// Position `n` steps towards `dir`.
    pub const fn relative_n(self, dir: Direction, n: i32) -> Self {
        let (dx, dy, dz) = dir.step();
        Self {
            x: self.x + dx * n,
            y: self.y + dy * n,
            z: self.z + dz * n,
        }
    }

    /// Position directly above.
    pub const fn above(self) -> Self {
        self.relative(Direction::Up)
    }

    /// Position directly below.
    pub const fn below(self) -> Self {
        self.relative(Direction::Down)
    }

    /// All six face neighbours in [`Direction::ALL`] order.
    pub fn neighbors(self) -> [BlockPos; 6] {
        Direction::ALL.map(|dir| self.relative(dir))
    }

    /// Block center as floating point coordinates.
    pub fn center(self) -> [f64; 3] {
        [
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        ]
    }

    /// Stable hash used to scope deterministic RNG streams.
    pub fn stable_hash(self) -> u64 {
        let x = self.x as u32 as u64;
        let y = self.y as u32 as u64;
        let z = self.z as u32 as u64;
        x.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ y.wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ z.wrapping_mul(0x1656_67B1_9E37_79F9)
    }
}
