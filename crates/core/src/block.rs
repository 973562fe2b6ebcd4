//! Block identifiers and the coarse block classification the devices need.

use crate::pos::Direction;
use serde::{Deserialize, Serialize};

/// Block identifier referencing the block registry.
pub type BlockId = u16;

/// Stable block ids for the blocks the devices produce or inspect.
#[allow(missing_docs)]
pub mod blocks {
    use super::BlockId;

    pub const STONE: BlockId = 1;
    pub const DIRT: BlockId = 2;
    pub const GRASS: BlockId = 3;
    pub const COBBLESTONE: BlockId = 4;
    pub const FARMLAND: BlockId = 5;
    pub const GRANITE: BlockId = 6;
    pub const DIORITE: BlockId = 7;
    pub const ANDESITE: BlockId = 8;
    pub const MAGMA_BLOCK: BlockId = 9;
    pub const OBSIDIAN: BlockId = 10;
    pub const TALL_GRASS: BlockId = 11;
    pub const WHEAT: BlockId = 12;
}

/// Automation device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Factory hopper.
    Hopper,
    /// Factory dropper.
    Dropper,
    /// Factory block placer.
    Placer,
    /// Small waste incinerator.
    Incinerator,
    /// Small mineral smelter.
    MineralSmelter,
}

/// Coarse view of a block as seen by the devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum Block {
    /// Empty space.
    #[default]
    Air,
    /// Flowing or still fluid (replaceable by placement).
    Fluid,
    /// Non-solid block that placement may replace (tall grass, snow layer).
    Replaceable(BlockId),
    /// Ordinary solid block.
    Solid(BlockId),
    /// Solid block that sustains plants.
    Soil(BlockId),
    /// A planted crop or sapling.
    Plant(BlockId),
    /// An automation device with its facing.
    Device {
        /// Device family.
        kind: DeviceKind,
        /// Output facing.
        facing: Direction,
    },
}

impl Block {
    /// Whether this position counts as empty space.
    pub fn is_air(self) -> bool {
        matches!(self, Block::Air)
    }

    /// Whether a block placement may overwrite this block.
    pub fn is_replaceable(self) -> bool {
        matches!(self, Block::Air | Block::Fluid | Block::Replaceable(_))
    }

    /// Whether a plant can grow on top of this block.
    pub fn sustains_plant(self) -> bool {
        matches!(self, Block::Soil(_))
    }

    /// Facing of an automation device, if this is one.
    pub fn device_facing(self) -> Option<Direction> {
        match self {
            Block::Device { facing, .. } => Some(facing),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaceable_classification() {
        assert!(Block::Air.is_replaceable());
        assert!(Block::Fluid.is_replaceable());
        assert!(Block::Replaceable(blocks::TALL_GRASS).is_replaceable());
        assert!(!Block::Solid(blocks::STONE).is_replaceable());
        assert!(!Block::Soil(blocks::DIRT).is_replaceable());
    }

    #[test]
    fn device_facing_only_for_devices() {
        let hopper = Block::Device {
            kind: DeviceKind::Hopper,
            facing: Direction::Down,
        };
        assert_eq!(hopper.device_facing(), Some(Direction::Down));
        assert_eq!(Block::Solid(blocks::STONE).device_facing(), None);
    }
}
