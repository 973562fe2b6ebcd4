//! The world as seen from inside a device tick.
//!
//! Devices never hold on to the world; the host lends a `&mut dyn
//! WorldAccess` for the duration of one tick and every neighbour is
//! re-resolved through it.

use crate::storage::StorageProvider;
use edautomation_core::{Block, BlockPos, ItemStack, SimTick};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Block state property a device may drive for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualField {
    /// Dropper shutter.
    Open,
    /// Incinerator fire.
    Lit,
    /// Smelter melt phase.
    Phase,
}

/// Sounds devices emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sound {
    ShutterOpen,
    ShutterClose,
    Drop,
    ItemPickup,
    PlaceBlock,
    LavaAmbient,
    FireAmbient,
    Extinguish,
    BucketFillLava,
}

/// Identifier of a free-floating item entity.
pub type ItemEntityId = u64;

/// Snapshot of an item entity near a device.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemEntityView {
    /// Entity id.
    pub id: ItemEntityId,
    /// Position.
    pub pos: DVec3,
    /// Velocity.
    pub velocity: DVec3,
    /// Carried stack.
    pub stack: ItemStack,
    /// Resting on a surface.
    pub on_ground: bool,
    /// Ticks until the entity may be picked up by regular means.
    pub pickup_delay: u32,
}

/// Axis-aligned box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb {
    /// Unit box of a block.
    pub fn block(pos: BlockPos) -> Self {
        let min = DVec3::new(pos.x as f64, pos.y as f64, pos.z as f64);
        Self {
            min,
            max: min + DVec3::ONE,
        }
    }

    /// Grow by the given amount on each side of each axis.
    pub fn inflate(self, x: f64, y: f64, z: f64) -> Self {
        let delta = DVec3::new(x, y, z);
        Self {
            min: self.min - delta,
            max: self.max + delta,
        }
    }

    /// Whether `point` lies inside the box.
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Failure reported by the host when a block cannot be set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The host refused to place a block at this position.
    #[error("block placement at {0:?} was rejected")]
    Rejected(BlockPos),
}

/// Host services available to a device during its tick.
pub trait WorldAccess {
    /// Current game tick.
    fn game_time(&self) -> SimTick;

    /// World seed for deterministic randomness.
    fn seed(&self) -> u64;

    /// Block at `pos`.
    fn block_at(&self, pos: BlockPos) -> Block;

    /// Whether any neighbour of `pos` emits a redstone signal into it.
    fn has_neighbor_signal(&self, pos: BlockPos) -> bool;

    /// Storage-exposing block entity at `pos`.
    fn storage_at(&mut self, pos: BlockPos) -> Option<&mut dyn StorageProvider>;

    /// Whether any block entity lives at `pos`.
    fn has_block_entity(&self, pos: BlockPos) -> bool;

    /// Item entities inside `area`.
    fn items_in(&self, area: Aabb) -> Vec<ItemEntityView>;

    /// Replace the stack of an item entity; `None` removes the entity.
    fn set_item_entity_stack(&mut self, id: ItemEntityId, stack: Option<ItemStack>);

    /// Whether a living or otherwise pickable entity occupies `pos`.
    fn has_pickable_entity(&self, pos: BlockPos) -> bool;

    /// Spawn a free item entity.
    fn spawn_item(&mut self, pos: DVec3, stack: ItemStack, velocity: DVec3);

    /// Set a block.
    fn place_block(&mut self, pos: BlockPos, block: Block) -> Result<(), PlacementError>;

    /// Turn `pos` into air.
    fn remove_block(&mut self, pos: BlockPos);

    /// Displayed block state property.
    fn visible_state(&self, pos: BlockPos, field: VisualField) -> i32;

    /// Update a displayed block state property.
    fn set_visible_state(&mut self, pos: BlockPos, field: VisualField, value: i32);

    /// Play a sound at `pos`.
    fn play_sound(&mut self, pos: BlockPos, sound: Sound);

    /// Offer `amount` millibuckets of lava to the fluid handler at `pos`.
    /// Returns the amount accepted.
    fn fill_fluid(&mut self, _pos: BlockPos, _amount: u32) -> u32 {
        0
    }
}
