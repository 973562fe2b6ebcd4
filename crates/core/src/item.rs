//! Item system - kinds, stacks and the compatibility predicate used by every
//! transfer path.

use crate::block::{Block, BlockId};
use serde::{Deserialize, Serialize};

/// Default maximum stack size.
pub const DEFAULT_STACK_SIZE: u32 = 64;

/// Item kind identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A placeable solid block
    Block(BlockId),
    /// A plant that needs soil underneath when placed
    Plant(BlockId),
    /// Generic item (no block form)
    Item(u16),
    /// Tools and other non-stacking items
    Tool(u16),
}

/// Well-known kinds the devices reason about.
pub mod items {
    use super::ItemKind;
    use crate::block::blocks;

    /// Cobblestone (cooled-down smelter output).
    pub const COBBLESTONE: ItemKind = ItemKind::Block(blocks::COBBLESTONE);
    /// Stone, an accepted smelter mineral.
    pub const STONE: ItemKind = ItemKind::Block(blocks::STONE);
    /// Magma block (intermediate smelter product).
    pub const MAGMA_BLOCK: ItemKind = ItemKind::Block(blocks::MAGMA_BLOCK);
    /// Obsidian (cooled-down magma).
    pub const OBSIDIAN: ItemKind = ItemKind::Block(blocks::OBSIDIAN);
    /// Wheat seeds, placed as a plant.
    pub const WHEAT_SEEDS: ItemKind = ItemKind::Plant(blocks::WHEAT);
    /// Empty bucket.
    pub const BUCKET: ItemKind = ItemKind::Item(1);
    /// Bucket filled with lava.
    pub const LAVA_BUCKET: ItemKind = ItemKind::Item(2);
    /// Stick, a generic item without block form.
    pub const STICK: ItemKind = ItemKind::Item(3);

    /// Minerals the mineral smelter accepts as input.
    pub const SMELTER_MINERALS: &[ItemKind] = &[
        COBBLESTONE,
        STONE,
        ItemKind::Block(blocks::GRANITE),
        ItemKind::Block(blocks::DIORITE),
        ItemKind::Block(blocks::ANDESITE),
    ];
}

impl ItemKind {
    /// Maximum stack size for this item kind
    pub fn max_stack_size(self) -> u32 {
        match self {
            ItemKind::Tool(_) => 1,
            items::LAVA_BUCKET => 1,
            items::BUCKET => 16,
            ItemKind::Block(_) | ItemKind::Plant(_) | ItemKind::Item(_) => DEFAULT_STACK_SIZE,
        }
    }

    /// Whether more than one of this kind fits into a slot.
    pub fn is_stackable(self) -> bool {
        self.max_stack_size() > 1
    }

    /// The block this item turns into when placed, if any.
    pub fn placed_block(self) -> Option<Block> {
        match self {
            ItemKind::Block(id) => Some(Block::Solid(id)),
            ItemKind::Plant(id) => Some(Block::Plant(id)),
            ItemKind::Item(_) | ItemKind::Tool(_) => None,
        }
    }
}

/// An item stack in a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Kind of item
    pub kind: ItemKind,
    /// Quantity in stack
    pub count: u32,
    /// Optional auxiliary metadata (damage, names, ...). Part of the
    /// compatibility predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<u8>>,
}

impl ItemStack {
    /// Create a new item stack without metadata
    pub fn new(kind: ItemKind, count: u32) -> Self {
        Self {
            kind,
            count,
            tag: None,
        }
    }

    /// Create an item stack carrying metadata.
    pub fn with_tag(kind: ItemKind, count: u32, tag: Vec<u8>) -> Self {
        Self {
            kind,
            count,
            tag: Some(tag),
        }
    }

    /// Maximum stack size for this stack's kind
    pub fn max_stack_size(&self) -> u32 {
        self.kind.max_stack_size()
    }

    /// Check if this stack is empty (count 0)
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Two stacks are compatible iff kind and metadata match.
    pub fn is_compatible(&self, other: &ItemStack) -> bool {
        self.kind == other.kind && self.tag == other.tag
    }

    /// Remaining room in this stack
    pub fn space_left(&self) -> u32 {
        self.max_stack_size().saturating_sub(self.count)
    }

    /// Same kind and metadata with a different count.
    pub fn with_count(&self, count: u32) -> Self {
        Self {
            kind: self.kind,
            count,
            tag: self.tag.clone(),
        }
    }

    /// Add up to `amount` items, returning how many were added.
    pub fn grow(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.space_left());
        self.count += added;
        added
    }

    /// Remove up to `amount` items, returning how many were removed.
    pub fn shrink(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.count);
        self.count -= removed;
        removed
    }

    /// Split off up to `amount` items into a new stack.
    pub fn split(&mut self, amount: u32) -> ItemStack {
        let taken = self.shrink(amount);
        self.with_count(taken)
    }
}

/// Normalize a slot: zero-count stacks become empty.
pub fn normalized(slot: Option<ItemStack>) -> Option<ItemStack> {
    slot.filter(|stack| !stack.is_empty())
}
