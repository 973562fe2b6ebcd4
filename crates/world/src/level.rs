//! In-memory host for the devices.
//!
//! [`Level`] owns blocks, block entities, redstone sources, item entities and
//! the displayed block states of a small sparse world, and implements
//! [`WorldAccess`] so devices can be ticked against it. Every side effect a
//! device produces is also appended to an event log so runs can be compared.

use crate::access::{
    Aabb, ItemEntityId, ItemEntityView, PlacementError, Sound, VisualField, WorldAccess,
};
use crate::config::AutomationConfig;
use crate::containers::{Cabinet, Chest};
use crate::devices::{Automaton, Device};
use crate::persist::{DeviceRecord, Persist, PersistError};
use crate::slots::SlotArray;
use crate::storage::{ItemHandler, LegacyInventory, StorageProvider};
use edautomation_core::{Block, BlockPos, DeviceKind, Direction, ItemStack, SimTick};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Item entities despawn after five minutes.
pub const ITEM_DESPAWN_TICKS: u32 = 6000;

const GRAVITY: f64 = 0.04;
const DRAG: f64 = 0.98;
const VOID_Y: f64 = -64.0;

/// Block entity stored at a position.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEntity {
    Device(Device),
    Chest(Chest),
    Cabinet(Cabinet),
}

impl BlockEntity {
    fn slots(&self) -> &SlotArray {
        match self {
            BlockEntity::Device(device) => device.automaton().slots(),
            BlockEntity::Chest(chest) => chest.slots(),
            BlockEntity::Cabinet(cabinet) => cabinet.slots(),
        }
    }

    fn slots_mut(&mut self) -> &mut SlotArray {
        match self {
            BlockEntity::Device(device) => device.slots_mut(),
            BlockEntity::Chest(chest) => chest.slots_mut(),
            BlockEntity::Cabinet(cabinet) => cabinet.slots_mut(),
        }
    }
}

impl StorageProvider for BlockEntity {
    fn has_item_handler(&self, side: Option<Direction>) -> bool {
        match self {
            BlockEntity::Device(device) => device.has_item_handler(side),
            BlockEntity::Chest(chest) => chest.has_item_handler(side),
            BlockEntity::Cabinet(cabinet) => cabinet.has_item_handler(side),
        }
    }

    fn item_handler(&mut self, side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        match self {
            BlockEntity::Device(device) => device.item_handler(side),
            BlockEntity::Chest(chest) => chest.item_handler(side),
            BlockEntity::Cabinet(cabinet) => cabinet.item_handler(side),
        }
    }

    fn legacy_inventory(&mut self) -> Option<&mut dyn LegacyInventory> {
        match self {
            BlockEntity::Device(device) => device.legacy_inventory(),
            BlockEntity::Chest(chest) => chest.legacy_inventory(),
            BlockEntity::Cabinet(cabinet) => cabinet.legacy_inventory(),
        }
    }

    fn automaton_facing(&self) -> Option<Direction> {
        match self {
            BlockEntity::Device(device) => device.automaton_facing(),
            _ => None,
        }
    }

    fn automaton_pull_side(&self) -> Option<Direction> {
        match self {
            BlockEntity::Device(device) => device.automaton_pull_side(),
            _ => None,
        }
    }
}

/// Free-floating item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntity {
    pub id: ItemEntityId,
    pub pos: DVec3,
    pub velocity: DVec3,
    pub stack: ItemStack,
    pub on_ground: bool,
    pub pickup_delay: u32,
    pub lifetime_ticks: u32,
}

impl ItemEntity {
    fn view(&self) -> ItemEntityView {
        ItemEntityView {
            id: self.id,
            pos: self.pos,
            velocity: self.velocity,
            stack: self.stack.clone(),
            on_ground: self.on_ground,
            pickup_delay: self.pickup_delay,
        }
    }
}

/// Observable side effect recorded by the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LevelEvent {
    Sound { tick: u64, pos: BlockPos, sound: Sound },
    ItemSpawned { tick: u64, id: ItemEntityId, stack: ItemStack, pos: [f64; 3], velocity: [f64; 3] },
    BlockPlaced { tick: u64, pos: BlockPos, block: Block },
    BlockRemoved { tick: u64, pos: BlockPos },
    VisualChanged { tick: u64, pos: BlockPos, field: VisualField, value: i32 },
    FluidPushed { tick: u64, pos: BlockPos, amount: u32 },
}

impl LevelEvent {
    /// Tick the event was recorded on.
    pub fn tick(&self) -> u64 {
        match self {
            LevelEvent::Sound { tick, .. }
            | LevelEvent::ItemSpawned { tick, .. }
            | LevelEvent::BlockPlaced { tick, .. }
            | LevelEvent::BlockRemoved { tick, .. }
            | LevelEvent::VisualChanged { tick, .. }
            | LevelEvent::FluidPushed { tick, .. } => *tick,
        }
    }

    /// Short name used when logging the event.
    pub fn label(&self) -> &'static str {
        match self {
            LevelEvent::Sound { .. } => "sound",
            LevelEvent::ItemSpawned { .. } => "item_spawned",
            LevelEvent::BlockPlaced { .. } => "block_placed",
            LevelEvent::BlockRemoved { .. } => "block_removed",
            LevelEvent::VisualChanged { .. } => "visual_changed",
            LevelEvent::FluidPushed { .. } => "fluid_pushed",
        }
    }
}

/// Persisted device together with where and how it was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedDevice {
    pub pos: BlockPos,
    pub kind: DeviceKind,
    pub facing: Direction,
    pub record: DeviceRecord,
}

/// Sparse world the devices are ticked in.
#[derive(Debug, Clone)]
pub struct Level {
    seed: u64,
    tick: SimTick,
    config: AutomationConfig,
    blocks: BTreeMap<BlockPos, Block>,
    entities: BTreeMap<BlockPos, BlockEntity>,
    signals: BTreeSet<BlockPos>,
    items: BTreeMap<ItemEntityId, ItemEntity>,
    next_item_id: ItemEntityId,
    visuals: BTreeMap<(BlockPos, VisualField), i32>,
    pickable: BTreeSet<BlockPos>,
    rejected: BTreeSet<BlockPos>,
    fluid_sinks: BTreeMap<BlockPos, (u32, u32)>,
    events: Vec<LevelEvent>,
}

impl Level {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, AutomationConfig::default())
    }

    pub fn with_config(seed: u64, config: AutomationConfig) -> Self {
        Self {
            seed,
            tick: SimTick::ZERO,
            config: config.clamped(),
            blocks: BTreeMap::new(),
            entities: BTreeMap::new(),
            signals: BTreeSet::new(),
            items: BTreeMap::new(),
            next_item_id: 1,
            visuals: BTreeMap::new(),
            pickable: BTreeSet::new(),
            rejected: BTreeSet::new(),
            fluid_sinks: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub fn tick_count(&self) -> SimTick {
        self.tick
    }

    /// Set a plain block. Any block entity at `pos` is discarded.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) {
        self.entities.remove(&pos);
        self.write_block(pos, block);
        self.notify_neighbors(pos);
    }

    /// Place a fresh device.
    pub fn place_device(&mut self, pos: BlockPos, kind: DeviceKind, facing: Direction) {
        let device = Device::new(kind, pos, facing, &self.config);
        self.install_device(pos, kind, facing, device);
    }

    /// Place a device and restore it from `record`.
    pub fn place_device_with_record(
        &mut self,
        pos: BlockPos,
        kind: DeviceKind,
        facing: Direction,
        record: &DeviceRecord,
    ) {
        let mut device = Device::new(kind, pos, facing, &self.config);
        device.load(record);
        self.install_device(pos, kind, facing, device);
    }

    fn install_device(&mut self, pos: BlockPos, kind: DeviceKind, facing: Direction, device: Device) {
        debug!(?pos, ?kind, ?facing, "placing device");
        self.write_block(pos, Block::Device { kind, facing });
        self.entities.insert(pos, BlockEntity::Device(device));
        self.notify_neighbors(pos);
    }

    /// Change the facing of the device block at `pos` without touching its
    /// block entity, as a wrench would.
    pub fn rotate_device(&mut self, pos: BlockPos, facing: Direction) {
        if let Block::Device { kind, .. } = self.block_at(pos) {
            self.write_block(pos, Block::Device { kind, facing });
        }
    }

    pub fn place_chest(&mut self, pos: BlockPos) {
        self.write_block(pos, Block::Solid(0));
        self.entities.insert(pos, BlockEntity::Chest(Chest::default()));
        self.notify_neighbors(pos);
    }

    pub fn place_cabinet(&mut self, pos: BlockPos) {
        self.write_block(pos, Block::Solid(0));
        self.entities.insert(pos, BlockEntity::Cabinet(Cabinet::default()));
        self.notify_neighbors(pos);
    }

    /// Break the block at `pos`, returning the saved state of a device that
    /// lived there. Devices with empty inventories leave no record.
    pub fn break_block(&mut self, pos: BlockPos) -> Option<DeviceRecord> {
        let record = match self.entities.remove(&pos) {
            Some(BlockEntity::Device(device)) if !device.automaton().slots().all_empty() => {
                Some(device.save())
            }
            _ => None,
        };
        self.blocks.remove(&pos);
        self.visuals.retain(|(at, _), _| *at != pos);
        self.notify_neighbors(pos);
        record
    }

    pub fn device(&self, pos: BlockPos) -> Option<&Device> {
        match self.entities.get(&pos) {
            Some(BlockEntity::Device(device)) => Some(device),
            _ => None,
        }
    }

    pub fn device_mut(&mut self, pos: BlockPos) -> Option<&mut Device> {
        match self.entities.get_mut(&pos) {
            Some(BlockEntity::Device(device)) => Some(device),
            _ => None,
        }
    }

    /// Slots of whatever block entity lives at `pos`.
    pub fn slots_at(&self, pos: BlockPos) -> Option<&SlotArray> {
        self.entities.get(&pos).map(BlockEntity::slots)
    }

    /// Mutable slots of a chest or cabinet at `pos`.
    pub fn slots_at_mut(&mut self, pos: BlockPos) -> Option<&mut SlotArray> {
        self.entities.get_mut(&pos).map(BlockEntity::slots_mut)
    }

    /// Turn a redstone source at `pos` on or off. Devices next to it are
    /// notified.
    pub fn set_signal(&mut self, pos: BlockPos, powered: bool) {
        let changed = if powered {
            self.signals.insert(pos)
        } else {
            self.signals.remove(&pos)
        };
        if changed {
            trace!(?pos, powered, "signal changed");
            self.notify_neighbors(pos);
        }
    }

    /// Mark `pos` as occupied by a living entity.
    pub fn set_pickable_entity(&mut self, pos: BlockPos, present: bool) {
        if present {
            self.pickable.insert(pos);
        } else {
            self.pickable.remove(&pos);
        }
    }

    /// Make the next placements at `pos` fail.
    pub fn reject_placement_at(&mut self, pos: BlockPos) {
        self.rejected.insert(pos);
    }

    /// Add a lava sink (e.g. a tank below a smelter) holding up to `capacity`.
    pub fn add_fluid_sink(&mut self, pos: BlockPos, capacity: u32) {
        self.fluid_sinks.insert(pos, (0, capacity));
    }

    pub fn fluid_in(&self, pos: BlockPos) -> u32 {
        self.fluid_sinks.get(&pos).map_or(0, |(amount, _)| *amount)
    }

    /// Feed energy to the device at `pos`, returning the amount accepted.
    pub fn feed_energy(&mut self, pos: BlockPos, amount: u32) -> u32 {
        self.device_mut(pos)
            .and_then(|device| device.automaton_mut().battery_mut())
            .map_or(0, |battery| battery.receive(amount, false))
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemEntity> {
        self.items.values()
    }

    /// Total of all loose item counts.
    pub fn loose_item_count(&self) -> u64 {
        self.items.values().map(|item| u64::from(item.stack.count)).sum()
    }

    /// Drop an item entity with no velocity and no pickup delay.
    pub fn drop_item(&mut self, pos: DVec3, stack: ItemStack) -> ItemEntityId {
        self.add_item(pos, stack, DVec3::ZERO, 0)
    }

    pub fn events(&self) -> &[LevelEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LevelEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one game tick: every device in position order, then item
    /// physics.
    pub fn tick(&mut self) {
        let positions: Vec<BlockPos> = self
            .entities
            .iter()
            .filter(|(_, entity)| matches!(entity, BlockEntity::Device(_)))
            .map(|(pos, _)| *pos)
            .collect();
        for pos in positions {
            let Some(BlockEntity::Device(mut device)) = self.entities.remove(&pos) else {
                continue;
            };
            let automaton = device.automaton_mut();
            automaton.tick(self);
            if automaton.take_dirty() {
                trace!(?pos, kind = ?automaton.kind(), tick = self.tick.0, "device changed");
            }
            // A device that removed its own block is gone.
            if matches!(self.block_at(pos), Block::Device { .. }) {
                self.entities.insert(pos, BlockEntity::Device(device));
            }
        }
        self.update_items();
        self.tick = self.tick.advance(1);
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Saved state of every device, in position order.
    pub fn save_devices(&self) -> Vec<SavedDevice> {
        self.entities
            .iter()
            .filter_map(|(pos, entity)| match entity {
                BlockEntity::Device(device) => {
                    let automaton = device.automaton();
                    Some(SavedDevice {
                        pos: *pos,
                        kind: automaton.kind(),
                        facing: self.block_at(*pos).device_facing().unwrap_or(automaton.facing()),
                        record: device.save(),
                    })
                }
                _ => None,
            })
            .collect()
    }

    pub fn save_devices_json(&self) -> Result<String, PersistError> {
        serde_json::to_string_pretty(&self.save_devices()).map_err(PersistError::Encode)
    }

    /// Restore devices saved by [`Level::save_devices`].
    pub fn load_devices(&mut self, saved: &[SavedDevice]) {
        for entry in saved {
            self.place_device_with_record(entry.pos, entry.kind, entry.facing, &entry.record);
        }
    }

    pub fn load_devices_json(&mut self, json: &str) -> Result<usize, PersistError> {
        let saved: Vec<SavedDevice> = serde_json::from_str(json).map_err(PersistError::Decode)?;
        self.load_devices(&saved);
        Ok(saved.len())
    }

    fn write_block(&mut self, pos: BlockPos, block: Block) {
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    fn notify_neighbors(&mut self, origin: BlockPos) {
        for pos in origin.neighbors() {
            let Some(BlockEntity::Device(mut device)) = self.entities.remove(&pos) else {
                continue;
            };
            device.automaton_mut().neighbor_changed(self);
            self.entities.insert(pos, BlockEntity::Device(device));
        }
    }

    fn add_item(&mut self, pos: DVec3, stack: ItemStack, velocity: DVec3, pickup_delay: u32) -> ItemEntityId {
        let id = self.next_item_id;
        self.next_item_id += 1;
        self.events.push(LevelEvent::ItemSpawned {
            tick: self.tick.0,
            id,
            stack: stack.clone(),
            pos: pos.to_array(),
            velocity: velocity.to_array(),
        });
        self.items.insert(
            id,
            ItemEntity {
                id,
                pos,
                velocity,
                stack,
                on_ground: false,
                pickup_delay,
                lifetime_ticks: ITEM_DESPAWN_TICKS,
            },
        );
        id
    }

    fn stops_items(block: Block) -> bool {
        !block.is_replaceable() && !matches!(block, Block::Plant(_))
    }

    fn cell_of(point: DVec3) -> BlockPos {
        let cell = point.floor();
        BlockPos::new(cell.x as i32, cell.y as i32, cell.z as i32)
    }

    fn update_items(&mut self) {
        let mut landed_on = Vec::new();
        let mut expired = Vec::new();
        let blocks = &self.blocks;
        let block_at = |pos: BlockPos| blocks.get(&pos).copied().unwrap_or_default();

        for item in self.items.values_mut() {
            item.pickup_delay = item.pickup_delay.saturating_sub(1);
            item.lifetime_ticks = item.lifetime_ticks.saturating_sub(1);
            if item.lifetime_ticks == 0 || item.pos.y < VOID_Y {
                expired.push(item.id);
                continue;
            }
            if item.on_ground {
                let support = Self::cell_of(item.pos - DVec3::new(0.0, 0.01, 0.0));
                if Self::stops_items(block_at(support)) {
                    continue;
                }
                item.on_ground = false;
            }
            item.velocity.y -= GRAVITY;
            item.velocity *= DRAG;
            let next = item.pos + item.velocity;
            let cell = Self::cell_of(next);
            if item.velocity.y <= 0.0 && Self::stops_items(block_at(cell)) {
                item.pos = DVec3::new(next.x, f64::from(cell.y) + 1.0, next.z);
                item.velocity = DVec3::ZERO;
                item.on_ground = true;
                landed_on.push(cell);
            } else {
                item.pos = next;
            }
        }

        for id in expired {
            trace!(id, "item entity despawned");
            self.items.remove(&id);
        }
        for pos in landed_on {
            if let Some(BlockEntity::Device(Device::Hopper(hopper))) = self.entities.get_mut(&pos) {
                hopper.item_landed();
            }
        }
    }
}

impl WorldAccess for Level {
    fn game_time(&self) -> SimTick {
        self.tick
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn block_at(&self, pos: BlockPos) -> Block {
        self.blocks.get(&pos).copied().unwrap_or_default()
    }

    fn has_neighbor_signal(&self, pos: BlockPos) -> bool {
        pos.neighbors().iter().any(|neighbor| self.signals.contains(neighbor))
    }

    fn storage_at(&mut self, pos: BlockPos) -> Option<&mut dyn StorageProvider> {
        self.entities
            .get_mut(&pos)
            .map(|entity| entity as &mut dyn StorageProvider)
    }

    fn has_block_entity(&self, pos: BlockPos) -> bool {
        self.entities.contains_key(&pos)
    }

    fn items_in(&self, area: Aabb) -> Vec<ItemEntityView> {
        self.items
            .values()
            .filter(|item| area.contains(item.pos))
            .map(ItemEntity::view)
            .collect()
    }

    fn set_item_entity_stack(&mut self, id: ItemEntityId, stack: Option<ItemStack>) {
        match stack.filter(|s| !s.is_empty()) {
            Some(stack) => {
                if let Some(item) = self.items.get_mut(&id) {
                    item.stack = stack;
                }
            }
            None => {
                self.items.remove(&id);
            }
        }
    }

    fn has_pickable_entity(&self, pos: BlockPos) -> bool {
        self.pickable.contains(&pos)
    }

    fn spawn_item(&mut self, pos: DVec3, stack: ItemStack, velocity: DVec3) {
        if !stack.is_empty() {
            self.add_item(pos, stack, velocity, 10);
        }
    }

    fn place_block(&mut self, pos: BlockPos, block: Block) -> Result<(), PlacementError> {
        if self.rejected.contains(&pos) {
            return Err(PlacementError::Rejected(pos));
        }
        self.write_block(pos, block);
        self.events.push(LevelEvent::BlockPlaced {
            tick: self.tick.0,
            pos,
            block,
        });
        Ok(())
    }

    fn remove_block(&mut self, pos: BlockPos) {
        self.blocks.remove(&pos);
        self.events.push(LevelEvent::BlockRemoved { tick: self.tick.0, pos });
    }

    fn visible_state(&self, pos: BlockPos, field: VisualField) -> i32 {
        self.visuals.get(&(pos, field)).copied().unwrap_or(0)
    }

    fn set_visible_state(&mut self, pos: BlockPos, field: VisualField, value: i32) {
        self.visuals.insert((pos, field), value);
        self.events.push(LevelEvent::VisualChanged {
            tick: self.tick.0,
            pos,
            field,
            value,
        });
    }

    fn play_sound(&mut self, pos: BlockPos, sound: Sound) {
        self.events.push(LevelEvent::Sound {
            tick: self.tick.0,
            pos,
            sound,
        });
    }

    fn fill_fluid(&mut self, pos: BlockPos, amount: u32) -> u32 {
        let Some((stored, capacity)) = self.fluid_sinks.get_mut(&pos) else {
            return 0;
        };
        let accepted = amount.min(capacity.saturating_sub(*stored));
        *stored += accepted;
        if accepted > 0 {
            self.events.push(LevelEvent::FluidPushed {
                tick: self.tick.0,
                pos,
                amount: accepted,
            });
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edautomation_core::items;

    #[test]
    fn items_fall_and_land_on_solid_blocks() {
        let mut level = Level::new(1);
        level.set_block(BlockPos::new(0, 0, 0), Block::Solid(1));
        let id = level.drop_item(DVec3::new(0.5, 3.0, 0.5), ItemStack::new(items::STICK, 2));
        level.run(40);
        let item = level.items().find(|item| item.id == id).unwrap();
        assert!(item.on_ground);
        assert_eq!(item.pos.y, 1.0);
    }

    #[test]
    fn signals_reach_direct_neighbors_only() {
        let mut level = Level::new(1);
        level.set_signal(BlockPos::new(1, 0, 0), true);
        assert!(level.has_neighbor_signal(BlockPos::new(0, 0, 0)));
        assert!(!level.has_neighbor_signal(BlockPos::new(-1, 0, 0)));
        level.set_signal(BlockPos::new(1, 0, 0), false);
        assert!(!level.has_neighbor_signal(BlockPos::new(0, 0, 0)));
    }

    #[test]
    fn breaking_an_empty_device_leaves_no_record() {
        let mut level = Level::new(1);
        let pos = BlockPos::new(0, 2, 0);
        level.place_device(pos, DeviceKind::Hopper, Direction::Down);
        assert!(level.break_block(pos).is_none());
        assert!(level.device(pos).is_none());
    }

    #[test]
    fn rejected_placement_reports_error() {
        let mut level = Level::new(1);
        let pos = BlockPos::new(0, 5, 0);
        level.reject_placement_at(pos);
        assert_eq!(
            level.place_block(pos, Block::Solid(1)),
            Err(PlacementError::Rejected(pos))
        );
        assert!(level.block_at(pos).is_air());
    }

    #[test]
    fn fluid_sink_caps_at_capacity() {
        let mut level = Level::new(1);
        let pos = BlockPos::new(0, -1, 0);
        level.add_fluid_sink(pos, 150);
        assert_eq!(level.fill_fluid(pos, 100), 100);
        assert_eq!(level.fill_fluid(pos, 100), 50);
        assert_eq!(level.fluid_in(pos), 150);
        assert_eq!(level.fill_fluid(BlockPos::new(9, 9, 9), 100), 0);
    }
}
