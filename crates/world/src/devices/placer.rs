//! Factory block placer: places the items it holds as blocks or plants in
//! front of itself, and spits out what cannot be placed.

use super::{device_facing, Automaton};
use crate::access::{Aabb, Sound, WorldAccess};
use crate::cooldown::TickTimer;
use crate::fields::DeviceFields;
use crate::persist::{DeviceRecord, Persist};
use crate::round_robin::RoundRobin;
use crate::slots::SlotArray;
use crate::storage::{AccessPolicy, ItemHandler, SlotHandler, StorageProvider};
use crate::trigger::{self, LogicFlags, TriggerState};
use edautomation_core::{Block, BlockPos, DeviceKind, Direction};
use glam::DVec3;
use tracing::{debug, error};

/// Number of slots in a placer inventory.
pub const PLACER_SLOT_COUNT: usize = 18;
/// Ticks between two full evaluations.
pub const TICK_INTERVAL: u32 = 40;
/// How far along the facing spat-out items may land.
pub const SPIT_RANGE: i32 = 8;

const EXTERNAL_CHANGE_WAKE: u32 = 8;
const NEIGHBOR_UPDATE_WAKE: u32 = 4;

pub mod field {
    pub const LOGIC: usize = 0;
    pub const POWERED: usize = 1;
    pub const CURSOR: usize = 2;
    pub const COUNT: usize = 3;
}

/// Result of one placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Placed,
    SpitOut,
    NoSpace,
    Failed,
}

/// Placer block entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Placer {
    pos: BlockPos,
    facing: Direction,
    slots: SlotArray,
    cursor: RoundRobin,
    trigger: TriggerState,
    logic: LogicFlags,
    tick_timer: TickTimer,
    pulse: bool,
    dirty: bool,
}

impl Placer {
    pub fn new(pos: BlockPos, facing: Direction) -> Self {
        Self {
            pos,
            facing,
            slots: SlotArray::new(PLACER_SLOT_COUNT),
            cursor: RoundRobin::default(),
            trigger: TriggerState::default(),
            logic: LogicFlags::IGNORE_EXTERNAL | LogicFlags::CONTINUOUS,
            tick_timer: TickTimer::default(),
            pulse: false,
            dirty: false,
        }
    }

    pub fn slots(&self) -> &SlotArray {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut SlotArray {
        &mut self.slots
    }

    pub fn logic(&self) -> LogicFlags {
        self.logic
    }

    pub fn set_logic(&mut self, logic: LogicFlags) {
        self.logic = logic;
    }

    pub fn cursor(&self) -> usize {
        self.cursor.cursor()
    }

    pub fn tick_timer(&self) -> TickTimer {
        self.tick_timer
    }

    pub fn manual_trigger(&mut self) {
        self.pulse = true;
        self.tick_timer.shorten_to(1);
    }

    /// Where a block of `block` would go, or why it cannot be placed.
    fn placement_target(&self, world: &dyn WorldAccess, block: Block, triggered: bool) -> Result<BlockPos, Attempt> {
        let target = self.pos.relative(self.facing);
        let current = world.block_at(target);
        if let Block::Plant(_) = block {
            if current.is_air() {
                return if world.block_at(target.below()).sustains_plant() {
                    Ok(target)
                } else {
                    Err(Attempt::NoSpace)
                };
            }
            if current == block || !world.block_at(target.above()).is_air() {
                return Err(Attempt::NoSpace);
            }
            return if current.sustains_plant() {
                Ok(target.above())
            } else {
                Err(Attempt::Failed)
            };
        }
        if !current.is_replaceable() || self.obstructed(world, target, triggered) {
            return Err(Attempt::NoSpace);
        }
        Ok(target)
    }

    fn obstructed(&self, world: &dyn WorldAccess, target: BlockPos, triggered: bool) -> bool {
        if world.has_pickable_entity(target) {
            return true;
        }
        !triggered && !world.items_in(Aabb::block(target)).is_empty()
    }

    fn try_place(&mut self, world: &mut dyn WorldAccess, triggered: bool) -> bool {
        let target = self.pos.relative(self.facing);
        if world.has_block_entity(target) {
            return false;
        }
        let Some(index) = self.cursor.advance(self.slots.as_slice(), |_| true) else {
            return false;
        };
        let Some(stack) = self.slots.get(index).cloned() else {
            return false;
        };
        let Some(block) = stack.kind.placed_block() else {
            return self.spit_out(world, index, false);
        };

        let attempt = match self.placement_target(world, block, triggered) {
            Err(attempt) => attempt,
            Ok(at) => match world.place_block(at, block) {
                Ok(()) => {
                    self.slots.shrink(index, 1);
                    world.play_sound(at, Sound::PlaceBlock);
                    Attempt::Placed
                }
                Err(err) => {
                    error!(pos = ?self.pos, %err, "placement failed, spitting out the stack");
                    world.remove_block(at);
                    self.spit_out(world, index, true);
                    Attempt::SpitOut
                }
            },
        };
        debug!(pos = ?self.pos, ?attempt, "placer attempt");

        if attempt != Attempt::NoSpace && self.slots.get(index).is_some() {
            self.cursor.skip_to_occupied(self.slots.as_slice());
        }
        matches!(attempt, Attempt::Placed | Attempt::SpitOut)
    }

    /// Drop one item (or the whole stack) of slot `index` into the first
    /// empty position along the facing.
    fn spit_out(&mut self, world: &mut dyn WorldAccess, index: usize, all: bool) -> bool {
        let Some(stack) = self.slots.get(index).cloned() else {
            return false;
        };
        let count = if all { stack.count } else { 1 };
        for distance in 1..=SPIT_RANGE {
            let at = self.pos.relative_n(self.facing, distance);
            if !world.block_at(at).is_air() {
                continue;
            }
            let taken = self.slots.shrink(index, count);
            world.spawn_item(DVec3::from_array(at.center()), stack.with_count(taken), DVec3::ZERO);
            world.play_sound(self.pos, Sound::ItemPickup);
            return true;
        }
        false
    }
}

impl Automaton for Placer {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Placer
    }

    fn pos(&self) -> BlockPos {
        self.pos
    }

    fn facing(&self) -> Direction {
        self.facing
    }

    fn slots(&self) -> &SlotArray {
        &self.slots
    }

    fn tick(&mut self, world: &mut dyn WorldAccess) {
        if !self.tick_timer.poll(TICK_INTERVAL) {
            return;
        }
        let Some(facing) = device_facing(world, self.pos, DeviceKind::Placer) else {
            return;
        };
        self.facing = facing;

        let raw = world.has_neighbor_signal(self.pos);
        let mut outcome = trigger::evaluate(raw, self.logic, self.trigger);
        if std::mem::take(&mut self.pulse) {
            outcome = outcome.pulsed();
        }
        if outcome.changed {
            self.dirty = true;
        }
        self.trigger = outcome.state;

        let triggered = outcome.changed && outcome.rs_active;
        if outcome.fire && self.try_place(world, triggered) {
            self.dirty = true;
        }
    }

    fn neighbor_changed(&mut self, world: &dyn WorldAccess) {
        let level = trigger::active_level(world.has_neighbor_signal(self.pos), self.logic);
        if level != self.trigger.latched_signal {
            self.tick_timer.shorten_to(1);
        } else {
            self.tick_timer.shorten_to(NEIGHBOR_UPDATE_WAKE);
        }
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl StorageProvider for Placer {
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        true
    }

    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        let handler = SlotHandler::new(&mut self.slots, 0..PLACER_SLOT_COUNT, AccessPolicy::insert_only())
            .waking(&mut self.tick_timer, EXTERNAL_CHANGE_WAKE);
        Some(Box::new(handler))
    }

    fn automaton_facing(&self) -> Option<Direction> {
        Some(self.facing)
    }
}

impl Persist for Placer {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_bool("powered", self.trigger.latched_signal);
        record.put_int("act_slot_index", self.cursor.cursor() as i64);
        record.put_int("logic", self.logic.bits() as i64);
        record.put_int("tick_timer", self.tick_timer.remaining() as i64);
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        self.trigger = TriggerState {
            latched_signal: record.get_bool("powered"),
            signal_changed_this_tick: false,
        };
        self.cursor.set_cursor(
            record.get_clamped("act_slot_index", 0, PLACER_SLOT_COUNT as i64 - 1) as usize,
            PLACER_SLOT_COUNT,
        );
        let default_logic = (LogicFlags::IGNORE_EXTERNAL | LogicFlags::CONTINUOUS).bits() as i64;
        self.logic = LogicFlags::from_bits_truncate(
            record.get_clamped_or("logic", 0, i64::from(u32::MAX), default_logic) as u32,
        );
        self.tick_timer = TickTimer::new(record.get_clamped("tick_timer", 0, TICK_INTERVAL as i64) as u32);
        record.load_items("items", &mut self.slots);
    }
}

impl DeviceFields for Placer {
    fn field_count(&self) -> usize {
        field::COUNT
    }

    fn field(&self, id: usize) -> i32 {
        match id {
            field::LOGIC => self.logic.bits() as i32,
            field::POWERED => i32::from(self.trigger.latched_signal),
            field::CURSOR => self.cursor.cursor() as i32,
            _ => 0,
        }
    }

    fn set_field(&mut self, id: usize, value: i32) {
        match id {
            field::LOGIC => self.logic = LogicFlags::from_bits_truncate(value.max(0) as u32),
            field::POWERED => self.trigger.latched_signal = value != 0,
            field::CURSOR => self.cursor.set_cursor(
                value.clamp(0, PLACER_SLOT_COUNT as i32 - 1) as usize,
                PLACER_SLOT_COUNT,
            ),
            _ => {}
        }
    }

    fn apply_action(&mut self, action: &str, value: i32) -> bool {
        match action {
            "logic" => self.set_field(field::LOGIC, value),
            "manual_trigger" => self.manual_trigger(),
            _ => return false,
        }
        self.dirty = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edautomation_core::{items, ItemStack};

    #[test]
    fn insert_only_handler() {
        let mut placer = Placer::new(BlockPos::new(0, 0, 0), Direction::North);
        placer.slots_mut().set(0, Some(ItemStack::new(items::COBBLESTONE, 4)));
        let mut handler = placer.item_handler(None).unwrap();
        assert!(handler.extract(0, 4, false).is_none());
        assert!(handler.insert(1, ItemStack::new(items::STONE, 2), false).is_none());
    }

    #[test]
    fn record_roundtrip_keeps_defaults() {
        let placer = Placer::new(BlockPos::new(0, 0, 0), Direction::North);
        let mut restored = Placer::new(BlockPos::new(0, 0, 0), Direction::North);
        restored.set_logic(LogicFlags::empty());
        restored.load(&placer.save());
        assert_eq!(restored, placer);
    }
}
