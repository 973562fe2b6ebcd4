//! Factory hopper: pulls from the block on its input side (or picks up
//! loose items) and pushes into the block it faces.

use super::{device_facing, Automaton};
use crate::access::{Aabb, WorldAccess};
use crate::cooldown::{Countdown, TickTimer};
use crate::fields::DeviceFields;
use crate::persist::{DeviceRecord, Persist};
use crate::round_robin::RoundRobin;
use crate::slots::SlotArray;
use crate::storage::{self, AccessPolicy, ItemHandler, LegacyInventory, SlotHandler, StorageProvider};
use crate::transfer::{self, MAX_TRANSFER_COUNT};
use crate::trigger::{self, LogicFlags, TriggerFlags, TriggerState};
use edautomation_core::{BlockPos, DeviceKind, Direction};
use glam::DVec3;
use tracing::debug;

/// Number of slots in a hopper inventory.
pub const HOPPER_SLOT_COUNT: usize = 18;
/// Ticks between two full evaluations.
pub const TICK_INTERVAL: u32 = 10;
/// Ticks between two ranged collection sweeps.
pub const COLLECTION_INTERVAL: u32 = 50;
/// Largest collection range (blocks added around the input side).
pub const MAX_COLLECTION_RANGE: u32 = 4;
/// Base delay after an insertion.
pub const PERIOD_OFFSET: u32 = 10;

const MAX_PERIOD: u32 = 100;
const MAX_DELAY: u32 = 400;
const MAX_RANGED_PICKUPS: usize = 3;
const DIRECT_PICKUP_DIST_SQ: f64 = 0.7;
const EXTERNAL_CHANGE_WAKE: u32 = 8;

/// Field ids exposed to the UI.
pub mod field {
    pub const RANGE: usize = 0;
    pub const XSIZE: usize = 1;
    pub const LOGIC: usize = 2;
    pub const PERIOD: usize = 3;
    pub const DELAY: usize = 4;
    pub const POWERED: usize = 5;
    pub const CURSOR: usize = 6;
    pub const COUNT: usize = 7;
}

/// Hopper block entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Hopper {
    pos: BlockPos,
    facing: Direction,
    slots: SlotArray,
    cursor: RoundRobin,
    trigger: TriggerState,
    logic: LogicFlags,
    transfer_count: u32,
    period: u32,
    range: u32,
    tick_timer: TickTimer,
    delay_timer: Countdown,
    collection_timer: Countdown,
    pulse: bool,
    dirty: bool,
}

impl Hopper {
    pub fn new(pos: BlockPos, facing: Direction) -> Self {
        Self {
            pos,
            facing,
            slots: SlotArray::new(HOPPER_SLOT_COUNT),
            cursor: RoundRobin::default(),
            trigger: TriggerState::default(),
            logic: LogicFlags::INVERTED | LogicFlags::CONTINUOUS,
            transfer_count: 1,
            period: 0,
            range: 0,
            tick_timer: TickTimer::default(),
            delay_timer: Countdown::default(),
            collection_timer: Countdown::default(),
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

    pub fn transfer_count(&self) -> u32 {
        self.transfer_count
    }

    /// Items moved per insertion (1..=32).
    pub fn set_transfer_count(&mut self, count: u32) {
        self.transfer_count = count.clamp(1, MAX_TRANSFER_COUNT);
    }

    pub fn set_period(&mut self, period: u32) {
        self.period = period.min(MAX_PERIOD);
    }

    pub fn set_range(&mut self, range: u32) {
        self.range = range.min(MAX_COLLECTION_RANGE);
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.trigger
    }

    pub fn tick_timer(&self) -> TickTimer {
        self.tick_timer
    }

    pub fn set_tick_timer(&mut self, remaining: u32) {
        self.tick_timer = TickTimer::new(remaining);
    }

    pub fn delay_timer(&self) -> Countdown {
        self.delay_timer
    }

    pub fn cursor(&self) -> usize {
        self.cursor.cursor()
    }

    /// Request a single insertion on the next evaluation.
    pub fn manual_trigger(&mut self) {
        self.pulse = true;
        self.tick_timer.shorten_to(1);
    }

    /// An item entity came to rest on top of the hopper.
    pub fn item_landed(&mut self) {
        self.tick_timer.shorten_to(1);
    }

    fn input_side(&self) -> Direction {
        if self.facing == Direction::Up {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    fn collect(&mut self, world: &mut dyn WorldAccess) {
        let input = self.input_side();
        let source = self.pos.relative(input);
        let range = self.slots.full_range();
        let pulled = match world.storage_at(source) {
            Some(provider) => storage::resolve(provider, Some(input.opposite())).map(|mut neighbor| {
                transfer::extract(
                    &mut neighbor,
                    input,
                    &mut self.slots,
                    range,
                    self.transfer_count,
                )
            }),
            None => None,
        };
        match pulled {
            Some(moved) => {
                if moved > 0 {
                    self.dirty = true;
                }
            }
            None => {
                if self.collection_timer.restart_if_due(TICK_INTERVAL, COLLECTION_INTERVAL)
                    && self.collect_loose_items(world, input)
                {
                    self.dirty = true;
                }
            }
        }
    }

    fn collect_loose_items(&mut self, world: &mut dyn WorldAccess, input: Direction) -> bool {
        let [cx, cy, cz] = self.pos.center();
        let reach = 0.1 + self.range as f64;
        let (reference, area) = if input == Direction::Up {
            (
                DVec3::new(cx, cy + 1.0, cz),
                Aabb::block(self.pos.above()).inflate(reach, 0.6, reach),
            )
        } else {
            (
                DVec3::new(cx, cy - 1.0, cz),
                Aabb::block(self.pos.relative_n(Direction::Down, 2)).inflate(reach, 1.0, reach),
            )
        };

        let mut collected_any = false;
        let mut ranged = 0;
        for item in world.items_in(area) {
            if !item.on_ground {
                continue;
            }
            let direct = item.pos.distance_squared(reference) < DIRECT_PICKUP_DIST_SQ;
            if !direct && item.pickup_delay > 0 {
                continue;
            }
            let accepted = self.slots.insert_stacked_all(&item.stack);
            if accepted == 0 {
                continue;
            }
            collected_any = true;
            let rest = item.stack.with_count(item.stack.count - accepted);
            world.set_item_entity_stack(item.id, Some(rest).filter(|s| !s.is_empty()));
            if !direct {
                ranged += 1;
                if ranged >= MAX_RANGED_PICKUPS {
                    break;
                }
            }
        }
        collected_any
    }

    fn insert(&mut self, world: &mut dyn WorldAccess) {
        let len = self.slots.len();
        let Some(index) = self.cursor.advance(self.slots.as_slice(), |_| true) else {
            return;
        };
        let Some(stack) = self.slots.get(index).cloned() else {
            return;
        };
        let target = self.pos.relative(self.facing);
        let Some(provider) = world.storage_at(target) else {
            debug!(pos = ?self.pos, "hopper has no output endpoint, backing off");
            self.delay_timer.set(TICK_INTERVAL + 2);
            return;
        };
        let Some(mut neighbor) = storage::resolve(provider, Some(self.facing.opposite())) else {
            debug!(pos = ?self.pos, "hopper output exposes no storage, backing off");
            self.delay_timer.set(TICK_INTERVAL + 2);
            return;
        };
        let requested = stack.count.min(self.transfer_count);
        let moved = transfer::insert(&mut neighbor, self.facing, &stack, self.transfer_count);
        if moved > 0 {
            self.slots.shrink(index, moved);
            self.dirty = true;
        }
        let depleted = self.slots.get(index).is_none();
        self.cursor.commit(index, len, depleted || moved < requested);
    }
}

impl Automaton for Hopper {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Hopper
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
        self.delay_timer.tick();
        if !self.tick_timer.poll(TICK_INTERVAL) {
            return;
        }
        let Some(facing) = device_facing(world, self.pos, DeviceKind::Hopper) else {
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

        if outcome.rs_active || self.logic.pulse_mode() {
            self.collect(world);
        }
        if outcome.fire && self.delay_timer.is_ready() {
            self.delay_timer.set(PERIOD_OFFSET + 2 * self.period);
            self.insert(world);
        }
    }

    fn neighbor_changed(&mut self, _world: &dyn WorldAccess) {
        self.tick_timer.shorten_to(1);
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl StorageProvider for Hopper {
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        true
    }

    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        let handler = SlotHandler::new(&mut self.slots, 0..HOPPER_SLOT_COUNT, AccessPolicy::open())
            .waking(&mut self.tick_timer, EXTERNAL_CHANGE_WAKE);
        Some(Box::new(handler))
    }

    fn legacy_inventory(&mut self) -> Option<&mut dyn LegacyInventory> {
        Some(&mut self.slots)
    }

    fn automaton_facing(&self) -> Option<Direction> {
        Some(self.facing)
    }

    fn automaton_pull_side(&self) -> Option<Direction> {
        Some(self.input_side())
    }
}

impl Persist for Hopper {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_bool("powered", self.trigger.latched_signal);
        record.put_int("act_slot_index", self.cursor.cursor() as i64);
        record.put_int("xsize", self.transfer_count as i64);
        record.put_int("logic", self.logic.bits() as i64);
        record.put_int("period", self.period as i64);
        record.put_int("range", self.range as i64);
        record.put_int("delay_timer", self.delay_timer.remaining() as i64);
        record.put_int("tick_timer", self.tick_timer.remaining() as i64);
        record.put_int("collection_timer", self.collection_timer.remaining() as i64);
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        self.trigger = TriggerState {
            latched_signal: record.get_bool("powered"),
            signal_changed_this_tick: false,
        };
        self.cursor.set_cursor(
            record.get_clamped("act_slot_index", 0, HOPPER_SLOT_COUNT as i64 - 1) as usize,
            HOPPER_SLOT_COUNT,
        );
        self.transfer_count = record.get_clamped_or("xsize", 1, MAX_TRANSFER_COUNT as i64, 1) as u32;
        self.logic = LogicFlags::from_bits_truncate(
            record.get_clamped_or("logic", 0, i64::from(u32::MAX), self.logic.bits() as i64) as u32,
        );
        self.period = record.get_clamped("period", 0, MAX_PERIOD as i64) as u32;
        self.range = record.get_clamped("range", 0, MAX_COLLECTION_RANGE as i64) as u32;
        self.delay_timer = Countdown::new(record.get_clamped("delay_timer", 0, MAX_DELAY as i64) as u32);
        self.tick_timer = TickTimer::new(record.get_clamped("tick_timer", 0, TICK_INTERVAL as i64) as u32);
        self.collection_timer = Countdown::new(
            record.get_clamped("collection_timer", 0, COLLECTION_INTERVAL as i64) as u32,
        );
        record.load_items("items", &mut self.slots);
    }
}

impl DeviceFields for Hopper {
    fn field_count(&self) -> usize {
        field::COUNT
    }

    fn field(&self, id: usize) -> i32 {
        match id {
            field::RANGE => self.range as i32,
            field::XSIZE => self.transfer_count as i32,
            field::LOGIC => self.logic.bits() as i32,
            field::PERIOD => self.period as i32,
            field::DELAY => self.delay_timer.remaining() as i32,
            field::POWERED => i32::from(self.trigger.latched_signal),
            field::CURSOR => self.cursor.cursor() as i32,
            _ => 0,
        }
    }

    fn set_field(&mut self, id: usize, value: i32) {
        match id {
            field::RANGE => self.set_range(value.max(0) as u32),
            field::XSIZE => self.set_transfer_count(value.max(1) as u32),
            field::LOGIC => self.logic = LogicFlags::from_bits_truncate(value.max(0) as u32),
            field::PERIOD => self.set_period(value.max(0) as u32),
            field::DELAY => self.delay_timer.set(value.clamp(0, MAX_DELAY as i32) as u32),
            field::POWERED => self.trigger.latched_signal = value != 0,
            field::CURSOR => self
                .cursor
                .set_cursor(value.clamp(0, HOPPER_SLOT_COUNT as i32 - 1) as usize, HOPPER_SLOT_COUNT),
            _ => {}
        }
    }

    fn apply_action(&mut self, action: &str, value: i32) -> bool {
        match action {
            "xsize" => self.set_field(field::XSIZE, value),
            "period" => self.set_field(field::PERIOD, value),
            "range" => self.set_field(field::RANGE, value),
            "logic" => self.set_field(field::LOGIC, value),
            "manual_trigger" => self.manual_trigger(),
            _ => return false,
        }
        self.dirty = true;
        true
    }
}
