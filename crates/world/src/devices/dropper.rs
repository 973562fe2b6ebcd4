//! Factory dropper: ejects items as projectiles (or into an adjacent
//! inventory) when triggered by redstone and/or its filter slots.

use super::{device_facing, Automaton};
use crate::access::{Sound, VisualField, WorldAccess};
use crate::config::DropperConfig;
use crate::cooldown::{Countdown, TickTimer};
use crate::fields::DeviceFields;
use crate::persist::{DeviceRecord, Persist};
use crate::round_robin::RoundRobin;
use crate::slots::SlotArray;
use crate::storage::{self, AccessPolicy, ItemHandler, SlotHandler, StorageProvider};
use crate::transfer;
use crate::trigger::{self, DropLogic, FilterMatch, FilterOutcome, TriggerState};
use edautomation_core::{scoped_rng, BlockPos, DeviceKind, Direction, ItemStack};
use glam::DVec3;
use rand::Rng;
use std::ops::Range;
use tracing::{debug, warn};

/// Total slots (input + filter).
pub const DROPPER_SLOT_COUNT: usize = 15;
/// Slots items are dropped from.
pub const INPUT_SLOTS: Range<usize> = 0..12;
/// Filter control slots.
pub const FILTER_SLOTS: Range<usize> = 12..15;
/// Ticks between two full evaluations.
pub const TICK_INTERVAL: u32 = 32;
/// Ticks the shutter stays open after a trigger.
pub const SHUTTER_CLOSE_DELAY: u32 = 40;
/// Largest drop batch.
pub const MAX_DROP_COUNT: u32 = 32;
/// Base delay after a drop.
pub const DROP_PERIOD_OFFSET: u32 = 10;

const INPUT_SLOT_COUNT: usize = 12;
const FILTER_COUNT: usize = 3;
const MAX_PERIOD: u32 = 100;
const MAX_TIMER: i64 = 400;
const IDLE_SHUTTER_DELAY: u32 = 10;

pub mod field {
    pub const SPEED: usize = 0;
    pub const XDEV: usize = 1;
    pub const YDEV: usize = 2;
    pub const NOISE: usize = 3;
    pub const COUNT: usize = 4;
    pub const LOGIC: usize = 5;
    pub const PERIOD: usize = 6;
    pub const DROP_TIMER: usize = 9;
    pub const OPEN_TIMER: usize = 10;
    pub const POWERED: usize = 11;
    pub const FILTER_0: usize = 12;
    pub const CURSOR: usize = 15;
    pub const FIELD_COUNT: usize = 16;
}

/// Dropper block entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropper {
    pos: BlockPos,
    facing: Direction,
    slots: SlotArray,
    cursor: RoundRobin,
    trigger: TriggerState,
    logic: DropLogic,
    drop_speed: i32,
    drop_xdev: i32,
    drop_ydev: i32,
    drop_noise: i32,
    drop_count: u32,
    drop_period: u32,
    filter_matches: [FilterMatch; FILTER_COUNT],
    tick_timer: TickTimer,
    drop_timer: Countdown,
    open_timer: Countdown,
    insert_adjacent: bool,
    external_pulse: bool,
    pulse: bool,
    dirty: bool,
}

impl Dropper {
    pub fn new(pos: BlockPos, facing: Direction, config: &DropperConfig) -> Self {
        Self {
            pos,
            facing,
            slots: SlotArray::new(DROPPER_SLOT_COUNT),
            cursor: RoundRobin::default(),
            trigger: TriggerState::default(),
            logic: DropLogic::EXTERN_AND_GATE,
            drop_speed: 10,
            drop_xdev: 0,
            drop_ydev: 0,
            drop_noise: 0,
            drop_count: 1,
            drop_period: 0,
            filter_matches: [FilterMatch::Unset; FILTER_COUNT],
            tick_timer: TickTimer::default(),
            drop_timer: Countdown::default(),
            open_timer: Countdown::default(),
            insert_adjacent: config.with_adjacent_item_insertion,
            external_pulse: false,
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

    pub fn logic(&self) -> DropLogic {
        self.logic
    }

    pub fn set_logic(&mut self, logic: DropLogic) {
        self.logic = logic;
    }

    /// Items per drop (1..=32).
    pub fn set_drop_count(&mut self, count: u32) {
        self.drop_count = count.clamp(1, MAX_DROP_COUNT);
    }

    pub fn set_drop_period(&mut self, period: u32) {
        self.drop_period = period.min(MAX_PERIOD);
    }

    pub fn filter_matches(&self) -> [FilterMatch; FILTER_COUNT] {
        self.filter_matches
    }

    pub fn open_timer(&self) -> Countdown {
        self.open_timer
    }

    pub fn drop_timer(&self) -> Countdown {
        self.drop_timer
    }

    pub fn cursor(&self) -> usize {
        self.cursor.cursor()
    }

    /// Behave as if a rising redstone edge arrived.
    pub fn manual_rs_trigger(&mut self) {
        self.external_pulse = true;
        self.tick_timer.shorten_to(1);
    }

    /// Force one drop regardless of signal and filters.
    pub fn manual_trigger(&mut self) {
        self.pulse = true;
        self.tick_timer.shorten_to(1);
    }

    fn update_filters(&mut self) -> FilterOutcome {
        let mut matches = [FilterMatch::Unset; FILTER_COUNT];
        for (slot, state) in FILTER_SLOTS.zip(matches.iter_mut()) {
            if let Some(filter) = self.slots.get(slot) {
                *state = if self.slots.count_compatible(filter, INPUT_SLOTS) >= filter.count {
                    FilterMatch::Matched
                } else {
                    FilterMatch::Set
                };
            }
        }
        if matches != self.filter_matches {
            self.filter_matches = matches;
            self.dirty = true;
        }
        FilterOutcome::from_matches(&matches, self.logic.contains(DropLogic::FILTER_AND_GATE))
    }

    fn update_shutter(&mut self, world: &mut dyn WorldAccess) {
        let open = i32::from(!self.open_timer.is_ready());
        if world.visible_state(self.pos, VisualField::Open) == open {
            return;
        }
        world.set_visible_state(self.pos, VisualField::Open, open);
        if !self.logic.contains(DropLogic::SILENT_OPEN) {
            let sound = if open != 0 { Sound::ShutterOpen } else { Sound::ShutterClose };
            world.play_sound(self.pos, sound);
        }
    }

    fn take_filter_drops(&mut self) -> Vec<ItemStack> {
        let mut drops = Vec::new();
        for (slot, state) in FILTER_SLOTS.zip(self.filter_matches) {
            if state != FilterMatch::Matched {
                continue;
            }
            let Some(filter) = self.slots.get(slot).cloned() else {
                continue;
            };
            let removed = self
                .slots
                .remove_compatible_from_back(&filter, filter.count, INPUT_SLOTS);
            if removed > 0 {
                drops.push(filter.with_count(removed));
            }
        }
        drops
    }

    fn take_round_robin_drop(&mut self) -> Vec<ItemStack> {
        let filters: Vec<ItemStack> = FILTER_SLOTS.filter_map(|slot| self.slots.get(slot).cloned()).collect();
        let drop_count = self.drop_count;
        let input = &self.slots.as_slice()[INPUT_SLOTS];
        let Some(index) = self.cursor.advance(input, |stack| {
            (stack.count >= drop_count || !stack.kind.is_stackable())
                && !filters.iter().any(|f| f.is_compatible(stack))
        }) else {
            return Vec::new();
        };
        self.cursor.commit(index, INPUT_SLOT_COUNT, true);
        let Some(stack) = self.slots.get(index).cloned() else {
            return Vec::new();
        };
        let taken = self.slots.shrink(index, drop_count);
        vec![stack.with_count(taken)]
    }

    /// Push `drops` into the adjacent endpoint. Returns the stacks that did
    /// not fit, or `None` when there is no endpoint to insert into.
    fn insert_into_neighbor(&self, world: &mut dyn WorldAccess, drops: &[ItemStack]) -> Option<Vec<ItemStack>> {
        let target = self.pos.relative(self.facing);
        let provider = world.storage_at(target)?;
        let mut neighbor = storage::resolve(provider, Some(self.facing.opposite()))?;
        Some(
            drops
                .iter()
                .filter_map(|stack| transfer::insert_all(&mut neighbor, self.facing, stack.clone()))
                .collect(),
        )
    }

    fn launch_velocity(&self, world: &dyn WorldAccess) -> DVec3 {
        let mut rng = scoped_rng(world.seed(), self.pos.stable_hash(), world.game_time());
        let (fx, fy, fz) = self.facing.step();
        let forward = DVec3::new(fx as f64, fy as f64, fz as f64);
        let vdx = self.drop_xdev as f64 * 1e-2;
        let vdy = self.drop_ydev as f64 * 1e-2;
        let deviation = match self.facing {
            Direction::Down => DVec3::new(vdx, 0.0, -vdy),
            Direction::Up => DVec3::new(vdx, 0.0, vdy),
            Direction::North => DVec3::new(vdx, vdy, 0.0),
            Direction::South => DVec3::new(-vdx, vdy, 0.0),
            Direction::East => DVec3::new(0.0, vdy, vdx),
            Direction::West => DVec3::new(0.0, vdy, -vdx),
        };
        let noise = self.drop_noise as f64 * 0.5e-3;
        let mut jitter = || (rng.gen::<f64>() - 0.5) * 2.0 * noise;
        let direction = forward + deviation + DVec3::new(jitter(), jitter(), jitter());
        let speed = self.drop_speed.max(5) as f64 * 1e-2 + jitter();
        direction.normalize_or_zero() * speed
    }

    fn launch(&self, world: &mut dyn WorldAccess, stack: ItemStack) {
        let (fx, fy, fz) = self.facing.step();
        let offset = if self.facing == Direction::Down { 0.8 } else { 0.7 };
        let spawn = DVec3::from_array(self.pos.center()) + DVec3::new(fx as f64, fy as f64, fz as f64) * offset;
        let velocity = self.launch_velocity(world);
        world.spawn_item(spawn, stack, velocity);
    }

    fn drop_items(&mut self, world: &mut dyn WorldAccess, filter_drop: bool) {
        let drops = if filter_drop {
            self.take_filter_drops()
        } else {
            self.take_round_robin_drop()
        };
        if !drops.is_empty() {
            self.dirty = true;
            let moved = self.eject(world, drops);
            if moved {
                self.drop_timer.set(DROP_PERIOD_OFFSET + 2 * self.drop_period);
                if !self.logic.contains(DropLogic::SILENT_DROP) {
                    world.play_sound(self.pos, Sound::Drop);
                }
            }
            debug!(pos = ?self.pos, moved, "dropper fired");
        }
        self.cursor.settle_on_occupied(&self.slots.as_slice()[INPUT_SLOTS]);
    }

    /// Hand `drops` to the adjacent endpoint or launch them. Whatever the
    /// endpoint refuses goes back into the inputs. Returns whether anything
    /// left the dropper.
    fn eject(&mut self, world: &mut dyn WorldAccess, drops: Vec<ItemStack>) -> bool {
        let total: u32 = drops.iter().map(|stack| stack.count).sum();
        let leftovers = if self.insert_adjacent {
            self.insert_into_neighbor(world, &drops)
        } else {
            None
        };
        let Some(leftovers) = leftovers else {
            for stack in drops {
                self.launch(world, stack);
            }
            return true;
        };
        let mut refused: u32 = leftovers.iter().map(|stack| stack.count).sum();
        for rest in leftovers {
            let accepted = self.slots.insert_stacked(&rest, INPUT_SLOTS);
            if accepted < rest.count {
                warn!(pos = ?self.pos, stack = ?rest, "inputs full, launching refused items");
                self.launch(world, rest.with_count(rest.count - accepted));
                refused -= rest.count - accepted;
            }
        }
        refused < total
    }
}

impl Automaton for Dropper {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Dropper
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
        self.open_timer.tick();
        self.drop_timer.tick();
        if !self.tick_timer.poll(TICK_INTERVAL) {
            return;
        }
        let Some(facing) = device_facing(world, self.pos, DeviceKind::Dropper) else {
            return;
        };
        self.facing = facing;
        if self.slots.range_is_empty(INPUT_SLOTS) {
            self.update_shutter(world);
            return;
        }

        let raw = world.has_neighbor_signal(self.pos);
        let mut outcome = trigger::evaluate(raw, self.logic, self.trigger);
        if std::mem::take(&mut self.external_pulse) {
            outcome = outcome.pulsed();
        }
        if outcome.changed {
            self.dirty = true;
        }
        self.trigger = outcome.state;

        let filter = self.update_filters();
        let mut fire = trigger::gate(outcome.fire, filter, self.logic.contains(DropLogic::EXTERN_AND_GATE));
        if std::mem::take(&mut self.pulse) {
            fire = true;
        }

        let drop_count = self.drop_count;
        let droppable = self.slots.as_slice()[INPUT_SLOTS]
            .iter()
            .flatten()
            .any(|stack| stack.count >= drop_count);
        if !droppable {
            self.open_timer.cap(IDLE_SHUTTER_DELAY);
        } else if fire || filter.trigger || outcome.fire {
            self.open_timer.set(SHUTTER_CLOSE_DELAY);
        }
        self.update_shutter(world);

        if fire && self.drop_timer.is_ready() {
            self.drop_items(world, filter.trigger);
        }
    }

    fn neighbor_changed(&mut self, world: &dyn WorldAccess) {
        let level = trigger::active_level(world.has_neighbor_signal(self.pos), self.logic);
        if level != self.trigger.latched_signal {
            self.tick_timer.shorten_to(1);
        }
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl StorageProvider for Dropper {
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        true
    }

    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        Some(Box::new(SlotHandler::new(&mut self.slots, INPUT_SLOTS, AccessPolicy::open())))
    }

    fn automaton_facing(&self) -> Option<Direction> {
        Some(self.facing)
    }
}

impl Persist for Dropper {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_bool("powered", self.trigger.latched_signal);
        record.put_int("open_timer", self.open_timer.remaining() as i64);
        record.put_int("drop_timer", self.drop_timer.remaining() as i64);
        record.put_int("tick_timer", self.tick_timer.remaining() as i64);
        record.put_int("drop_speed", self.drop_speed as i64);
        record.put_int("drop_noise", self.drop_noise as i64);
        record.put_int("drop_xdev", self.drop_xdev as i64);
        record.put_int("drop_ydev", self.drop_ydev as i64);
        record.put_int("drop_slot_index", self.cursor.cursor() as i64);
        record.put_int("drop_count", self.drop_count as i64);
        record.put_int("drop_logic", self.logic.bits() as i64);
        record.put_int("drop_period", self.drop_period as i64);
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        self.trigger = TriggerState {
            latched_signal: record.get_bool("powered"),
            signal_changed_this_tick: false,
        };
        self.open_timer = Countdown::new(record.get_clamped("open_timer", 0, MAX_TIMER) as u32);
        self.drop_timer = Countdown::new(record.get_clamped("drop_timer", 0, MAX_TIMER) as u32);
        self.tick_timer = TickTimer::new(record.get_clamped("tick_timer", 0, TICK_INTERVAL as i64) as u32);
        self.drop_speed = record.get_clamped_or("drop_speed", 0, 100, 10) as i32;
        self.drop_noise = record.get_clamped("drop_noise", 0, 100) as i32;
        self.drop_xdev = record.get_clamped("drop_xdev", -100, 100) as i32;
        self.drop_ydev = record.get_clamped("drop_ydev", -100, 100) as i32;
        self.cursor.set_cursor(
            record.get_clamped("drop_slot_index", 0, INPUT_SLOT_COUNT as i64 - 1) as usize,
            INPUT_SLOT_COUNT,
        );
        self.drop_count = record.get_clamped_or("drop_count", 1, MAX_DROP_COUNT as i64, 1) as u32;
        self.logic = DropLogic::from_bits_truncate(record.get_clamped_or(
            "drop_logic",
            0,
            i64::from(u32::MAX),
            DropLogic::EXTERN_AND_GATE.bits() as i64,
        ) as u32);
        self.drop_period = record.get_clamped("drop_period", 0, MAX_PERIOD as i64) as u32;
        record.load_items("items", &mut self.slots);
        self.filter_matches = [FilterMatch::Unset; FILTER_COUNT];
    }
}

impl DeviceFields for Dropper {
    fn field_count(&self) -> usize {
        field::FIELD_COUNT
    }

    fn field(&self, id: usize) -> i32 {
        match id {
            field::SPEED => self.drop_speed,
            field::XDEV => self.drop_xdev,
            field::YDEV => self.drop_ydev,
            field::NOISE => self.drop_noise,
            field::COUNT => self.drop_count as i32,
            field::LOGIC => self.logic.bits() as i32,
            field::PERIOD => self.drop_period as i32,
            field::DROP_TIMER => self.drop_timer.remaining() as i32,
            field::OPEN_TIMER => self.open_timer.remaining() as i32,
            field::POWERED => i32::from(self.trigger.latched_signal),
            id if (field::FILTER_0..field::FILTER_0 + FILTER_COUNT).contains(&id) => {
                self.filter_matches[id - field::FILTER_0].as_field()
            }
            field::CURSOR => self.cursor.cursor() as i32,
            _ => 0,
        }
    }

    fn set_field(&mut self, id: usize, value: i32) {
        match id {
            field::SPEED => self.drop_speed = value.clamp(0, 100),
            field::XDEV => self.drop_xdev = value.clamp(-100, 100),
            field::YDEV => self.drop_ydev = value.clamp(-100, 100),
            field::NOISE => self.drop_noise = value.clamp(0, 100),
            field::COUNT => self.set_drop_count(value.max(1) as u32),
            field::LOGIC => self.logic = DropLogic::from_bits_truncate(value.max(0) as u32),
            field::PERIOD => self.set_drop_period(value.max(0) as u32),
            field::DROP_TIMER => self.drop_timer.set(value.clamp(0, MAX_TIMER as i32) as u32),
            field::OPEN_TIMER => self.open_timer.set(value.clamp(0, MAX_TIMER as i32) as u32),
            field::POWERED => self.trigger.latched_signal = value != 0,
            id if (field::FILTER_0..field::FILTER_0 + FILTER_COUNT).contains(&id) => {
                self.filter_matches[id - field::FILTER_0] = FilterMatch::from_field(value);
            }
            field::CURSOR => self.cursor.set_cursor(
                value.clamp(0, INPUT_SLOT_COUNT as i32 - 1) as usize,
                INPUT_SLOT_COUNT,
            ),
            _ => {}
        }
    }

    fn apply_action(&mut self, action: &str, value: i32) -> bool {
        match action {
            "drop_speed" => self.set_field(field::SPEED, value),
            "drop_xdev" => self.set_field(field::XDEV, value),
            "drop_ydev" => self.set_field(field::YDEV, value),
            "drop_noise" => self.set_field(field::NOISE, value),
            "drop_count" => self.set_field(field::COUNT, value),
            "drop_period" => self.set_field(field::PERIOD, value),
            "drop_logic" => self.set_field(field::LOGIC, value),
            "manual_rstrigger" => self.manual_rs_trigger(),
            "manual_trigger" => self.manual_trigger(),
            _ => return false,
        }
        self.dirty = true;
        true
    }
}
