//! Small mineral smelter: melts a single mineral block into lava through
//! warmup, hot and magma phases while it is supplied with energy.

use super::{device_facing, Automaton};
use crate::access::{Sound, VisualField, WorldAccess};
use crate::config::SmelterConfig;
use crate::cooldown::TickTimer;
use crate::energy::Battery;
use crate::fields::DeviceFields;
use crate::persist::{DeviceRecord, Persist};
use crate::slots::SlotArray;
use crate::storage::{AccessPolicy, ItemHandler, SlotHandler, StorageProvider};
use edautomation_core::{items, BlockPos, DeviceKind, Direction, ItemStack};

pub const SMELTER_SLOT_COUNT: usize = 2;
pub const TICK_INTERVAL: u32 = 20;
pub const MAX_FLUID_LEVEL: u32 = 2000;
pub const MAX_BUCKET_EXTRACT_FLUID_LEVEL: u32 = 900;
pub const MAX_ENERGY_BUFFER: u32 = 32_000;
pub const MAX_ENERGY_TRANSFER: u32 = 8192;

const INPUT_SLOT: usize = 0;
const OUTPUT_SLOT: usize = 1;
const LAVA_PER_BLOCK: u32 = 1000;
const FLUID_PUSH_PER_TICK: u32 = 100;
const MAX_PROGRESS: u32 = 100;

pub mod field {
    pub const PROGRESS: usize = 0;
    pub const PHASE: usize = 1;
    pub const LAVA: usize = 2;
    pub const ENERGY: usize = 3;
    pub const COUNT: usize = 4;
}

/// Melt phase derived from the progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Warmup = 0,
    Hot = 1,
    MagmaBlock = 2,
    Lava = 3,
}

impl Phase {
    pub fn from_progress(progress: u32) -> Self {
        match progress {
            100.. => Phase::Lava,
            90..=99 => Phase::MagmaBlock,
            5..=89 => Phase::Hot,
            _ => Phase::Warmup,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

fn accepts_kind(stack: &ItemStack, lava_ready: bool) -> bool {
    if lava_ready {
        stack.kind == items::BUCKET
    } else {
        items::SMELTER_MINERALS.contains(&stack.kind)
    }
}

/// Mineral smelter block entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MineralSmelter {
    pos: BlockPos,
    facing: Direction,
    slots: SlotArray,
    battery: Battery,
    lava: u32,
    progress: u32,
    energy_consumption: u32,
    heatup_rate: u32,
    cooldown_rate: u32,
    tick_timer: TickTimer,
    force_update: bool,
    dirty: bool,
}

impl MineralSmelter {
    pub fn new(pos: BlockPos, facing: Direction, config: &SmelterConfig) -> Self {
        Self {
            pos,
            facing,
            slots: SlotArray::with_stack_limit(SMELTER_SLOT_COUNT, 1),
            battery: Battery::new(MAX_ENERGY_BUFFER, MAX_ENERGY_TRANSFER),
            lava: 0,
            progress: 0,
            energy_consumption: config.energy_consumption.clamp(8, 4096),
            heatup_rate: config.heatup_rate.clamp(1, 5),
            cooldown_rate: config.cooldown_rate(),
            tick_timer: TickTimer::default(),
            force_update: false,
            dirty: false,
        }
    }

    pub fn slots(&self) -> &SlotArray {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut SlotArray {
        &mut self.slots
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn lava(&self) -> u32 {
        self.lava
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn phase(&self) -> Phase {
        Phase::from_progress(self.progress)
    }

    /// Enough lava stored to fill a bucket.
    pub fn fluid_extraction_possible(&self) -> bool {
        self.lava >= MAX_BUCKET_EXTRACT_FLUID_LEVEL
    }

    /// Redstone comparator output.
    pub fn comparator_signal(&self) -> i32 {
        self.phase().as_i32() * 5
    }

    /// Whether `stack` may be put into the (empty) smelter.
    pub fn accepts_input(&self, stack: &ItemStack) -> bool {
        self.slots.all_empty() && accepts_kind(stack, self.fluid_extraction_possible())
    }

    /// Put one item of `stack` into the input slot.
    pub fn insert(&mut self, stack: &ItemStack, simulate: bool) -> bool {
        if stack.is_empty() || !self.accepts_input(stack) {
            return false;
        }
        if !simulate {
            self.slots.set(INPUT_SLOT, Some(stack.with_count(1)));
            if stack.kind != items::BUCKET {
                self.progress = 0;
            }
            self.force_update = true;
            self.dirty = true;
        }
        true
    }

    /// Take the output, restarting the process.
    pub fn extract(&mut self, simulate: bool) -> Option<ItemStack> {
        let stack = self.slots.get(OUTPUT_SLOT).cloned()?;
        if !simulate {
            self.reset_process();
        }
        Some(stack)
    }

    fn reset_process(&mut self) {
        self.slots.clear();
        self.lava = 0;
        self.progress = 0;
        self.force_update = true;
        self.tick_timer = TickTimer::default();
        self.dirty = true;
    }

    fn heat(&mut self, world: &dyn WorldAccess) {
        let input_present = self.slots.get(INPUT_SLOT).is_some();
        if !input_present && self.lava < LAVA_PER_BLOCK {
            self.progress = 0;
        } else if self.battery.is_empty() || world.has_neighbor_signal(self.pos) {
            self.progress = self.progress.saturating_sub(self.cooldown_rate);
        } else if self.progress >= MAX_PROGRESS {
            self.progress = MAX_PROGRESS;
            if !self.battery.draw(self.energy_consumption * TICK_INTERVAL / 20) {
                self.battery.clear();
            }
        } else if self.phase() >= Phase::Lava || input_present {
            if !self.battery.draw(self.energy_consumption * TICK_INTERVAL) {
                self.battery.clear();
            }
            self.progress = (self.progress + self.heatup_rate).min(MAX_PROGRESS);
        }
    }

    fn handle_bucket(&mut self, world: &mut dyn WorldAccess, input: &ItemStack) {
        let output_is_lava_bucket = self
            .slots
            .get(OUTPUT_SLOT)
            .is_some_and(|s| s.kind == items::LAVA_BUCKET);
        if output_is_lava_bucket {
            return;
        }
        if self.fluid_extraction_possible() {
            self.slots.set(OUTPUT_SLOT, Some(ItemStack::new(items::LAVA_BUCKET, 1)));
            world.play_sound(self.pos, Sound::BucketFillLava);
        } else {
            self.slots.set(OUTPUT_SLOT, Some(input.clone()));
        }
        self.dirty = true;
    }

    fn heated_up(&mut self, world: &mut dyn WorldAccess, phase: Phase) {
        match phase {
            Phase::Lava => {
                self.lava = (self.lava + LAVA_PER_BLOCK).min(MAX_FLUID_LEVEL);
                self.slots.clear();
                world.play_sound(self.pos, Sound::LavaAmbient);
                self.dirty = true;
            }
            Phase::MagmaBlock => {
                self.slots.set(OUTPUT_SLOT, Some(ItemStack::new(items::MAGMA_BLOCK, 1)));
                world.play_sound(self.pos, Sound::FireAmbient);
                self.dirty = true;
            }
            Phase::Hot => world.play_sound(self.pos, Sound::FireAmbient),
            Phase::Warmup => {}
        }
    }

    fn cooled_down(&mut self, world: &mut dyn WorldAccess, phase: Phase, input: Option<&ItemStack>) {
        match phase {
            Phase::MagmaBlock => {
                if self.lava < LAVA_PER_BLOCK {
                    self.reset_process();
                } else {
                    let magma = self
                        .fluid_extraction_possible()
                        .then(|| ItemStack::new(items::MAGMA_BLOCK, 1));
                    self.slots.set(INPUT_SLOT, magma.clone());
                    self.slots.set(OUTPUT_SLOT, magma);
                    self.lava = 0;
                }
                world.play_sound(self.pos, Sound::Extinguish);
                self.dirty = true;
            }
            Phase::Hot => {
                let product = if input.is_some_and(|s| s.kind == items::MAGMA_BLOCK) {
                    items::OBSIDIAN
                } else {
                    items::COBBLESTONE
                };
                self.slots.set(OUTPUT_SLOT, Some(ItemStack::new(product, 1)));
                world.play_sound(self.pos, Sound::Extinguish);
                self.dirty = true;
            }
            Phase::Warmup => world.play_sound(self.pos, Sound::Extinguish),
            Phase::Lava => {}
        }
    }

    fn push_lava(&mut self, world: &mut dyn WorldAccess) {
        let offered = self.lava.min(FLUID_PUSH_PER_TICK);
        let accepted = world.fill_fluid(self.pos.below(), offered).min(offered);
        if accepted == 0 {
            return;
        }
        self.lava -= accepted;
        self.dirty = true;
        if self.lava == 0 {
            self.reset_process();
            world.play_sound(self.pos, Sound::Extinguish);
        }
    }
}

impl Automaton for MineralSmelter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::MineralSmelter
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
        let Some(facing) = device_facing(world, self.pos, DeviceKind::MineralSmelter) else {
            return;
        };
        self.facing = facing;

        let last_phase = self.phase();
        let input = self.slots.get(INPUT_SLOT).cloned();
        self.heat(world);
        let new_phase = self.phase();

        match &input {
            Some(stack) if stack.kind == items::BUCKET => self.handle_bucket(world, stack),
            _ if new_phase > last_phase => self.heated_up(world, new_phase),
            _ if new_phase < last_phase => self.cooled_down(world, new_phase, input.as_ref()),
            _ if new_phase == Phase::Lava && self.lava > 0 => self.push_lava(world),
            _ => {}
        }

        let shown = self.phase().as_i32();
        if self.force_update || world.visible_state(self.pos, VisualField::Phase) != shown {
            world.set_visible_state(self.pos, VisualField::Phase, shown);
            self.force_update = false;
        }
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn battery_mut(&mut self) -> Option<&mut Battery> {
        Some(&mut self.battery)
    }
}

impl StorageProvider for MineralSmelter {
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        true
    }

    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        let empty = self.slots.all_empty();
        let lava_ready = self.fluid_extraction_possible();
        let not_lava = self.phase() != Phase::Lava;
        let policy = AccessPolicy {
            insert: Box::new(move |slot, stack| slot == INPUT_SLOT && empty && accepts_kind(stack, lava_ready)),
            extract: Box::new(move |slot| slot == OUTPUT_SLOT && not_lava),
        };
        Some(Box::new(SlotHandler::new(&mut self.slots, 0..SMELTER_SLOT_COUNT, policy)))
    }
}

impl Persist for MineralSmelter {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_int("progress", self.progress.min(MAX_PROGRESS) as i64);
        record.put_int("energy", self.battery.energy() as i64);
        record.put_int("lava", self.lava as i64);
        record.put_int("tick_timer", self.tick_timer.remaining() as i64);
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        self.progress = record.get_clamped("progress", 0, MAX_PROGRESS as i64) as u32;
        self.battery
            .set_energy(record.get_clamped("energy", 0, MAX_ENERGY_BUFFER as i64) as u32);
        self.lava = record.get_clamped("lava", 0, MAX_FLUID_LEVEL as i64) as u32;
        self.tick_timer = TickTimer::new(record.get_clamped("tick_timer", 0, TICK_INTERVAL as i64) as u32);
        record.load_items("items", &mut self.slots);
    }
}

impl DeviceFields for MineralSmelter {
    fn field_count(&self) -> usize {
        field::COUNT
    }

    fn field(&self, id: usize) -> i32 {
        match id {
            field::PROGRESS => self.progress as i32,
            field::PHASE => self.phase().as_i32(),
            field::LAVA => self.lava as i32,
            field::ENERGY => self.battery.energy() as i32,
            _ => 0,
        }
    }

    fn set_field(&mut self, _id: usize, _value: i32) {}

    fn apply_action(&mut self, _action: &str, _value: i32) -> bool {
        false
    }
}
