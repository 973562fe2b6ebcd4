//! Small waste incinerator: a FIFO buffer that destroys whatever reaches
//! its burn slot, faster while it has energy.

use super::{device_facing, Automaton};
use crate::access::{VisualField, WorldAccess};
use crate::config::IncineratorConfig;
use crate::cooldown::TickTimer;
use crate::energy::Battery;
use crate::fields::DeviceFields;
use crate::persist::{DeviceRecord, Persist};
use crate::slots::SlotArray;
use crate::storage::{AccessPolicy, ItemHandler, SlotHandler, StorageProvider};
use edautomation_core::{BlockPos, DeviceKind, Direction};

pub const INCINERATOR_SLOT_COUNT: usize = 16;
pub const INPUT_SLOT: usize = 0;
pub const BURN_SLOT: usize = 15;
pub const TICK_INTERVAL: u32 = 20;
pub const ENERGIZED_TICK_INTERVAL: u32 = 5;
pub const INCINERATION_STACK_DECREMENT: u32 = 4;
pub const MAX_ENERGY_BUFFER: u32 = 16_000;
pub const MAX_ENERGY_TRANSFER: u32 = 256;

pub mod field {
    pub const ENERGY: usize = 0;
    pub const BURNING: usize = 1;
    pub const COUNT: usize = 2;
}

/// Waste incinerator block entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Incinerator {
    pos: BlockPos,
    facing: Direction,
    slots: SlotArray,
    battery: Battery,
    energy_consumption: u32,
    tick_timer: TickTimer,
    dirty: bool,
}

impl Incinerator {
    pub fn new(pos: BlockPos, facing: Direction, config: &IncineratorConfig) -> Self {
        Self {
            pos,
            facing,
            slots: SlotArray::new(INCINERATOR_SLOT_COUNT),
            battery: Battery::new(MAX_ENERGY_BUFFER, MAX_ENERGY_TRANSFER),
            energy_consumption: config.energy_consumption.clamp(4, 4096),
            tick_timer: TickTimer::default(),
            dirty: false,
        }
    }

    pub fn slots(&self) -> &SlotArray {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut SlotArray {
        &mut self.slots
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn tick_timer(&self) -> TickTimer {
        self.tick_timer
    }

    /// Whether something sits in the burn slot.
    pub fn is_burning(&self) -> bool {
        self.slots.get(BURN_SLOT).is_some()
    }
}

impl Automaton for Incinerator {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Incinerator
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
        let Some(facing) = device_facing(world, self.pos, DeviceKind::Incinerator) else {
            return;
        };
        self.facing = facing;

        if self.slots.get(INPUT_SLOT).is_some() && self.slots.move_between(INPUT_SLOT, 1, u32::MAX) {
            self.dirty = true;
        }
        let backed_up = self.slots.get(INPUT_SLOT).is_some();

        if self.is_burning() {
            self.slots.shrink(BURN_SLOT, INCINERATION_STACK_DECREMENT);
            if self.battery.draw(self.energy_consumption * TICK_INTERVAL) {
                self.tick_timer.shorten_to(ENERGIZED_TICK_INTERVAL);
            }
            self.dirty = true;
        }

        if backed_up {
            let mut transferred = false;
            for slot in (1..BURN_SLOT).rev() {
                transferred |= self.slots.move_between(slot - 1, slot, u32::MAX);
            }
            if !self.is_burning() && !transferred {
                self.slots.shift_up(INPUT_SLOT, BURN_SLOT);
                self.dirty = true;
            }
        }

        let lit = i32::from(self.is_burning());
        if world.visible_state(self.pos, VisualField::Lit) != lit {
            world.set_visible_state(self.pos, VisualField::Lit, lit);
        }
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn battery_mut(&mut self) -> Option<&mut Battery> {
        Some(&mut self.battery)
    }
}

impl StorageProvider for Incinerator {
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        true
    }

    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        let handler = SlotHandler::new(&mut self.slots, INPUT_SLOT..INPUT_SLOT + 1, AccessPolicy::insert_only());
        Some(Box::new(handler))
    }
}

impl Persist for Incinerator {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_int("energy", self.battery.energy() as i64);
        record.put_int("tick_timer", self.tick_timer.remaining() as i64);
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        self.battery
            .set_energy(record.get_clamped("energy", 0, MAX_ENERGY_BUFFER as i64) as u32);
        self.tick_timer = TickTimer::new(record.get_clamped("tick_timer", 0, TICK_INTERVAL as i64) as u32);
        record.load_items("items", &mut self.slots);
    }
}

impl DeviceFields for Incinerator {
    fn field_count(&self) -> usize {
        field::COUNT
    }

    fn field(&self, id: usize) -> i32 {
        match id {
            field::ENERGY => self.battery.energy() as i32,
            field::BURNING => i32::from(self.is_burning()),
            _ => 0,
        }
    }

    fn set_field(&mut self, _id: usize, _value: i32) {}

    fn apply_action(&mut self, _action: &str, _value: i32) -> bool {
        false
    }
}
