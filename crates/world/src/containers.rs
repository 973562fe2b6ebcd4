//! Plain storage blocks the devices move items between.

use crate::persist::{DeviceRecord, Persist};
use crate::slots::SlotArray;
use crate::storage::{AccessPolicy, ItemHandler, LegacyInventory, SlotHandler, StorageProvider};
use edautomation_core::Direction;

/// Number of slots in a chest or cabinet.
pub const CONTAINER_SLOTS: usize = 27;

/// Chest exposing the slot-addressed capability on every side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chest {
    slots: SlotArray,
}

impl Default for Chest {
    fn default() -> Self {
        Self::new(CONTAINER_SLOTS)
    }
}

impl Chest {
    pub fn new(len: usize) -> Self {
        Self {
            slots: SlotArray::new(len),
        }
    }

    pub fn slots(&self) -> &SlotArray {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut SlotArray {
        &mut self.slots
    }
}

impl StorageProvider for Chest {
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        true
    }

    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        let range = self.slots.full_range();
        Some(Box::new(SlotHandler::new(&mut self.slots, range, AccessPolicy::open())))
    }
}

/// Older container that only offers get/set slot access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cabinet {
    slots: SlotArray,
    changes: u32,
}

impl Default for Cabinet {
    fn default() -> Self {
        Self::new(CONTAINER_SLOTS)
    }
}

impl Cabinet {
    pub fn new(len: usize) -> Self {
        Self {
            slots: SlotArray::new(len),
            changes: 0,
        }
    }

    pub fn slots(&self) -> &SlotArray {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut SlotArray {
        &mut self.slots
    }

    /// Completed modifications reported through the legacy interface.
    pub fn changes(&self) -> u32 {
        self.changes
    }
}

impl LegacyInventory for Cabinet {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<edautomation_core::ItemStack> {
        self.slots.get(slot).cloned()
    }

    fn set_stack(&mut self, slot: usize, stack: Option<edautomation_core::ItemStack>) {
        self.slots.set(slot, stack);
    }

    fn mark_changed(&mut self) {
        self.changes += 1;
    }
}

impl StorageProvider for Cabinet {
    fn legacy_inventory(&mut self) -> Option<&mut dyn LegacyInventory> {
        Some(self)
    }
}

impl Persist for Chest {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        record.load_items("items", &mut self.slots);
    }
}

impl Persist for Cabinet {
    fn save(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.put_items("items", &self.slots);
        record
    }

    fn load(&mut self, record: &DeviceRecord) {
        record.load_items("items", &mut self.slots);
    }
}
