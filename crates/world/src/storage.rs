//! Neighbouring storage as seen by a device.
//!
//! Storage is reached through one of two interfaces: the slot-addressed
//! [`ItemHandler`] capability (primary path) or the older read-modify-write
//! [`LegacyInventory`] (fallback). [`StorageEndpoint`] unifies both so the
//! transfer algorithms are written once.

use crate::cooldown::TickTimer;
use crate::slots::SlotArray;
use edautomation_core::{Direction, ItemStack};
use std::ops::Range;

/// Slot-addressed storage capability.
pub trait ItemHandler {
    /// Number of addressable slots.
    fn slot_count(&self) -> usize;

    /// Copy of the stack in `slot`.
    fn stack_in_slot(&self, slot: usize) -> Option<ItemStack>;

    /// Insert `stack` into `slot`, returning what did not fit.
    fn insert(&mut self, slot: usize, stack: ItemStack, simulate: bool) -> Option<ItemStack>;

    /// Extract up to `count` items from `slot`.
    fn extract(&mut self, slot: usize, count: u32, simulate: bool) -> Option<ItemStack>;
}

/// Plain inventory with get/set slot access.
pub trait LegacyInventory {
    /// Number of slots.
    fn slot_count(&self) -> usize;

    /// Copy of the stack in `slot`.
    fn stack_in_slot(&self, slot: usize) -> Option<ItemStack>;

    /// Overwrite `slot`.
    fn set_stack(&mut self, slot: usize, stack: Option<ItemStack>);

    /// Per-slot stack limit.
    fn max_stack_size(&self) -> u32 {
        edautomation_core::item::DEFAULT_STACK_SIZE
    }

    /// Notify the inventory of a completed modification.
    fn mark_changed(&mut self) {}
}

/// Either storage interface of a neighbour.
pub enum StorageEndpoint<'a> {
    /// Capability path.
    Handler(Box<dyn ItemHandler + 'a>),
    /// Legacy fallback path.
    Legacy(&'a mut dyn LegacyInventory),
}

impl StorageEndpoint<'_> {
    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        match self {
            StorageEndpoint::Handler(handler) => handler.slot_count(),
            StorageEndpoint::Legacy(inventory) => inventory.slot_count(),
        }
    }

    /// Copy of the stack in `slot`.
    pub fn stack_in_slot(&self, slot: usize) -> Option<ItemStack> {
        match self {
            StorageEndpoint::Handler(handler) => handler.stack_in_slot(slot),
            StorageEndpoint::Legacy(inventory) => inventory.stack_in_slot(slot),
        }
    }

    /// Insert into `slot`, returning the remainder.
    pub fn insert(&mut self, slot: usize, stack: ItemStack, simulate: bool) -> Option<ItemStack> {
        match self {
            StorageEndpoint::Handler(handler) => handler.insert(slot, stack, simulate),
            StorageEndpoint::Legacy(inventory) => legacy_insert(&mut **inventory, slot, stack, simulate),
        }
    }

    /// Extract up to `count` from `slot`.
    pub fn extract(&mut self, slot: usize, count: u32, simulate: bool) -> Option<ItemStack> {
        match self {
            StorageEndpoint::Handler(handler) => handler.extract(slot, count, simulate),
            StorageEndpoint::Legacy(inventory) => legacy_extract(&mut **inventory, slot, count, simulate),
        }
    }
}

fn legacy_insert(
    inventory: &mut dyn LegacyInventory,
    slot: usize,
    stack: ItemStack,
    simulate: bool,
) -> Option<ItemStack> {
    if stack.is_empty() || slot >= inventory.slot_count() {
        return Some(stack).filter(|s| !s.is_empty());
    }
    let limit = stack.max_stack_size().min(inventory.max_stack_size());
    let (placed, moved) = match inventory.stack_in_slot(slot) {
        None => {
            let moved = stack.count.min(limit);
            (stack.with_count(moved), moved)
        }
        Some(existing) if existing.is_compatible(&stack) => {
            let moved = stack.count.min(limit.saturating_sub(existing.count));
            (existing.with_count(existing.count + moved), moved)
        }
        Some(_) => return Some(stack),
    };
    if moved > 0 && !simulate {
        inventory.set_stack(slot, Some(placed));
        inventory.mark_changed();
    }
    let remainder = stack.with_count(stack.count - moved);
    Some(remainder).filter(|s| !s.is_empty())
}

fn legacy_extract(
    inventory: &mut dyn LegacyInventory,
    slot: usize,
    count: u32,
    simulate: bool,
) -> Option<ItemStack> {
    let mut existing = inventory.stack_in_slot(slot)?;
    let taken = existing.split(count);
    if taken.is_empty() {
        return None;
    }
    if !simulate {
        inventory.set_stack(slot, Some(existing).filter(|s| !s.is_empty()));
        inventory.mark_changed();
    }
    Some(taken)
}

/// A block entity that may expose storage to its neighbours.
pub trait StorageProvider {
    /// Whether a capability handler is exposed on `side` (`None` = internal).
    fn has_item_handler(&self, _side: Option<Direction>) -> bool {
        false
    }

    /// Capability handler for `side`.
    fn item_handler(&mut self, _side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        None
    }

    /// Legacy inventory view.
    fn legacy_inventory(&mut self) -> Option<&mut dyn LegacyInventory> {
        None
    }

    /// Facing of a direction-aware automaton, used to refuse back transfers.
    fn automaton_facing(&self) -> Option<Direction> {
        None
    }

    /// Side a direction-aware automaton pulls items from, used to refuse
    /// extraction that would feed straight back into it.
    fn automaton_pull_side(&self) -> Option<Direction> {
        None
    }
}

/// A resolved neighbour endpoint.
pub struct Neighbor<'a> {
    /// Storage interface.
    pub endpoint: StorageEndpoint<'a>,
    /// Facing of the neighbour if it is a direction-aware automaton.
    pub facing: Option<Direction>,
    /// Side the neighbour pulls from if it is a collecting automaton.
    pub pull_side: Option<Direction>,
}

/// Resolve the storage a provider exposes on `side`, preferring the
/// capability handler over the legacy inventory.
pub fn resolve(provider: &mut dyn StorageProvider, side: Option<Direction>) -> Option<Neighbor<'_>> {
    let facing = provider.automaton_facing();
    let pull_side = provider.automaton_pull_side();
    if provider.has_item_handler(side) {
        let handler = provider.item_handler(side)?;
        return Some(Neighbor {
            endpoint: StorageEndpoint::Handler(handler),
            facing,
            pull_side,
        });
    }
    provider.legacy_inventory().map(|inventory| Neighbor {
        endpoint: StorageEndpoint::Legacy(inventory),
        facing,
        pull_side,
    })
}

/// Which operations a [`SlotHandler`] allows, and on what.
pub struct AccessPolicy<'a> {
    /// Insertion filter over (handler slot, stack).
    pub insert: Box<dyn Fn(usize, &ItemStack) -> bool + 'a>,
    /// Extraction filter over handler slots.
    pub extract: Box<dyn Fn(usize) -> bool + 'a>,
}

impl<'a> AccessPolicy<'a> {
    /// Insert and extract anywhere.
    pub fn open() -> Self {
        Self {
            insert: Box::new(|_, _| true),
            extract: Box::new(|_| true),
        }
    }

    /// Insert anywhere, never extract.
    pub fn insert_only() -> Self {
        Self {
            insert: Box::new(|_, _| true),
            extract: Box::new(|_| false),
        }
    }
}

/// Capability handler over a window of a device's own slots.
pub struct SlotHandler<'a> {
    slots: &'a mut SlotArray,
    range: Range<usize>,
    policy: AccessPolicy<'a>,
    wake: Option<(&'a mut TickTimer, u32)>,
}

impl<'a> SlotHandler<'a> {
    /// Expose `range` of `slots` under `policy`.
    pub fn new(slots: &'a mut SlotArray, range: Range<usize>, policy: AccessPolicy<'a>) -> Self {
        let end = range.end.min(slots.len());
        let range = range.start.min(end)..end;
        Self {
            slots,
            range,
            policy,
            wake: None,
        }
    }

    /// Shorten `timer` to at most `ticks` whenever the contents change.
    pub fn waking(mut self, timer: &'a mut TickTimer, ticks: u32) -> Self {
        self.wake = Some((timer, ticks));
        self
    }

    fn notify(&mut self) {
        if let Some((timer, ticks)) = self.wake.as_mut() {
            timer.shorten_to(*ticks);
        }
    }
}

impl ItemHandler for SlotHandler<'_> {
    fn slot_count(&self) -> usize {
        self.range.len()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<ItemStack> {
        if slot >= self.range.len() {
            return None;
        }
        self.slots.get(self.range.start + slot).cloned()
    }

    fn insert(&mut self, slot: usize, stack: ItemStack, simulate: bool) -> Option<ItemStack> {
        if stack.is_empty() {
            return None;
        }
        if slot >= self.range.len() || !(self.policy.insert)(slot, &stack) {
            return Some(stack);
        }
        let index = self.range.start + slot;
        let limit = self.slots.limit_for(&stack);
        let moved = match self.slots.get(index) {
            None => stack.count.min(limit),
            Some(existing) if existing.is_compatible(&stack) => {
                stack.count.min(limit.saturating_sub(existing.count))
            }
            Some(_) => 0,
        };
        if moved > 0 && !simulate {
            let total = self.slots.get(index).map_or(0, |s| s.count) + moved;
            self.slots.set(index, Some(stack.with_count(total)));
            self.notify();
        }
        Some(stack.with_count(stack.count - moved)).filter(|s| !s.is_empty())
    }

    fn extract(&mut self, slot: usize, count: u32, simulate: bool) -> Option<ItemStack> {
        if slot >= self.range.len() || !(self.policy.extract)(slot) {
            return None;
        }
        let index = self.range.start + slot;
        let existing = self.slots.get(index)?;
        let taken = existing.with_count(count.min(existing.count));
        if taken.is_empty() {
            return None;
        }
        if !simulate {
            self.slots.shrink(index, taken.count);
            self.notify();
        }
        Some(taken)
    }
}

impl LegacyInventory for SlotArray {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn stack_in_slot(&self, slot: usize) -> Option<ItemStack> {
        self.get(slot).cloned()
    }

    fn set_stack(&mut self, slot: usize, stack: Option<ItemStack>) {
        self.set(slot, stack);
    }

    fn max_stack_size(&self) -> u32 {
        self.stack_limit().min(edautomation_core::item::DEFAULT_STACK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edautomation_core::items;

    #[test]
    fn legacy_insert_simulate_leaves_inventory_untouched() {
        let mut slots = SlotArray::new(1);
        let inventory: &mut dyn LegacyInventory = &mut slots;
        let mut endpoint = StorageEndpoint::Legacy(inventory);
        let remainder = endpoint.insert(0, ItemStack::new(items::STICK, 70), true);
        assert_eq!(remainder.map(|s| s.count), Some(6));
        assert!(endpoint.stack_in_slot(0).is_none());
    }

    #[test]
    fn slot_handler_honours_policy_and_window() {
        let mut slots = SlotArray::new(4);
        slots.set(3, Some(ItemStack::new(items::STICK, 5)));
        let mut timer = TickTimer::new(30);
        {
            let mut handler = SlotHandler::new(&mut slots, 2..4, AccessPolicy::insert_only())
                .waking(&mut timer, 8);
            assert_eq!(handler.slot_count(), 2);
            assert_eq!(handler.stack_in_slot(1).map(|s| s.count), Some(5));
            assert!(handler.extract(1, 5, false).is_none());
            assert!(handler.insert(0, ItemStack::new(items::STICK, 3), false).is_none());
        }
        assert_eq!(timer.remaining(), 8);
        assert_eq!(slots.get(2).map(|s| s.count), Some(3));
    }

    #[test]
    fn slot_handler_rejects_incompatible() {
        let mut slots = SlotArray::new(1);
        slots.set(0, Some(ItemStack::new(items::STICK, 1)));
        let mut handler = SlotHandler::new(&mut slots, 0..1, AccessPolicy::open());
        let rejected = handler.insert(0, ItemStack::new(items::BUCKET, 1), false);
        assert_eq!(rejected.map(|s| s.kind), Some(items::BUCKET));
    }
}
