//! Fixed-length slot arrays owned by a single device.
//!
//! Every slot is `Option<ItemStack>`; zero-count stacks are normalized to
//! `None` and counts are clamped to the kind's stack limit on write.

use edautomation_core::item::normalized;
use edautomation_core::ItemStack;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Ordered, fixed-length slot storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotArray {
    slots: Vec<Option<ItemStack>>,
    stack_limit: u32,
}

impl SlotArray {
    /// Create `len` empty slots with the default stack limit.
    pub fn new(len: usize) -> Self {
        Self::with_stack_limit(len, u32::MAX)
    }

    /// Create `len` empty slots whose stacks never exceed `stack_limit`
    /// (on top of each kind's own limit).
    pub fn with_stack_limit(len: usize, stack_limit: u32) -> Self {
        Self {
            slots: vec![None; len],
            stack_limit: stack_limit.max(1),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the array has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Full range of slot indices.
    pub fn full_range(&self) -> Range<usize> {
        0..self.slots.len()
    }

    /// Array-wide stack limit.
    pub fn stack_limit(&self) -> u32 {
        self.stack_limit
    }

    /// Limit applied to a stack of `stack`'s kind in this array.
    pub fn limit_for(&self, stack: &ItemStack) -> u32 {
        stack.max_stack_size().min(self.stack_limit)
    }

    /// Borrow the raw slots.
    pub fn as_slice(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Stack in `index`, if any.
    pub fn get(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Overwrite a slot. Out-of-range writes are ignored.
    pub fn set(&mut self, index: usize, stack: Option<ItemStack>) {
        let stack = normalized(stack).map(|mut s| {
            s.count = s.count.min(self.limit_for(&s));
            s
        });
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack;
        }
    }

    /// Remove and return the stack in `index`.
    pub fn take(&mut self, index: usize) -> Option<ItemStack> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Remove up to `amount` items from `index`, returning how many were removed.
    pub fn shrink(&mut self, index: usize, amount: u32) -> u32 {
        let Some(slot) = self.slots.get_mut(index) else {
            return 0;
        };
        let Some(stack) = slot.as_mut() else {
            return 0;
        };
        let removed = stack.shrink(amount);
        if stack.is_empty() {
            *slot = None;
        }
        removed
    }

    /// Whether every slot in `range` is empty.
    pub fn range_is_empty(&self, range: Range<usize>) -> bool {
        self.slots[clamp_range(range, self.slots.len())]
            .iter()
            .all(Option::is_none)
    }

    /// Whether every slot is empty.
    pub fn all_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Total number of items across all slots.
    pub fn total_count(&self) -> u64 {
        self.slots.iter().flatten().map(|s| s.count as u64).sum()
    }

    /// Number of items compatible with `stack` inside `range`.
    pub fn count_compatible(&self, stack: &ItemStack, range: Range<usize>) -> u32 {
        self.slots[clamp_range(range, self.slots.len())]
            .iter()
            .flatten()
            .filter(|s| s.is_compatible(stack))
            .map(|s| s.count)
            .sum()
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Insert as much of `stack` as fits into `range`: top up compatible
    /// stacks first, then place the remainder into the first empty slot.
    /// Returns the number of items accepted; `stack` itself is not modified.
    pub fn insert_stacked(&mut self, stack: &ItemStack, range: Range<usize>) -> u32 {
        if stack.is_empty() {
            return 0;
        }
        let limit = self.limit_for(stack);
        let mut remaining = stack.count;
        let mut first_empty = None;

        for index in clamp_range(range, self.slots.len()) {
            match self.slots[index].as_mut() {
                None => {
                    if first_empty.is_none() {
                        first_empty = Some(index);
                    }
                }
                Some(existing) if existing.is_compatible(stack) => {
                    let space = limit.saturating_sub(existing.count);
                    remaining -= existing.grow(space.min(remaining));
                    if remaining == 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
        }

        if remaining > 0 {
            if let Some(index) = first_empty {
                let placed = remaining.min(limit);
                self.slots[index] = Some(stack.with_count(placed));
                remaining -= placed;
            }
        }

        stack.count - remaining
    }

    /// Insert into every slot (see [`SlotArray::insert_stacked`]).
    pub fn insert_stacked_all(&mut self, stack: &ItemStack) -> u32 {
        self.insert_stacked(stack, self.full_range())
    }

    /// Remove up to `amount` items compatible with `stack` from `range`,
    /// walking from the last slot to the first. Returns how many were removed.
    pub fn remove_compatible_from_back(
        &mut self,
        stack: &ItemStack,
        amount: u32,
        range: Range<usize>,
    ) -> u32 {
        let mut remaining = amount;
        for index in clamp_range(range, self.slots.len()).rev() {
            if remaining == 0 {
                break;
            }
            let compatible = self.slots[index]
                .as_ref()
                .is_some_and(|s| s.is_compatible(stack));
            if compatible {
                remaining -= self.shrink(index, remaining);
            }
        }
        amount - remaining
    }

    /// Move up to `count` items from slot `from` onto slot `to` when `to` is
    /// empty or holds a compatible stack with room. Returns whether anything
    /// changed.
    pub fn move_between(&mut self, from: usize, to: usize, count: u32) -> bool {
        if from >= self.slots.len() || to >= self.slots.len() || from == to {
            return false;
        }
        let Some(source) = self.slots[from].clone() else {
            return false;
        };
        let count = count.min(source.count);
        if count == 0 {
            return false;
        }
        let limit = self.limit_for(&source);
        let moved = match self.slots[to].as_mut() {
            None => {
                let moved = count.min(limit);
                self.slots[to] = Some(source.with_count(moved));
                moved
            }
            Some(target) if target.is_compatible(&source) => {
                let moved = count.min(limit.saturating_sub(target.count));
                target.count += moved;
                moved
            }
            Some(_) => 0,
        };
        self.shrink(from, moved);
        moved > 0
    }

    /// Shift every stack in `from..=to` one slot up. Slot `from` becomes empty
    /// and the stack previously in `to` is returned.
    pub fn shift_up(&mut self, from: usize, to: usize) -> Option<ItemStack> {
        if from >= to || to >= self.slots.len() {
            return None;
        }
        let out = self.slots[to].take();
        self.slots[from..=to].rotate_right(1);
        out
    }
}

fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}
