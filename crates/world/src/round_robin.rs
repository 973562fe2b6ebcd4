//! Round-robin slot cursor.

use edautomation_core::ItemStack;
use serde::{Deserialize, Serialize};

/// Cursor over a slot array that yields occupied slots in rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    /// Cursor starting at `cursor`.
    pub fn new(cursor: usize) -> Self {
        Self { cursor }
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Set the cursor, wrapping out-of-range values to 0.
    pub fn set_cursor(&mut self, cursor: usize, len: usize) {
        self.cursor = if cursor < len { cursor } else { 0 };
    }

    /// Scan from the cursor for the first occupied slot accepted by `pred`.
    ///
    /// The cursor is left on the returned slot; callers decide with
    /// [`RoundRobin::commit`] whether to move past it. A full scan without a
    /// hit resets the cursor to 0.
    pub fn advance<P>(&mut self, slots: &[Option<ItemStack>], mut pred: P) -> Option<usize>
    where
        P: FnMut(&ItemStack) -> bool,
    {
        let len = slots.len();
        if len == 0 {
            self.cursor = 0;
            return None;
        }
        if self.cursor >= len {
            self.cursor = 0;
        }
        let mut index = self.cursor;
        for _ in 0..len {
            if let Some(stack) = &slots[index] {
                if pred(stack) {
                    self.cursor = index;
                    return Some(index);
                }
            }
            index = (index + 1) % len;
        }
        self.cursor = 0;
        None
    }

    /// Settle the cursor after acting on `index`: move past it when `move_on`
    /// is set, otherwise stay so the slot is finished first.
    pub fn commit(&mut self, index: usize, len: usize, move_on: bool) {
        if len == 0 {
            self.cursor = 0;
        } else if move_on {
            self.cursor = (index + 1) % len;
        } else {
            self.cursor = index.min(len - 1);
        }
    }

    /// Move the cursor onto the next occupied slot after the current one,
    /// falling back to 0 when none is found.
    pub fn skip_to_occupied(&mut self, slots: &[Option<ItemStack>]) {
        let len = slots.len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let start = self.cursor.min(len - 1);
        for step in 1..=len {
            let index = (start + step) % len;
            if slots[index].is_some() {
                self.cursor = index;
                return;
            }
        }
        self.cursor = 0;
    }

    /// Leave the cursor on the first occupied slot at or after the current
    /// one, falling back to 0 when none is found.
    pub fn settle_on_occupied(&mut self, slots: &[Option<ItemStack>]) {
        let len = slots.len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let start = self.cursor.min(len - 1);
        self.cursor = (0..len)
            .map(|step| (start + step) % len)
            .find(|&index| slots[index].is_some())
            .unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edautomation_core::items;

    fn slots(counts: &[u32]) -> Vec<Option<ItemStack>> {
        counts
            .iter()
            .map(|&c| (c > 0).then(|| ItemStack::new(items::STICK, c)))
            .collect()
    }

    #[test]
    fn skips_empty_slots_and_wraps() {
        let slots = slots(&[0, 0, 3, 0]);
        let mut rr = RoundRobin::new(3);
        assert_eq!(rr.advance(&slots, |_| true), Some(2));
        assert_eq!(rr.cursor(), 2);
    }

    #[test]
    fn empty_scan_resets() {
        let slots = slots(&[0, 0, 0]);
        let mut rr = RoundRobin::new(2);
        assert_eq!(rr.advance(&slots, |_| true), None);
        assert_eq!(rr.cursor(), 0);
    }

    #[test]
    fn commit_stays_on_partial_slots() {
        let slots = slots(&[5, 5]);
        let mut rr = RoundRobin::default();
        let index = rr.advance(&slots, |_| true).unwrap();
        rr.commit(index, slots.len(), false);
        assert_eq!(rr.advance(&slots, |_| true), Some(0));
        rr.commit(0, slots.len(), true);
        assert_eq!(rr.advance(&slots, |_| true), Some(1));
    }

    #[test]
    fn predicate_filters_candidates() {
        let slots = slots(&[1, 8, 2]);
        let mut rr = RoundRobin::default();
        assert_eq!(rr.advance(&slots, |s| s.count >= 4), Some(1));
    }

    #[test]
    fn skip_to_occupied_moves_forward() {
        let slots = slots(&[1, 0, 0, 1]);
        let mut rr = RoundRobin::new(0);
        rr.skip_to_occupied(&slots);
        assert_eq!(rr.cursor(), 3);
        rr.skip_to_occupied(&slots);
        assert_eq!(rr.cursor(), 0);
    }

    #[test]
    fn settle_on_occupied_keeps_current_slot() {
        let slots = slots(&[1, 2, 0, 1]);
        let mut rr = RoundRobin::new(1);
        rr.settle_on_occupied(&slots);
        assert_eq!(rr.cursor(), 1);
        rr.set_cursor(2, slots.len());
        rr.settle_on_occupied(&slots);
        assert_eq!(rr.cursor(), 3);
        rr.settle_on_occupied(&self::slots(&[0, 0, 0, 0]));
        assert_eq!(rr.cursor(), 0);
    }
}
