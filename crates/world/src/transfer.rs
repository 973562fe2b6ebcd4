//! Item movement between a device and a neighbouring endpoint.
//!
//! Both directions work purely through [`StorageEndpoint`], so capability
//! handlers and legacy inventories share one algorithm.

use crate::slots::SlotArray;
use crate::storage::Neighbor;
use edautomation_core::{Direction, ItemStack};
use std::ops::Range;
use tracing::trace;

/// Upper bound for a single transfer.
pub const MAX_TRANSFER_COUNT: u32 = 32;

/// Whether handing items towards `toward_receiver` would feed a receiver that
/// faces straight back at the giver.
pub fn is_back_transfer(receiver_facing: Option<Direction>, toward_receiver: Direction) -> bool {
    receiver_facing == Some(toward_receiver.opposite())
}

/// Whether pulling towards `toward_source` would drain a source that itself
/// pulls from the puller's side.
pub fn is_back_pull(source_pull_side: Option<Direction>, toward_source: Direction) -> bool {
    source_pull_side == Some(toward_source.opposite())
}

/// Push up to `max_count` items of `stack` into `neighbor`, which sits in
/// direction `toward_receiver` from the giver.
///
/// Compatible, non-full stacks are topped up first; any remainder goes into
/// the first empty slot. Returns the number of items moved; the caller
/// shrinks its source by that amount.
pub fn insert(
    neighbor: &mut Neighbor<'_>,
    toward_receiver: Direction,
    stack: &ItemStack,
    max_count: u32,
) -> u32 {
    let requested = max_count.min(MAX_TRANSFER_COUNT).min(stack.count);
    if requested == 0 {
        return 0;
    }
    if is_back_transfer(neighbor.facing, toward_receiver) {
        trace!(?toward_receiver, "refusing back transfer");
        return 0;
    }

    let endpoint = &mut neighbor.endpoint;
    let mut remaining = requested;
    let mut first_empty = None;

    for slot in 0..endpoint.slot_count() {
        match endpoint.stack_in_slot(slot) {
            None => {
                if first_empty.is_none() {
                    first_empty = Some(slot);
                }
            }
            Some(existing) if existing.is_compatible(stack) && existing.count < existing.max_stack_size() => {
                let rest = endpoint.insert(slot, stack.with_count(remaining), false);
                remaining = rest.map_or(0, |s| s.count);
                if remaining == 0 {
                    break;
                }
            }
            Some(_) => {}
        }
    }

    if remaining > 0 {
        if let Some(slot) = first_empty {
            let rest = endpoint.insert(slot, stack.with_count(remaining), false);
            remaining = rest.map_or(0, |s| s.count);
        }
    }

    requested - remaining
}

/// Push a whole stack into `neighbor`, returning what did not fit.
pub fn insert_all(
    neighbor: &mut Neighbor<'_>,
    toward_receiver: Direction,
    stack: ItemStack,
) -> Option<ItemStack> {
    let mut rest = stack;
    while !rest.is_empty() {
        let moved = insert(neighbor, toward_receiver, &rest, rest.count);
        if moved == 0 {
            break;
        }
        rest.count -= moved;
    }
    Some(rest).filter(|s| !s.is_empty())
}

/// Pull up to `max_count` items from `neighbor`, which lies towards
/// `toward_source` from the puller, into `local[range]`.
///
/// Each source slot is extracted in simulation first; only the part the
/// local slots actually accepted is extracted for real. A source that is
/// itself collecting from the puller is refused.
pub fn extract(
    neighbor: &mut Neighbor<'_>,
    toward_source: Direction,
    local: &mut SlotArray,
    range: Range<usize>,
    max_count: u32,
) -> u32 {
    if is_back_pull(neighbor.pull_side, toward_source) {
        trace!(?toward_source, "refusing to pull from a collecting source");
        return 0;
    }
    let requested = max_count.min(MAX_TRANSFER_COUNT);
    if requested == 0 {
        return 0;
    }
    let endpoint = &mut neighbor.endpoint;
    let mut remaining = requested;

    for slot in 0..endpoint.slot_count() {
        let Some(offered) = endpoint.extract(slot, remaining, true) else {
            continue;
        };
        let accepted = local.insert_stacked(&offered, range.clone());
        if accepted == 0 {
            continue;
        }
        let taken = endpoint.extract(slot, accepted, false).map_or(0, |s| s.count);
        if taken < accepted {
            local.remove_compatible_from_back(&offered, accepted - taken, range.clone());
        }
        remaining -= taken.min(remaining);
        if remaining == 0 {
            break;
        }
    }

    requested - remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LegacyInventory, StorageEndpoint};
    use edautomation_core::items;

    fn legacy(slots: &mut SlotArray, facing: Option<Direction>) -> Neighbor<'_> {
        let inventory: &mut dyn LegacyInventory = slots;
        Neighbor {
            endpoint: StorageEndpoint::Legacy(inventory),
            facing,
            pull_side: None,
        }
    }

    #[test]
    fn insert_moves_at_most_requested() {
        let mut target = SlotArray::new(5);
        let stack = ItemStack::new(items::STICK, 10);
        let moved = insert(&mut legacy(&mut target, None), Direction::Up, &stack, 4);
        assert_eq!(moved, 4);
        assert_eq!(target.get(0).map(|s| s.count), Some(4));
    }

    #[test]
    fn insert_refuses_receiver_facing_back() {
        let mut target = SlotArray::new(5);
        let stack = ItemStack::new(items::STICK, 10);
        {
            let mut neighbor = legacy(&mut target, Some(Direction::West));
            assert_eq!(insert(&mut neighbor, Direction::East, &stack, 8), 0);
        }
        let mut neighbor = legacy(&mut target, Some(Direction::Down));
        assert_eq!(insert(&mut neighbor, Direction::East, &stack, 8), 8);
    }

    #[test]
    fn insert_tops_up_before_empty_slot() {
        let mut target = SlotArray::new(3);
        target.set(1, Some(ItemStack::new(items::STICK, 62)));
        let stack = ItemStack::new(items::STICK, 10);
        let moved = insert(&mut legacy(&mut target, None), Direction::Up, &stack, 10);
        assert_eq!(moved, 10);
        assert_eq!(target.get(1).map(|s| s.count), Some(64));
        assert_eq!(target.get(0).map(|s| s.count), Some(8));
        assert!(target.get(2).is_none());
    }

    #[test]
    fn full_receiver_accepts_nothing() {
        let mut target = SlotArray::new(1);
        target.set(0, Some(ItemStack::new(items::BUCKET, 1)));
        let stack = ItemStack::new(items::STICK, 10);
        assert_eq!(insert(&mut legacy(&mut target, None), Direction::Up, &stack, 10), 0);
    }

    #[test]
    fn extract_only_takes_what_fits() {
        let mut source = SlotArray::new(2);
        source.set(0, Some(ItemStack::new(items::STICK, 20)));
        let mut local = SlotArray::with_stack_limit(1, 5);
        let range = local.full_range();
        let moved = extract(&mut legacy(&mut source, None), Direction::Up, &mut local, range, 16);
        assert_eq!(moved, 5);
        assert_eq!(source.get(0).map(|s| s.count), Some(15));
    }

    #[test]
    fn extract_refuses_source_pulling_from_us() {
        let mut source = SlotArray::new(1);
        source.set(0, Some(ItemStack::new(items::STICK, 20)));
        let mut local = SlotArray::new(1);
        let range = local.full_range();
        let mut neighbor = legacy(&mut source, Some(Direction::Up));
        neighbor.pull_side = Some(Direction::Down);
        assert_eq!(extract(&mut neighbor, Direction::Up, &mut local, range.clone(), 16), 0);
        neighbor.pull_side = Some(Direction::Up);
        assert_eq!(extract(&mut neighbor, Direction::Up, &mut local, range, 16), 16);
    }

    #[test]
    fn zero_count_moves_nothing() {
        let mut target = SlotArray::new(2);
        let stack = ItemStack::new(items::STICK, 10);
        assert_eq!(insert(&mut legacy(&mut target, None), Direction::Down, &stack, 0), 0);
        assert!(target.all_empty());

        target.set(0, Some(stack));
        let mut local = SlotArray::new(1);
        let range = local.full_range();
        assert_eq!(extract(&mut legacy(&mut target, None), Direction::Up, &mut local, range, 0), 0);
        assert_eq!(target.get(0).map(|s| s.count), Some(10));
    }

    #[test]
    fn insert_all_returns_remainder() {
        let mut target = SlotArray::with_stack_limit(1, 10);
        let rest = insert_all(
            &mut legacy(&mut target, None),
            Direction::North,
            ItemStack::new(items::STICK, 25),
        );
        assert_eq!(rest.map(|s| s.count), Some(15));
    }
}
