//! Device Scenario Worldtest
//!
//! Drives each automation device inside a [`Level`] and checks the
//! observable outcome: item movement, block placement, destruction and
//! melting.

use edautomation_core::{items, Block, BlockPos, DeviceKind, Direction, ItemStack};
use edautomation_world::devices::{incinerator, smelter::Phase};
use edautomation_world::trigger::{self, DropLogic, LogicFlags, TriggerState};
use edautomation_world::{Device, Level, LevelEvent, Sound, VisualField, WorldAccess};

const SEED: u64 = 0x5eed;

fn origin() -> BlockPos {
    BlockPos::new(0, 0, 0)
}

/// Tick until `done` holds, returning how many ticks it took.
fn run_until(level: &mut Level, max_ticks: u64, mut done: impl FnMut(&Level) -> bool) -> Option<u64> {
    for elapsed in 0..max_ticks {
        if done(level) {
            return Some(elapsed);
        }
        level.tick();
    }
    done(level).then_some(max_ticks)
}

fn hopper_mut(level: &mut Level, pos: BlockPos) -> &mut edautomation_world::Hopper {
    match level.device_mut(pos) {
        Some(Device::Hopper(hopper)) => hopper,
        other => panic!("expected hopper at {pos:?}, found {other:?}"),
    }
}

fn count_at(level: &Level, pos: BlockPos, slot: usize) -> u32 {
    level
        .slots_at(pos)
        .and_then(|slots| slots.get(slot))
        .map_or(0, |stack| stack.count)
}

#[test]
fn hopper_pushes_transfer_count_into_chest_above() {
    let mut level = Level::new(SEED);
    level.place_chest(origin().above());
    level.place_device(origin(), DeviceKind::Hopper, Direction::Up);
    {
        let hopper = hopper_mut(&mut level, origin());
        hopper.set_transfer_count(4);
        hopper.slots_mut().set(0, Some(ItemStack::new(items::STONE, 10)));
    }

    level.tick();

    assert_eq!(count_at(&level, origin(), 0), 6);
    assert_eq!(count_at(&level, origin().above(), 0), 4);
}

#[test]
fn hopper_waits_out_its_tick_timer() {
    let mut level = Level::new(SEED);
    level.place_chest(origin().above());
    level.place_device(origin(), DeviceKind::Hopper, Direction::Up);
    {
        let hopper = hopper_mut(&mut level, origin());
        hopper.slots_mut().set(0, Some(ItemStack::new(items::STONE, 10)));
        hopper.set_tick_timer(3);
    }

    for _ in 0..3 {
        level.tick();
        assert_eq!(count_at(&level, origin(), 0), 10);
    }
    level.tick();
    assert_eq!(count_at(&level, origin(), 0), 9);
    assert_eq!(
        hopper_mut(&mut level, origin()).tick_timer().remaining(),
        edautomation_world::devices::hopper::TICK_INTERVAL
    );
}

#[test]
fn hopper_pulls_from_legacy_cabinet() {
    let mut level = Level::new(SEED);
    level.place_cabinet(origin().above());
    if let Some(slots) = level.slots_at_mut(origin().above()) {
        slots.set(3, Some(ItemStack::new(items::STICK, 10)));
    }
    level.place_device(origin(), DeviceKind::Hopper, Direction::Down);

    level.tick();

    assert_eq!(count_at(&level, origin().above(), 3), 9);
    assert_eq!(level.slots_at(origin()).map(|s| s.total_count()), Some(1));
}

#[test]
fn facing_hoppers_never_hand_items_back() {
    let mut level = Level::new(SEED);
    let east = BlockPos::new(1, 0, 0);
    level.place_device(origin(), DeviceKind::Hopper, Direction::East);
    level.place_device(east, DeviceKind::Hopper, Direction::West);
    hopper_mut(&mut level, origin())
        .slots_mut()
        .set(0, Some(ItemStack::new(items::STICK, 16)));
    hopper_mut(&mut level, east)
        .slots_mut()
        .set(0, Some(ItemStack::new(items::STONE, 16)));

    level.run(200);

    assert_eq!(count_at(&level, origin(), 0), 16);
    assert_eq!(count_at(&level, east, 0), 16);
    assert_eq!(level.slots_at(origin()).map(|s| s.total_count()), Some(16));
    assert_eq!(level.slots_at(east).map(|s| s.total_count()), Some(16));
}

#[test]
fn stacked_hoppers_do_not_pull_from_each_other() {
    let mut level = Level::new(SEED);
    let above = origin().above();
    level.place_device(origin(), DeviceKind::Hopper, Direction::North);
    level.place_device(above, DeviceKind::Hopper, Direction::Up);
    hopper_mut(&mut level, origin())
        .slots_mut()
        .set(0, Some(ItemStack::new(items::STICK, 16)));
    hopper_mut(&mut level, above)
        .slots_mut()
        .set(0, Some(ItemStack::new(items::STONE, 16)));

    level.run(200);

    let held = |level: &Level, pos| {
        level
            .slots_at(pos)
            .map(|slots| slots.as_slice().iter().flatten().map(|s| (s.kind, s.count)).collect::<Vec<_>>())
    };
    assert_eq!(held(&level, origin()), Some(vec![(items::STICK, 16)]));
    assert_eq!(held(&level, above), Some(vec![(items::STONE, 16)]));
}

#[test]
fn any_neighbor_update_wakes_the_hopper() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Hopper, Direction::Down);
    hopper_mut(&mut level, origin()).set_tick_timer(9);

    level.set_block(BlockPos::new(1, 0, 0), Block::Solid(edautomation_core::block::blocks::STONE));

    assert_eq!(hopper_mut(&mut level, origin()).tick_timer().remaining(), 1);
}

#[test]
fn hopper_collects_items_landing_on_top() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Hopper, Direction::Down);
    level.drop_item(glam::DVec3::new(0.5, 3.0, 0.5), ItemStack::new(items::STICK, 5));

    let ticks = run_until(&mut level, 400, |level| level.items().next().is_none());

    assert!(ticks.is_some(), "item was never collected");
    assert_eq!(level.slots_at(origin()).map(|s| s.total_count()), Some(5));
}

#[test]
fn inverted_trigger_fires_on_adjusted_edges() {
    let mut state = TriggerState::default();
    let fired: Vec<bool> = [false, true, true, false]
        .into_iter()
        .map(|raw| {
            let outcome = trigger::evaluate(raw, LogicFlags::INVERTED, state);
            state = outcome.state;
            outcome.fire
        })
        .collect();
    assert_eq!(fired, vec![true, false, false, true]);
}

#[test]
fn powered_dropper_launches_one_item() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Dropper, Direction::East);
    if let Some(Device::Dropper(dropper)) = level.device_mut(origin()) {
        dropper.slots_mut().set(0, Some(ItemStack::new(items::STICK, 5)));
    }
    level.tick();
    assert_eq!(level.items().count(), 0);

    level.set_signal(BlockPos::new(0, 1, 0), true);
    let ticks = run_until(&mut level, 10, |level| level.items().count() == 1);

    assert!(ticks.is_some(), "dropper never fired");
    assert_eq!(count_at(&level, origin(), 0), 4);
    assert_eq!(level.visible_state(origin(), VisualField::Open), 1);
    let launched = level.items().next().map(|item| (item.stack.count, item.velocity.x > 0.0));
    assert_eq!(launched, Some((1, true)));
    assert!(level
        .events()
        .iter()
        .any(|event| matches!(event, LevelEvent::Sound { sound: Sound::Drop, .. })));
}

#[test]
fn dropper_inserts_into_adjacent_chest() {
    let mut level = Level::new(SEED);
    let east = BlockPos::new(1, 0, 0);
    level.place_chest(east);
    level.place_device(origin(), DeviceKind::Dropper, Direction::East);
    if let Some(Device::Dropper(dropper)) = level.device_mut(origin()) {
        dropper.slots_mut().set(2, Some(ItemStack::new(items::STONE, 3)));
        dropper.manual_trigger();
    }

    level.run(3);

    assert_eq!(level.items().count(), 0);
    assert_eq!(count_at(&level, east, 0), 1);
    assert_eq!(count_at(&level, origin(), 2), 2);
}

fn dropper_mut(level: &mut Level, pos: BlockPos) -> &mut edautomation_world::Dropper {
    match level.device_mut(pos) {
        Some(Device::Dropper(dropper)) => dropper,
        other => panic!("expected dropper at {pos:?}, found {other:?}"),
    }
}

#[test]
fn dropper_visits_each_stacked_slot_once_per_cycle() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Dropper, Direction::East);
    {
        let dropper = dropper_mut(&mut level, origin());
        dropper.set_logic(DropLogic::IGNORE_EXTERNAL | DropLogic::CONTINUOUS);
        for slot in 0..3 {
            dropper.slots_mut().set(slot, Some(ItemStack::new(items::STICK, 5)));
        }
    }

    let mut order = Vec::new();
    for _ in 0..400 {
        if order.len() == 6 {
            break;
        }
        let before: Vec<u32> = (0..3).map(|slot| count_at(&level, origin(), slot)).collect();
        level.tick();
        order.extend((0..3).filter(|&slot| count_at(&level, origin(), slot) < before[slot]));
    }

    assert_eq!(order, vec![0, 1, 2, 0, 1, 2]);
    assert_eq!(level.items().count(), 6);
}

#[test]
fn dropper_stays_ready_when_the_adjacent_chest_is_full() {
    let mut level = Level::new(SEED);
    let east = BlockPos::new(1, 0, 0);
    level.place_chest(east);
    if let Some(chest) = level.slots_at_mut(east) {
        for slot in 0..chest.len() {
            chest.set(slot, Some(ItemStack::new(items::STONE, 64)));
        }
    }
    level.place_device(origin(), DeviceKind::Dropper, Direction::East);
    {
        let dropper = dropper_mut(&mut level, origin());
        dropper.set_drop_period(10);
        dropper.slots_mut().set(0, Some(ItemStack::new(items::STICK, 3)));
        dropper.manual_trigger();
    }

    level.run(3);

    assert_eq!(level.items().count(), 0);
    assert_eq!(count_at(&level, origin(), 0), 3);
    assert!(dropper_mut(&mut level, origin()).drop_timer().is_ready());
    assert!(!level
        .events()
        .iter()
        .any(|event| matches!(event, LevelEvent::Sound { sound: Sound::Drop, .. })));
}

#[test]
fn placer_places_blocks_and_spits_out_on_failure() {
    let mut level = Level::new(SEED);
    let front = origin().relative(Direction::North);
    level.place_device(origin(), DeviceKind::Placer, Direction::North);
    if let Some(Device::Placer(placer)) = level.device_mut(origin()) {
        placer.slots_mut().set(0, Some(ItemStack::new(items::COBBLESTONE, 3)));
    }

    level.tick();
    assert_eq!(level.block_at(front), Block::Solid(edautomation_core::block::blocks::COBBLESTONE));
    assert_eq!(count_at(&level, origin(), 0), 2);

    let mut level = Level::new(SEED);
    level.reject_placement_at(front);
    level.place_device(origin(), DeviceKind::Placer, Direction::North);
    if let Some(Device::Placer(placer)) = level.device_mut(origin()) {
        placer.slots_mut().set(0, Some(ItemStack::new(items::COBBLESTONE, 3)));
    }

    level.tick();
    assert!(level.block_at(front).is_air());
    assert_eq!(count_at(&level, origin(), 0), 0);
    assert_eq!(level.loose_item_count(), 3);
}

#[test]
fn placer_plants_seeds_on_soil_only() {
    let mut level = Level::new(SEED);
    let front = origin().relative(Direction::South);
    level.set_block(front.below(), Block::Soil(edautomation_core::block::blocks::FARMLAND));
    level.place_device(origin(), DeviceKind::Placer, Direction::South);
    if let Some(Device::Placer(placer)) = level.device_mut(origin()) {
        placer.slots_mut().set(0, Some(ItemStack::new(items::WHEAT_SEEDS, 2)));
    }

    level.tick();

    assert_eq!(level.block_at(front), Block::Plant(edautomation_core::block::blocks::WHEAT));
    assert_eq!(count_at(&level, origin(), 0), 1);
}

#[test]
fn energized_incinerator_burns_a_stack_in_eight_active_ticks() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Incinerator, Direction::North);
    if let Some(Device::Incinerator(device)) = level.device_mut(origin()) {
        device
            .slots_mut()
            .set(incinerator::BURN_SLOT, Some(ItemStack::new(items::STICK, 32)));
    }

    let mut active_ticks = 0;
    let mut last = 32;
    for _ in 0..200 {
        level.feed_energy(origin(), incinerator::MAX_ENERGY_TRANSFER);
        level.tick();
        let now = count_at(&level, origin(), incinerator::BURN_SLOT);
        if now < last {
            active_ticks += 1;
            assert_eq!(last - now, incinerator::INCINERATION_STACK_DECREMENT);
            last = now;
        }
        if now == 0 {
            break;
        }
    }

    assert_eq!(active_ticks, 8);
    assert_eq!(count_at(&level, origin(), incinerator::BURN_SLOT), 0);
}

#[test]
fn backed_up_incinerator_shifts_into_burn_slot_and_lights() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Incinerator, Direction::North);
    if let Some(Device::Incinerator(device)) = level.device_mut(origin()) {
        for slot in 0..incinerator::BURN_SLOT {
            device.slots_mut().set(slot, Some(ItemStack::new(items::STICK, 64)));
        }
    }

    level.tick();

    assert_eq!(count_at(&level, origin(), incinerator::BURN_SLOT), 64);
    assert_eq!(count_at(&level, origin(), incinerator::INPUT_SLOT), 0);
    assert_eq!(level.visible_state(origin(), VisualField::Lit), 1);
}

#[test]
fn incinerator_goes_dark_once_the_burn_slot_is_empty() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::Incinerator, Direction::North);
    if let Some(Device::Incinerator(device)) = level.device_mut(origin()) {
        device
            .slots_mut()
            .set(incinerator::BURN_SLOT, Some(ItemStack::new(items::STICK, 8)));
    }

    level.tick();
    assert_eq!(level.visible_state(origin(), VisualField::Lit), 1);
    run_until(&mut level, 100, |level| level.visible_state(origin(), VisualField::Lit) == 0)
        .expect("incinerator never went dark");
    assert_eq!(count_at(&level, origin(), incinerator::BURN_SLOT), 0);
}

fn smelter(level: &Level) -> &edautomation_world::MineralSmelter {
    match level.device(origin()) {
        Some(Device::MineralSmelter(smelter)) => smelter,
        other => panic!("expected smelter, found {other:?}"),
    }
}

fn smelter_mut(level: &mut Level) -> &mut edautomation_world::MineralSmelter {
    match level.device_mut(origin()) {
        Some(Device::MineralSmelter(smelter)) => smelter,
        other => panic!("expected smelter, found {other:?}"),
    }
}

fn powered_run_until(level: &mut Level, max_ticks: u64, mut done: impl FnMut(&Level) -> bool) -> bool {
    for _ in 0..max_ticks {
        if done(level) {
            return true;
        }
        level.feed_energy(origin(), 8192);
        level.tick();
    }
    done(level)
}

#[test]
fn smelter_melts_stone_into_lava_and_fills_a_bucket() {
    let mut level = Level::new(SEED);
    let sink = origin().below();
    level.add_fluid_sink(sink, 5000);
    level.place_device(origin(), DeviceKind::MineralSmelter, Direction::North);
    assert!(smelter_mut(&mut level).insert(&ItemStack::new(items::STONE, 4), false));

    assert!(powered_run_until(&mut level, 5000, |level| smelter(level).phase() == Phase::MagmaBlock));
    assert_eq!(
        smelter(&level).slots().get(1).map(|s| s.kind),
        Some(items::MAGMA_BLOCK)
    );

    assert!(powered_run_until(&mut level, 5000, |level| smelter(level).phase() == Phase::Lava));
    assert_eq!(smelter(&level).lava(), 1000);
    assert!(smelter(&level).slots().all_empty());
    assert_eq!(smelter(&level).comparator_signal(), 15);

    assert!(powered_run_until(&mut level, 100, |level| level.fluid_in(sink) == 100));
    assert_eq!(smelter(&level).lava(), 900);

    assert!(powered_run_until(&mut level, 100, |level| smelter(level).phase() == Phase::Warmup));
    assert!(smelter(&level).fluid_extraction_possible());
    assert!(!smelter(&level).accepts_input(&ItemStack::new(items::STONE, 1)));
    assert!(smelter_mut(&mut level).insert(&ItemStack::new(items::BUCKET, 1), false));

    assert!(powered_run_until(&mut level, 100, |level| {
        smelter(level).slots().get(1).is_some_and(|s| s.kind == items::LAVA_BUCKET)
    }));
    let bucket = smelter_mut(&mut level).extract(false);
    assert_eq!(bucket.map(|s| s.kind), Some(items::LAVA_BUCKET));
    assert_eq!(smelter(&level).lava(), 0);
}

#[test]
fn redstone_signal_cools_smelter_back_to_cobblestone() {
    let mut level = Level::new(SEED);
    level.place_device(origin(), DeviceKind::MineralSmelter, Direction::North);
    assert!(smelter_mut(&mut level).insert(&ItemStack::new(items::STONE, 1), false));

    assert!(powered_run_until(&mut level, 5000, |level| smelter(level).phase() == Phase::MagmaBlock));
    level.set_signal(BlockPos::new(0, 1, 0), true);

    assert!(powered_run_until(&mut level, 100, |level| smelter(level).phase() == Phase::Hot));
    assert_eq!(
        smelter(&level).slots().get(1).map(|s| s.kind),
        Some(items::COBBLESTONE)
    );
    assert_eq!(smelter(&level).progress(), 89);
}
