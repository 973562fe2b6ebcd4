//! Determinism and persistence worldtests
//!
//! Two levels built from the same seed must evolve identically, and a level
//! rebuilt from saved device records must carry on where the first one left
//! off.

use edautomation_core::{block::blocks, items, Block, BlockPos, DeviceKind, Direction, ItemStack};
use edautomation_testkit::{assert_reports_match, run_micro_worldtest, MicroWorldtestConfig};
use edautomation_world::devices::dropper;
use edautomation_world::{Automaton, Device, DeviceFields, Level, Persist};
use serde::Serialize;

const WORLD_SEED: u64 = 99_887_766;
const TICKS: u64 = 300;

#[derive(Debug, Serialize)]
struct Frame {
    items: Vec<(u32, [f64; 3])>,
    dropper_slots: u64,
    chest_slots: u64,
}

fn build_level(seed: u64) -> Level {
    let mut level = Level::new(seed);
    for x in -6..=4 {
        for z in -8..=4 {
            level.set_block(BlockPos::new(x, 0, z), Block::Solid(blocks::STONE));
        }
    }
    let dropper_pos = BlockPos::new(0, 10, 0);
    level.place_device(dropper_pos, DeviceKind::Dropper, Direction::North);
    if let Some(Device::Dropper(device)) = level.device_mut(dropper_pos) {
        device.set_field(dropper::field::NOISE, 80);
        device.set_field(dropper::field::XDEV, 30);
        device.set_logic(
            edautomation_world::DropLogic::CONTINUOUS | edautomation_world::DropLogic::IGNORE_EXTERNAL,
        );
        for slot in 0..4 {
            device.slots_mut().set(slot, Some(ItemStack::new(items::STICK, 16)));
        }
    }
    let hopper_pos = BlockPos::new(5, 0, 5);
    level.place_chest(hopper_pos.below());
    level.place_device(hopper_pos, DeviceKind::Hopper, Direction::Down);
    if let Some(Device::Hopper(hopper)) = level.device_mut(hopper_pos) {
        hopper.set_transfer_count(4);
        hopper.slots_mut().set(0, Some(ItemStack::new(items::STONE, 40)));
    }
    level
}

fn run(seed: u64) -> edautomation_testkit::MicroWorldtestReport<Frame> {
    run_micro_worldtest(
        MicroWorldtestConfig {
            name: "dropper_scatter".into(),
            ticks: TICKS,
        },
        build_level(seed),
        |_, level| level.tick(),
        |_, level| Frame {
            items: level
                .items()
                .map(|item| (item.stack.count, item.pos.to_array()))
                .collect(),
            dropper_slots: level
                .slots_at(BlockPos::new(0, 10, 0))
                .map_or(0, |slots| slots.total_count()),
            chest_slots: level
                .slots_at(BlockPos::new(5, -1, 5))
                .map_or(0, |slots| slots.total_count()),
        },
    )
}

#[test]
fn same_seed_replays_identically() {
    let first = run(WORLD_SEED);
    let second = run(WORLD_SEED);
    assert_reports_match(&first, &second).expect("runs diverged");

    let last = first.last().expect("report has frames");
    assert!(!last.items.is_empty(), "dropper never fired");
    assert_eq!(last.chest_slots, 40);
    let launched: u64 = last.items.iter().map(|(count, _)| u64::from(*count)).sum();
    assert_eq!(launched + last.dropper_slots, 64);
}

#[test]
fn saved_devices_resume_after_reload() {
    let mut level = build_level(WORLD_SEED);
    level.run(57);
    let json = level.save_devices_json().expect("devices encode");

    let mut restored = Level::new(WORLD_SEED);
    restored.place_chest(BlockPos::new(5, -1, 5));
    let loaded = restored.load_devices_json(&json).expect("devices decode");
    assert_eq!(loaded, 2);

    for saved in level.save_devices() {
        let device = restored.device(saved.pos).expect("device restored");
        assert_eq!(device.save(), saved.record);
        assert_eq!(device.automaton().kind(), saved.kind);
    }
}

#[test]
fn broken_device_keeps_its_inventory() {
    let mut level = Level::new(WORLD_SEED);
    let pos = BlockPos::new(2, 2, 2);
    level.place_device(pos, DeviceKind::Placer, Direction::Up);
    if let Some(Device::Placer(placer)) = level.device_mut(pos) {
        placer.slots_mut().set(7, Some(ItemStack::new(items::COBBLESTONE, 12)));
    }

    let record = level.break_block(pos).expect("placer leaves a record");
    assert!(level.device(pos).is_none());

    let elsewhere = BlockPos::new(-3, 2, 2);
    level.place_device_with_record(elsewhere, DeviceKind::Placer, Direction::Up, &record);
    let slots = level.slots_at(elsewhere).expect("placer restored");
    assert_eq!(slots.get(7).map(|s| s.count), Some(12));
}
