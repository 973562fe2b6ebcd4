//! Scenario files: a small level layout plus a schedule of external inputs.

use anyhow::{Context, Result};
use edautomation_core::block::blocks;
use edautomation_core::{items, Block, BlockPos, DeviceKind, Direction, ItemStack};
use edautomation_world::{AutomationConfig, DeviceFields, Level, LevelEvent};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Ticks run when neither the scenario nor the command line names a count.
pub const DEFAULT_TICKS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    pub ticks: u64,
    pub config: AutomationConfig,
    pub blocks: Vec<BlockSpec>,
    pub containers: Vec<ContainerSpec>,
    pub devices: Vec<DeviceSpec>,
    pub fluid_sinks: Vec<FluidSinkSpec>,
    pub rejected: Vec<BlockPos>,
    pub signals: Vec<SignalSpec>,
    pub energy: Vec<EnergyFeed>,
    pub drops: Vec<DropSpec>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            seed: 0,
            ticks: DEFAULT_TICKS,
            config: AutomationConfig::default(),
            blocks: Vec::new(),
            containers: Vec::new(),
            devices: Vec::new(),
            fluid_sinks: Vec::new(),
            rejected: Vec::new(),
            signals: Vec::new(),
            energy: Vec::new(),
            drops: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub pos: BlockPos,
    pub block: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Chest,
    Cabinet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub pos: BlockPos,
    pub kind: ContainerKind,
    #[serde(default)]
    pub items: Vec<SlotSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub pos: BlockPos,
    pub kind: DeviceKind,
    pub facing: Direction,
    #[serde(default)]
    pub items: Vec<SlotSpec>,
    /// Named actions applied right after placement (tuning fields, logic).
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub slot: usize,
    pub stack: ItemStack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    #[serde(default)]
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidSinkSpec {
    pub pos: BlockPos,
    pub capacity: u32,
}

/// Redstone change applied before the level runs tick `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub tick: u64,
    pub pos: BlockPos,
    pub powered: bool,
}

/// Energy offered to the device at `pos` before every tick in `from..until`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyFeed {
    pub pos: BlockPos,
    pub per_tick: u32,
    #[serde(default)]
    pub from: u64,
    #[serde(default = "never")]
    pub until: u64,
}

fn never() -> u64 {
    u64::MAX
}

/// Loose item entity spawned before tick `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropSpec {
    #[serde(default)]
    pub tick: u64,
    pub pos: [f64; 3],
    pub stack: ItemStack,
}

impl Scenario {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut scenario: Scenario = toml::from_str(raw)?;
        scenario.config = scenario.config.clamped();
        Ok(scenario)
    }

    /// Build the initial level: terrain first, then containers, then devices.
    pub fn build_level(&self) -> Level {
        let mut level = Level::with_config(self.seed, self.config.clone());
        for spec in &self.blocks {
            level.set_block(spec.pos, spec.block);
        }
        for pos in &self.rejected {
            level.reject_placement_at(*pos);
        }
        for sink in &self.fluid_sinks {
            level.add_fluid_sink(sink.pos, sink.capacity);
        }
        for spec in &self.containers {
            match spec.kind {
                ContainerKind::Chest => level.place_chest(spec.pos),
                ContainerKind::Cabinet => level.place_cabinet(spec.pos),
            }
            fill_slots(&mut level, spec.pos, &spec.items);
        }
        for spec in &self.devices {
            level.place_device(spec.pos, spec.kind, spec.facing);
            fill_slots(&mut level, spec.pos, &spec.items);
            if let Some(device) = level.device_mut(spec.pos) {
                let automaton = device.automaton_mut();
                for action in &spec.actions {
                    if !automaton.apply_action(&action.name, action.value) {
                        warn!(pos = ?spec.pos, action = %action.name, "device ignored unknown action");
                    }
                }
            }
        }
        level
    }

    /// Apply everything scheduled for the tick the level is about to run.
    pub fn apply_inputs(&self, level: &mut Level) {
        let now = level.tick_count().0;
        for signal in self.signals.iter().filter(|signal| signal.tick == now) {
            level.set_signal(signal.pos, signal.powered);
        }
        for feed in self.energy.iter().filter(|feed| (feed.from..feed.until).contains(&now)) {
            level.feed_energy(feed.pos, feed.per_tick);
        }
        for drop in self.drops.iter().filter(|drop| drop.tick == now) {
            level.drop_item(DVec3::from_array(drop.pos), drop.stack.clone());
        }
    }

    /// Run `ticks` ticks, handing every recorded event to `on_event`.
    pub fn run<F>(&self, level: &mut Level, ticks: u64, mut on_event: F) -> Result<u64>
    where
        F: FnMut(&LevelEvent) -> Result<()>,
    {
        let mut events = 0;
        for _ in 0..ticks {
            self.apply_inputs(level);
            level.tick();
            for event in level.drain_events() {
                on_event(&event)?;
                events += 1;
            }
        }
        debug!(scenario = %self.name, ticks, events, "scenario finished");
        Ok(events)
    }

    /// Built-in layout used when no scenario file is given: a hopper feeding a
    /// smelter, a dropper throwing sticks and a placer planting seeds.
    pub fn demo() -> Self {
        let hopper = BlockPos::new(0, 2, 0);
        let smelter = BlockPos::new(0, 1, 0);
        let dropper = BlockPos::new(4, 1, 0);
        let placer = BlockPos::new(-4, 1, 0);
        let mut blocks = Vec::new();
        for x in -6..=12 {
            for z in -6..=6 {
                let id = if x == -4 && z == -1 { blocks::FARMLAND } else { blocks::STONE };
                let block = if id == blocks::FARMLAND { Block::Soil(id) } else { Block::Solid(id) };
                blocks.push(BlockSpec { pos: BlockPos::new(x, 0, z), block });
            }
        }
        Scenario {
            name: "demo".to_string(),
            seed: 7,
            ticks: 600,
            blocks,
            containers: vec![ContainerSpec {
                pos: BlockPos::new(0, 3, 0),
                kind: ContainerKind::Chest,
                items: vec![SlotSpec { slot: 0, stack: ItemStack::new(items::COBBLESTONE, 3) }],
            }],
            devices: vec![
                DeviceSpec { pos: hopper, kind: DeviceKind::Hopper, facing: Direction::Down, items: Vec::new(), actions: Vec::new() },
                DeviceSpec { pos: smelter, kind: DeviceKind::MineralSmelter, facing: Direction::North, items: Vec::new(), actions: Vec::new() },
                DeviceSpec {
                    pos: dropper,
                    kind: DeviceKind::Dropper,
                    facing: Direction::East,
                    items: vec![SlotSpec { slot: 0, stack: ItemStack::new(items::STICK, 8) }],
                    actions: vec![ActionSpec { name: "drop_period".to_string(), value: 20 }],
                },
                DeviceSpec {
                    pos: placer,
                    kind: DeviceKind::Placer,
                    facing: Direction::North,
                    items: vec![SlotSpec { slot: 0, stack: ItemStack::new(items::WHEAT_SEEDS, 4) }],
                    actions: Vec::new(),
                },
            ],
            signals: vec![
                SignalSpec { tick: 10, pos: dropper.relative(Direction::West), powered: true },
                SignalSpec { tick: 10, pos: placer.relative(Direction::South), powered: true },
            ],
            energy: vec![EnergyFeed { pos: smelter, per_tick: 8192, from: 0, until: u64::MAX }],
            ..Scenario::default()
        }
    }
}

fn fill_slots(level: &mut Level, pos: BlockPos, specs: &[SlotSpec]) {
    let Some(slots) = level.slots_at_mut(pos) else {
        return;
    };
    for spec in specs {
        if spec.slot >= slots.len() {
            warn!(?pos, slot = spec.slot, "scenario slot out of range");
            continue;
        }
        slots.set(spec.slot, Some(spec.stack.clone()));
    }
}
