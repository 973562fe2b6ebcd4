//! The five automation devices and their shared tick contract.

pub mod dropper;
pub mod hopper;
pub mod incinerator;
pub mod placer;
pub mod smelter;

pub use dropper::Dropper;
pub use hopper::Hopper;
pub use incinerator::Incinerator;
pub use placer::Placer;
pub use smelter::MineralSmelter;

use crate::access::WorldAccess;
use crate::config::AutomationConfig;
use crate::energy::Battery;
use crate::fields::DeviceFields;
use crate::persist::{DeviceRecord, Persist};
use crate::slots::SlotArray;
use crate::storage::{ItemHandler, LegacyInventory, StorageProvider};
use edautomation_core::{Block, BlockPos, DeviceKind, Direction};

/// A tick-scheduled device living at a block position.
pub trait Automaton: StorageProvider + Persist + DeviceFields {
    fn kind(&self) -> DeviceKind;

    fn pos(&self) -> BlockPos;

    /// Output facing as of the last tick (or placement).
    fn facing(&self) -> Direction;

    fn slots(&self) -> &SlotArray;

    /// Called once per game tick. Must never block; anything that cannot
    /// happen now is deferred through the device's own timers.
    fn tick(&mut self, world: &mut dyn WorldAccess);

    /// A neighbouring block or signal changed.
    fn neighbor_changed(&mut self, _world: &dyn WorldAccess) {}

    /// Return and clear the "needs save/sync" flag.
    fn take_dirty(&mut self) -> bool;

    fn battery_mut(&mut self) -> Option<&mut Battery> {
        None
    }
}

/// Facing of the device block at `pos` if it still is a `kind` device.
pub(crate) fn device_facing(world: &dyn WorldAccess, pos: BlockPos, kind: DeviceKind) -> Option<Direction> {
    match world.block_at(pos) {
        Block::Device { kind: found, facing } if found == kind => Some(facing),
        _ => None,
    }
}

/// Any of the device block entities.
#[derive(Debug, Clone, PartialEq)]
pub enum Device {
    Hopper(Hopper),
    Dropper(Dropper),
    Placer(Placer),
    Incinerator(Incinerator),
    MineralSmelter(MineralSmelter),
}

macro_rules! dispatch {
    ($self:expr, $device:ident => $body:expr) => {
        match $self {
            Device::Hopper($device) => $body,
            Device::Dropper($device) => $body,
            Device::Placer($device) => $body,
            Device::Incinerator($device) => $body,
            Device::MineralSmelter($device) => $body,
        }
    };
}

impl Device {
    /// Fresh device of `kind` as placed by a player.
    pub fn new(kind: DeviceKind, pos: BlockPos, facing: Direction, config: &AutomationConfig) -> Self {
        match kind {
            DeviceKind::Hopper => Device::Hopper(Hopper::new(pos, facing)),
            DeviceKind::Dropper => Device::Dropper(Dropper::new(pos, facing, &config.dropper)),
            DeviceKind::Placer => Device::Placer(Placer::new(pos, facing)),
            DeviceKind::Incinerator => Device::Incinerator(Incinerator::new(pos, facing, &config.incinerator)),
            DeviceKind::MineralSmelter => {
                Device::MineralSmelter(MineralSmelter::new(pos, facing, &config.smelter))
            }
        }
    }

    pub fn automaton(&self) -> &dyn Automaton {
        dispatch!(self, device => device)
    }

    pub fn automaton_mut(&mut self) -> &mut dyn Automaton {
        dispatch!(self, device => device)
    }

    /// Direct slot access for setup and debugging tools.
    pub fn slots_mut(&mut self) -> &mut SlotArray {
        dispatch!(self, device => device.slots_mut())
    }
}

impl StorageProvider for Device {
    fn has_item_handler(&self, side: Option<Direction>) -> bool {
        dispatch!(self, device => device.has_item_handler(side))
    }

    fn item_handler(&mut self, side: Option<Direction>) -> Option<Box<dyn ItemHandler + '_>> {
        dispatch!(self, device => device.item_handler(side))
    }

    fn legacy_inventory(&mut self) -> Option<&mut dyn LegacyInventory> {
        dispatch!(self, device => device.legacy_inventory())
    }

    fn automaton_facing(&self) -> Option<Direction> {
        dispatch!(self, device => device.automaton_facing())
    }

    fn automaton_pull_side(&self) -> Option<Direction> {
        dispatch!(self, device => device.automaton_pull_side())
    }
}

impl Persist for Device {
    fn save(&self) -> DeviceRecord {
        dispatch!(self, device => device.save())
    }

    fn load(&mut self, record: &DeviceRecord) {
        dispatch!(self, device => device.load(record))
    }
}
